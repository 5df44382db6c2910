//! K-way merge writer (spec section 4.5).
//!
//! Merges `N` already-sorted sequences into one non-decreasing stream,
//! written as whitespace-separated decimals. Matches spec section 4.5's
//! algorithm exactly: each step finds the minimum among all active
//! sources' current heads, then emits every occurrence of that minimum
//! across every source whose head equals it before advancing. This is
//! `O(total * N)`, acceptable for the small `N` this tool targets; spec
//! section 9's Open Question notes a heap-based merge is an equivalent
//! refinement, but it changes performance, not emitted order.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Merges `sources` (each already sorted non-decreasing) into `path`, one
/// non-decreasing whitespace-separated stream, each value followed by a
/// single space.
pub fn merge_to_file(sources: &[Vec<i32>], path: &Path) -> io::Result<()> {
    let mut out = io::BufWriter::new(File::create(path)?);
    for value in merge(sources) {
        write!(out, "{value} ")?;
    }
    out.flush()
}

/// The merge proper, exposed separately so tests can assert on the emitted
/// sequence without touching the filesystem.
pub fn merge(sources: &[Vec<i32>]) -> Vec<i32> {
    let mut indices = vec![0usize; sources.len()];
    let total: usize = sources.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total);

    loop {
        let min = sources
            .iter()
            .zip(indices.iter())
            .filter(|(src, &idx)| idx < src.len())
            .map(|(src, &idx)| src[idx])
            .min();

        let Some(min) = min else {
            break;
        };

        for (src, idx) in sources.iter().zip(indices.iter_mut()) {
            while *idx < src.len() && src[*idx] == min {
                out.push(min);
                *idx += 1;
            }
        }
    }

    out
}
