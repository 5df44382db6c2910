//! Command-line surface (spec section 6): `program file1 [file2 ...]`.
//!
//! Parsed with `clap`'s derive API, the idiomatic choice for a hosted Rust
//! CLI (SPEC_FULL.md section 6) in place of the teacher kernel's bespoke
//! `no_std` boot-argument handling, which has no hosted-process analogue.

use std::path::PathBuf;

use clap::Parser;

use crate::scheduler::DEFAULT_TIME_SLICE_US;

/// Sorts whitespace-separated integer files concurrently, one cooperative
/// execution context per file, time-sliced by a periodic signal, then
/// k-way merges the sorted results into one output file.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Input files, each containing whitespace-separated signed decimal
    /// integers. At least one is required.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output path for the merged, non-decreasing sequence.
    #[arg(long, default_value = "sorted.txt")]
    pub output: PathBuf,

    /// Scheduler time slice, in microseconds, between preemption signals.
    #[arg(long, default_value_t = DEFAULT_TIME_SLICE_US)]
    pub time_slice_us: u64,
}
