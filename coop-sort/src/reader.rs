//! Integer stream reader (spec section 4.1).
//!
//! Slurps a file whole into memory and tokenises it into a dense sequence
//! of signed decimal integers, separated by any run of ASCII whitespace.
//! The original (`task1/Array.c`'s `readArrayFromFile`) counts tokens in a
//! first pass over the raw bytes, then re-scans extracting each run with
//! `sscanf`. This does it in one pass with `split_whitespace`, which is
//! behavior-equivalent (spec.md section 4.1a).

use std::fs;
use std::path::Path;

/// Reads `path` and returns the sequence of whitespace-separated signed
/// decimal integers it contains.
///
/// On an open/read error, returns an empty vector; the caller is expected
/// to treat an empty result as a failed read for a non-empty file (spec
/// section 4.1: "Fails... on open/read error"). A token that isn't a valid
/// `-?[0-9]+` run doesn't crash: it's logged and contributes `0`, matching
/// the spec's "undefined value... must not crash" requirement while making
/// the substitution observable.
pub fn read_ints(path: &Path) -> Vec<i32> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            log::error!("{}: {e}", path.display());
            return Vec::new();
        }
    };

    raw.split_whitespace()
        .map(|token| match token.parse::<i32>() {
            Ok(v) => v,
            Err(_) => {
                log::warn!("{}: invalid integer token {token:?}, using 0", path.display());
                0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn tokenises_mixed_whitespace() {
        let f = write_tmp("3 1\t2\n\n-5  7");
        assert_eq!(read_ints(f.path()), vec![3, 1, 2, -5, 7]);
    }

    #[test]
    fn trailing_token_without_newline_counts() {
        let f = write_tmp("7");
        assert_eq!(read_ints(f.path()), vec![7]);
    }

    #[test]
    fn leading_minus_is_part_of_token() {
        let f = write_tmp("-12 34");
        assert_eq!(read_ints(f.path()), vec![-12, 34]);
    }

    #[test]
    fn missing_file_returns_empty() {
        assert_eq!(read_ints(Path::new("/no/such/file/here")), Vec::<i32>::new());
    }

    #[test]
    fn invalid_token_does_not_panic() {
        let f = write_tmp("1 12x4 3");
        assert_eq!(read_ints(f.path()), vec![1, 0, 3]);
    }
}
