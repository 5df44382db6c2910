use std::fmt;

use strum::FromRepr;

/// Closed set of error codes reported by [`crate::Ufs`] operations.
///
/// Mirrors the original implementation's `enum ufs_error_code`, kept as a
/// `#[repr(i32)]` enum with a stable numeric encoding (so callers who only
/// have the `errno()`-style integer can still recover the variant via
/// [`UfsError::from_repr`]), plus `std::error::Error` so it composes with
/// ordinary `?`-based Rust error handling.
#[derive(FromRepr, Clone, Copy, Debug, Eq, PartialEq, Default)]
#[repr(i32)]
pub enum UfsError {
    /// No error has occurred since the last successful operation.
    #[default]
    NoErr = 0,
    /// File absent, ghost-without-`CREATE`, descriptor out of range, or
    /// descriptor slot empty.
    NoFile = 1,
    /// Requested position or size exceeds [`crate::MAX_FILE_SIZE`].
    NoMem = 2,
    /// Descriptor lacks the permission the operation requires.
    NoPermission = 3,
    /// A required buffer pointer/slice argument was null/empty where a
    /// value was mandatory.
    NullPtrBuf = 4,
}

impl UfsError {
    /// Returns the error description, matching the original C `perror`-style
    /// wording where applicable.
    pub const fn as_str(self) -> &'static str {
        match self {
            UfsError::NoErr => "no error",
            UfsError::NoFile => "no such file",
            UfsError::NoMem => "out of space",
            UfsError::NoPermission => "permission denied",
            UfsError::NullPtrBuf => "null buffer pointer",
        }
    }

    /// Returns the stable numeric encoding of this error.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for UfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for UfsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_repr() {
        for err in [
            UfsError::NoErr,
            UfsError::NoFile,
            UfsError::NoMem,
            UfsError::NoPermission,
            UfsError::NullPtrBuf,
        ] {
            assert_eq!(UfsError::from_repr(err.code()), Some(err));
        }
    }

    #[test]
    fn default_is_no_err() {
        assert_eq!(UfsError::default(), UfsError::NoErr);
    }
}
