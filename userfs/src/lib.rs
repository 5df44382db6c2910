//! Process-local, single-threaded, block-chained in-memory filesystem.
//!
//! [`Ufs`] is the primary entry point: an explicit handle carrying its own
//! file table, descriptor table, and last error, so a process can run as
//! many independent filesystem instances as it likes. The free functions at
//! the crate root ([`open`], [`read`], [`write`], [`close`], [`delete`],
//! [`resize`], [`errno`]) operate on a single default instance behind a
//! mutex, mirroring the plain-function shape of the original C API for
//! callers who don't need more than one filesystem.
//!
//! None of this is safe to share across threads without the mutex: `Ufs`
//! itself assumes single-threaded access, matching the original design.

mod block;
mod descriptor;
mod error;
mod file;
mod flags;
mod fs;

use std::sync::Mutex;

use lazy_static::lazy_static;

pub use block::BLOCK_SIZE;
pub use descriptor::Fd;
pub use error::UfsError;
pub use file::FileId;
pub use flags::OpenFlags;
pub use fs::{Ufs, MAX_FILE_SIZE};

lazy_static! {
    static ref DEFAULT: Mutex<Ufs> = Mutex::new(Ufs::new());
}

/// Opens `name` against the default filesystem instance. Returns `-1` on
/// failure; inspect [`errno`] for the reason.
pub fn open(name: &str, flags: OpenFlags) -> i64 {
    match DEFAULT.lock().unwrap().open(name, flags) {
        Ok(fd) => fd as i64,
        Err(_) => -1,
    }
}

/// Reads from `fd` into `buf` on the default filesystem instance. Returns
/// `-1` on failure.
pub fn read(fd: Fd, buf: &mut [u8]) -> i64 {
    match DEFAULT.lock().unwrap().read(fd, buf) {
        Ok(n) => n as i64,
        Err(_) => -1,
    }
}

/// Writes `buf` to `fd` on the default filesystem instance. Returns `-1` on
/// failure.
pub fn write(fd: Fd, buf: &[u8]) -> i64 {
    match DEFAULT.lock().unwrap().write(fd, buf) {
        Ok(n) => n as i64,
        Err(_) => -1,
    }
}

/// Closes `fd` on the default filesystem instance. Returns `-1` on failure.
pub fn close(fd: Fd) -> i64 {
    match DEFAULT.lock().unwrap().close(fd) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

/// Deletes `name` on the default filesystem instance. Returns `-1` on
/// failure.
pub fn delete(name: &str) -> i64 {
    match DEFAULT.lock().unwrap().delete(name) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

/// Resizes the file behind `fd` on the default filesystem instance. Returns
/// `-1` on failure.
pub fn resize(fd: Fd, new_size: usize) -> i64 {
    match DEFAULT.lock().unwrap().resize(fd, new_size) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

/// The last error reported by the default filesystem instance.
pub fn errno() -> UfsError {
    DEFAULT.lock().unwrap().errno()
}
