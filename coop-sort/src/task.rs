//! Task record (spec section 4.3, data model section 3).
//!
//! One [`TaskRecord`] per input file, owned by the scheduler's [`crate::scheduler::run`]
//! call from creation until program exit. Its integer array is mutated only by
//! its owning execution context; the `sorted` flag, swap count, and CPU
//! time are written by the scheduler (from the signal-driven chooser) and
//! read by both the scheduler and main's termination busy-wait.
//!
//! Spec section 5 recommends an atomic byte for `sorted` "[to] satisfy"
//! portable single-writer/multi-reader access under signal preemption;
//! this uses [`AtomicBool`] for exactly that reason. Swap count and CPU
//! time are plain `u64`/`Duration`-backed atomics too, even though spec
//! section 5 says they're "mutated only from the signal handler's
//! scheduler context (never from task context)": the busy-wait terminator
//! in `main` reads them for the final report while the scheduler may still
//! be mutating another task's fields, and atomics make that race-free
//! without a lock.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Per-task state (spec sections 3 and 4.3).
///
/// `data` holds the integer array: empty until the task's own execution
/// context reads and sorts it, written exactly once by that context, and
/// read-only to everyone else (the k-way merge writer) from then on. A
/// `Mutex` is overkill for a value with only ever one writer and one later
/// reader that never overlap in time, but it's the ordinary, safe way to
/// express "shared behind `Arc`, mutated at some point" in std Rust, and
/// its lock is taken at most twice over a task's entire lifetime.
pub struct TaskRecord {
    pub id: usize,
    pub input_path: PathBuf,
    pub data: Mutex<Vec<i32>>,
    pub sorted: AtomicBool,
    pub swap_count: AtomicU64,
    pub total_cpu_micros: AtomicU64,
}

impl TaskRecord {
    pub fn new(id: usize, input_path: PathBuf) -> Self {
        TaskRecord {
            id,
            input_path,
            data: Mutex::new(Vec::new()),
            sorted: AtomicBool::new(false),
            swap_count: AtomicU64::new(0),
            total_cpu_micros: AtomicU64::new(0),
        }
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted.load(Ordering::SeqCst)
    }

    /// One-way false->true transition (spec section 3): called exactly
    /// once, by the task's own execution context, just before it returns.
    pub fn mark_sorted(&self) {
        self.sorted.store(true, Ordering::SeqCst);
    }

    pub fn record_swap(&self) {
        self.swap_count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn charge_micros(&self, micros: u64) {
        self.total_cpu_micros.fetch_add(micros, Ordering::SeqCst);
    }

    pub fn swap_count(&self) -> u64 {
        self.swap_count.load(Ordering::SeqCst)
    }

    pub fn total_cpu_micros(&self) -> u64 {
        self.total_cpu_micros.load(Ordering::SeqCst)
    }
}
