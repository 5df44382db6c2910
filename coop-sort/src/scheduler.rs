//! Preemptive scheduler (spec section 4.4) — the hard part of C1.
//!
//! A single OS thread runs every task; a periodic real-time timer
//! (`ITIMER_REAL`/`SIGALRM`) fires every time slice and preempts whichever
//! context is currently running onto a dedicated scheduler context, whose
//! entry point is the chooser described below. This mirrors the spec's
//! "Ucontext-style coroutines" Design Note using `libc`'s `sigaltstack`/
//! `sigaction`/`setitimer` plus [`crate::context`]'s `ucontext_t` wrapper.
//!
//! # Global mutable state
//!
//! The scheduler's tables (tasks, contexts, "who's currently running")
//! are process-wide for the lifetime of one [`run`] call, because the
//! `SIGALRM` handler is a plain `extern "C" fn(c_int)` with no way to
//! capture anything: it can only reach this state through a raw pointer,
//! matching spec section 9's "Global mutable state... Encapsulate into an
//! explicit... handle" note as closely as a signal handler allows (the
//! handle itself, [`Runtime`], is still a single explicit struct; only its
//! address is smuggled through a static because the OS signal API demands
//! it). [`run`] is not reentrant: only one scheduler may be active in the
//! process at a time, matching C1's single-OS-thread, single-workload
//! design.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::context::{self, ExecContext};
use crate::reader;
use crate::sorter;
use crate::task::TaskRecord;

/// Default time slice (spec section 4.4: "default 2000 us").
pub const DEFAULT_TIME_SLICE_US: u64 = 2000;

static TIMER_ARMED: AtomicBool = AtomicBool::new(false);

/// Which context was most recently resumed: either `main` (including its
/// busy-wait terminator) or a specific task. Tracked explicitly because the
/// round-robin chooser needs a reference index even when the thing that
/// just got preempted wasn't a task (spec section 4.4: "starting from
/// (current_index + 1) mod N").
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Running {
    Main,
    Task(usize),
}

/// All scheduler-owned state for one [`run`] call. Boxed and referenced
/// through a raw pointer so its address is stable across the whole run
/// (every `ucontext_t`'s `uc_link` and every closure captured at
/// construction time embeds a pointer to fields inside this struct).
struct Runtime {
    tasks: Vec<Arc<TaskRecord>>,
    contexts: Vec<ExecContext>,
    /// One per task: a trampoline that flips `running` back to `Main`
    /// before falling through to `main_ctx` via its own `uc_link`. Spec
    /// section 4.3's contexts "do not communicate with each other" and
    /// each "return" — modeled here as a one-shot link target per task
    /// rather than a single shared one, since [`ExecContext`]'s closure is
    /// reclaimed by value the first time its trampoline runs (see
    /// [`ExecContext::with_stack_size`]'s doc comment).
    finishers: Vec<ExecContext>,
    main_ctx: ExecContext,
    scheduler_ctx: ExecContext,
    running: Running,
    last_tick: Instant,
}

static mut RUNTIME: *mut Runtime = std::ptr::null_mut();

/// Runs every task to completion under the cooperative scheduler and
/// returns their records (each task's `data` holds its sorted array).
///
/// Spec section 4.4 Startup/Termination: arms the timer, transfers control
/// into task 0, busy-waits on "all sorted", then disarms the timer.
pub fn run(paths: &[PathBuf], time_slice: Duration) -> Vec<Arc<TaskRecord>> {
    let tasks: Vec<Arc<TaskRecord>> = paths
        .iter()
        .enumerate()
        .map(|(id, path)| Arc::new(TaskRecord::new(id, path.clone())))
        .collect();

    let runtime_ptr: *mut Runtime = Box::into_raw(Box::new(Runtime {
        tasks: tasks.clone(),
        contexts: Vec::new(),
        finishers: Vec::new(),
        main_ctx: ExecContext::uninit(),
        scheduler_ctx: ExecContext::uninit(),
        running: Running::Main,
        last_tick: Instant::now(),
    }));
    // SAFETY: `run` is documented non-reentrant; nothing else can be
    // touching `RUNTIME` while this function owns the only reference.
    unsafe {
        RUNTIME = runtime_ptr;
    }

    let main_ptr = unsafe { (*runtime_ptr).main_ctx.as_mut_ptr() };

    let finishers: Vec<ExecContext> = tasks
        .iter()
        .map(|_| {
            ExecContext::with_stack_size(
                move || unsafe { (*runtime_ptr).running = Running::Main },
                main_ptr,
                context::TRAMPOLINE_STACK_SIZE,
            )
        })
        .collect();
    unsafe {
        (*runtime_ptr).finishers = finishers;
    }

    let contexts: Vec<ExecContext> = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let task = task.clone();
            let link = unsafe { (*runtime_ptr).finishers[i].as_mut_ptr() };
            ExecContext::new(move || run_task(&task), link)
        })
        .collect();
    unsafe {
        (*runtime_ptr).contexts = contexts;
    }

    let scheduler_ctx = ExecContext::new(move || chooser_loop(runtime_ptr), std::ptr::null_mut());
    unsafe {
        (*runtime_ptr).scheduler_ctx = scheduler_ctx;
    }

    install_signal_handler();
    arm_timer(time_slice);

    unsafe {
        let rt = &mut *runtime_ptr;
        rt.running = Running::Task(0);
        rt.last_tick = Instant::now();
        context::swap(rt.main_ctx.as_mut_ptr(), rt.contexts[0].as_mut_ptr());
    }

    // Spec section 4.4 Termination: "main busy-waits on the all-sorted
    // predicate". While this spins, SIGALRM keeps firing and the chooser
    // keeps dispatching whichever tasks remain (see `chooser_loop`'s
    // `Running::Main` branch): main contributes no scheduling logic of its
    // own here, it's just the thing the timer interrupts when nothing else
    // happens to be running.
    while !tasks.iter().all(|t| t.is_sorted()) {
        std::hint::spin_loop();
    }

    disarm_timer();

    // SAFETY: every task context has returned control to `main_ctx` by now
    // (that's the loop condition above), so nothing still references
    // `runtime_ptr`'s contexts/stacks.
    unsafe {
        drop(Box::from_raw(runtime_ptr));
        RUNTIME = std::ptr::null_mut();
    }

    tasks
}

fn run_task(task: &Arc<TaskRecord>) {
    let mut data = reader::read_ints(&task.input_path);
    sorter::heap_sort(&mut data);
    *task.data.lock().unwrap() = data;
    // One-way false->true transition, written just before return (spec
    // section 5): any later signal observes it, and single-thread
    // cooperative execution means no signal can fire *during* this store.
    task.mark_sorted();
}

/// The scheduler context's entry point: repeatedly woken by `SIGALRM`
/// swapping into it, picks the next unsorted task round-robin from
/// whichever context was just preempted, and swaps into it. Never returns
/// (each "exit" is itself a `swapcontext` into someone else).
fn chooser_loop(runtime_ptr: *mut Runtime) -> ! {
    loop {
        // SAFETY: only the scheduler context's own execution touches `rt`
        // here; at most one context runs at a time (spec section 5).
        let rt = unsafe { &mut *runtime_ptr };

        let now = Instant::now();
        let elapsed = now.duration_since(rt.last_tick);
        rt.last_tick = now;
        if let Running::Task(i) = rt.running {
            rt.tasks[i].charge_micros(elapsed.as_micros() as u64);
        }

        let n = rt.tasks.len();
        let start = match rt.running {
            Running::Task(i) => i,
            Running::Main => n - 1,
        };
        let chosen = (1..=n)
            .map(|step| (start + step) % n)
            .find(|&idx| !rt.tasks[idx].is_sorted());

        match chosen {
            None => {
                disarm_timer();
                let target = match rt.running {
                    Running::Main => rt.main_ctx.as_mut_ptr(),
                    Running::Task(i) => rt.contexts[i].as_mut_ptr(),
                };
                unsafe { context::swap(rt.scheduler_ctx.as_mut_ptr(), target) };
            }
            Some(idx) => {
                if let Running::Task(prev) = rt.running {
                    if prev != idx {
                        rt.tasks[prev].record_swap();
                    }
                }
                rt.running = Running::Task(idx);
                let target = rt.contexts[idx].as_mut_ptr();
                unsafe { context::swap(rt.scheduler_ctx.as_mut_ptr(), target) };
            }
        }
    }
}

/// Dedicated signal stack (spec section 3: "a single shared stack region
/// used by the signal-delivery context only; never reentered"). 64 KiB is
/// comfortably above `SIGSTKSZ` on every mainstream target and the handler
/// itself does only a `swapcontext` call before leaving this stack.
const ALTSTACK_SIZE: usize = 64 * 1024;

fn install_signal_handler() {
    unsafe {
        let altstack = vec![0u8; ALTSTACK_SIZE].into_boxed_slice();
        let ss = libc::stack_t {
            ss_sp: Box::leak(altstack).as_mut_ptr() as *mut libc::c_void,
            ss_flags: 0,
            ss_size: ALTSTACK_SIZE,
        };
        if libc::sigaltstack(&ss, std::ptr::null_mut()) != 0 {
            fatal("sigaltstack");
        }

        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigalrm_handler as usize;
        sa.sa_flags = libc::SA_ONSTACK | libc::SA_RESTART;
        libc::sigemptyset(&mut sa.sa_mask);
        if libc::sigaction(libc::SIGALRM, &sa, std::ptr::null_mut()) != 0 {
            fatal("sigaction");
        }
    }
}

/// The handler itself does the bare minimum the spec allows (section 4.4:
/// "must not call anything non-async-safe beyond the stack swap and the
/// time-accounting increment"): it swaps out of whatever was running and
/// into the scheduler context, which does all the real work once it's no
/// longer executing on the signal-delivery stack.
extern "C" fn sigalrm_handler(_sig: libc::c_int) {
    // SAFETY: `RUNTIME` is set for the whole lifetime of a `run` call, and
    // `run` arms the timer only after every field below is initialised.
    unsafe {
        let rt = &mut *RUNTIME;
        let from = match rt.running {
            Running::Main => rt.main_ctx.as_mut_ptr(),
            Running::Task(i) => rt.contexts[i].as_mut_ptr(),
        };
        context::swap(from, rt.scheduler_ctx.as_mut_ptr());
    }
}

fn arm_timer(slice: Duration) {
    let micros = slice.as_micros().max(1) as i64;
    let tv = libc::timeval {
        tv_sec: micros / 1_000_000,
        tv_usec: (micros % 1_000_000) as libc::suseconds_t,
    };
    let it = libc::itimerval {
        it_interval: tv,
        it_value: tv,
    };
    unsafe {
        if libc::setitimer(libc::ITIMER_REAL, &it, std::ptr::null_mut()) != 0 {
            fatal("setitimer");
        }
    }
    TIMER_ARMED.store(true, Ordering::SeqCst);
}

/// Idempotent: the chooser may disarm the timer from inside a signal
/// delivery, and `run` disarms it again unconditionally on the way out.
fn disarm_timer() {
    if !TIMER_ARMED.swap(false, Ordering::SeqCst) {
        return;
    }
    let zero = libc::itimerval {
        it_interval: libc::timeval { tv_sec: 0, tv_usec: 0 },
        it_value: libc::timeval { tv_sec: 0, tv_usec: 0 },
    };
    unsafe {
        libc::setitimer(libc::ITIMER_REAL, &zero, std::ptr::null_mut());
    }
}

fn fatal(what: &str) -> ! {
    // Timer/context setup failures are fatal (spec section 4.4 Failure
    // semantics; section 7: "scheduler-internal errors... are fatal").
    log::error!("{what} failed: {}", std::io::Error::last_os_error());
    std::process::exit(1);
}
