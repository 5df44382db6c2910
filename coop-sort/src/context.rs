//! Execution contexts (spec section 4.3, Design Notes "Ucontext-style
//! coroutines").
//!
//! A resumable unit of work with its own private stack, implemented with
//! the POSIX `<ucontext.h>` family via `libc` — the direct Rust-std
//! equivalent of the original's `ucontext_t`/`getcontext`/`makecontext`/
//! `swapcontext` (`task1/main.c`'s includes). `libc` is not a dependency
//! the teacher kernel carries (it's `no_std` and talks to hardware
//! directly), but it's the standard crate the wider ecosystem reaches for
//! whenever raw POSIX signal/context primitives are needed (SPEC_FULL.md
//! section 2).

use std::mem::MaybeUninit;

/// Per-context stack size (spec section 3: "private stack region >= 1 MiB").
pub const STACK_SIZE: usize = 1024 * 1024;

/// Stack size for the small trampoline contexts the scheduler uses
/// internally (the per-task "finished" link target): these run a few
/// instructions and never call into the reader or sorter, so they don't
/// need a full task-sized stack.
pub const TRAMPOLINE_STACK_SIZE: usize = 64 * 1024;

/// One resumable execution context: a `ucontext_t` plus the stack memory
/// it runs on. `_stack` is never read from Rust directly; it's kept alive
/// here purely so its backing allocation outlives every `swapcontext` call
/// that might be running on it.
pub struct ExecContext {
    ctx: Box<libc::ucontext_t>,
    _stack: Vec<u8>,
}

impl ExecContext {
    /// Allocates a context whose stack size is `STACK_SIZE` and whose entry
    /// point, when first resumed, runs `entry` to completion and then
    /// returns control to `link` (the context named in `uc_link`), per
    /// `ucontext_t` semantics.
    ///
    /// # Safety
    /// `link` must outlive every resumption of the returned context: the
    /// C library reads `uc_link` only when `entry` returns, which may
    /// happen arbitrarily later (after any number of preemptions).
    pub fn new<F>(entry: F, link: *mut libc::ucontext_t) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self::with_stack_size(entry, link, STACK_SIZE)
    }

    /// As [`Self::new`], but with an explicit stack size. Used for the
    /// scheduler's internal trampoline contexts, which need far less than
    /// a full task's [`STACK_SIZE`].
    ///
    /// Each context built this way must only ever be resumed via its own
    /// dedicated `makecontext` entry, never shared across more than one
    /// logical "first resumption": the entry closure is a `FnOnce` reclaimed
    /// by-value the first (and only) time the trampoline runs, so reusing
    /// the same `ExecContext` for a second implicit `uc_link` return would
    /// double-free it.
    pub fn with_stack_size<F>(entry: F, link: *mut libc::ucontext_t, stack_size: usize) -> Self
    where
        F: FnOnce() + 'static,
    {
        let mut stack = vec![0u8; stack_size];
        let mut ctx: Box<libc::ucontext_t> =
            Box::new(unsafe { MaybeUninit::zeroed().assume_init() });

        // SAFETY: `ctx` is a fully owned, freshly zeroed ucontext_t; getcontext
        // only fills in the fields required to later makecontext/swapcontext it.
        if unsafe { libc::getcontext(ctx.as_mut()) } != 0 {
            log::error!("getcontext failed during context creation: {}", std::io::Error::last_os_error());
            std::process::exit(1);
        }

        ctx.uc_stack.ss_sp = stack.as_mut_ptr() as *mut libc::c_void;
        ctx.uc_stack.ss_size = stack.len();
        ctx.uc_stack.ss_flags = 0;
        ctx.uc_link = link;

        // makecontext's varargs are ints; a pointer is split across two to
        // survive the 32-bit-int-promotion boundary on 64-bit targets. The
        // trampoline below reassembles it before invoking the closure.
        let boxed: Box<Box<dyn FnOnce()>> = Box::new(Box::new(entry));
        let raw = Box::into_raw(boxed) as usize;
        let hi = (raw >> 32) as u32;
        let lo = (raw & 0xffff_ffff) as u32;

        // SAFETY: `trampoline` matches the `extern "C" fn(u32, u32)` shape
        // implied by the two i32 varargs passed below; `ctx`'s stack was
        // just set above and is large enough for any task's reader+sorter
        // call depth.
        unsafe {
            libc::makecontext(
                ctx.as_mut(),
                std::mem::transmute::<extern "C" fn(u32, u32), extern "C" fn()>(trampoline),
                2,
                hi,
                lo,
            );
        }

        ExecContext { ctx, _stack: stack }
    }

    /// A zeroed placeholder, used wherever a context is only ever the
    /// *outgoing* ("from") side of a `swapcontext` call: `swapcontext`
    /// populates it with the current machine state as a side effect, the
    /// same way `getcontext` would, so it needs no prior initialisation.
    /// Used for the main context and as the scheduler's own pre-creation
    /// placeholder before it is `makecontext`'d via [`Self::new`].
    pub fn uninit() -> Self {
        ExecContext {
            ctx: Box::new(unsafe { MaybeUninit::zeroed().assume_init() }),
            _stack: Vec::new(),
        }
    }

    pub fn as_mut_ptr(&mut self) -> *mut libc::ucontext_t {
        self.ctx.as_mut()
    }
}

extern "C" fn trampoline(hi: u32, lo: u32) {
    let raw = ((hi as usize) << 32) | (lo as usize);
    // SAFETY: `raw` was produced by `Box::into_raw` in `ExecContext::new`
    // and this trampoline runs exactly once, the first time the context is
    // resumed, so reclaiming ownership here is sound.
    let boxed: Box<Box<dyn FnOnce()>> = unsafe { Box::from_raw(raw as *mut Box<dyn FnOnce()>) };
    boxed();
    // Falls off the end here; the C runtime transfers control to uc_link.
}

/// Swaps the currently running context out (saving its state into `from`)
/// and resumes `to`.
///
/// # Safety
/// Both pointers must reference live, either `makecontext`'d or previously
/// `swapcontext`'d-into `ucontext_t`s, and this must be the only place
/// either is being entered right now (spec section 5's "at most one task
/// context executing at any instant").
pub unsafe fn swap(from: *mut libc::ucontext_t, to: *mut libc::ucontext_t) {
    if libc::swapcontext(from, to) != 0 {
        log::error!("swapcontext failed: {}", std::io::Error::last_os_error());
        std::process::exit(1);
    }
}
