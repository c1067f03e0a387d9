//! Call depth tracking
//!
//! One counter per thread, i.e. per call stack: concurrent stacks never share
//! a counter, so increment/decrement pairs always nest correctly.

use std::cell::Cell;
use std::marker::PhantomData;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Depth of the traced call currently executing on this thread
pub fn current() -> usize {
    DEPTH.with(Cell::get)
}

/// Holds one level of call depth for the lifetime of a traced call
///
/// Created on entry, dropped on every exit path (return, error or unwind).
#[must_use = "the depth is released as soon as the guard is dropped"]
pub struct DepthGuard {
    depth: usize,
    // released on the thread that acquired it
    _not_send: PhantomData<*const ()>,
}

impl DepthGuard {
    pub fn enter() -> Self {
        let depth = DEPTH.with(|d| {
            let depth = d.get();
            d.set(depth + 1);
            depth
        });
        Self {
            depth,
            _not_send: PhantomData,
        }
    }

    /// Depth captured before this guard incremented it
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}
