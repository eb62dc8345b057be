//! Evaluation context threaded through `Eval`/`Apply`/intrinsics.
//!
//! `Eval`, `Apply` and every intrinsic accept a context and propagate it to
//! the resolver on lazy package loads; cancellation surfaces as a resolver
//! error rather than being polled by the evaluator itself. `Context` is
//! therefore deliberately thin: it carries a cancellation flag and a
//! call-depth counter used for recursion detection, nothing else — no
//! deadlines, no values map, since nothing in this engine needs them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    depth: Arc<AtomicUsize>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Depth of the current call-frame stack. Used by the evaluator to cap
    /// recursion.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    pub(crate) fn enter_call(&self) -> CallGuard {
        self.depth.fetch_add(1, Ordering::Relaxed);
        CallGuard {
            depth: self.depth.clone(),
        }
    }
}

pub(crate) struct CallGuard {
    depth: Arc<AtomicUsize>,
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::Relaxed);
    }
}
