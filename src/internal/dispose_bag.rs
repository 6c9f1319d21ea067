//! Internal disposal bag for managing cleanup hooks.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

pub(crate) type DisposeHook = Box<dyn FnOnce() + Send>;

/// Container for disposal hooks with LIFO execution order.
#[derive(Default)]
pub(crate) struct DisposeBag {
    hooks: Vec<DisposeHook>,
}

impl DisposeBag {
    /// Add a disposal hook.
    pub(crate) fn push(&mut self, f: DisposeHook) {
        self.hooks.push(f);
    }

    /// Takes every hook out of the bag, most recent first.
    ///
    /// Callers run the hooks after releasing the lock guarding the bag.
    pub(crate) fn drain_reverse(&mut self) -> Vec<DisposeHook> {
        let mut hooks = std::mem::take(&mut self.hooks);
        hooks.reverse();
        hooks
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }
}

/// Runs `hooks` in order. A panicking hook is logged and does not stop the rest.
pub(crate) fn run_hooks(hooks: Vec<DisposeHook>) {
    for hook in hooks {
        if catch_unwind(AssertUnwindSafe(hook)).is_err() {
            warn!("dispose hook panicked");
        }
    }
}
