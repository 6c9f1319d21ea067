//! Circular dependency detection infrastructure.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};
use crate::key::ContractKey;

/// One in-flight resolution: the contract and the container resolving it.
///
/// The same contract resolved by two different containers is not a cycle, so a
/// child registration may delegate to its parent's registration of the same
/// contract.
#[derive(Clone, PartialEq, Eq)]
struct Frame {
    key: ContractKey,
    scope: usize,
}

// Thread-local resolution stack for circular dependency detection
thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// Guard for managing the thread-local resolution stack.
///
/// Entering checks the stack before any lifetime manager lock is taken, so a
/// cycle through a singleton reports an error instead of deadlocking.
pub(crate) struct StackGuard {
    #[cfg(debug_assertions)]
    frame: Frame,
}

impl StackGuard {
    /// Pushes `key` as resolved by the container identified by `scope`.
    pub(crate) fn enter(key: &ContractKey, scope: usize, max_depth: usize) -> DiResult<Self> {
        let frame = Frame {
            key: key.clone(),
            scope,
        };
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            // Circular detection BEFORE pushing the new frame
            if stack.contains(&frame) {
                let path = stack
                    .iter()
                    .map(|f| f.key.to_string())
                    .chain(std::iter::once(key.to_string()))
                    .collect();
                return Err(DiError::Circular(path));
            }

            if stack.len() >= max_depth {
                return Err(DiError::DepthExceeded(stack.len()));
            }

            stack.push(frame.clone());
            Ok(())
        })?;

        #[cfg(not(debug_assertions))]
        let _ = frame;

        Ok(Self {
            #[cfg(debug_assertions)]
            frame,
        })
    }

    /// Current depth of the calling thread's resolution stack.
    #[cfg(test)]
    pub(crate) fn depth() -> usize {
        RESOLUTION_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            let last = stack.borrow_mut().pop();
            #[cfg(debug_assertions)]
            debug_assert!(last.as_ref() == Some(&self.frame));
            #[cfg(not(debug_assertions))]
            let _ = last;
        });
    }
}
