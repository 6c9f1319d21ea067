//! Diagnostic observers for resolution events.
//!
//! Observers see every contract the container resolves, including nested
//! dependencies, with timing for successful builds and the error for failed
//! ones.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::error::DiError;
use crate::key::ContractKey;

/// Observer trait for resolution events.
///
/// # Performance
///
/// Observer calls are made synchronously on the resolving thread. Keep
/// implementations lightweight; the container skips timing entirely when no
/// observer is registered.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{Container, ContractKey, DiError, ResolutionObserver, Type};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Counter(AtomicUsize);
///
/// impl ResolutionObserver for Counter {
///     fn resolving(&self, _key: &ContractKey) {}
///
///     fn resolved(&self, _key: &ContractKey, _duration: Duration) {
///         self.0.fetch_add(1, Ordering::Relaxed);
///     }
///
///     fn failed(&self, _key: &ContractKey, _error: &DiError) {}
/// }
///
/// let counter = Arc::new(Counter::default());
/// let container = Container::builder().observer(counter.clone()).build();
/// container.register_shared(Type::of::<u32>(), None, Arc::new(7u32));
///
/// container.resolve(&Type::of::<u32>(), None).unwrap();
/// assert_eq!(counter.0.load(Ordering::Relaxed), 1);
/// ```
pub trait ResolutionObserver: Send + Sync {
    /// Called before a registration is consulted.
    fn resolving(&self, key: &ContractKey);

    /// Called when a contract resolved, with the time spent including dependencies.
    fn resolved(&self, key: &ContractKey, duration: Duration);

    /// Called when resolving a contract failed.
    fn failed(&self, key: &ContractKey, error: &DiError);
}

/// Forwards resolution events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl ResolutionObserver for TracingObserver {
    fn resolving(&self, key: &ContractKey) {
        trace!(contract = %key, "resolving");
    }

    fn resolved(&self, key: &ContractKey, duration: Duration) {
        debug!(contract = %key, elapsed_us = duration.as_micros() as u64, "resolved");
    }

    fn failed(&self, key: &ContractKey, error: &DiError) {
        warn!(contract = %key, error = %error, "resolution failed");
    }
}

/// Registered observers.
///
/// Has minimal overhead when no observers are registered.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn ResolutionObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn ResolutionObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    #[inline]
    pub(crate) fn resolving(&self, key: &ContractKey) {
        for observer in &self.observers {
            observer.resolving(key);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, key: &ContractKey, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(key, duration);
        }
    }

    #[inline]
    pub(crate) fn failed(&self, key: &ContractKey, error: &DiError) {
        for observer in &self.observers {
            observer.failed(key, error);
        }
    }
}
