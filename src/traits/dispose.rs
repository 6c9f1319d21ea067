//! Disposal trait for resource cleanup.

/// Trait for synchronous resource disposal.
///
/// Implement this trait for services that need structured teardown (e.g., flushing caches,
/// closing connections) and declare it on the described type with
/// [`TypeBuilder::disposable`](crate::TypeBuilder::disposable). Instances owned by a
/// container are disposed in LIFO order when the container is disposed.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{Container, ContractKey, Dispose, Lifetime, TypeBuilder};
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// static FLUSHED: AtomicBool = AtomicBool::new(false);
///
/// struct Cache;
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         FLUSHED.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let cache = TypeBuilder::class("Cache")
///     .constructor(|c| c.body(|_| Ok(Cache)))
///     .disposable::<Cache>()
///     .build()
///     .unwrap();
///
/// let container = Container::new();
/// container.register(ContractKey::new(cache.clone()), Vec::new(), Lifetime::Singleton).unwrap();
/// container.resolve(&cache, None).unwrap();
/// container.dispose();
/// assert!(FLUSHED.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}
