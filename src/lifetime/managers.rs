//! Built-in lifetime managers.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use ahash::RandomState;
use parking_lot::{Mutex, RwLock};

use super::{LifetimeContext, LifetimeManager, Lookup, Pending};
use crate::internal::run_hooks;
use crate::types::{AnyArc, Disposer};

/// Never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransientLifetimeManager;

impl LifetimeManager for TransientLifetimeManager {
    fn try_get(&self, _context: &LifetimeContext<'_>) -> Option<AnyArc> {
        None
    }

    fn get<'m>(&'m self, _context: &LifetimeContext<'_>) -> Lookup<'m> {
        Lookup::Miss(Pending::unlocked(self))
    }

    fn set(&self, _value: AnyArc, _context: &LifetimeContext<'_>) {}

    fn create_lifetime_manager(&self) -> Box<dyn LifetimeManager> {
        Box::new(TransientLifetimeManager)
    }

    fn name(&self) -> &'static str {
        "transient"
    }
}

/// Singleton per registration, constructed at most once.
///
/// Concurrent first resolutions queue on the construction lock; the losers
/// observe the winner's value once it is stored.
#[derive(Default)]
pub struct ContainerControlledLifetimeManager {
    value: RwLock<Option<AnyArc>>,
    construction: Mutex<()>,
}

impl ContainerControlledLifetimeManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup<'m>(&'m self, manager: &'m dyn LifetimeManager) -> Lookup<'m> {
        if let Some(value) = self.value.read().clone() {
            return Lookup::Hit(value);
        }
        let guard = self.construction.lock();
        // Another thread may have stored the value while we waited.
        match self.value.read().clone() {
            Some(value) => Lookup::Hit(value),
            None => Lookup::Miss(Pending::locked(manager, guard)),
        }
    }
}

impl LifetimeManager for ContainerControlledLifetimeManager {
    fn try_get(&self, _context: &LifetimeContext<'_>) -> Option<AnyArc> {
        self.value.read().clone()
    }

    fn get<'m>(&'m self, _context: &LifetimeContext<'_>) -> Lookup<'m> {
        self.lookup(self)
    }

    fn set(&self, value: AnyArc, context: &LifetimeContext<'_>) {
        *self.value.write() = Some(value);
        context.track_disposal();
    }

    fn create_lifetime_manager(&self) -> Box<dyn LifetimeManager> {
        Box::new(ContainerControlledLifetimeManager::new())
    }

    fn remove_value(&self) {
        *self.value.write() = None;
    }

    fn name(&self) -> &'static str {
        "singleton"
    }
}

/// Singleton per container: each child container builds its own instance.
#[derive(Default)]
pub struct HierarchicalLifetimeManager {
    inner: ContainerControlledLifetimeManager,
}

impl HierarchicalLifetimeManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LifetimeManager for HierarchicalLifetimeManager {
    fn try_get(&self, context: &LifetimeContext<'_>) -> Option<AnyArc> {
        self.inner.try_get(context)
    }

    fn get<'m>(&'m self, _context: &LifetimeContext<'_>) -> Lookup<'m> {
        self.inner.lookup(self)
    }

    fn set(&self, value: AnyArc, context: &LifetimeContext<'_>) {
        self.inner.set(value, context);
    }

    fn create_lifetime_manager(&self) -> Box<dyn LifetimeManager> {
        Box::new(HierarchicalLifetimeManager::new())
    }

    fn remove_value(&self) {
        self.inner.remove_value();
    }

    fn is_hierarchical(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "hierarchical"
    }
}

/// One instance per top-level resolve call tree.
///
/// Values live in the resolution context, not in the manager, and are
/// dropped when the outermost resolve returns.
#[derive(Default)]
pub struct PerResolveLifetimeManager {
    // Gives every manager a distinct, stable address to key its slot on.
    _slot: u8,
}

impl PerResolveLifetimeManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> usize {
        &self._slot as *const u8 as usize
    }
}

impl LifetimeManager for PerResolveLifetimeManager {
    fn try_get(&self, context: &LifetimeContext<'_>) -> Option<AnyArc> {
        context.per_resolve_value(self.slot())
    }

    fn get<'m>(&'m self, context: &LifetimeContext<'_>) -> Lookup<'m> {
        match self.try_get(context) {
            Some(value) => Lookup::Hit(value),
            None => Lookup::Miss(Pending::unlocked(self)),
        }
    }

    fn set(&self, value: AnyArc, context: &LifetimeContext<'_>) {
        context.set_per_resolve_value(self.slot(), value);
    }

    fn create_lifetime_manager(&self) -> Box<dyn LifetimeManager> {
        Box::new(PerResolveLifetimeManager::new())
    }

    fn name(&self) -> &'static str {
        "per-resolve"
    }
}

static NEXT_THREAD_SLOT: AtomicU64 = AtomicU64::new(1);

/// A value kept for one thread, disposed when the slot is dropped.
struct ThreadSlot {
    generation: u64,
    value: AnyArc,
    disposer: Option<Disposer>,
}

impl Drop for ThreadSlot {
    fn drop(&mut self) {
        if let Some(disposer) = self.disposer.take() {
            run_hooks(vec![disposer]);
        }
    }
}

thread_local! {
    // Keyed by manager slot; torn down with the thread.
    static THREAD_VALUES: RefCell<HashMap<u64, ThreadSlot, RandomState>> =
        RefCell::new(HashMap::default());
}

/// One instance per calling thread.
///
/// Values live in the calling thread's local storage and are dropped when that
/// thread exits. Disposable values are disposed at that point.
/// [`remove_value`](LifetimeManager::remove_value) discards the calling
/// thread's value at once and every other thread's on its next access.
pub struct PerThreadLifetimeManager {
    slot: u64,
    generation: AtomicU64,
}

impl Default for PerThreadLifetimeManager {
    fn default() -> Self {
        Self {
            slot: NEXT_THREAD_SLOT.fetch_add(1, Ordering::Relaxed),
            generation: AtomicU64::new(0),
        }
    }
}

impl PerThreadLifetimeManager {
    pub fn new() -> Self {
        Self::default()
    }

    // Slots are returned out of the borrow so their drop may touch thread storage again.
    fn take_slot(&self) -> Option<ThreadSlot> {
        THREAD_VALUES
            .try_with(|values| values.try_borrow_mut().ok()?.remove(&self.slot))
            .ok()
            .flatten()
    }
}

impl LifetimeManager for PerThreadLifetimeManager {
    fn try_get(&self, _context: &LifetimeContext<'_>) -> Option<AnyArc> {
        let generation = self.generation.load(Ordering::Acquire);
        let current = THREAD_VALUES
            .try_with(|values| {
                values
                    .borrow()
                    .get(&self.slot)
                    .map(|slot| (slot.generation == generation).then(|| slot.value.clone()))
            })
            .ok()
            .flatten();
        match current {
            Some(Some(value)) => Some(value),
            Some(None) => {
                // Stale since the last `remove_value`.
                drop(self.take_slot());
                None
            }
            None => None,
        }
    }

    fn get<'m>(&'m self, context: &LifetimeContext<'_>) -> Lookup<'m> {
        match self.try_get(context) {
            Some(value) => Lookup::Hit(value),
            None => Lookup::Miss(Pending::unlocked(self)),
        }
    }

    fn set(&self, value: AnyArc, context: &LifetimeContext<'_>) {
        let slot = ThreadSlot {
            generation: self.generation.load(Ordering::Acquire),
            value,
            disposer: context.take_disposer(),
        };
        let replaced = THREAD_VALUES
            .try_with(|values| values.borrow_mut().insert(self.slot, slot))
            .ok()
            .flatten();
        drop(replaced);
    }

    fn create_lifetime_manager(&self) -> Box<dyn LifetimeManager> {
        Box::new(PerThreadLifetimeManager::new())
    }

    fn remove_value(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        drop(self.take_slot());
    }

    fn name(&self) -> &'static str {
        "per-thread"
    }
}

impl Drop for PerThreadLifetimeManager {
    fn drop(&mut self) {
        drop(self.take_slot());
    }
}

/// Holds a weak reference; the instance is rebuilt once every owner drops it.
///
/// The container never disposes externally controlled instances.
#[derive(Default)]
pub struct ExternallyControlledLifetimeManager {
    value: RwLock<Option<Weak<dyn Any + Send + Sync>>>,
}

impl ExternallyControlledLifetimeManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LifetimeManager for ExternallyControlledLifetimeManager {
    fn try_get(&self, _context: &LifetimeContext<'_>) -> Option<AnyArc> {
        self.value.read().as_ref().and_then(Weak::upgrade)
    }

    fn get<'m>(&'m self, context: &LifetimeContext<'_>) -> Lookup<'m> {
        match self.try_get(context) {
            Some(value) => Lookup::Hit(value),
            None => Lookup::Miss(Pending::unlocked(self)),
        }
    }

    fn set(&self, value: AnyArc, _context: &LifetimeContext<'_>) {
        *self.value.write() = Some(Arc::downgrade(&value));
    }

    fn create_lifetime_manager(&self) -> Box<dyn LifetimeManager> {
        Box::new(ExternallyControlledLifetimeManager::new())
    }

    fn remove_value(&self) {
        *self.value.write() = None;
    }

    fn name(&self) -> &'static str {
        "external"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::DisposeBag;
    use crate::lifetime::Lifetime;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::thread;

    struct Harness {
        bag: Mutex<DisposeBag>,
        per_resolve: RefCell<HashMap<usize, AnyArc>>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                bag: Mutex::new(DisposeBag::default()),
                per_resolve: RefCell::new(HashMap::new()),
            }
        }

        fn context(&self) -> LifetimeContext<'_> {
            LifetimeContext::new(&self.bag, &self.per_resolve)
        }
    }

    fn store(manager: &dyn LifetimeManager, context: &LifetimeContext<'_>, value: AnyArc) {
        match manager.get(context) {
            Lookup::Miss(pending) => pending.set(value, context),
            Lookup::Hit(_) => panic!("expected an empty manager"),
        }
    }

    #[test]
    fn transient_never_caches() {
        let harness = Harness::new();
        let ctx = harness.context();
        let manager = TransientLifetimeManager;
        store(&manager, &ctx, Arc::new(1u32));
        assert!(manager.try_get(&ctx).is_none());
    }

    #[test]
    fn singleton_transitions_from_empty_to_populated() {
        let harness = Harness::new();
        let ctx = harness.context();
        let manager = ContainerControlledLifetimeManager::new();
        assert!(manager.try_get(&ctx).is_none());

        let value: AnyArc = Arc::new(7u32);
        store(&manager, &ctx, value.clone());
        assert!(Arc::ptr_eq(&manager.try_get(&ctx).unwrap(), &value));
        assert!(matches!(manager.get(&ctx), Lookup::Hit(_)));

        manager.remove_value();
        assert!(manager.try_get(&ctx).is_none());
    }

    #[test]
    fn dropped_pending_releases_the_lock() {
        let harness = Harness::new();
        let ctx = harness.context();
        let manager = ContainerControlledLifetimeManager::new();
        match manager.get(&ctx) {
            Lookup::Miss(pending) => drop(pending),
            Lookup::Hit(_) => unreachable!(),
        }
        // Would deadlock if the first guard were still held.
        store(&manager, &ctx, Arc::new(1u8));
    }

    #[test]
    fn clones_are_empty_and_of_the_same_kind() {
        let harness = Harness::new();
        let ctx = harness.context();
        for lifetime in [
            Lifetime::Transient,
            Lifetime::Singleton,
            Lifetime::Hierarchical,
            Lifetime::PerResolve,
            Lifetime::PerThread,
            Lifetime::External,
        ] {
            let manager = lifetime.manager();
            let value: AnyArc = Arc::new(3u16);
            store(manager.as_ref(), &ctx, value.clone());

            let clone = manager.create_lifetime_manager();
            assert_eq!(clone.name(), manager.name());
            assert_eq!(clone.is_hierarchical(), manager.is_hierarchical());
            assert!(clone.try_get(&ctx).is_none(), "{} clone is not empty", clone.name());
        }
    }

    #[test]
    fn per_resolve_is_scoped_to_the_context() {
        let manager = PerResolveLifetimeManager::new();
        let first = Harness::new();
        store(&manager, &first.context(), Arc::new(1u8));
        assert!(manager.try_get(&first.context()).is_some());

        let second = Harness::new();
        assert!(manager.try_get(&second.context()).is_none());
    }

    #[test]
    fn per_thread_values_are_isolated() {
        let harness = Harness::new();
        let ctx = harness.context();
        let manager = Arc::new(PerThreadLifetimeManager::new());
        store(manager.as_ref(), &ctx, Arc::new(1u8));

        let other = manager.clone();
        let seen = thread::spawn(move || {
            let harness = Harness::new();
            let result = other.try_get(&harness.context()).is_some();
            result
        })
        .join()
        .unwrap();
        assert!(!seen);
        assert!(manager.try_get(&ctx).is_some());
    }

    #[test]
    fn per_thread_values_die_with_their_thread() {
        let manager = Arc::new(PerThreadLifetimeManager::new());
        let disposed = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8u32)
            .map(|i| {
                let manager = manager.clone();
                let disposed = disposed.clone();
                thread::spawn(move || {
                    let harness = Harness::new();
                    let ctx = harness.context();
                    let value: AnyArc = Arc::new(i);
                    ctx.offer_disposer(Some(Box::new(move || {
                        disposed.fetch_add(1, Ordering::SeqCst);
                    })));
                    store(manager.as_ref(), &ctx, value.clone());
                    assert_eq!(harness.bag.lock().len(), 0);
                    Arc::downgrade(&value)
                })
            })
            .collect();

        for handle in handles {
            let weak = handle.join().unwrap();
            assert!(weak.upgrade().is_none());
        }
        assert_eq!(disposed.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn removing_values_reaches_other_threads() {
        let manager = Arc::new(PerThreadLifetimeManager::new());
        let stored = Arc::new(Barrier::new(2));
        let removed = Arc::new(Barrier::new(2));

        let worker = {
            let manager = manager.clone();
            let stored = stored.clone();
            let removed = removed.clone();
            thread::spawn(move || {
                let harness = Harness::new();
                let ctx = harness.context();
                store(manager.as_ref(), &ctx, Arc::new(1u8));
                stored.wait();
                removed.wait();
                manager.try_get(&ctx).is_none()
            })
        };

        stored.wait();
        manager.remove_value();
        removed.wait();
        assert!(worker.join().unwrap());
    }

    #[test]
    fn external_value_follows_outside_owners() {
        let harness = Harness::new();
        let ctx = harness.context();
        let manager = ExternallyControlledLifetimeManager::new();
        let value: AnyArc = Arc::new(String::from("shared"));
        store(&manager, &ctx, value.clone());
        assert!(manager.try_get(&ctx).is_some());

        drop(value);
        assert!(manager.try_get(&ctx).is_none());
    }

    #[test]
    fn stored_values_hand_over_disposal() {
        let harness = Harness::new();
        let ctx = harness.context();
        ctx.offer_disposer(Some(Box::new(|| {})));
        store(&ContainerControlledLifetimeManager::new(), &ctx, Arc::new(1u8));
        assert_eq!(harness.bag.lock().len(), 1);

        ctx.offer_disposer(Some(Box::new(|| {})));
        store(&TransientLifetimeManager, &ctx, Arc::new(1u8));
        assert_eq!(harness.bag.lock().len(), 1);
    }
}
