//! Lifetime managers controlling instance caching and reuse.

mod managers;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

pub use managers::{
    ContainerControlledLifetimeManager, ExternallyControlledLifetimeManager,
    HierarchicalLifetimeManager, PerResolveLifetimeManager, PerThreadLifetimeManager,
    TransientLifetimeManager,
};

use crate::internal::DisposeBag;
use crate::types::{AnyArc, Disposer};

/// Built-in lifetimes controlling instance caching behavior
///
/// # Lifetime Characteristics
///
/// - **Transient**: a new instance on every resolution
/// - **Singleton**: one instance per registration, built at most once
/// - **Hierarchical**: one instance per container; child containers get their own
/// - **PerResolve**: one instance per top-level resolve call tree
/// - **PerThread**: one instance per calling thread
/// - **External**: reuses the instance while someone else keeps it alive
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{Container, ContractKey, Lifetime, TypeBuilder};
/// use std::sync::Arc;
///
/// struct Clock;
///
/// let clock = TypeBuilder::class("Clock")
///     .constructor(|c| c.body(|_| Ok(Clock)))
///     .build()
///     .unwrap();
///
/// let container = Container::new();
/// container.register(ContractKey::new(clock.clone()), Vec::new(), Lifetime::Singleton).unwrap();
///
/// let a = container.resolve(&clock, None).unwrap();
/// let b = container.resolve(&clock, None).unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    Transient,
    Singleton,
    Hierarchical,
    PerResolve,
    PerThread,
    External,
}

impl Lifetime {
    /// A fresh, empty manager of this kind.
    pub fn manager(self) -> Box<dyn LifetimeManager> {
        match self {
            Lifetime::Transient => Box::new(TransientLifetimeManager),
            Lifetime::Singleton => Box::new(ContainerControlledLifetimeManager::new()),
            Lifetime::Hierarchical => Box::new(HierarchicalLifetimeManager::new()),
            Lifetime::PerResolve => Box::new(PerResolveLifetimeManager::new()),
            Lifetime::PerThread => Box::new(PerThreadLifetimeManager::new()),
            Lifetime::External => Box::new(ExternallyControlledLifetimeManager::new()),
        }
    }
}

/// Controls whether a registration reuses previously built instances.
///
/// `try_get` never blocks. `get` may serialize construction: a miss hands out
/// a [`Pending`] guard that holds the manager's construction lock until the
/// caller stores the new value or drops the guard.
pub trait LifetimeManager: Send + Sync + 'static {
    /// Cached value, if any, without taking the construction lock.
    fn try_get(&self, context: &LifetimeContext<'_>) -> Option<AnyArc>;

    /// Cached value, or a guard for constructing one.
    fn get<'m>(&'m self, context: &LifetimeContext<'_>) -> Lookup<'m>;

    /// Stores a newly built value.
    fn set(&self, value: AnyArc, context: &LifetimeContext<'_>);

    /// A new manager of the same kind with nothing stored.
    fn create_lifetime_manager(&self) -> Box<dyn LifetimeManager>;

    /// Forgets the stored value.
    fn remove_value(&self) {}

    /// Child containers clone hierarchical managers instead of sharing them.
    fn is_hierarchical(&self) -> bool {
        false
    }

    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;
}

/// Anything a registration accepts as its lifetime.
pub trait IntoLifetimeManager {
    fn into_lifetime_manager(self) -> Arc<dyn LifetimeManager>;
}

impl IntoLifetimeManager for Lifetime {
    fn into_lifetime_manager(self) -> Arc<dyn LifetimeManager> {
        Arc::from(self.manager())
    }
}

impl<M: LifetimeManager> IntoLifetimeManager for M {
    fn into_lifetime_manager(self) -> Arc<dyn LifetimeManager> {
        Arc::new(self)
    }
}

impl IntoLifetimeManager for Arc<dyn LifetimeManager> {
    fn into_lifetime_manager(self) -> Arc<dyn LifetimeManager> {
        self
    }
}

impl fmt::Debug for dyn LifetimeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LifetimeManager({})", self.name())
    }
}

/// Result of [`LifetimeManager::get`].
pub enum Lookup<'m> {
    Hit(AnyArc),
    Miss(Pending<'m>),
}

/// Obligation to construct a value, holding any construction lock.
///
/// Dropping the guard without calling [`set`](Pending::set) releases the lock
/// and leaves the manager empty.
#[must_use = "a pending construction releases its lock when dropped"]
pub struct Pending<'m> {
    manager: &'m dyn LifetimeManager,
    _guard: Option<MutexGuard<'m, ()>>,
}

impl<'m> Pending<'m> {
    /// Construction that needs no serialization.
    pub fn unlocked(manager: &'m dyn LifetimeManager) -> Self {
        Self {
            manager,
            _guard: None,
        }
    }

    /// Construction serialized by `guard`.
    pub fn locked(manager: &'m dyn LifetimeManager, guard: MutexGuard<'m, ()>) -> Self {
        Self {
            manager,
            _guard: Some(guard),
        }
    }

    /// Stores the value, then releases the lock.
    pub fn set(self, value: AnyArc, context: &LifetimeContext<'_>) {
        self.manager.set(value, context);
    }
}

/// State a lifetime manager may use while storing values.
pub struct LifetimeContext<'a> {
    disposables: &'a Mutex<DisposeBag>,
    per_resolve: &'a RefCell<HashMap<usize, AnyArc>>,
    disposer: Cell<Option<Disposer>>,
}

impl<'a> LifetimeContext<'a> {
    pub(crate) fn new(
        disposables: &'a Mutex<DisposeBag>,
        per_resolve: &'a RefCell<HashMap<usize, AnyArc>>,
    ) -> Self {
        Self {
            disposables,
            per_resolve,
            disposer: Cell::new(None),
        }
    }

    pub(crate) fn offer_disposer(&self, disposer: Option<Disposer>) {
        self.disposer.set(disposer);
    }

    /// Hands disposal of the value being stored to the owning container.
    ///
    /// Managers that keep a value alive call this from `set`; values that are
    /// not kept are never disposed by the container.
    pub fn track_disposal(&self) {
        if let Some(disposer) = self.disposer.take() {
            self.disposables.lock().push(disposer);
        }
    }

    /// Takes the disposer of the value being stored, for managers that own
    /// disposal themselves instead of handing it to the container.
    pub(crate) fn take_disposer(&self) -> Option<Disposer> {
        self.disposer.take()
    }

    /// Value cached for the current resolve call tree under `slot`.
    pub fn per_resolve_value(&self, slot: usize) -> Option<AnyArc> {
        self.per_resolve.borrow().get(&slot).cloned()
    }

    pub fn set_per_resolve_value(&self, slot: usize, value: AnyArc) {
        self.per_resolve.borrow_mut().insert(slot, value);
    }
}
