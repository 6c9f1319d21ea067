//! The dependency injection container.
//!
//! This module contains the [`Container`] type, which owns the registration
//! table, resolves contracts through lifetime managers and tracks disposal.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

pub mod context;
pub use context::ResolutionContext;

use crate::config::{ContainerBuilder, ContainerOptions};
use crate::descriptors::RegistrationDescriptor;
use crate::error::{DiError, DiResult};
use crate::injection::plan::BuildPlan;
use crate::injection::InjectionMember;
use crate::internal::{run_hooks, DisposeBag, StackGuard};
use crate::key::ContractKey;
use crate::lifetime::{IntoLifetimeManager, Lifetime, LifetimeContext, LifetimeManager, Lookup};
use crate::registration::{Factory, Registration, Registry, Strategy, TypeMapping};
use crate::traits::ResolverCore;
use crate::types::{AnyArc, Type};

/// Dependency injection container.
///
/// Maps contracts (a [`Type`] plus an optional name) to implementations and
/// builds object graphs on demand, selecting constructors, methods, fields
/// and properties on the closed type being built.
///
/// # Thread Safety
///
/// `Container` is a cheap handle (`Arc` internally) and can be shared across
/// threads. Registration and resolution may happen concurrently; a
/// container-controlled registration is constructed at most once.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{
///     Container, ContractKey, InjectionConstructor, Lifetime, ParameterValue, Resolver, TypeBuilder,
/// };
/// use std::sync::Arc;
///
/// struct Greeter { greeting: String }
///
/// let greeter = TypeBuilder::class("Greeter")
///     .constructor(|c| {
///         c.param("greeting", ferrous_inject::Type::of::<String>())
///             .body(|call| Ok(Greeter { greeting: call.value(0)? }))
///     })
///     .build()
///     .unwrap();
///
/// let container = Container::new();
/// container
///     .register(
///         ContractKey::new(greeter.clone()),
///         vec![InjectionConstructor::new(vec![ParameterValue::value(String::from("hello"))]).into()],
///         Lifetime::Transient,
///     )
///     .unwrap();
///
/// let built = container.resolve_as::<Greeter>(&greeter).unwrap();
/// assert_eq!(built.greeting, "hello");
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

struct ContainerInner {
    registry: Registry,
    parent: Option<Container>,
    // Per-container clones of hierarchical managers, keyed by registration id.
    hierarchical: DashMap<u64, Arc<dyn LifetimeManager>, RandomState>,
    implicit_plans: DashMap<Type, Arc<BuildPlan>, RandomState>,
    disposers: Mutex<DisposeBag>,
    options: Arc<ContainerOptions>,
}

impl ContainerInner {
    fn new(parent: Option<Container>, options: Arc<ContainerOptions>) -> Self {
        Self {
            registry: Registry::default(),
            parent,
            hierarchical: DashMap::default(),
            implicit_plans: DashMap::default(),
            disposers: Mutex::new(DisposeBag::default()),
            options,
        }
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        let hooks = self.disposers.get_mut().drain_reverse();
        if !hooks.is_empty() {
            debug!(count = hooks.len(), "disposing container on drop");
        }
        run_hooks(hooks);
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Root container with default options.
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub(crate) fn with_options(options: ContainerOptions) -> Self {
        Self {
            inner: Arc::new(ContainerInner::new(None, Arc::new(options))),
        }
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.inner.options
    }

    pub fn parent(&self) -> Option<&Container> {
        self.inner.parent.as_ref()
    }

    /// Child container that sees every registration of this one.
    ///
    /// Registrations added to the child shadow the parent's. Hierarchical
    /// lifetimes build a separate instance per child; other lifetimes share
    /// the parent's.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_inject::{Container, ContractKey, Lifetime, TypeBuilder};
    /// use std::sync::Arc;
    ///
    /// struct Session;
    ///
    /// let session = TypeBuilder::class("Session")
    ///     .constructor(|c| c.body(|_| Ok(Session)))
    ///     .build()
    ///     .unwrap();
    ///
    /// let root = Container::new();
    /// root.register(ContractKey::new(session.clone()), Vec::new(), Lifetime::Hierarchical).unwrap();
    ///
    /// let child = root.create_child_container();
    /// let from_root = root.resolve(&session, None).unwrap();
    /// let from_child = child.resolve(&session, None).unwrap();
    /// assert!(!Arc::ptr_eq(&from_root, &from_child));
    /// assert!(Arc::ptr_eq(&from_child, &child.resolve(&session, None).unwrap()));
    /// ```
    pub fn create_child_container(&self) -> Container {
        Container {
            inner: Arc::new(ContainerInner::new(
                Some(self.clone()),
                self.inner.options.clone(),
            )),
        }
    }

    /// Registers `contract` to be built from its own type.
    pub fn register(
        &self,
        contract: impl Into<ContractKey>,
        members: Vec<InjectionMember>,
        lifetime: impl IntoLifetimeManager,
    ) -> DiResult<()> {
        let contract = contract.into();
        let mapped_to = contract.ty().clone();
        self.register_type(contract, mapped_to, members, lifetime)
    }

    /// Registers `contract` to be built from `mapped_to`.
    ///
    /// An open generic contract may map to an open generic definition of the
    /// same arity; each closed contract then builds the definition closed
    /// over the same arguments.
    ///
    /// # Errors
    ///
    /// `InvalidSpecification` when the mapping or a member specification is
    /// malformed. Member selection happens on first resolution of each
    /// closed type.
    pub fn register_type(
        &self,
        contract: impl Into<ContractKey>,
        mapped_to: Type,
        members: Vec<InjectionMember>,
        lifetime: impl IntoLifetimeManager,
    ) -> DiResult<()> {
        let contract = contract.into();
        let mapping = TypeMapping::new(&contract, mapped_to, members)?;
        let manager = lifetime.into_lifetime_manager();
        debug!(contract = %contract, lifetime = manager.name(), "registered type");
        self.inner
            .registry
            .insert(Registration::new(contract, Strategy::Type(mapping), manager));
        Ok(())
    }

    /// Registers a pre-built instance owned by the container.
    ///
    /// The instance is kept by a container-controlled lifetime and disposed
    /// with the container when `ty` is a disposable definition.
    pub fn register_instance<T: Any + Send + Sync>(&self, ty: Type, name: Option<&str>, instance: T) {
        self.register_shared(ty, name, Arc::new(instance));
    }

    /// Registers a pre-built instance kept by `lifetime`.
    pub fn register_instance_with<T: Any + Send + Sync>(
        &self,
        ty: Type,
        name: Option<&str>,
        instance: T,
        lifetime: impl IntoLifetimeManager,
    ) {
        self.register_shared_with(ty, name, Arc::new(instance), lifetime);
    }

    /// Registers an already shared instance owned by the container.
    pub fn register_shared(&self, ty: Type, name: Option<&str>, instance: AnyArc) {
        self.register_shared_with(ty, name, instance, Lifetime::Singleton);
    }

    /// Registers an already shared instance kept by `lifetime`.
    ///
    /// The instance is stored in the manager right away and served from it.
    /// Once the manager lets go of it (an externally controlled lifetime whose
    /// owners dropped it, or a lifetime that keeps nothing) resolving the
    /// contract fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_inject::{Container, Lifetime, Resolver, Type};
    /// use std::sync::Arc;
    ///
    /// let container = Container::new();
    /// let url = Arc::new(String::from("postgres://"));
    /// container.register_shared_with(Type::of::<String>(), None, url.clone(), Lifetime::External);
    /// assert!(container.get::<String>().is_ok());
    ///
    /// drop(url);
    /// assert!(container.get::<String>().is_err());
    /// ```
    pub fn register_shared_with(
        &self,
        ty: Type,
        name: Option<&str>,
        instance: AnyArc,
        lifetime: impl IntoLifetimeManager,
    ) {
        let contract = ContractKey::with_name(ty, name);
        let manager = lifetime.into_lifetime_manager();
        debug!(contract = %contract, lifetime = manager.name(), "registered instance");

        let per_resolve = RefCell::new(HashMap::new());
        let context = LifetimeContext::new(&self.inner.disposers, &per_resolve);
        context.offer_disposer(contract.ty().dispose_hook().and_then(|hook| hook(&instance)));
        let strategy = Strategy::Instance(Arc::downgrade(&instance));
        manager.set(instance, &context);

        self.inner
            .registry
            .insert(Registration::new(contract, strategy, manager));
    }

    /// Registers a factory receiving the live context and the requested type.
    pub fn register_factory<F>(&self, contract: impl Into<ContractKey>, lifetime: impl IntoLifetimeManager, factory: F)
    where
        F: Fn(&ResolutionContext<'_>, &Type) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        let contract = contract.into();
        let manager = lifetime.into_lifetime_manager();
        let factory: Factory = Arc::new(factory);
        debug!(contract = %contract, lifetime = manager.name(), "registered factory");
        self.inner
            .registry
            .insert(Registration::new(contract, Strategy::Factory(factory), manager));
    }

    /// Whether `contract` is registered here or in an ancestor.
    pub fn is_registered(&self, contract: &ContractKey) -> bool {
        let mut current = Some(self);
        while let Some(container) = current {
            if container.inner.registry.contains(contract) {
                return true;
            }
            current = container.parent();
        }
        false
    }

    /// Resolves the contract `(ty, name)`.
    pub fn resolve(&self, ty: &Type, name: Option<&str>) -> DiResult<AnyArc> {
        self.resolve_key(&ContractKey::with_name(ty.clone(), name))
    }

    pub fn resolve_key(&self, contract: &ContractKey) -> DiResult<AnyArc> {
        let ctx = ResolutionContext::new(self);
        self.resolve_in(&ctx, contract)
    }

    /// Resolves `(ty, name)`, yielding `None` when nothing can serve it.
    pub fn try_resolve(&self, ty: &Type, name: Option<&str>) -> DiResult<Option<AnyArc>> {
        ResolutionContext::new(self).try_resolve_any(ty, name)
    }

    /// Runs `f` with a fresh resolution context over this container.
    pub fn with_context<R>(&self, f: impl FnOnce(&ResolutionContext<'_>) -> R) -> R {
        f(&ResolutionContext::new(self))
    }

    /// Snapshot of this container's own registrations.
    pub fn registrations(&self) -> Vec<RegistrationDescriptor> {
        self.inner
            .registry
            .registrations()
            .iter()
            .map(|r| r.descriptor())
            .collect()
    }

    /// Disposes tracked instances in reverse order of creation and empties the
    /// lifetime managers owned by this container.
    ///
    /// Parent containers are unaffected. Dropping the last handle disposes too.
    pub fn dispose(&self) {
        for registration in self.inner.registry.all_with_derived() {
            registration.manager().remove_value();
        }
        for manager in self.inner.hierarchical.iter() {
            manager.value().remove_value();
        }
        let hooks = self.inner.disposers.lock().drain_reverse();
        debug!(count = hooks.len(), "disposing container");
        run_hooks(hooks);
    }

    pub(crate) fn push_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        self.inner.disposers.lock().push(f);
    }

    /// Whether resolving `contract` would reach a registration or auto-build.
    pub(crate) fn can_resolve(&self, contract: &ContractKey) -> bool {
        self.is_registered(contract) || self.can_auto_build(contract)
    }

    pub(crate) fn resolve_in(&self, ctx: &ResolutionContext<'_>, key: &ContractKey) -> DiResult<AnyArc> {
        // Entered before any lifetime lock is taken.
        let _guard = StackGuard::enter(key, self.scope_id(), self.inner.options.max_depth)?;

        let observers = &self.inner.options.observers;
        if !observers.has_observers() {
            return self.produce(ctx, key);
        }
        observers.resolving(key);
        let start = Instant::now();
        let result = self.produce(ctx, key);
        match &result {
            Ok(_) => observers.resolved(key, start.elapsed()),
            Err(e) => observers.failed(key, e),
        }
        result
    }

    fn produce(&self, ctx: &ResolutionContext<'_>, key: &ContractKey) -> DiResult<AnyArc> {
        let Some((owner, registration)) = self.find(key) else {
            if self.can_auto_build(key) {
                return self.auto_build(ctx, key.ty());
            }
            return Err(DiError::unresolved(key.to_string(), "no registration for this contract"));
        };

        let manager = self.manager_for(&owner, &registration);
        // Values kept by a hierarchical clone belong to the requesting container.
        let tracker = if manager.is_hierarchical() { self } else { &owner };
        let lifetime = LifetimeContext::new(&tracker.inner.disposers, &ctx.per_resolve);

        // Bound to a local so the lookup drops before `manager`.
        let result = match manager.get(&lifetime) {
            Lookup::Hit(value) => {
                trace!(contract = %key, lifetime = manager.name(), "cache hit");
                Ok(value)
            }
            Lookup::Miss(pending) => {
                let (value, disposer) = registration.build(ctx, key.ty())?;
                lifetime.offer_disposer(disposer);
                pending.set(value.clone(), &lifetime);
                Ok(value)
            }
        };
        result
    }

    /// Identity of this container on the resolution stack.
    fn scope_id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    /// Registration serving `key` and the container that owns it.
    fn find(&self, key: &ContractKey) -> Option<(Container, Arc<Registration>)> {
        let mut current = Some(self);
        while let Some(container) = current {
            if let Some(registration) = container.inner.registry.get(key) {
                return Some((container.clone(), registration));
            }
            current = container.parent();
        }
        None
    }

    fn manager_for(&self, owner: &Container, registration: &Registration) -> Arc<dyn LifetimeManager> {
        let manager = registration.manager();
        if !manager.is_hierarchical() || Arc::ptr_eq(&owner.inner, &self.inner) {
            return manager.clone();
        }
        self.inner
            .hierarchical
            .entry(registration.id())
            .or_insert_with(|| Arc::from(manager.create_lifetime_manager()))
            .value()
            .clone()
    }

    fn can_auto_build(&self, key: &ContractKey) -> bool {
        self.inner.options.auto_build && key.name().is_none() && key.ty().is_constructible()
    }

    /// Builds an unregistered concrete class as a transient.
    fn auto_build(&self, ctx: &ResolutionContext<'_>, ty: &Type) -> DiResult<AnyArc> {
        let cached = self.inner.implicit_plans.get(ty).map(|p| p.value().clone());
        let plan = match cached {
            Some(plan) => plan,
            None => {
                let plan = Arc::new(BuildPlan::compile(ty, &[])?);
                self.inner
                    .implicit_plans
                    .entry(ty.clone())
                    .or_insert(plan)
                    .value()
                    .clone()
            }
        };
        plan.execute(ctx)
    }

    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        let mut s = String::new();
        s.push_str("=== Container Debug ===\n");
        let mut depth = 0;
        let mut current = Some(self);
        while let Some(container) = current {
            s.push_str(&format!("Level {}:\n", depth));
            for descriptor in container.registrations() {
                s.push_str(&format!("  {}\n", descriptor));
            }
            depth += 1;
            current = container.parent();
        }
        s
    }
}

impl ResolverCore for Container {
    fn resolve_any(&self, ty: &Type, name: Option<&str>) -> DiResult<AnyArc> {
        self.resolve(ty, name)
    }

    fn try_resolve_any(&self, ty: &Type, name: Option<&str>) -> DiResult<Option<AnyArc>> {
        self.try_resolve(ty, name)
    }

    fn push_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        Container::push_disposer(self, f);
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registrations", &self.inner.registry.len())
            .field("has_parent", &self.inner.parent.is_some())
            .field("tracked_disposers", &self.inner.disposers.lock().len())
            .field("options", &self.inner.options)
            .finish()
    }
}
