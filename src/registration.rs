//! Registration table.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tracing::{debug, trace};

use crate::descriptors::{RegistrationDescriptor, RegistrationKind};
use crate::error::{DiError, DiResult};
use crate::injection::plan::BuildPlan;
use crate::injection::InjectionMember;
use crate::key::ContractKey;
use crate::lifetime::LifetimeManager;
use crate::provider::ResolutionContext;
use crate::types::{AnyArc, Disposer, Type, TypeCategory};

static NEXT_REGISTRATION_ID: AtomicU64 = AtomicU64::new(1);

/// User supplied factory producing the instance for a requested contract type.
pub type Factory = Arc<dyn Fn(&ResolutionContext<'_>, &Type) -> DiResult<AnyArc> + Send + Sync>;

/// Mapping from a contract to an implementation type.
pub(crate) struct TypeMapping {
    mapped_to: Type,
    members: Arc<[InjectionMember]>,
    plan: OnceCell<Arc<BuildPlan>>,
    closed_plans: DashMap<Type, Arc<BuildPlan>, RandomState>,
}

impl TypeMapping {
    pub(crate) fn new(contract: &ContractKey, mapped_to: Type, members: Vec<InjectionMember>) -> DiResult<Self> {
        validate_mapping(contract.ty(), &mapped_to)?;
        if members.iter().filter(|m| m.is_constructor()).count() > 1 {
            return Err(DiError::InvalidSpecification(format!(
                "{} declares more than one injection constructor",
                contract
            )));
        }
        for member in &members {
            member.validate()?;
        }
        Ok(Self {
            mapped_to,
            members: members.into(),
            plan: OnceCell::new(),
            closed_plans: DashMap::default(),
        })
    }

    /// The implementation type serving `requested`.
    ///
    /// Open mappings are closed over the requested contract's arguments.
    fn close(&self, requested: &Type) -> DiResult<Type> {
        if self.mapped_to.is_generic_type_definition() {
            self.mapped_to.make_generic(requested.generic_arguments())
        } else {
            Ok(self.mapped_to.clone())
        }
    }

    fn plan_for(&self, closed: &Type) -> DiResult<Arc<BuildPlan>> {
        if closed == &self.mapped_to {
            return self
                .plan
                .get_or_try_init(|| BuildPlan::compile(closed, &self.members).map(Arc::new))
                .cloned();
        }
        let cached = self.closed_plans.get(closed).map(|plan| plan.value().clone());
        if let Some(plan) = cached {
            return Ok(plan);
        }
        let plan = Arc::new(BuildPlan::compile(closed, &self.members)?);
        Ok(self
            .closed_plans
            .entry(closed.clone())
            .or_insert(plan)
            .value()
            .clone())
    }
}

fn validate_mapping(contract: &Type, mapped_to: &Type) -> DiResult<()> {
    if mapped_to.category() != Some(TypeCategory::Class) {
        return Err(DiError::InvalidSpecification(format!(
            "{} is not a concrete class and cannot be built",
            mapped_to
        )));
    }
    if mapped_to.is_generic_type_definition() {
        let open_contract = contract.is_generic_type_definition();
        let arity = mapped_to.generic_parameter_names().len();
        if !open_contract || contract.generic_parameter_names().len() != arity {
            return Err(DiError::InvalidSpecification(format!(
                "open type {} can only serve an open contract with {} generic parameters, not {}",
                mapped_to, arity, contract
            )));
        }
        return Ok(());
    }
    if mapped_to.contains_generic_parameters() {
        return Err(DiError::InvalidSpecification(format!(
            "{} is partially open",
            mapped_to
        )));
    }
    if !contract.is_assignable_from(mapped_to) {
        return Err(DiError::InvalidSpecification(format!(
            "{} is not assignable to {}",
            mapped_to, contract
        )));
    }
    Ok(())
}

pub(crate) enum Strategy {
    Type(TypeMapping),
    // The lifetime manager owns the instance; the strategy only finds it again.
    Instance(Weak<dyn Any + Send + Sync>),
    Factory(Factory),
}

/// One entry of the registration table.
pub(crate) struct Registration {
    id: u64,
    contract: ContractKey,
    strategy: Arc<Strategy>,
    manager: Arc<dyn LifetimeManager>,
}

impl Registration {
    pub(crate) fn new(contract: ContractKey, strategy: Strategy, manager: Arc<dyn LifetimeManager>) -> Self {
        Self {
            id: NEXT_REGISTRATION_ID.fetch_add(1, Ordering::Relaxed),
            contract,
            strategy: Arc::new(strategy),
            manager,
        }
    }

    /// Registration for one closed contract served by this open registration.
    ///
    /// The strategy and its plan cache are shared; the lifetime manager is a
    /// fresh clone so every closed contract caches its own instance.
    fn close(&self, contract: ContractKey) -> Self {
        Self {
            id: NEXT_REGISTRATION_ID.fetch_add(1, Ordering::Relaxed),
            contract,
            strategy: self.strategy.clone(),
            manager: Arc::from(self.manager.create_lifetime_manager()),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn contract(&self) -> &ContractKey {
        &self.contract
    }

    pub(crate) fn manager(&self) -> &Arc<dyn LifetimeManager> {
        &self.manager
    }

    /// Produces a new instance for `requested`, plus the disposer for it if
    /// its type declares one.
    pub(crate) fn build(
        &self,
        ctx: &ResolutionContext<'_>,
        requested: &Type,
    ) -> DiResult<(AnyArc, Option<Disposer>)> {
        match &*self.strategy {
            Strategy::Instance(value) => value
                .upgrade()
                .map(|value| (value, None))
                .ok_or_else(|| {
                    DiError::unresolved(self.contract.to_string(), "the registered instance was released")
                }),
            Strategy::Factory(factory) => Ok((factory(ctx, requested)?, None)),
            Strategy::Type(mapping) => {
                let closed = mapping.close(requested)?;
                let plan = mapping.plan_for(&closed)?;
                trace!(contract = %self.contract, ty = %plan.ty(), "executing build plan");
                let value = plan.execute(ctx)?;
                let disposer = closed.dispose_hook().and_then(|hook| hook(&value));
                let value = match closed.caster_for(requested) {
                    Some(cast) => cast(value)?,
                    None => value,
                };
                Ok((value, disposer))
            }
        }
    }

    pub(crate) fn descriptor(&self) -> RegistrationDescriptor {
        let (kind, mapped_to, member_count, lifetime) = match &*self.strategy {
            Strategy::Type(mapping) => (
                RegistrationKind::Type,
                Some(mapping.mapped_to.clone()),
                mapping.members.len(),
                self.manager.name(),
            ),
            Strategy::Instance(_) => (RegistrationKind::Instance, None, 0, self.manager.name()),
            Strategy::Factory(_) => (RegistrationKind::Factory, None, 0, self.manager.name()),
        };
        RegistrationDescriptor {
            contract: self.contract.clone(),
            mapped_to,
            lifetime,
            kind,
            member_count,
        }
    }
}

/// Registrations of one container.
///
/// Closed contracts served by an open generic registration get their own
/// derived registration on first lookup.
#[derive(Default)]
pub(crate) struct Registry {
    entries: DashMap<ContractKey, Arc<Registration>, RandomState>,
    closed: DashMap<ContractKey, Arc<Registration>, RandomState>,
}

impl Registry {
    /// Adds a registration, replacing any earlier one for the same contract.
    pub(crate) fn insert(&self, registration: Registration) {
        let contract = registration.contract.clone();
        if contract.ty().is_generic_type_definition() {
            self.closed
                .retain(|key, _| key.generic_definition_key().as_ref() != Some(&contract));
        }
        if self.entries.insert(contract.clone(), Arc::new(registration)).is_some() {
            debug!(contract = %contract, "replaced registration");
        }
    }

    pub(crate) fn get(&self, key: &ContractKey) -> Option<Arc<Registration>> {
        let exact = self.entries.get(key).map(|r| r.value().clone());
        if exact.is_some() {
            return exact;
        }
        let open_key = key.generic_definition_key()?;
        let open = self.entries.get(&open_key).map(|r| r.value().clone())?;
        let closed = self
            .closed
            .entry(key.clone())
            .or_insert_with(|| Arc::new(open.close(key.clone())))
            .value()
            .clone();
        Some(closed)
    }

    pub(crate) fn contains(&self, key: &ContractKey) -> bool {
        self.entries.contains_key(key)
            || key
                .generic_definition_key()
                .map_or(false, |open| self.entries.contains_key(&open))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Every registered contract's registration, closed derivations excluded.
    pub(crate) fn registrations(&self) -> Vec<Arc<Registration>> {
        self.entries.iter().map(|r| r.value().clone()).collect()
    }

    /// Every registration whose lifetime manager may hold values.
    pub(crate) fn all_with_derived(&self) -> Vec<Arc<Registration>> {
        self.entries
            .iter()
            .chain(self.closed.iter())
            .map(|r| r.value().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifetime::Lifetime;
    use crate::types::TypeBuilder;

    struct Repository;

    fn repository_types() -> (Type, Type) {
        let contract = TypeBuilder::interface("IRepository")
            .generic_parameters(&["T"])
            .build()
            .unwrap();
        let builder = TypeBuilder::class("Repository").generic_parameters(&["T"]);
        let implements = contract.make_generic(&[builder.param("T")]).unwrap();
        let repository = builder
            .implements(implements)
            .constructor(|c| c.body(|_| Ok(Repository)))
            .build()
            .unwrap();
        (contract, repository)
    }

    fn mapped(contract: &ContractKey, to: Type) -> Registration {
        let mapping = TypeMapping::new(contract, to, Vec::new()).unwrap();
        Registration::new(contract.clone(), Strategy::Type(mapping), Arc::from(Lifetime::Singleton.manager()))
    }

    #[test]
    fn closed_lookups_derive_one_registration_per_contract() {
        let (contract, repository) = repository_types();
        let registry = Registry::default();
        let open = ContractKey::new(contract.clone());
        registry.insert(mapped(&open, repository));

        let orders = ContractKey::new(contract.make_generic(&[Type::of::<u32>()]).unwrap());
        let first = registry.get(&orders).unwrap();
        let second = registry.get(&orders).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.contract(), &orders);
        assert!(registry.contains(&orders));

        let names = ContractKey::new(contract.make_generic(&[Type::of::<String>()]).unwrap());
        let other = registry.get(&names).unwrap();
        assert_ne!(first.id(), other.id());
        assert!(!Arc::ptr_eq(first.manager(), other.manager()));
    }

    #[test]
    fn replacing_an_open_registration_drops_derived_entries() {
        let (contract, repository) = repository_types();
        let registry = Registry::default();
        let open = ContractKey::new(contract.clone());
        registry.insert(mapped(&open, repository.clone()));

        let closed = ContractKey::new(contract.make_generic(&[Type::of::<u32>()]).unwrap());
        let before = registry.get(&closed).unwrap();
        registry.insert(mapped(&open, repository));
        let after = registry.get(&closed).unwrap();
        assert_ne!(before.id(), after.id());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn invalid_mappings_are_rejected() {
        let (contract, repository) = repository_types();
        let closed = ContractKey::new(contract.make_generic(&[Type::of::<u32>()]).unwrap());

        let open_to_closed = TypeMapping::new(&closed, repository.clone(), Vec::new());
        assert!(matches!(open_to_closed, Err(DiError::InvalidSpecification(_))));

        let to_interface = TypeMapping::new(&ContractKey::new(contract.clone()), contract.clone(), Vec::new());
        assert!(matches!(to_interface, Err(DiError::InvalidSpecification(_))));

        let unrelated = TypeBuilder::class("Unrelated").build().unwrap();
        let not_assignable = TypeMapping::new(&closed, unrelated, Vec::new());
        assert!(matches!(not_assignable, Err(DiError::InvalidSpecification(_))));
    }
}
