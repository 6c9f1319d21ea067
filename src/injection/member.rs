//! Field and property injection members.

use std::sync::Arc;

use super::parameters::ParameterValue;
use super::resolver::{InjectDelegate, ResolverFactory};
use super::MemberSelector;
use crate::error::{DiError, DiResult};
use crate::matching::MatchRank;
use crate::types::{AccessorInfo, AccessorKind, Type};

#[derive(Clone, Debug)]
struct AccessorInjection {
    kind: AccessorKind,
    name: Arc<str>,
    value: ParameterValue,
    member: Option<AccessorInfo>,
}

impl AccessorInjection {
    fn new(kind: AccessorKind, name: &str, value: ParameterValue) -> Self {
        Self {
            kind,
            name: Arc::from(name),
            value,
            member: None,
        }
    }

    fn with_member(kind: AccessorKind, member: AccessorInfo, value: ParameterValue) -> DiResult<Self> {
        if member.kind() != kind {
            return Err(DiError::InvalidSpecification(format!(
                "{} is a {:?}, not a {:?}",
                member.name(),
                member.kind(),
                kind
            )));
        }
        if !member.is_writable() {
            return Err(DiError::InvalidSpecification(format!(
                "{}::{} is read-only",
                member.declaring_type(),
                member.name()
            )));
        }
        Ok(Self {
            kind,
            name: Arc::from(member.name()),
            value,
            member: Some(member),
        })
    }

    fn select(&self, closed: &Type) -> DiResult<AccessorInfo> {
        if let Some(member) = &self.member {
            if member.declaring_type() == closed {
                return Ok(member.clone());
            }
        }
        let kind = match self.kind {
            AccessorKind::Field => "field",
            AccessorKind::Property => "property",
        };
        let found = closed
            .accessors(self.kind)
            .into_iter()
            .find(|a| a.name() == &*self.name)
            .ok_or_else(|| {
                DiError::selection(
                    closed.to_string(),
                    &*self.name,
                    format!("no public instance {} with this name", kind),
                )
            })?;
        if !found.is_writable() {
            return Err(DiError::selection(closed.to_string(), &*self.name, format!("{} is read-only", kind)));
        }
        if self.value.match_accessor(&found) == MatchRank::NoMatch {
            return Err(DiError::selection(
                closed.to_string(),
                &*self.name,
                format!("{} cannot be assigned to {}", self.value, found.member_type()),
            ));
        }
        Ok(found)
    }

    fn resolver(&self, closed: &Type) -> DiResult<InjectDelegate> {
        let accessor = self.select(closed)?;
        ResolverFactory::accessor(&accessor, &self.value)
    }
}

/// Field injection, applied after construction.
///
/// Fields are found by name on the closed type or anywhere along its base
/// chain.
#[derive(Clone, Debug)]
pub struct InjectionField(AccessorInjection);

impl InjectionField {
    /// Resolves the field by its own type.
    pub fn new(name: &str) -> Self {
        Self::with_value(name, ParameterValue::dependency())
    }

    /// Resolves the field by its own type, leaving it untouched when unresolvable.
    pub fn optional(name: &str) -> Self {
        Self::with_value(name, ParameterValue::optional_dependency())
    }

    pub fn with_value(name: &str, value: ParameterValue) -> Self {
        Self(AccessorInjection::new(AccessorKind::Field, name, value))
    }

    /// Uses a field enumerated from the mapped type, a base type or a generic definition.
    pub fn with_member(member: AccessorInfo, value: ParameterValue) -> DiResult<Self> {
        AccessorInjection::with_member(AccessorKind::Field, member, value).map(Self)
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn value(&self) -> &ParameterValue {
        &self.0.value
    }

    pub fn resolver(&self, closed: &Type) -> DiResult<InjectDelegate> {
        self.0.resolver(closed)
    }
}

impl MemberSelector for InjectionField {
    type Member = AccessorInfo;

    fn select(&self, closed: &Type) -> DiResult<AccessorInfo> {
        self.0.select(closed)
    }
}

/// Property injection, applied after fields.
#[derive(Clone, Debug)]
pub struct InjectionProperty(AccessorInjection);

impl InjectionProperty {
    pub fn new(name: &str) -> Self {
        Self::with_value(name, ParameterValue::dependency())
    }

    pub fn optional(name: &str) -> Self {
        Self::with_value(name, ParameterValue::optional_dependency())
    }

    pub fn with_value(name: &str, value: ParameterValue) -> Self {
        Self(AccessorInjection::new(AccessorKind::Property, name, value))
    }

    pub fn with_member(member: AccessorInfo, value: ParameterValue) -> DiResult<Self> {
        AccessorInjection::with_member(AccessorKind::Property, member, value).map(Self)
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn value(&self) -> &ParameterValue {
        &self.0.value
    }

    pub fn resolver(&self, closed: &Type) -> DiResult<InjectDelegate> {
        self.0.resolver(closed)
    }
}

impl MemberSelector for InjectionProperty {
    type Member = AccessorInfo;

    fn select(&self, closed: &Type) -> DiResult<AccessorInfo> {
        self.0.select(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TypeBuilder, Visibility};

    struct Entity {
        id: u64,
    }

    struct Customer {
        entity: Entity,
        name: String,
    }

    fn customer_type() -> (Type, Type) {
        let entity = TypeBuilder::class("Entity")
            .field("Id", Type::of::<u64>(), |f| {
                f.setter(|e: &mut Entity, call| {
                    e.id = call.value(0)?;
                    Ok(())
                })
            })
            .field("Version", Type::of::<u32>(), |f| f)
            .build()
            .unwrap();
        let customer = TypeBuilder::class("Customer")
            .extends(entity.clone(), |c: &mut Customer| &mut c.entity)
            .constructor(|c| {
                c.body(|_| {
                    Ok(Customer {
                        entity: Entity { id: 0 },
                        name: String::new(),
                    })
                })
            })
            .property("Name", Type::of::<String>(), |p| {
                p.setter(|c: &mut Customer, call| {
                    c.name = call.value(0)?;
                    Ok(())
                })
            })
            .field("Secret", Type::of::<String>(), |f| {
                f.visibility(Visibility::Private)
                    .setter(|_: &mut Customer, _| Ok(()))
            })
            .build()
            .unwrap();
        (entity, customer)
    }

    #[test]
    fn inherited_fields_are_found() {
        let (entity, customer) = customer_type();
        let id = InjectionField::new("Id").select(&customer).unwrap();
        assert_eq!(id.declaring_type(), &entity);
        assert!(id.is_inherited());
    }

    #[test]
    fn private_and_missing_fields_fail_selection() {
        let (_, customer) = customer_type();
        assert!(InjectionField::new("Secret")
            .select(&customer)
            .unwrap_err()
            .is_selection_failure());
        assert!(InjectionField::new("Name")
            .select(&customer)
            .unwrap_err()
            .is_selection_failure());
    }

    #[test]
    fn read_only_members_are_rejected() {
        let (entity, customer) = customer_type();
        assert!(InjectionField::new("Version")
            .select(&customer)
            .unwrap_err()
            .is_selection_failure());

        let version = entity.field("Version").unwrap();
        assert!(InjectionField::with_member(version, ParameterValue::dependency()).is_err());
    }

    #[test]
    fn mismatched_literal_fails_selection() {
        let (_, customer) = customer_type();
        let err = InjectionProperty::with_value("Name", ParameterValue::value(5u8))
            .select(&customer)
            .unwrap_err();
        assert!(err.is_selection_failure());
        assert!(InjectionProperty::with_value("Name", ParameterValue::value(String::from("Ada")))
            .select(&customer)
            .is_ok());
    }

    #[test]
    fn assign_writes_through_the_base_projection() {
        let (_, customer) = customer_type();
        let id = customer.field("Id").unwrap();
        let mut instance = Customer {
            entity: Entity { id: 0 },
            name: String::new(),
        };
        id.assign(&mut instance, Some(Arc::new(42u64))).unwrap();
        assert_eq!(instance.entity.id, 42);
    }
}
