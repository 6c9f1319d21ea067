//! Injection members and the engine that binds them to closed types.
//!
//! An [`InjectionMember`] is declared at registration against the mapped type,
//! which may be an open generic definition. At resolution time each member is
//! selected on the closed type being built ([`MemberSelector`]) and turned
//! into a delegate by the [`ResolverFactory`].

mod generic;
mod member;
mod method;
mod parameters;
pub(crate) mod plan;
mod resolver;

pub use generic::{generic_parameter_info, GenericParameter};
pub use member::{InjectionField, InjectionProperty};
pub use method::{InjectionConstructor, InjectionMethod};
pub use parameters::{DependencyMarker, ParameterValue, DEPENDENCY, OPTIONAL_DEPENDENCY};
pub use resolver::{InjectDelegate, ParameterResolver, ResolveDelegate, ResolverFactory};

use crate::error::{DiError, DiResult};
use crate::types::{AccessorInfo, ConstructorInfo, MethodInfo, Type};

/// Locates the member a specification refers to on a closed type.
pub trait MemberSelector {
    type Member;

    /// Returns the member of `closed` corresponding to this specification.
    ///
    /// # Errors
    ///
    /// `SelectionFailure` when `closed` has no structural counterpart, and
    /// `AmbiguousMatch` when overloads tie.
    fn select(&self, closed: &Type) -> DiResult<Self::Member>;
}

/// One member used to construct or initialize an instance.
#[derive(Clone, Debug)]
pub enum InjectionMember {
    Constructor(InjectionConstructor),
    Method(InjectionMethod),
    Field(InjectionField),
    Property(InjectionProperty),
}

/// A member selected on a closed type.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectedMember {
    Constructor(ConstructorInfo),
    Method(MethodInfo),
    Field(AccessorInfo),
    Property(AccessorInfo),
}

impl InjectionMember {
    /// Member name used in diagnostics.
    pub fn name(&self) -> &str {
        match self {
            InjectionMember::Constructor(_) => ".ctor",
            InjectionMember::Method(m) => m.name(),
            InjectionMember::Field(f) => f.name(),
            InjectionMember::Property(p) => p.name(),
        }
    }

    pub fn is_constructor(&self) -> bool {
        matches!(self, InjectionMember::Constructor(_))
    }

    /// Checks what can be checked before a closed type is known.
    pub(crate) fn validate(&self) -> DiResult<()> {
        if self.name().trim().is_empty() {
            return Err(DiError::InvalidSpecification(
                "injection member name is empty".into(),
            ));
        }
        Ok(())
    }
}

impl MemberSelector for InjectionMember {
    type Member = SelectedMember;

    fn select(&self, closed: &Type) -> DiResult<SelectedMember> {
        Ok(match self {
            InjectionMember::Constructor(c) => SelectedMember::Constructor(c.select(closed)?),
            InjectionMember::Method(m) => SelectedMember::Method(m.select(closed)?),
            InjectionMember::Field(f) => SelectedMember::Field(f.select(closed)?),
            InjectionMember::Property(p) => SelectedMember::Property(p.select(closed)?),
        })
    }
}

impl From<InjectionConstructor> for InjectionMember {
    fn from(member: InjectionConstructor) -> Self {
        InjectionMember::Constructor(member)
    }
}

impl From<InjectionMethod> for InjectionMember {
    fn from(member: InjectionMethod) -> Self {
        InjectionMember::Method(member)
    }
}

impl From<InjectionField> for InjectionMember {
    fn from(member: InjectionField) -> Self {
        InjectionMember::Field(member)
    }
}

impl From<InjectionProperty> for InjectionMember {
    fn from(member: InjectionProperty) -> Self {
        InjectionMember::Property(member)
    }
}
