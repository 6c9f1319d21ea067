//! Registration descriptors for introspection and diagnostics.

use std::fmt;

use crate::key::ContractKey;
use crate::types::Type;

/// How a registration produces its instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationKind {
    /// Built from a mapped type through a compiled build plan.
    Type,
    /// A pre-built shared instance.
    Instance,
    /// A user supplied factory closure.
    Factory,
}

/// Snapshot of one registration.
///
/// # Use Cases
///
/// - **Debugging**: inspect what is registered and under which lifetime
/// - **Validation**: assert that required contracts are present at startup
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{Container, ContractKey, Lifetime, RegistrationKind, TypeBuilder};
///
/// struct Mailer;
///
/// let mailer = TypeBuilder::class("Mailer")
///     .constructor(|c| c.body(|_| Ok(Mailer)))
///     .build()
///     .unwrap();
///
/// let container = Container::new();
/// container
///     .register(ContractKey::named(mailer.clone(), "smtp"), Vec::new(), Lifetime::Singleton)
///     .unwrap();
///
/// let descriptors = container.registrations();
/// let smtp = descriptors.iter().find(|d| d.contract.name() == Some("smtp")).unwrap();
/// assert_eq!(smtp.kind, RegistrationKind::Type);
/// assert_eq!(smtp.lifetime, "singleton");
/// assert_eq!(smtp.mapped_to.as_ref(), Some(&mailer));
/// ```
#[derive(Debug, Clone)]
pub struct RegistrationDescriptor {
    pub contract: ContractKey,
    /// Implementation type for type registrations.
    pub mapped_to: Option<Type>,
    /// Name of the lifetime manager kind.
    pub lifetime: &'static str,
    pub kind: RegistrationKind,
    /// Number of injection members declared on the registration.
    pub member_count: usize,
}

impl RegistrationDescriptor {
    pub fn is_named(&self) -> bool {
        self.contract.name().is_some()
    }

    /// Whether the registration maps an open generic contract.
    pub fn is_open_generic(&self) -> bool {
        self.contract.ty().is_generic_type_definition()
    }
}

impl fmt::Display for RegistrationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mapped_to {
            Some(mapped) => write!(f, "{} -> {} [{}]", self.contract, mapped, self.lifetime),
            None => write!(f, "{} ({:?}) [{}]", self.contract, self.kind, self.lifetime),
        }
    }
}
