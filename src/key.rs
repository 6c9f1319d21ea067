//! Contract key types for the dependency injection container.

use std::fmt;
use std::sync::Arc;

use crate::types::Type;

/// Key for registration storage and lookup.
///
/// A contract is a requested type plus an optional registration name. The
/// same type may be registered several times under different names.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{ContractKey, Type};
///
/// let unnamed = ContractKey::new(Type::of::<u32>());
/// let named = ContractKey::named(Type::of::<u32>(), "port");
///
/// assert_ne!(unnamed, named);
/// assert_eq!(named.name(), Some("port"));
/// assert_eq!(named.to_string(), "u32 (port)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractKey {
    ty: Type,
    name: Option<Arc<str>>,
}

impl ContractKey {
    pub fn new(ty: Type) -> Self {
        Self { ty, name: None }
    }

    pub fn named(ty: Type, name: impl Into<Arc<str>>) -> Self {
        Self {
            ty,
            name: Some(name.into()),
        }
    }

    /// Builds a key from an optional name.
    pub fn with_name(ty: Type, name: Option<&str>) -> Self {
        Self {
            ty,
            name: name.map(Arc::from),
        }
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Key of the open generic registration that could serve this contract.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_inject::{ContractKey, Type, TypeBuilder};
    ///
    /// let list = TypeBuilder::interface("IList").generic_parameters(&["T"]).build().unwrap();
    /// let closed = ContractKey::named(list.make_generic(&[Type::of::<u8>()]).unwrap(), "bytes");
    ///
    /// let open = closed.generic_definition_key().unwrap();
    /// assert_eq!(open.ty(), &list);
    /// assert_eq!(open.name(), Some("bytes"));
    /// ```
    pub fn generic_definition_key(&self) -> Option<ContractKey> {
        if self.ty.is_generic_type_definition() {
            return None;
        }
        self.ty.generic_type_definition().map(|ty| ContractKey {
            ty,
            name: self.name.clone(),
        })
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", self.ty, name),
            None => write!(f, "{}", self.ty),
        }
    }
}

impl From<Type> for ContractKey {
    fn from(ty: Type) -> Self {
        ContractKey::new(ty)
    }
}
