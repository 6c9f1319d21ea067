//! Runtime type model.
//!
//! Rust has no runtime reflection, so the container works against an explicit
//! description of the types it builds. A [`Type`] is a cheap, shareable handle
//! to one of:
//!
//! - a native Rust type, identified by its `TypeId`
//! - a described type definition, optionally generic
//! - a constructed generic type (a definition closed over type arguments)
//! - a generic parameter placeholder such as `T`
//! - an array of another type
//!
//! Described types carry their constructors, methods, fields and properties,
//! which member selection enumerates.
//!
//! # Examples
//!
//! ```rust
//! use ferrous_inject::{Type, TypeBuilder};
//!
//! struct Order;
//!
//! let list = TypeBuilder::interface("IList").generic_parameters(&["T"]).build().unwrap();
//! let orders = list.make_generic(&[Type::of::<Order>()]).unwrap();
//!
//! assert!(orders.is_generic_type());
//! assert!(!orders.contains_generic_parameters());
//! assert_eq!(orders.generic_type_definition(), Some(list));
//! ```

mod builder;
mod members;

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub use builder::{AccessorBuilder, ConstructorBuilder, MethodBuilder, TypeBuilder};
pub(crate) use members::{Caster, DisposeHook, Disposer, Projection};
pub use members::{
    AccessorInfo, AccessorKind, ConstructorInfo, Invocation, MemberSignature, MethodBase,
    MethodInfo, ParameterInfo, Visibility,
};
use members::{AccessorDef, ConstructorDef, MethodDef};

use crate::error::{DiError, DiResult};

/// Shared, type-erased service instance.
pub type AnyArc = Arc<dyn Any + Send + Sync>;
/// Mutable view of an instance during build-up.
pub type Target = dyn Any + Send + Sync;
/// Freshly constructed instance, owned until build-up completes.
pub type Instance = Box<Target>;

static NEXT_DEFINITION_ID: AtomicU64 = AtomicU64::new(1);

/// What kind of described type a definition is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    Class,
    Abstract,
    Interface,
}

pub(crate) struct BaseDef {
    pub(crate) ty: Type,
    pub(crate) project: Projection,
}

pub(crate) struct InterfaceDef {
    pub(crate) ty: Type,
    pub(crate) cast: Option<Caster>,
}

pub(crate) struct TypeDef {
    id: u64,
    pub(crate) name: Arc<str>,
    pub(crate) category: TypeCategory,
    pub(crate) generic_parameters: Vec<Arc<str>>,
    pub(crate) base: Option<BaseDef>,
    pub(crate) interfaces: Vec<InterfaceDef>,
    pub(crate) constructors: Vec<Arc<ConstructorDef>>,
    pub(crate) methods: Vec<Arc<MethodDef>>,
    pub(crate) accessors: Vec<Arc<AccessorDef>>,
    pub(crate) dispose: Option<DisposeHook>,
}

impl TypeDef {
    pub(crate) fn next_id() -> u64 {
        NEXT_DEFINITION_ID.fetch_add(1, Ordering::Relaxed)
    }
}

pub(crate) enum TypeKind {
    Native {
        id: TypeId,
        name: &'static str,
    },
    Definition(Arc<TypeDef>),
    Constructed {
        definition: Arc<TypeDef>,
        arguments: Vec<Type>,
    },
    GenericParameter {
        name: Arc<str>,
        position: usize,
    },
    Array(Type),
}

/// Handle to a runtime type.
#[derive(Clone)]
pub struct Type(Arc<TypeKind>);

impl Type {
    /// The native Rust type `T`.
    pub fn of<T: Any>() -> Self {
        Type(Arc::new(TypeKind::Native {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }))
    }

    /// Generic parameter placeholder at `position` of its definition.
    pub fn generic_parameter(name: impl Into<Arc<str>>, position: usize) -> Self {
        Type(Arc::new(TypeKind::GenericParameter {
            name: name.into(),
            position,
        }))
    }

    /// Array of `element`.
    pub fn array_of(element: Type) -> Self {
        Type(Arc::new(TypeKind::Array(element)))
    }

    pub fn make_array(&self) -> Self {
        Type::array_of(self.clone())
    }

    pub(crate) fn from_definition(def: TypeDef) -> Self {
        Type(Arc::new(TypeKind::Definition(Arc::new(def))))
    }

    pub(crate) fn kind(&self) -> &TypeKind {
        &self.0
    }

    /// Closes a generic type definition over `arguments`.
    pub fn make_generic(&self, arguments: &[Type]) -> DiResult<Type> {
        match self.kind() {
            TypeKind::Definition(def) if !def.generic_parameters.is_empty() => {
                if arguments.len() != def.generic_parameters.len() {
                    return Err(DiError::InvalidSpecification(format!(
                        "{} expects {} generic arguments, got {}",
                        self,
                        def.generic_parameters.len(),
                        arguments.len()
                    )));
                }
                Ok(Type(Arc::new(TypeKind::Constructed {
                    definition: def.clone(),
                    arguments: arguments.to_vec(),
                })))
            }
            _ => Err(DiError::InvalidSpecification(format!(
                "{} is not a generic type definition",
                self
            ))),
        }
    }

    pub(crate) fn definition(&self) -> Option<&Arc<TypeDef>> {
        match self.kind() {
            TypeKind::Definition(def) => Some(def),
            TypeKind::Constructed { definition, .. } => Some(definition),
            _ => None,
        }
    }

    /// `TypeId` of a native type.
    pub fn native_type_id(&self) -> Option<TypeId> {
        match self.kind() {
            TypeKind::Native { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn is_generic_parameter(&self) -> bool {
        matches!(self.kind(), TypeKind::GenericParameter { .. })
    }

    pub fn generic_parameter_name(&self) -> Option<&str> {
        match self.kind() {
            TypeKind::GenericParameter { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn generic_parameter_position(&self) -> Option<usize> {
        match self.kind() {
            TypeKind::GenericParameter { position, .. } => Some(*position),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind(), TypeKind::Array(_))
    }

    pub fn element_type(&self) -> Option<&Type> {
        match self.kind() {
            TypeKind::Array(element) => Some(element),
            _ => None,
        }
    }

    /// True for generic definitions and constructed generic types.
    pub fn is_generic_type(&self) -> bool {
        match self.kind() {
            TypeKind::Definition(def) => !def.generic_parameters.is_empty(),
            TypeKind::Constructed { .. } => true,
            _ => false,
        }
    }

    pub fn is_generic_type_definition(&self) -> bool {
        matches!(self.kind(), TypeKind::Definition(def) if !def.generic_parameters.is_empty())
    }

    /// The open definition a generic type was constructed from.
    pub fn generic_type_definition(&self) -> Option<Type> {
        match self.kind() {
            TypeKind::Definition(def) if !def.generic_parameters.is_empty() => Some(self.clone()),
            TypeKind::Constructed { definition, .. } => {
                Some(Type(Arc::new(TypeKind::Definition(definition.clone()))))
            }
            _ => None,
        }
    }

    /// Type arguments of a constructed type; empty otherwise.
    pub fn generic_arguments(&self) -> &[Type] {
        match self.kind() {
            TypeKind::Constructed { arguments, .. } => arguments,
            _ => &[],
        }
    }

    /// Names of the generic parameters declared by a definition.
    pub fn generic_parameter_names(&self) -> Vec<&str> {
        self.definition()
            .map(|def| def.generic_parameters.iter().map(|p| &**p).collect())
            .unwrap_or_default()
    }

    pub fn contains_generic_parameters(&self) -> bool {
        match self.kind() {
            TypeKind::Native { .. } => false,
            TypeKind::Definition(def) => !def.generic_parameters.is_empty(),
            TypeKind::Constructed { arguments, .. } => {
                arguments.iter().any(Type::contains_generic_parameters)
            }
            TypeKind::GenericParameter { .. } => true,
            TypeKind::Array(element) => element.contains_generic_parameters(),
        }
    }

    /// Replaces generic parameters by position with `arguments`.
    pub fn substitute(&self, arguments: &[Type]) -> Type {
        if arguments.is_empty() {
            return self.clone();
        }
        match self.kind() {
            TypeKind::GenericParameter { position, .. } => {
                arguments.get(*position).cloned().unwrap_or_else(|| self.clone())
            }
            TypeKind::Array(element) => Type::array_of(element.substitute(arguments)),
            TypeKind::Constructed {
                definition,
                arguments: own,
            } => Type(Arc::new(TypeKind::Constructed {
                definition: definition.clone(),
                arguments: own.iter().map(|a| a.substitute(arguments)).collect(),
            })),
            _ => self.clone(),
        }
    }

    /// Category of a described type; `None` for native types, parameters and arrays.
    pub fn category(&self) -> Option<TypeCategory> {
        self.definition().map(|def| def.category)
    }

    pub fn is_interface(&self) -> bool {
        self.category() == Some(TypeCategory::Interface)
    }

    /// A concrete class with at least one injectable constructor.
    pub fn is_constructible(&self) -> bool {
        self.category() == Some(TypeCategory::Class)
            && !self.contains_generic_parameters()
            && !self.supported_constructors().is_empty()
    }

    /// Base type closed over this type's generic arguments.
    pub fn base_type(&self) -> Option<Type> {
        let def = self.definition()?;
        def.base
            .as_ref()
            .map(|base| base.ty.substitute(self.generic_arguments()))
    }

    /// Directly implemented interfaces, closed over this type's generic arguments.
    pub fn interfaces(&self) -> Vec<Type> {
        self.definition()
            .map(|def| {
                def.interfaces
                    .iter()
                    .map(|i| i.ty.substitute(self.generic_arguments()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a value of `other` may stand in for this type.
    pub fn is_assignable_from(&self, other: &Type) -> bool {
        if self == other {
            return true;
        }
        if let (Some(mine), Some(theirs)) = (self.element_type(), other.element_type()) {
            return mine.is_assignable_from(theirs);
        }
        if other.interfaces().iter().any(|i| self.is_assignable_from(i)) {
            return true;
        }
        other
            .base_type()
            .map_or(false, |base| self.is_assignable_from(&base))
    }

    /// Every declared constructor.
    pub fn constructors(&self) -> Vec<ConstructorInfo> {
        self.definition()
            .map(|def| {
                def.constructors
                    .iter()
                    .map(|c| ConstructorInfo::new(self.clone(), c.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Declared constructors eligible for injection: public or protected, non-static.
    pub fn supported_constructors(&self) -> Vec<ConstructorInfo> {
        let mut constructors = self.constructors();
        constructors.retain(ConstructorInfo::is_injectable);
        constructors
    }

    /// Every method declared on this type. Base type methods are not included.
    pub fn methods(&self) -> Vec<MethodInfo> {
        self.definition()
            .map(|def| {
                def.methods
                    .iter()
                    .map(|m| MethodInfo::new(self.clone(), m.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Declared methods eligible for injection: public or protected, non-static.
    pub fn supported_methods(&self) -> Vec<MethodInfo> {
        let mut methods = self.methods();
        methods.retain(MethodInfo::is_injectable);
        methods
    }

    /// Public instance fields, including those inherited through the base chain.
    pub fn instance_fields(&self) -> Vec<AccessorInfo> {
        self.accessors(AccessorKind::Field)
    }

    /// Public instance properties, including those inherited through the base chain.
    pub fn instance_properties(&self) -> Vec<AccessorInfo> {
        self.accessors(AccessorKind::Property)
    }

    pub fn field(&self, name: &str) -> Option<AccessorInfo> {
        self.instance_fields().into_iter().find(|f| f.name() == name)
    }

    pub fn property(&self, name: &str) -> Option<AccessorInfo> {
        self.instance_properties()
            .into_iter()
            .find(|p| p.name() == name)
    }

    pub(crate) fn accessors(&self, kind: AccessorKind) -> Vec<AccessorInfo> {
        let Some(def) = self.definition() else {
            return Vec::new();
        };
        let mut found: Vec<AccessorInfo> = def
            .accessors
            .iter()
            .filter(|a| a.kind == kind && a.visibility == Visibility::Public && !a.is_static)
            .map(|a| AccessorInfo::new(self.clone(), a.clone()))
            .collect();
        if let Some(base) = &def.base {
            let base_type = base.ty.substitute(self.generic_arguments());
            for inherited in base_type.accessors(kind) {
                // A member redeclared on the derived type hides the base one.
                if found.iter().any(|own| own.name() == inherited.name()) {
                    continue;
                }
                found.push(inherited.inherited_through(base.project.clone()));
            }
        }
        found
    }

    /// Declared constructor with exactly these closed parameter types.
    pub fn find_constructor(&self, parameter_types: &[Type]) -> Option<ConstructorInfo> {
        self.constructors()
            .into_iter()
            .find(|c| c.parameter_types() == parameter_types)
    }

    /// Declared method with this name and exactly these closed parameter types.
    pub fn find_method(&self, name: &str, parameter_types: &[Type]) -> Option<MethodInfo> {
        self.methods()
            .into_iter()
            .find(|m| m.name() == name && m.parameter_types() == parameter_types)
    }

    /// Caster registered for one of this type's own interfaces.
    pub(crate) fn caster_for(&self, contract: &Type) -> Option<Caster> {
        let def = self.definition()?;
        def.interfaces
            .iter()
            .find(|i| &i.ty.substitute(self.generic_arguments()) == contract)
            .and_then(|i| i.cast.clone())
    }

    pub(crate) fn dispose_hook(&self) -> Option<&DisposeHook> {
        self.definition().and_then(|def| def.dispose.as_ref())
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        match (self.kind(), other.kind()) {
            (TypeKind::Native { id: a, .. }, TypeKind::Native { id: b, .. }) => a == b,
            (TypeKind::Definition(a), TypeKind::Definition(b)) => a.id == b.id,
            (
                TypeKind::Constructed {
                    definition: a,
                    arguments: x,
                },
                TypeKind::Constructed {
                    definition: b,
                    arguments: y,
                },
            ) => a.id == b.id && x == y,
            (
                TypeKind::GenericParameter {
                    name: a,
                    position: x,
                },
                TypeKind::GenericParameter {
                    name: b,
                    position: y,
                },
            ) => a == b && x == y,
            (TypeKind::Array(a), TypeKind::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.kind() {
            TypeKind::Native { id, .. } => {
                0u8.hash(state);
                id.hash(state);
            }
            TypeKind::Definition(def) => {
                1u8.hash(state);
                def.id.hash(state);
            }
            TypeKind::Constructed {
                definition,
                arguments,
            } => {
                2u8.hash(state);
                definition.id.hash(state);
                arguments.hash(state);
            }
            TypeKind::GenericParameter { name, position } => {
                3u8.hash(state);
                name.hash(state);
                position.hash(state);
            }
            TypeKind::Array(element) => {
                4u8.hash(state);
                element.hash(state);
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            TypeKind::Native { name, .. } => f.write_str(name),
            TypeKind::Definition(def) => {
                f.write_str(&def.name)?;
                write_list(f, def.generic_parameters.iter().map(|p| &**p))
            }
            TypeKind::Constructed {
                definition,
                arguments,
            } => {
                f.write_str(&definition.name)?;
                let names: Vec<String> = arguments.iter().map(Type::to_string).collect();
                write_list(f, names.iter().map(String::as_str))
            }
            TypeKind::GenericParameter { name, .. } => f.write_str(name),
            TypeKind::Array(element) => write!(f, "{}[]", element),
        }
    }
}

fn write_list<'a>(f: &mut fmt::Formatter<'_>, items: impl Iterator<Item = &'a str>) -> fmt::Result {
    let mut first = true;
    for item in items {
        f.write_str(if first { "<" } else { ", " })?;
        f.write_str(item)?;
        first = false;
    }
    if !first {
        f.write_str(">")?;
    }
    Ok(())
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self)
    }
}
