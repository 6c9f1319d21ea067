//! Argument sources for injected members.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::generic::GenericParameter;
use super::resolver::ParameterResolver;
use crate::error::{DiError, DiResult};
use crate::matching::{match_type, MatchRank};
use crate::provider::ResolutionContext;
use crate::traits::ResolverCore;
use crate::types::{AccessorInfo, AnyArc, ParameterInfo, Type};

/// Shared marker asking for a parameter to be resolved by its own type.
#[derive(Debug, PartialEq, Eq)]
pub struct DependencyMarker {
    optional: bool,
}

impl DependencyMarker {
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// Resolve the parameter's declared type.
pub static DEPENDENCY: DependencyMarker = DependencyMarker { optional: false };
/// Resolve the parameter's declared type, supplying nothing when it is not resolvable.
pub static OPTIONAL_DEPENDENCY: DependencyMarker = DependencyMarker { optional: true };

/// How one argument of an injected member is obtained.
///
/// Values are created at registration and reused by every resolution.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{MatchRank, ParameterValue, Type};
///
/// let literal = ParameterValue::value(42u32);
/// assert_eq!(literal.match_to(&Type::of::<u32>()), MatchRank::ExactMatch);
/// assert_eq!(literal.match_to(&Type::of::<u64>()), MatchRank::NoMatch);
///
/// let generic = ParameterValue::generic("T").unwrap();
/// assert_eq!(generic.match_to(&Type::generic_parameter("T", 0)), MatchRank::ExactMatch);
/// ```
#[derive(Clone)]
pub enum ParameterValue {
    /// A fixed value supplied at registration.
    Value { ty: Type, value: AnyArc },
    /// Resolve a contract; `ty` defaults to the parameter's own type.
    Resolved {
        ty: Option<Type>,
        name: Option<Arc<str>>,
        optional: bool,
    },
    /// Resolve the type a generic parameter of the declaring type is bound to.
    Generic(GenericParameter),
    /// Resolve the parameter's own type.
    Dependency(&'static DependencyMarker),
}

impl ParameterValue {
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        ParameterValue::Value {
            ty: Type::of::<T>(),
            value: Arc::new(value),
        }
    }

    /// A literal whose runtime type is described by `ty`.
    pub fn typed_value(ty: Type, value: AnyArc) -> Self {
        ParameterValue::Value { ty, value }
    }

    pub fn resolve(ty: Type) -> Self {
        ParameterValue::Resolved {
            ty: Some(ty),
            name: None,
            optional: false,
        }
    }

    pub fn resolve_named(ty: Type, name: &str) -> Self {
        ParameterValue::Resolved {
            ty: Some(ty),
            name: Some(Arc::from(name)),
            optional: false,
        }
    }

    /// The parameter's own type under a registration name.
    pub fn named(name: &str) -> Self {
        ParameterValue::Resolved {
            ty: None,
            name: Some(Arc::from(name)),
            optional: false,
        }
    }

    pub fn optional(ty: Type) -> Self {
        ParameterValue::Resolved {
            ty: Some(ty),
            name: None,
            optional: true,
        }
    }

    pub fn generic(name: &str) -> DiResult<Self> {
        GenericParameter::new(name).map(ParameterValue::Generic)
    }

    pub fn dependency() -> Self {
        ParameterValue::Dependency(&DEPENDENCY)
    }

    pub fn optional_dependency() -> Self {
        ParameterValue::Dependency(&OPTIONAL_DEPENDENCY)
    }

    /// Ranks this value against a parameter or member type.
    ///
    /// Values that take the member's own type match anything.
    pub fn match_to(&self, ty: &Type) -> MatchRank {
        match self {
            ParameterValue::Value { ty: declared, .. }
            | ParameterValue::Resolved {
                ty: Some(declared), ..
            } => match_type(declared, ty),
            ParameterValue::Resolved { ty: None, .. } | ParameterValue::Dependency(_) => {
                MatchRank::Compatible
            }
            ParameterValue::Generic(generic) => generic.match_to(ty),
        }
    }

    /// Ranks this value against a parameter of a closed member.
    pub fn match_parameter(&self, parameter: &ParameterInfo) -> MatchRank {
        match self {
            ParameterValue::Generic(generic) => generic.match_parameter(parameter),
            _ => self.match_to(parameter.parameter_type()),
        }
    }

    /// Ranks this value against a field or property of a closed type.
    pub fn match_accessor(&self, accessor: &AccessorInfo) -> MatchRank {
        match self {
            ParameterValue::Generic(generic) => match generic.bind_accessor(accessor) {
                Ok(_) => MatchRank::ExactMatch,
                Err(_) => MatchRank::NoMatch,
            },
            _ => self.match_to(accessor.member_type()),
        }
    }

    /// Resolver supplying this value for `parameter`.
    pub fn resolver_for_parameter(&self, parameter: &ParameterInfo) -> DiResult<ParameterResolver> {
        match self {
            ParameterValue::Generic(generic) => Ok(generic_resolver(generic, generic.bind(parameter)?)),
            _ => self.resolver_for_type(parameter.parameter_type()),
        }
    }

    /// Resolver supplying this value for a field or property.
    pub fn resolver_for_accessor(&self, accessor: &AccessorInfo) -> DiResult<ParameterResolver> {
        match self {
            ParameterValue::Generic(generic) => {
                Ok(generic_resolver(generic, generic.bind_accessor(accessor)?))
            }
            _ => self.resolver_for_type(accessor.member_type()),
        }
    }

    /// Resolver supplying this value where `ty` is expected.
    ///
    /// # Errors
    ///
    /// A generic parameter reference needs a member to bind against and is
    /// rejected with `InvalidSpecification`.
    pub fn resolver_for_type(&self, ty: &Type) -> DiResult<ParameterResolver> {
        match self {
            ParameterValue::Value { value, .. } => {
                let value = value.clone();
                Ok(parameter_resolver(move |_| Ok(Some(value.clone()))))
            }
            ParameterValue::Resolved {
                ty: explicit,
                name,
                optional,
            } => Ok(dependency_resolver(
                explicit.clone().unwrap_or_else(|| ty.clone()),
                name.clone(),
                *optional,
            )),
            ParameterValue::Generic(generic) => Err(DiError::InvalidSpecification(format!(
                "generic parameter reference {} cannot be bound to {} without a member",
                generic, ty
            ))),
            ParameterValue::Dependency(marker) => {
                Ok(dependency_resolver(ty.clone(), None, marker.optional))
            }
        }
    }
}

impl From<GenericParameter> for ParameterValue {
    fn from(generic: GenericParameter) -> Self {
        ParameterValue::Generic(generic)
    }
}

impl fmt::Debug for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Value { ty, .. } => write!(f, "value of {}", ty),
            ParameterValue::Resolved { ty, name, optional } => {
                f.write_str(if *optional { "optional " } else { "resolved " })?;
                match ty {
                    Some(ty) => write!(f, "{}", ty)?,
                    None => f.write_str("parameter type")?,
                }
                if let Some(name) = name {
                    write!(f, " ({})", name)?;
                }
                Ok(())
            }
            ParameterValue::Generic(generic) => write!(f, "generic {}", generic),
            ParameterValue::Dependency(marker) if marker.optional => f.write_str("optional dependency"),
            ParameterValue::Dependency(_) => f.write_str("dependency"),
        }
    }
}

fn parameter_resolver<F>(f: F) -> ParameterResolver
where
    F: Fn(&ResolutionContext<'_>) -> DiResult<Option<AnyArc>> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn generic_resolver(generic: &GenericParameter, bound: Type) -> ParameterResolver {
    dependency_resolver(
        bound,
        generic.resolution_name().map(Arc::from),
        generic.is_optional(),
    )
}

fn dependency_resolver(ty: Type, name: Option<Arc<str>>, optional: bool) -> ParameterResolver {
    parameter_resolver(move |ctx| {
        if optional {
            ctx.try_resolve_any(&ty, name.as_deref())
        } else {
            ctx.resolve_any(&ty, name.as_deref()).map(Some)
        }
    })
}
