//! Generic parameter references and their binding to closed types.

use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::matching::{match_type, MatchRank};
use crate::types::{AccessorInfo, MethodBase, ParameterInfo, Type};

const SHAPE_MARKERS: [&str; 2] = ["[]", "()"];

/// Reference to a generic parameter of the type being built, by name.
///
/// A trailing `[]` or `()` marks the reference as array shaped and is stripped
/// from the stored name.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::GenericParameter;
///
/// let items = GenericParameter::new("T[]").unwrap();
/// assert_eq!(items.parameter_type_name(), "T");
/// assert!(items.is_array());
///
/// assert!(GenericParameter::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericParameter {
    name: Arc<str>,
    is_array: bool,
    resolution_name: Option<Arc<str>>,
    optional: bool,
}

impl GenericParameter {
    pub fn new(name: &str) -> DiResult<Self> {
        Self::parse(name, None, false)
    }

    /// Resolves the bound type under the registration `resolution_name`.
    pub fn named(name: &str, resolution_name: &str) -> DiResult<Self> {
        Self::parse(name, Some(resolution_name), false)
    }

    /// Supplies nothing when the bound type is not resolvable.
    pub fn optional(name: &str) -> DiResult<Self> {
        Self::parse(name, None, true)
    }

    pub fn optional_named(name: &str, resolution_name: &str) -> DiResult<Self> {
        Self::parse(name, Some(resolution_name), true)
    }

    fn parse(name: &str, resolution_name: Option<&str>, optional: bool) -> DiResult<Self> {
        let mut bare = name.trim();
        let mut is_array = false;
        while let Some(stripped) = SHAPE_MARKERS
            .iter()
            .find_map(|marker| bare.strip_suffix(marker))
        {
            bare = stripped.trim_end();
            is_array = true;
        }
        if bare.is_empty() {
            return Err(DiError::InvalidSpecification(format!(
                "generic parameter reference {:?} has no name",
                name
            )));
        }
        if bare.contains(['[', ']', '(', ')']) {
            return Err(DiError::InvalidSpecification(format!(
                "generic parameter reference {:?} has a misplaced shape marker",
                name
            )));
        }
        Ok(Self {
            name: Arc::from(bare),
            is_array,
            resolution_name: resolution_name.map(Arc::from),
            optional,
        })
    }

    /// Bare generic parameter name, without any shape marker.
    pub fn parameter_type_name(&self) -> &str {
        &self.name
    }

    pub fn is_array(&self) -> bool {
        self.is_array
    }

    pub fn resolution_name(&self) -> Option<&str> {
        self.resolution_name.as_deref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    fn placeholder(&self) -> Type {
        let parameter = Type::generic_parameter(self.name.clone(), usize::MAX);
        if self.is_array {
            parameter.make_array()
        } else {
            parameter
        }
    }

    /// Ranks this reference against a type taken from an open definition.
    pub fn match_to(&self, ty: &Type) -> MatchRank {
        match_type(&self.placeholder(), ty)
    }

    /// Ranks this reference against a parameter of a closed generic member.
    pub fn match_parameter(&self, parameter: &ParameterInfo) -> MatchRank {
        match generic_parameter_info(parameter) {
            Ok(open) => self.match_to(open.parameter_type()),
            Err(_) => MatchRank::NoMatch,
        }
    }

    /// Concrete type this reference denotes for `parameter`.
    pub fn bind(&self, parameter: &ParameterInfo) -> DiResult<Type> {
        let open = generic_parameter_info(parameter)?;
        let member = parameter.member();
        self.close(
            open.parameter_type(),
            member.declaring_type(),
            &format!("{} parameter {}", member.name(), parameter.name()),
        )
    }

    /// Concrete type this reference denotes for a field or property.
    pub fn bind_accessor(&self, accessor: &AccessorInfo) -> DiResult<Type> {
        let declaring = accessor.declaring_type();
        let definition = declaring.generic_type_definition().ok_or_else(|| {
            DiError::selection(declaring.to_string(), accessor.name(), "declaring type is not generic")
        })?;
        let open = definition
            .accessors(accessor.kind())
            .into_iter()
            .find(|a| a.name() == accessor.name())
            .ok_or_else(|| {
                DiError::selection(
                    definition.to_string(),
                    accessor.name(),
                    "no member with this name on the generic definition",
                )
            })?;
        self.close(open.member_type(), declaring, accessor.name())
    }

    fn close(&self, open: &Type, declaring: &Type, member: &str) -> DiResult<Type> {
        if self.match_to(open) != MatchRank::ExactMatch {
            return Err(DiError::selection(
                declaring.to_string(),
                member,
                format!("declared as {}, not {}", open, self),
            ));
        }
        Ok(open.substitute(declaring.generic_arguments()))
    }
}

impl fmt::Display for GenericParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.is_array {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

/// Finds the open-definition counterpart of a closed member's parameter.
///
/// The member is re-derived on the generic definition of its declaring type by
/// matching parameter names, which survive generic closing where parameter
/// types do not. The returned parameter reports its open type, so a generic
/// parameter placeholder (or array of one) remains visible.
///
/// # Errors
///
/// `SelectionFailure` when the declaring type is not generic or no injectable
/// member of the same kind has the same parameter names.
pub fn generic_parameter_info(parameter: &ParameterInfo) -> DiResult<ParameterInfo> {
    let member = parameter.member();
    let declaring = member.declaring_type();
    let fail = |reason: &str| {
        DiError::selection(declaring.to_string(), member.signature().to_string(), reason)
    };

    let definition = declaring
        .generic_type_definition()
        .ok_or_else(|| fail("declaring type is not generic"))?;

    let candidates: Vec<MethodBase> = match member {
        MethodBase::Constructor(_) => definition
            .supported_constructors()
            .into_iter()
            .map(MethodBase::Constructor)
            .collect(),
        MethodBase::Method(method) => definition
            .supported_methods()
            .into_iter()
            .filter(|m| m.name() == method.name())
            .map(MethodBase::Method)
            .collect(),
    };

    let counterpart = candidates
        .into_iter()
        .find(|candidate| candidate.parameter_names().eq(member.parameter_names()))
        .ok_or_else(|| fail("no member on the generic definition has the same parameter names"))?;

    counterpart
        .parameters()
        .into_iter()
        .nth(parameter.position())
        .ok_or_else(|| fail("parameter position is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeBuilder;

    struct Order;

    struct Batch;

    fn batch_type() -> Type {
        let builder = TypeBuilder::class("Batch").generic_parameters(&["T"]);
        let t = builder.param("T");
        builder
            .constructor(|c| {
                c.param("items", t.make_array())
                    .param("first", t.clone())
                    .body(|_| Ok(Batch))
            })
            .build()
            .unwrap()
    }

    #[test]
    fn strips_shape_markers() {
        let parens = GenericParameter::new("TKey()").unwrap();
        assert_eq!(parens.parameter_type_name(), "TKey");
        assert!(parens.is_array());
        assert_eq!(parens.to_string(), "TKey[]");

        let plain = GenericParameter::named("T", "primary").unwrap();
        assert!(!plain.is_array());
        assert_eq!(plain.resolution_name(), Some("primary"));
    }

    #[test]
    fn rejects_misplaced_markers() {
        assert!(GenericParameter::new("T[]x").is_err());
        assert!(GenericParameter::new("[]").is_err());
        assert!(GenericParameter::new("   ").is_err());
    }

    #[test]
    fn binder_finds_open_counterpart() {
        let closed = batch_type().make_generic(&[Type::of::<Order>()]).unwrap();
        let ctor = closed.supported_constructors().remove(0);
        let parameters = ctor.parameters();

        let open = generic_parameter_info(&parameters[1]).unwrap();
        assert_eq!(open.parameter_type().generic_parameter_name(), Some("T"));
        assert_eq!(parameters[1].parameter_type(), &Type::of::<Order>());
    }

    #[test]
    fn bind_closes_scalar_and_array_references() {
        let closed = batch_type().make_generic(&[Type::of::<Order>()]).unwrap();
        let parameters = closed.supported_constructors().remove(0).parameters();

        let items = GenericParameter::new("T[]").unwrap();
        assert_eq!(items.bind(&parameters[0]).unwrap(), Type::of::<Order>().make_array());
        assert_eq!(items.match_parameter(&parameters[1]), MatchRank::NoMatch);

        let first = GenericParameter::new("T").unwrap();
        assert_eq!(first.bind(&parameters[1]).unwrap(), Type::of::<Order>());
        assert!(first.bind(&parameters[0]).unwrap_err().is_selection_failure());
    }

    #[test]
    fn non_generic_declaring_type_fails_selection() {
        let plain = TypeBuilder::class("Plain")
            .constructor(|c| c.param("value", Type::of::<u32>()).body(|_| Ok(Order)))
            .build()
            .unwrap();
        let parameters = plain.supported_constructors().remove(0).parameters();

        let err = generic_parameter_info(&parameters[0]).unwrap_err();
        assert!(err.is_selection_failure());
        assert_eq!(
            GenericParameter::new("T").unwrap().match_parameter(&parameters[0]),
            MatchRank::NoMatch
        );
    }
}
