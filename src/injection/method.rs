//! Constructor and method injection members.

use std::sync::Arc;

use super::parameters::ParameterValue;
use super::resolver::{InjectDelegate, ResolveDelegate, ResolverFactory};
use super::MemberSelector;
use crate::error::{DiError, DiResult};
use crate::matching::MatchRank;
use crate::types::{
    ConstructorInfo, Instance, MemberSignature, MethodInfo, ParameterInfo, Type,
};

/// Members that take parameters and may be overloaded.
pub(crate) trait Overload: Clone {
    fn declaring_type(&self) -> &Type;
    fn signature(&self) -> MemberSignature;
    fn open_signature(&self) -> MemberSignature;
    fn parameters(&self) -> Vec<ParameterInfo>;
    fn is_injectable(&self) -> bool;
}

impl Overload for ConstructorInfo {
    fn declaring_type(&self) -> &Type {
        ConstructorInfo::declaring_type(self)
    }

    fn signature(&self) -> MemberSignature {
        ConstructorInfo::signature(self)
    }

    fn open_signature(&self) -> MemberSignature {
        ConstructorInfo::open_signature(self)
    }

    fn parameters(&self) -> Vec<ParameterInfo> {
        ConstructorInfo::parameters(self)
    }

    fn is_injectable(&self) -> bool {
        ConstructorInfo::is_injectable(self)
    }
}

impl Overload for MethodInfo {
    fn declaring_type(&self) -> &Type {
        MethodInfo::declaring_type(self)
    }

    fn signature(&self) -> MemberSignature {
        MethodInfo::signature(self)
    }

    fn open_signature(&self) -> MemberSignature {
        MethodInfo::open_signature(self)
    }

    fn parameters(&self) -> Vec<ParameterInfo> {
        MethodInfo::parameters(self)
    }

    fn is_injectable(&self) -> bool {
        MethodInfo::is_injectable(self)
    }
}

/// How the member to invoke is identified.
#[derive(Clone, Debug)]
enum Selection<M> {
    /// A member handle captured at registration, with its signature as written
    /// on the declaring definition.
    Explicit { member: M, signature: MemberSignature },
    /// Chosen among the closed type's members by ranking the arguments.
    ByArguments,
}

impl<M: Overload> Selection<M> {
    fn explicit(member: M, arguments: &[ParameterValue]) -> DiResult<Self> {
        if !member.is_injectable() {
            return Err(DiError::InvalidSpecification(format!(
                "{}::{} is static or not visible for injection",
                member.declaring_type(),
                member.signature()
            )));
        }
        validate_arguments(&member, arguments)?;
        let signature = member.open_signature();
        Ok(Selection::Explicit { member, signature })
    }
}

fn validate_arguments<M: Overload>(member: &M, arguments: &[ParameterValue]) -> DiResult<()> {
    if arguments.is_empty() {
        return Ok(());
    }
    let parameters = member.parameters();
    if parameters.len() != arguments.len() {
        return Err(DiError::InvalidSpecification(format!(
            "{}::{} takes {} parameters, {} arguments supplied",
            member.declaring_type(),
            member.signature(),
            parameters.len(),
            arguments.len()
        )));
    }
    for (parameter, argument) in parameters.iter().zip(arguments) {
        // Only generic references can be checked against an open parameter type.
        let open = parameter.parameter_type().contains_generic_parameters();
        if open && !matches!(argument, ParameterValue::Generic(_)) {
            continue;
        }
        let rank = if open {
            argument.match_to(parameter.parameter_type())
        } else {
            argument.match_parameter(parameter)
        };
        if rank == MatchRank::NoMatch {
            return Err(DiError::InvalidSpecification(format!(
                "{} does not fit parameter {} of {}::{}",
                argument,
                parameter.name(),
                member.declaring_type(),
                member.signature()
            )));
        }
    }
    Ok(())
}

/// Rebinds a captured member onto `closed` by structural identity.
fn select_explicit<M: Overload>(
    member: &M,
    signature: &MemberSignature,
    closed: &Type,
    candidates: Vec<M>,
) -> DiResult<M> {
    if member.declaring_type() == closed {
        return Ok(member.clone());
    }
    let wanted = signature.close_over(closed.generic_arguments());
    candidates
        .into_iter()
        .find(|candidate| candidate.signature() == wanted)
        .ok_or_else(|| {
            DiError::selection(
                closed.to_string(),
                signature.to_string(),
                "no member with the same name and parameter signature",
            )
        })
}

/// Picks the candidate whose parameters best fit `arguments`.
///
/// A candidate ranks as its worst-matching parameter. Ties at `ExactMatch` go
/// to the first declared candidate; ties at `Compatible` are ambiguous.
fn select_by_arguments<M: Overload>(
    closed: &Type,
    member: &str,
    candidates: Vec<M>,
    arguments: &[ParameterValue],
) -> DiResult<M> {
    let mut best = MatchRank::NoMatch;
    let mut winners: Vec<M> = Vec::new();
    for candidate in candidates {
        let parameters = candidate.parameters();
        if parameters.len() != arguments.len() {
            continue;
        }
        let rank = parameters
            .iter()
            .zip(arguments)
            .map(|(parameter, argument)| argument.match_parameter(parameter))
            .min()
            .unwrap_or(MatchRank::ExactMatch);
        if rank == MatchRank::NoMatch || rank < best {
            continue;
        }
        if rank > best {
            best = rank;
            winners.clear();
        }
        winners.push(candidate);
    }

    match winners.len() {
        0 => Err(DiError::selection(
            closed.to_string(),
            member,
            format!("no overload accepts {} supplied arguments", arguments.len()),
        )),
        n if n > 1 && best != MatchRank::ExactMatch => Err(DiError::AmbiguousMatch {
            ty: closed.to_string(),
            member: member.to_string(),
            candidates: n,
        }),
        _ => Ok(winners.swap_remove(0)),
    }
}

/// Constructor injection.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{InjectionConstructor, MemberSelector, ParameterValue, Type, TypeBuilder};
///
/// struct Widget(u32);
///
/// let widget = TypeBuilder::class("Widget")
///     .constructor(|c| c.body(|_| Ok(Widget(0))))
///     .constructor(|c| c.param("size", Type::of::<u32>()).body(|call| Ok(Widget(call.value(0)?))))
///     .build()
///     .unwrap();
///
/// let injection = InjectionConstructor::new(vec![ParameterValue::value(7u32)]);
/// let selected = injection.select(&widget).unwrap();
/// assert_eq!(selected.parameter_count(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct InjectionConstructor {
    selection: Selection<ConstructorInfo>,
    arguments: Vec<ParameterValue>,
}

impl InjectionConstructor {
    /// Selects the constructor whose parameters fit `arguments`.
    pub fn new(arguments: Vec<ParameterValue>) -> Self {
        Self {
            selection: Selection::ByArguments,
            arguments,
        }
    }

    /// Uses a constructor enumerated from the mapped type or its generic definition.
    ///
    /// With no arguments every parameter is resolved by its own type.
    pub fn with_member(member: ConstructorInfo, arguments: Vec<ParameterValue>) -> DiResult<Self> {
        Ok(Self {
            selection: Selection::explicit(member, &arguments)?,
            arguments,
        })
    }

    pub fn arguments(&self) -> &[ParameterValue] {
        &self.arguments
    }

    /// The captured constructor, if one was supplied.
    pub fn member(&self) -> Option<&ConstructorInfo> {
        match &self.selection {
            Selection::Explicit { member, .. } => Some(member),
            Selection::ByArguments => None,
        }
    }

    /// Delegate building a new instance of `closed`.
    pub fn resolver(&self, closed: &Type) -> DiResult<ResolveDelegate<Instance>> {
        let ctor = self.select(closed)?;
        ResolverFactory::constructor(&ctor, &self.arguments)
    }
}

impl MemberSelector for InjectionConstructor {
    type Member = ConstructorInfo;

    fn select(&self, closed: &Type) -> DiResult<ConstructorInfo> {
        let candidates = closed.supported_constructors();
        match &self.selection {
            Selection::Explicit { member, signature } => {
                select_explicit(member, signature, closed, candidates)
            }
            Selection::ByArguments => {
                select_by_arguments(closed, ".ctor", candidates, &self.arguments)
            }
        }
    }
}

/// Method injection, called after construction.
#[derive(Clone, Debug)]
pub struct InjectionMethod {
    name: Arc<str>,
    selection: Selection<MethodInfo>,
    arguments: Vec<ParameterValue>,
}

impl InjectionMethod {
    /// Selects the overload of `name` whose parameters fit `arguments`.
    ///
    /// With no arguments the method must not be overloaded, and every
    /// parameter is resolved by its own type.
    pub fn new(name: &str, arguments: Vec<ParameterValue>) -> Self {
        Self {
            name: Arc::from(name),
            selection: Selection::ByArguments,
            arguments,
        }
    }

    pub fn with_member(member: MethodInfo, arguments: Vec<ParameterValue>) -> DiResult<Self> {
        Ok(Self {
            name: Arc::from(member.name()),
            selection: Selection::explicit(member, &arguments)?,
            arguments,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[ParameterValue] {
        &self.arguments
    }

    pub fn member(&self) -> Option<&MethodInfo> {
        match &self.selection {
            Selection::Explicit { member, .. } => Some(member),
            Selection::ByArguments => None,
        }
    }

    /// Delegate calling the method on an instance of `closed`.
    pub fn resolver(&self, closed: &Type) -> DiResult<InjectDelegate> {
        let method = self.select(closed)?;
        ResolverFactory::method(&method, &self.arguments)
    }
}

impl MemberSelector for InjectionMethod {
    type Member = MethodInfo;

    fn select(&self, closed: &Type) -> DiResult<MethodInfo> {
        let mut candidates = closed.supported_methods();
        match &self.selection {
            Selection::Explicit { member, signature } => {
                select_explicit(member, signature, closed, candidates)
            }
            Selection::ByArguments => {
                candidates.retain(|m| m.name() == &*self.name);
                if !self.arguments.is_empty() {
                    return select_by_arguments(closed, &self.name, candidates, &self.arguments);
                }
                match candidates.len() {
                    0 => Err(DiError::selection(
                        closed.to_string(),
                        &*self.name,
                        "no injectable method with this name",
                    )),
                    1 => Ok(candidates.swap_remove(0)),
                    n => Err(DiError::AmbiguousMatch {
                        ty: closed.to_string(),
                        member: self.name.to_string(),
                        candidates: n,
                    }),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TypeBuilder, Visibility};

    struct Printer;

    fn printer_type() -> Type {
        TypeBuilder::class("Printer")
            .constructor(|c| c.body(|_| Ok(Printer)))
            .constructor(|c| c.param("copies", Type::of::<u32>()).body(|_| Ok(Printer)))
            .constructor(|c| c.param("copies", Type::of::<u64>()).body(|_| Ok(Printer)))
            .method("Configure", |m| {
                m.param("duplex", Type::of::<bool>())
                    .body(|_: &mut Printer, _| Ok(()))
            })
            .method("Configure", |m| {
                m.param("copies", Type::of::<u32>())
                    .body(|_: &mut Printer, _| Ok(()))
            })
            .method("Hidden", |m| {
                m.visibility(Visibility::Private)
                    .body(|_: &mut Printer, _| Ok(()))
            })
            .build()
            .unwrap()
    }

    #[test]
    fn by_arguments_prefers_exact_type() {
        let printer = printer_type();
        let ctor = InjectionConstructor::new(vec![ParameterValue::value(2u64)])
            .select(&printer)
            .unwrap();
        assert_eq!(ctor.parameter_types(), &[Type::of::<u64>()]);
    }

    #[test]
    fn compatible_ties_are_ambiguous() {
        let printer = printer_type();
        let err = InjectionConstructor::new(vec![ParameterValue::dependency()])
            .select(&printer)
            .unwrap_err();
        assert!(err.is_ambiguous());
    }

    #[test]
    fn no_fitting_overload_fails_selection() {
        let printer = printer_type();
        let err = InjectionConstructor::new(vec![ParameterValue::value("text")])
            .select(&printer)
            .unwrap_err();
        assert!(err.is_selection_failure());
    }

    #[test]
    fn method_overloads_need_arguments() {
        let printer = printer_type();
        let err = InjectionMethod::new("Configure", vec![]).select(&printer).unwrap_err();
        assert!(err.is_ambiguous());

        let method = InjectionMethod::new("Configure", vec![ParameterValue::value(true)])
            .select(&printer)
            .unwrap();
        assert_eq!(method.parameters()[0].name(), "duplex");
    }

    #[test]
    fn private_methods_are_not_selected() {
        let printer = printer_type();
        assert!(InjectionMethod::new("Hidden", vec![])
            .select(&printer)
            .unwrap_err()
            .is_selection_failure());

        let hidden = printer
            .methods()
            .into_iter()
            .find(|m| m.name() == "Hidden")
            .unwrap();
        assert!(matches!(
            InjectionMethod::with_member(hidden, vec![]),
            Err(DiError::InvalidSpecification(_))
        ));
    }

    #[test]
    fn explicit_member_arity_is_validated() {
        let printer = printer_type();
        let ctor = printer.find_constructor(&[Type::of::<u32>()]).unwrap();
        let err = InjectionConstructor::with_member(
            ctor.clone(),
            vec![ParameterValue::value(1u32), ParameterValue::value(2u32)],
        )
        .unwrap_err();
        assert!(matches!(err, DiError::InvalidSpecification(_)));

        let selected = InjectionConstructor::with_member(ctor.clone(), vec![])
            .unwrap()
            .select(&printer)
            .unwrap();
        assert_eq!(selected, ctor);
    }
}
