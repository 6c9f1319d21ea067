//! Resolution delegates for selected members.

use std::sync::Arc;

use smallvec::SmallVec;

use super::parameters::ParameterValue;
use crate::error::{DiError, DiResult};
use crate::provider::ResolutionContext;
use crate::types::{
    AccessorInfo, AnyArc, ConstructorInfo, Instance, MethodInfo, ParameterInfo, Target,
};

/// Produces a value from a live resolution context.
pub type ResolveDelegate<T> = Arc<dyn Fn(&ResolutionContext<'_>) -> DiResult<T> + Send + Sync>;

/// Acts on an instance that is being built up.
pub type InjectDelegate =
    Arc<dyn Fn(&ResolutionContext<'_>, &mut Target) -> DiResult<()> + Send + Sync>;

/// Supplies one argument; `None` stands for an absent optional dependency.
pub type ParameterResolver = ResolveDelegate<Option<AnyArc>>;

type Arguments = SmallVec<[Option<AnyArc>; 4]>;

/// Turns selected members and their argument sources into delegates.
///
/// Arguments are resolved strictly left to right. The first failure aborts the
/// delegate before later arguments are attempted and is returned unchanged.
pub struct ResolverFactory;

impl ResolverFactory {
    /// Delegate that resolves the constructor's arguments and allocates a new instance.
    ///
    /// An empty `values` list resolves every parameter by its own type.
    pub fn constructor(
        ctor: &ConstructorInfo,
        values: &[ParameterValue],
    ) -> DiResult<ResolveDelegate<Instance>> {
        let resolvers = Self::parameter_resolvers(&ctor.parameters(), values)?;
        let ctor = ctor.clone();
        Ok(resolve_delegate(move |ctx| {
            let arguments = resolve_arguments(ctx, &resolvers)?;
            ctor.invoke(&arguments)
        }))
    }

    /// Delegate that calls the method on the instance being built up.
    pub fn method(method: &MethodInfo, values: &[ParameterValue]) -> DiResult<InjectDelegate> {
        let resolvers = Self::parameter_resolvers(&method.parameters(), values)?;
        let method = method.clone();
        Ok(inject_delegate(move |ctx, target| {
            let arguments = resolve_arguments(ctx, &resolvers)?;
            method.invoke(target, &arguments)
        }))
    }

    /// Delegate that assigns the resolved value to a field or property.
    ///
    /// An absent optional value leaves the member untouched.
    pub fn accessor(accessor: &AccessorInfo, value: &ParameterValue) -> DiResult<InjectDelegate> {
        let resolver = value.resolver_for_accessor(accessor)?;
        let accessor = accessor.clone();
        Ok(inject_delegate(move |ctx, target| match resolver(ctx)? {
            Some(value) => accessor.assign(target, Some(value)),
            None => Ok(()),
        }))
    }

    fn parameter_resolvers(
        parameters: &[ParameterInfo],
        values: &[ParameterValue],
    ) -> DiResult<SmallVec<[ParameterResolver; 4]>> {
        if values.is_empty() {
            let dependency = ParameterValue::dependency();
            return parameters
                .iter()
                .map(|p| dependency.resolver_for_parameter(p))
                .collect();
        }
        if values.len() != parameters.len() {
            let member = parameters
                .first()
                .map(|p| p.member().signature().to_string())
                .unwrap_or_default();
            let ty = parameters
                .first()
                .map(|p| p.member().declaring_type().to_string())
                .unwrap_or_default();
            return Err(DiError::selection(
                ty,
                member,
                format!(
                    "{} arguments supplied for {} parameters",
                    values.len(),
                    parameters.len()
                ),
            ));
        }
        parameters
            .iter()
            .zip(values)
            .map(|(parameter, value)| value.resolver_for_parameter(parameter))
            .collect()
    }
}

fn resolve_arguments(
    ctx: &ResolutionContext<'_>,
    resolvers: &[ParameterResolver],
) -> DiResult<Arguments> {
    resolvers.iter().map(|resolve| resolve(ctx)).collect()
}

pub(crate) fn resolve_delegate<T, F>(f: F) -> ResolveDelegate<T>
where
    F: Fn(&ResolutionContext<'_>) -> DiResult<T> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn inject_delegate<F>(f: F) -> InjectDelegate
where
    F: Fn(&ResolutionContext<'_>, &mut Target) -> DiResult<()> + Send + Sync + 'static,
{
    Arc::new(f)
}
