//! Compiled construction plans.

use std::sync::Arc;

use tracing::debug;

use super::resolver::{InjectDelegate, ResolveDelegate, ResolverFactory};
use super::InjectionMember;
use crate::error::{DiError, DiResult};
use crate::provider::ResolutionContext;
use crate::types::{AnyArc, ConstructorInfo, Instance, Type, TypeCategory};

/// Constructor delegate plus the injectors applied to the new instance.
///
/// Fields are injected first, then properties, then methods, each in
/// registration order.
pub(crate) struct BuildPlan {
    ty: Type,
    construct: ResolveDelegate<Instance>,
    injectors: Vec<InjectDelegate>,
}

impl BuildPlan {
    pub(crate) fn compile(closed: &Type, members: &[InjectionMember]) -> DiResult<Self> {
        let requested = closed.to_string();
        let in_context = |member: &str| {
            let requested = requested.clone();
            let member = member.to_string();
            move |e: DiError| e.in_context(requested, member)
        };

        let construct = match members.iter().find_map(|m| match m {
            InjectionMember::Constructor(c) => Some(c),
            _ => None,
        }) {
            Some(ctor) => ctor.resolver(closed).map_err(in_context(".ctor"))?,
            None => {
                let ctor = default_constructor(closed).map_err(in_context(".ctor"))?;
                ResolverFactory::constructor(&ctor, &[]).map_err(in_context(".ctor"))?
            }
        };

        let mut injectors = Vec::new();
        for member in members {
            if let InjectionMember::Field(field) = member {
                injectors.push(field.resolver(closed).map_err(in_context(field.name()))?);
            }
        }
        for member in members {
            if let InjectionMember::Property(property) = member {
                injectors.push(property.resolver(closed).map_err(in_context(property.name()))?);
            }
        }
        for member in members {
            if let InjectionMember::Method(method) = member {
                injectors.push(method.resolver(closed).map_err(in_context(method.name()))?);
            }
        }

        debug!(ty = %closed, injectors = injectors.len(), "compiled build plan");
        Ok(Self {
            ty: closed.clone(),
            construct,
            injectors,
        })
    }

    pub(crate) fn ty(&self) -> &Type {
        &self.ty
    }

    pub(crate) fn execute(&self, ctx: &ResolutionContext<'_>) -> DiResult<AnyArc> {
        let mut instance = (self.construct)(ctx)?;
        for inject in &self.injectors {
            inject(ctx, &mut *instance)?;
        }
        Ok(Arc::from(instance))
    }
}

/// The supported constructor with the most parameters.
///
/// Two or more constructors tied at that length are ambiguous.
pub(crate) fn default_constructor(closed: &Type) -> DiResult<ConstructorInfo> {
    if closed.category() != Some(TypeCategory::Class) {
        return Err(DiError::selection(
            closed.to_string(),
            ".ctor",
            "only concrete classes can be constructed",
        ));
    }
    let mut candidates = closed.supported_constructors();
    let longest = candidates
        .iter()
        .map(ConstructorInfo::parameter_count)
        .max()
        .ok_or_else(|| DiError::selection(closed.to_string(), ".ctor", "no injectable constructor"))?;
    candidates.retain(|c| c.parameter_count() == longest);
    if candidates.len() > 1 {
        return Err(DiError::AmbiguousMatch {
            ty: closed.to_string(),
            member: ".ctor".to_string(),
            candidates: candidates.len(),
        });
    }
    Ok(candidates.swap_remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeBuilder;

    struct Engine;

    #[test]
    fn default_constructor_is_the_longest() {
        let engine = TypeBuilder::class("Engine")
            .constructor(|c| c.body(|_| Ok(Engine)))
            .constructor(|c| c.param("power", Type::of::<u32>()).body(|_| Ok(Engine)))
            .build()
            .unwrap();
        assert_eq!(default_constructor(&engine).unwrap().parameter_count(), 1);
    }

    #[test]
    fn tied_default_constructors_are_ambiguous() {
        let engine = TypeBuilder::class("Engine")
            .constructor(|c| c.param("power", Type::of::<u32>()).body(|_| Ok(Engine)))
            .constructor(|c| c.param("name", Type::of::<String>()).body(|_| Ok(Engine)))
            .build()
            .unwrap();
        assert!(default_constructor(&engine).unwrap_err().is_ambiguous());
    }

    #[test]
    fn interfaces_have_no_default_constructor() {
        let service = TypeBuilder::interface("IService").build().unwrap();
        assert!(default_constructor(&service).unwrap_err().is_selection_failure());
        assert!(default_constructor(&Type::of::<u32>()).unwrap_err().is_selection_failure());
    }
}
