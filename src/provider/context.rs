//! Resolution context shared by one top-level resolve call tree.

use std::cell::RefCell;
use std::collections::HashMap;

use super::Container;
use crate::error::DiResult;
use crate::key::ContractKey;
use crate::traits::ResolverCore;
use crate::types::{AnyArc, Type};

/// Live context handed to build plans and factories.
///
/// Everything resolved through one context belongs to the same call tree, so
/// per-resolve lifetimes share instances across it.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{Container, ContractKey, Lifetime, Resolver, Type};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let container = Container::new();
/// container.register_instance(Type::of::<Database>(), None, Database {
///     url: "postgres://localhost".to_string(),
/// });
/// container.register_factory(Type::of::<UserService>(), Lifetime::Transient, |ctx, _| {
///     Ok(Arc::new(UserService { db: ctx.get::<Database>()? }))
/// });
///
/// let service = container.get::<UserService>().unwrap();
/// assert_eq!(service.db.url, "postgres://localhost");
/// ```
pub struct ResolutionContext<'a> {
    container: &'a Container,
    pub(super) per_resolve: RefCell<HashMap<usize, AnyArc>>,
}

impl<'a> ResolutionContext<'a> {
    pub(crate) fn new(container: &'a Container) -> Self {
        Self {
            container,
            per_resolve: RefCell::new(HashMap::new()),
        }
    }

    /// Container the call tree started from.
    pub fn container(&self) -> &Container {
        self.container
    }
}

impl ResolverCore for ResolutionContext<'_> {
    fn resolve_any(&self, ty: &Type, name: Option<&str>) -> DiResult<AnyArc> {
        let key = ContractKey::with_name(ty.clone(), name);
        self.container.resolve_in(self, &key)
    }

    fn try_resolve_any(&self, ty: &Type, name: Option<&str>) -> DiResult<Option<AnyArc>> {
        let key = ContractKey::with_name(ty.clone(), name);
        if !self.container.can_resolve(&key) {
            return Ok(None);
        }
        self.container.resolve_in(self, &key).map(Some)
    }

    fn push_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        self.container.push_disposer(f);
    }
}
