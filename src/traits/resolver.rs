//! Resolver traits for dependency resolution.

use std::any::Any;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::traits::Dispose;
use crate::types::{AnyArc, Type};

/// Object-safe resolution used by compiled build plans and factories.
///
/// Implemented by [`ResolutionContext`](crate::ResolutionContext), which
/// carries circular dependency detection and per-resolve state for one
/// top-level resolve call tree.
///
/// Most users should use the [`Resolver`] trait instead, which provides typed
/// helpers built on top of this trait.
pub trait ResolverCore {
    /// Resolves the contract `(ty, name)`.
    ///
    /// # Returns
    ///
    /// * `Ok(AnyArc)` - The resolved instance as `Arc<dyn Any>`
    /// * `Err(DiError)` - No registration, a failed build, or a circular graph
    fn resolve_any(&self, ty: &Type, name: Option<&str>) -> DiResult<AnyArc>;

    /// Like [`resolve_any`](Self::resolve_any), but yields `None` when nothing
    /// is registered for the contract.
    ///
    /// Failures while building a registered contract are still errors.
    fn try_resolve_any(&self, ty: &Type, name: Option<&str>) -> DiResult<Option<AnyArc>>;

    /// Registers a disposal hook on the owning container.
    ///
    /// Hooks run in LIFO order when the container is disposed.
    fn push_disposer(&self, f: Box<dyn FnOnce() + Send>);
}

/// Typed resolution helpers.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{Container, Resolver, Type};
/// use std::sync::Arc;
///
/// let container = Container::new();
/// container.register_shared(Type::of::<String>(), None, Arc::new(String::from("postgres://")));
///
/// container.with_context(|ctx| {
///     let url = ctx.get::<String>().unwrap();
///     assert_eq!(&*url, "postgres://");
/// });
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves `ty` and downcasts the instance to `T`.
    fn resolve_as<T: Any + Send + Sync>(&self, ty: &Type) -> DiResult<Arc<T>> {
        downcast(self.resolve_any(ty, None)?)
    }

    fn resolve_named_as<T: Any + Send + Sync>(&self, ty: &Type, name: &str) -> DiResult<Arc<T>> {
        downcast(self.resolve_any(ty, Some(name))?)
    }

    /// Resolves `ty` and returns `None` when the contract is not registered.
    fn try_resolve_as<T: Any + Send + Sync>(&self, ty: &Type) -> DiResult<Option<Arc<T>>> {
        self.try_resolve_any(ty, None)?.map(downcast).transpose()
    }

    /// Resolves a contract whose instances are stored as `Arc<T>`.
    ///
    /// Interfaces registered with
    /// [`TypeBuilder::implements_as`](crate::TypeBuilder::implements_as) or
    /// instances registered as `Arc<dyn Trait>` resolve through this method.
    fn resolve_trait<T: ?Sized + Send + Sync + 'static>(&self, ty: &Type) -> DiResult<Arc<T>> {
        downcast_trait(self.resolve_any(ty, None)?)
    }

    fn resolve_named_trait<T: ?Sized + Send + Sync + 'static>(
        &self,
        ty: &Type,
        name: &str,
    ) -> DiResult<Arc<T>> {
        downcast_trait(self.resolve_any(ty, Some(name))?)
    }

    /// Resolves the native Rust type `T`.
    fn get<T: Any + Send + Sync>(&self) -> DiResult<Arc<T>> {
        self.resolve_as::<T>(&Type::of::<T>())
    }

    /// Registers a service for disposal with the owning container.
    ///
    /// Call this from factories that create resources the container would
    /// not otherwise know how to dispose.
    fn register_disposer<T: Dispose>(&self, service: Arc<T>) {
        self.push_disposer(Box::new(move || service.dispose()));
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}

fn downcast<T: Any + Send + Sync>(any: AnyArc) -> DiResult<Arc<T>> {
    any.downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>().to_string()))
}

fn downcast_trait<T: ?Sized + Send + Sync + 'static>(any: AnyArc) -> DiResult<Arc<T>> {
    any.downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| DiError::TypeMismatch(std::any::type_name::<T>().to_string()))
}
