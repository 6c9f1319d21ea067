//! # ferrous-inject
//!
//! Reflection-style dependency injection for Rust: contracts map to described
//! types, and the container selects constructors, methods, fields and
//! properties on the closed type it builds, including open generic
//! registrations closed at resolution time.
//!
//! ## Features
//!
//! - **Runtime type model**: described classes, interfaces and generic definitions
//! - **Open generics**: `IRepository<>` mapped to `Repository<>` serves every `IRepository<T>`
//! - **Member injection**: constructors, methods, fields and properties, selected per closed type
//! - **Lifetime managers**: transient, singleton, hierarchical, per-resolve, per-thread, external
//! - **Circular dependency detection**: detailed error paths instead of deadlocks
//! - **Child containers**: hierarchical registrations and disposal
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_inject::{Container, ContractKey, Lifetime, Resolver, Type, TypeBuilder};
//! use std::sync::Arc;
//!
//! struct DbContext { url: String }
//! struct Repository { db: Arc<DbContext> }
//! struct Order;
//!
//! let db_context = TypeBuilder::class("DbContext")
//!     .constructor(|c| c.body(|_| Ok(DbContext { url: "postgres://localhost".to_string() })))
//!     .build()?;
//!
//! let contract = TypeBuilder::interface("IRepository").generic_parameters(&["T"]).build()?;
//! let builder = TypeBuilder::class("Repository").generic_parameters(&["T"]);
//! let implemented = contract.make_generic(&[builder.param("T")])?;
//! let repository = builder
//!     .implements(implemented)
//!     .constructor(|c| {
//!         c.param("db", db_context.clone())
//!             .body(|call| Ok(Repository { db: call.arg::<DbContext>(0)? }))
//!     })
//!     .build()?;
//!
//! let container = Container::new();
//! container.register(ContractKey::new(db_context.clone()), Vec::new(), Lifetime::Singleton)?;
//! container.register_type(ContractKey::new(contract.clone()), repository, Vec::new(), Lifetime::Transient)?;
//!
//! let orders = contract.make_generic(&[Type::of::<Order>()])?;
//! let repo = container.resolve_as::<Repository>(&orders)?;
//! assert_eq!(repo.db.url, "postgres://localhost");
//! # Ok::<(), ferrous_inject::DiError>(())
//! ```
//!
//! ## Injection Members
//!
//! Registrations declare members against the mapped type. A member may name
//! a handle enumerated from a generic definition; it is re-located on each
//! closed type by structural comparison of names and parameter names.
//!
//! ```rust
//! use ferrous_inject::{
//!     Container, ContractKey, InjectionMethod, InjectionProperty, Lifetime, ParameterValue,
//!     Resolver, Type, TypeBuilder,
//! };
//!
//! #[derive(Default)]
//! struct Mailer { host: String, port: u16 }
//!
//! let mailer = TypeBuilder::class("Mailer")
//!     .constructor(|c| c.body(|_| Ok(Mailer::default())))
//!     .property("Host", Type::of::<String>(), |p| {
//!         p.setter(|m: &mut Mailer, call| {
//!             m.host = call.value(0)?;
//!             Ok(())
//!         })
//!     })
//!     .method("Configure", |m| {
//!         m.param("port", Type::of::<u16>()).body(|mailer: &mut Mailer, call| {
//!             mailer.port = call.value(0)?;
//!             Ok(())
//!         })
//!     })
//!     .build()?;
//!
//! let container = Container::new();
//! container.register(
//!     ContractKey::new(mailer.clone()),
//!     vec![
//!         InjectionProperty::with_value("Host", ParameterValue::value(String::from("smtp.local"))).into(),
//!         InjectionMethod::new("Configure", vec![ParameterValue::value(25u16)]).into(),
//!     ],
//!     Lifetime::Transient,
//! )?;
//!
//! let built = container.resolve_as::<Mailer>(&mailer)?;
//! assert_eq!(built.host, "smtp.local");
//! assert_eq!(built.port, 25);
//! # Ok::<(), ferrous_inject::DiError>(())
//! ```

pub mod config;
pub mod descriptors;
pub mod error;
pub mod injection;
pub mod key;
pub mod lifetime;
pub mod matching;
pub mod observer;
pub mod provider;
pub mod traits;
pub mod types;

mod internal;
mod registration;

pub use config::{ContainerBuilder, ContainerOptions, DEFAULT_MAX_DEPTH};
pub use descriptors::{RegistrationDescriptor, RegistrationKind};
pub use error::{DiError, DiResult};
pub use injection::{
    generic_parameter_info, DependencyMarker, GenericParameter, InjectDelegate, InjectionConstructor,
    InjectionField, InjectionMember, InjectionMethod, InjectionProperty, MemberSelector,
    ParameterResolver, ParameterValue, ResolveDelegate, ResolverFactory, SelectedMember, DEPENDENCY,
    OPTIONAL_DEPENDENCY,
};
pub use key::ContractKey;
pub use lifetime::{
    ContainerControlledLifetimeManager, ExternallyControlledLifetimeManager,
    HierarchicalLifetimeManager, IntoLifetimeManager, Lifetime, LifetimeContext, LifetimeManager,
    Lookup, Pending, PerResolveLifetimeManager, PerThreadLifetimeManager, TransientLifetimeManager,
};
pub use matching::{match_type, MatchRank};
pub use observer::{ResolutionObserver, TracingObserver};
pub use provider::{Container, ResolutionContext};
pub use registration::Factory;
pub use traits::{Dispose, Resolver, ResolverCore};
pub use types::{
    AccessorInfo, AccessorKind, AnyArc, ConstructorInfo, Instance, Invocation, MemberSignature,
    MethodBase, MethodInfo, ParameterInfo, Target, Type, TypeBuilder, TypeCategory, Visibility,
};
