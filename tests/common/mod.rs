//! Shared fixtures: an order repository domain described for the container.
#![allow(dead_code)]

use ferrous_inject::{AnyArc, Dispose, GenericParameter, InjectionConstructor, ParameterValue, Type, TypeBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub trait DbContext: Send + Sync {
    fn url(&self) -> &str;
}

pub struct SqlContext {
    pub url: String,
}

impl DbContext for SqlContext {
    fn url(&self) -> &str {
        &self.url
    }
}

pub struct Order {
    pub id: u32,
}

pub struct Repository {
    pub db: Arc<dyn DbContext>,
    pub default_value: Option<AnyArc>,
    pub entity: Option<Type>,
}

pub struct Domain {
    pub db_contract: Type,
    pub sql_context: Type,
    pub order: Type,
    pub repository_contract: Type,
    pub repository: Type,
}

impl Domain {
    pub fn new() -> Self {
        let db_contract = TypeBuilder::interface("IDbContext").build().unwrap();
        let sql_context = TypeBuilder::class("SqlContext")
            .implements_as(db_contract.clone(), |context: Arc<SqlContext>| {
                context as Arc<dyn DbContext>
            })
            .constructor(|c| {
                c.body(|_| {
                    Ok(SqlContext {
                        url: "postgres://localhost/orders".to_string(),
                    })
                })
            })
            .build()
            .unwrap();

        let order = TypeBuilder::class("Order")
            .constructor(|c| c.body(|_| Ok(Order { id: 7 })))
            .build()
            .unwrap();

        let repository_contract = TypeBuilder::interface("IRepository")
            .generic_parameters(&["T"])
            .build()
            .unwrap();
        let builder = TypeBuilder::class("Repository").generic_parameters(&["T"]);
        let t = builder.param("T");
        let implemented = repository_contract.make_generic(&[t.clone()]).unwrap();
        let repository = builder
            .implements(implemented)
            .constructor(|c| {
                c.param("ctx", db_contract.clone()).body(|call| {
                    Ok(Repository {
                        db: call.arg_trait::<dyn DbContext>(0)?,
                        default_value: None,
                        entity: call.declaring_type().generic_arguments().first().cloned(),
                    })
                })
            })
            .constructor(|c| {
                c.param("ctx", db_contract.clone())
                    .param("defaultValue", t.clone())
                    .body(|call| {
                        Ok(Repository {
                            db: call.arg_trait::<dyn DbContext>(0)?,
                            default_value: call.raw(1).cloned(),
                            entity: call.declaring_type().generic_arguments().first().cloned(),
                        })
                    })
            })
            .build()
            .unwrap();

        Self {
            db_contract,
            sql_context,
            order,
            repository_contract,
            repository,
        }
    }

    /// `IRepository<entity>`.
    pub fn repository_of(&self, entity: Type) -> Type {
        self.repository_contract.make_generic(&[entity]).unwrap()
    }

    /// The two-parameter constructor as declared on the open definition.
    pub fn open_two_parameter_constructor(&self) -> ferrous_inject::ConstructorInfo {
        self.repository
            .constructors()
            .into_iter()
            .find(|c| c.parameter_count() == 2)
            .unwrap()
    }

    /// Constructor injection `(IDbContext ctx, T defaultValue)` with `T` optional.
    pub fn two_parameter_injection(&self) -> InjectionConstructor {
        InjectionConstructor::with_member(
            self.open_two_parameter_constructor(),
            vec![
                ParameterValue::dependency(),
                GenericParameter::optional("T").unwrap().into(),
            ],
        )
        .unwrap()
    }
}

/// Counts constructions and disposals of the type it builds.
#[derive(Default)]
pub struct Probe {
    pub constructed: AtomicUsize,
    pub disposed: AtomicUsize,
}

impl Probe {
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

pub struct Tracked {
    pub probe: Arc<Probe>,
}

impl Dispose for Tracked {
    fn dispose(&self) {
        self.probe.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

/// A disposable class counting its constructions through `probe`.
pub fn tracked_type(name: &str, probe: &Arc<Probe>) -> Type {
    let probe = probe.clone();
    TypeBuilder::class(name)
        .constructor(move |c| {
            c.body(move |_| {
                probe.constructed.fetch_add(1, Ordering::SeqCst);
                Ok(Tracked {
                    probe: probe.clone(),
                })
            })
        })
        .disposable::<Tracked>()
        .build()
        .unwrap()
}
