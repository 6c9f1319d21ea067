mod common;

use common::{tracked_type, Probe, Tracked};
use ferrous_inject::{
    AnyArc, Container, ContractKey, DiError, Dispose, Lifetime, Resolver, Type, TypeBuilder,
};
use parking_lot::Mutex;
use std::sync::Arc;

#[test]
fn singletons_are_disposed_with_the_container() {
    let probe = Arc::new(Probe::default());
    let tracked = tracked_type("Tracked", &probe);
    let container = Container::new();
    container
        .register(ContractKey::new(tracked.clone()), Vec::new(), Lifetime::Singleton)
        .unwrap();

    container.resolve(&tracked, None).unwrap();
    container.resolve(&tracked, None).unwrap();
    assert_eq!(probe.disposed(), 0);

    container.dispose();
    assert_eq!(probe.disposed(), 1);
}

#[test]
fn dispose_empties_managers() {
    let probe = Arc::new(Probe::default());
    let tracked = tracked_type("Tracked", &probe);
    let container = Container::new();
    container
        .register(ContractKey::new(tracked.clone()), Vec::new(), Lifetime::Singleton)
        .unwrap();

    let before = container.resolve(&tracked, None).unwrap();
    container.dispose();
    let after = container.resolve(&tracked, None).unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(probe.constructed(), 2);

    // Disposing again only touches what was built since.
    container.dispose();
    assert_eq!(probe.disposed(), 2);
}

#[test]
fn transients_are_not_disposed() {
    let probe = Arc::new(Probe::default());
    let tracked = tracked_type("Tracked", &probe);
    let container = Container::new();
    container
        .register(ContractKey::new(tracked.clone()), Vec::new(), Lifetime::Transient)
        .unwrap();

    container.resolve(&tracked, None).unwrap();
    container.resolve(&tracked, None).unwrap();
    drop(container);
    assert_eq!(probe.constructed(), 2);
    assert_eq!(probe.disposed(), 0);
}

#[test]
fn dropping_the_last_handle_disposes() {
    let probe = Arc::new(Probe::default());
    let tracked = tracked_type("Tracked", &probe);
    let container = Container::new();
    container
        .register(ContractKey::new(tracked.clone()), Vec::new(), Lifetime::Singleton)
        .unwrap();
    container.resolve(&tracked, None).unwrap();

    let handle = container.clone();
    drop(container);
    assert_eq!(probe.disposed(), 0);
    drop(handle);
    assert_eq!(probe.disposed(), 1);
}

struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Dispose for Recorder {
    fn dispose(&self) {
        self.log.lock().push(self.name);
    }
}

fn recorder_type(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>, depends_on: Option<Type>) -> Type {
    let log = log.clone();
    TypeBuilder::class(name)
        .constructor(move |c| {
            let c = match depends_on {
                Some(dependency) => c.param("dependency", dependency),
                None => c,
            };
            c.body(move |_| {
                Ok(Recorder {
                    name,
                    log: log.clone(),
                })
            })
        })
        .disposable::<Recorder>()
        .build()
        .unwrap()
}

#[test]
fn disposal_runs_in_reverse_creation_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let config = recorder_type("Config", &log, None);
    let pool = recorder_type("Pool", &log, Some(config.clone()));
    let service = recorder_type("Service", &log, Some(pool.clone()));

    let container = Container::new();
    for ty in [&config, &pool, &service] {
        container
            .register(ContractKey::new(ty.clone()), Vec::new(), Lifetime::Singleton)
            .unwrap();
    }

    container.resolve(&service, None).unwrap();
    container.dispose();
    assert_eq!(*log.lock(), vec!["Service", "Pool", "Config"]);
}

#[test]
fn child_disposal_leaves_parent_untouched() {
    let probe = Arc::new(Probe::default());
    let tracked = tracked_type("Tracked", &probe);
    let root = Container::new();
    root.register(ContractKey::new(tracked.clone()), Vec::new(), Lifetime::Hierarchical)
        .unwrap();
    let child = root.create_child_container();

    root.resolve(&tracked, None).unwrap();
    child.resolve(&tracked, None).unwrap();

    child.dispose();
    assert_eq!(probe.disposed(), 1);
    root.dispose();
    assert_eq!(probe.disposed(), 2);
}

#[test]
fn container_owned_instances_are_disposed_with_the_container() {
    let probe = Arc::new(Probe::default());
    let tracked = tracked_type("Tracked", &probe);
    let container = Container::new();
    container.register_instance(
        tracked.clone(),
        None,
        Tracked {
            probe: probe.clone(),
        },
    );

    let first = container.resolve_as::<Tracked>(&tracked).unwrap();
    let second = container.resolve_as::<Tracked>(&tracked).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(container.registrations()[0].lifetime, "singleton");

    container.dispose();
    assert_eq!(probe.disposed(), 1);
}

#[test]
fn instances_of_native_types_are_not_disposed() {
    let probe = Arc::new(Probe::default());
    let container = Container::new();
    container.register_instance(
        Type::of::<Tracked>(),
        None,
        Tracked {
            probe: probe.clone(),
        },
    );
    container.get::<Tracked>().unwrap();
    container.dispose();
    assert_eq!(probe.disposed(), 0);
}

#[test]
fn externally_owned_instances_are_held_weakly() {
    let probe = Arc::new(Probe::default());
    let tracked = tracked_type("Tracked", &probe);
    let owner: AnyArc = Arc::new(Tracked {
        probe: probe.clone(),
    });
    let container = Container::new();
    container.register_shared_with(tracked.clone(), None, owner.clone(), Lifetime::External);

    let resolved = container.resolve(&tracked, None).unwrap();
    assert!(Arc::ptr_eq(&resolved, &owner));
    drop(resolved);

    container.dispose();
    assert_eq!(probe.disposed(), 0);
    assert!(container.resolve(&tracked, None).is_ok());

    drop(owner);
    assert!(matches!(
        container.resolve(&tracked, None),
        Err(DiError::DependencyResolutionFailure { .. })
    ));
}

#[test]
fn factories_can_register_disposers() {
    let probe = Arc::new(Probe::default());
    let container = Container::new();
    let factory_probe = probe.clone();
    container.register_factory(Type::of::<Tracked>(), Lifetime::Transient, move |ctx, _| {
        let tracked = Arc::new(Tracked {
            probe: factory_probe.clone(),
        });
        ctx.register_disposer(tracked.clone());
        Ok(tracked)
    });

    container.get::<Tracked>().unwrap();
    container.get::<Tracked>().unwrap();
    container.dispose();
    assert_eq!(probe.disposed(), 2);
}
