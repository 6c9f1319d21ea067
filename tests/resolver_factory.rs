use ferrous_inject::{
    Container, DiError, InjectionMethod, Lifetime, MemberSelector, ParameterValue, ResolverFactory,
    Target, Type, TypeBuilder,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, PartialEq)]
struct Point {
    x: i32,
    y: i32,
    label: String,
}

fn point_type() -> Type {
    TypeBuilder::class("Point")
        .constructor(|c| {
            c.param("x", Type::of::<i32>())
                .param("y", Type::of::<i32>())
                .param("label", Type::of::<String>())
                .body(|call| {
                    Ok(Point {
                        x: call.value(0)?,
                        y: call.value(1)?,
                        label: call.value(2)?,
                    })
                })
        })
        .method("Shift", |m| {
            m.param("dx", Type::of::<i32>()).body(|p: &mut Point, call| {
                p.x += call.value::<i32>(0)?;
                Ok(())
            })
        })
        .build()
        .unwrap()
}

#[test]
fn constructor_delegate_builds_independent_instances() {
    let point = point_type();
    let ctor = point.constructors().remove(0);
    let delegate = ResolverFactory::constructor(
        &ctor,
        &[
            ParameterValue::value(1i32),
            ParameterValue::value(2i32),
            ParameterValue::value(String::from("origin")),
        ],
    )
    .unwrap();

    let container = Container::new();
    let (first, second) = container.with_context(|ctx| (delegate(ctx).unwrap(), delegate(ctx).unwrap()));
    let first = first.downcast::<Point>().unwrap();
    let second = second.downcast::<Point>().unwrap();

    assert_eq!(*first, *second);
    assert!(!std::ptr::eq(&*first, &*second));
    assert_eq!(first.label, "origin");
}

#[test]
fn method_delegate_acts_on_existing_instance() {
    let point = point_type();
    let method = InjectionMethod::new("Shift", vec![ParameterValue::value(5i32)])
        .select(&point)
        .unwrap();
    let delegate = ResolverFactory::method(&method, &[ParameterValue::value(5i32)]).unwrap();

    let mut target = Point {
        x: 1,
        y: 0,
        label: String::new(),
    };
    let container = Container::new();
    container.with_context(|ctx| {
        let target: &mut Target = &mut target;
        delegate(ctx, &mut *target).unwrap();
        delegate(ctx, &mut *target).unwrap();
    });
    assert_eq!(target.x, 11);
}

#[test]
fn arguments_resolve_left_to_right_and_stop_at_first_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let container = Container::new();
    let counter = calls.clone();
    container.register_factory(Type::of::<String>(), Lifetime::Transient, move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(String::from("late")))
    });

    let pair = TypeBuilder::class("Pair")
        .constructor(|c| {
            c.param("first", Type::of::<u128>())
                .param("second", Type::of::<String>())
                .body(|_| Ok(()))
        })
        .build()
        .unwrap();
    let ctor = pair.constructors().remove(0);
    let delegate = ResolverFactory::constructor(&ctor, &[]).unwrap();

    let err = container.with_context(|ctx| delegate(ctx).map(|_| ())).unwrap_err();
    assert!(matches!(err, DiError::DependencyResolutionFailure { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn generic_reference_needs_a_member() {
    let value = ParameterValue::generic("T").unwrap();
    assert!(matches!(
        value.resolver_for_type(&Type::of::<u8>()),
        Err(DiError::InvalidSpecification(_))
    ));
}

#[test]
fn optional_dependency_yields_absent_value() {
    let maybe = TypeBuilder::class("Maybe")
        .constructor(|c| {
            c.param("port", Type::of::<u16>())
                .body(|call| Ok(call.optional::<u16>(0)?.map(|p| *p)))
        })
        .build()
        .unwrap();
    let ctor = maybe.constructors().remove(0);
    let delegate = ResolverFactory::constructor(&ctor, &[ParameterValue::optional_dependency()]).unwrap();

    let container = Container::new();
    let built = container.with_context(|ctx| delegate(ctx)).unwrap();
    assert_eq!(*built.downcast::<Option<u16>>().unwrap(), None);

    container.register_instance(Type::of::<u16>(), None, 8080u16);
    let built = container.with_context(|ctx| delegate(ctx)).unwrap();
    assert_eq!(*built.downcast::<Option<u16>>().unwrap(), Some(8080));
}
