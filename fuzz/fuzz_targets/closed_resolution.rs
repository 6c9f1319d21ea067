#![no_main]

use libfuzzer_sys::fuzz_target;
use ferrous_inject::{Container, ContractKey, Lifetime, Resolver, Type, TypeBuilder};
use std::sync::Arc;

struct Pair {
    left: Type,
    right: Type,
}

fn leaf(byte: u8) -> Type {
    match byte % 5 {
        0 => Type::of::<u8>(),
        1 => Type::of::<String>(),
        2 => Type::of::<bool>(),
        3 => Type::array_of(Type::of::<u16>()),
        _ => Type::of::<()>(),
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let contract = TypeBuilder::interface("IPair")
        .generic_parameters(&["TLeft", "TRight"])
        .build()
        .unwrap();
    let builder = TypeBuilder::class("Pair").generic_parameters(&["TLeft", "TRight"]);
    let implemented = contract
        .make_generic(&[builder.param("TLeft"), builder.param("TRight")])
        .unwrap();
    let pair = builder
        .implements(implemented)
        .constructor(|c| {
            c.body(|call| {
                let arguments = call.declaring_type().generic_arguments();
                Ok(Pair {
                    left: arguments[0].clone(),
                    right: arguments[1].clone(),
                })
            })
        })
        .build()
        .unwrap();

    let lifetime = match data[0] % 3 {
        0 => Lifetime::Transient,
        1 => Lifetime::Singleton,
        _ => Lifetime::PerThread,
    };
    let container = Container::new();
    container
        .register_type(ContractKey::new(contract.clone()), pair, Vec::new(), lifetime)
        .unwrap();

    // Every closing resolves to the same arguments it was requested with
    for window in data[1..].chunks(2) {
        let left = leaf(window[0]);
        let right = leaf(*window.last().unwrap());
        let closed = contract.make_generic(&[left.clone(), right.clone()]).unwrap();
        let built = container.resolve_as::<Pair>(&closed).unwrap();
        assert_eq!(built.left, left);
        assert_eq!(built.right, right);

        if lifetime == Lifetime::Singleton {
            let again = container.resolve_as::<Pair>(&closed).unwrap();
            assert!(Arc::ptr_eq(&built, &again));
        }
    }
});
