//! Unit tests for RegistrationDescriptor methods

use ferrous_inject::{ContractKey, RegistrationDescriptor, RegistrationKind, Type, TypeBuilder};

fn descriptor(contract: ContractKey, mapped_to: Option<Type>, kind: RegistrationKind) -> RegistrationDescriptor {
    RegistrationDescriptor {
        contract,
        mapped_to,
        lifetime: "singleton",
        kind,
        member_count: 0,
    }
}

#[test]
fn test_descriptor_unnamed() {
    let d = descriptor(ContractKey::new(Type::of::<String>()), None, RegistrationKind::Instance);
    assert!(!d.is_named());
    assert!(!d.is_open_generic());
}

#[test]
fn test_descriptor_named() {
    let d = descriptor(ContractKey::named(Type::of::<u32>(), "port"), None, RegistrationKind::Factory);
    assert!(d.is_named());
    assert_eq!(d.to_string(), "u32 (port) (Factory) [singleton]");
}

#[test]
fn test_descriptor_open_generic_mapping() {
    let contract = TypeBuilder::interface("IRepository").generic_parameters(&["T"]).build().unwrap();
    let builder = TypeBuilder::class("Repository").generic_parameters(&["T"]);
    let implemented = contract.make_generic(&[builder.param("T")]).unwrap();
    let repository = builder.implements(implemented).build().unwrap();

    let d = descriptor(ContractKey::new(contract), Some(repository), RegistrationKind::Type);
    assert!(d.is_open_generic());
    assert_eq!(d.to_string(), "IRepository<T> -> Repository<T> [singleton]");
}

#[test]
fn test_descriptor_closed_generic_is_not_open() {
    let contract = TypeBuilder::interface("IList").generic_parameters(&["T"]).build().unwrap();
    let closed = contract.make_generic(&[Type::of::<u8>()]).unwrap();
    let d = descriptor(ContractKey::new(closed), None, RegistrationKind::Factory);
    assert!(!d.is_open_generic());
}
