use std::sync::Arc;

use injectables::{
    Args, BoxError, Constructor, Inject, Injectable, InjectableConfig, InjectableRegistry,
    Injected, InjectablesError, Registrant, args, facade, validate_injections,
};
use regex::Regex;
use serial_test::serial;

#[derive(Default, Injectable)]
struct FooService;

#[derive(Default, Injectable)]
struct FooRepository;

#[derive(Default, Injectable)]
struct BarService;

#[derive(Default, Injected)]
struct Handler {
    #[inject]
    foo: Inject<FooService>,
    #[inject]
    bar: Inject<BarService>,
}

#[test]
#[serial]
fn the_default_registry_holds_declared_types() {
    facade::reset();
    assert!(!facade::has("FooService"));

    assert_eq!(facade::register_declared(), 3);
    assert!(facade::has("FooService"));
    assert!(facade::has("FooRepository"));
    assert!(facade::has("BarService"));
    assert!(validate_injections().is_ok());
}

#[test]
#[serial]
fn selective_reset_only_drops_matching_keys() {
    facade::reset();
    facade::register_declared();
    let handler = Handler::default();

    assert_eq!(facade::selective_reset(Regex::new("^Foo").unwrap()).unwrap(), 2);
    assert!(!facade::has("FooService"));
    assert!(!facade::has("FooRepository"));
    assert!(facade::has("BarService"));

    assert!(handler.bar().is_ok());
    assert!(matches!(handler.foo(), Err(InjectablesError::Injection { .. })));
    assert!(matches!(validate_injections(), Err(InjectablesError::Injection { .. })));

    // declared types come back without disturbing what is still there
    let bar = BarService::resolve(&args![]).unwrap();
    facade::register_declared();
    assert!(handler.foo().is_ok());
    assert!(Arc::ptr_eq(&bar, &BarService::resolve(&args![]).unwrap()));
}

#[test]
#[serial]
fn registries_can_be_swapped() {
    let registry = InjectableRegistry::builder()
        .register(Registrant::instance(FooService), None, InjectableConfig::default())
        .unwrap()
        .build();
    facade::set_registry(Arc::new(registry));
    assert!(facade::has("FooService"));
    assert!(!facade::has("BarService"));

    facade::set_registry(Arc::new(InjectableRegistry::builder().with_declared().build()));
    assert!(facade::has("BarService"));
}

#[test]
#[serial]
fn force_replaces_an_existing_registration() {
    facade::reset();
    let register = |value: u32, force: bool| {
        let constructor = Constructor::new(move |_: &Args| Ok::<_, BoxError>(value));
        facade::register(constructor, Some("Number".into()), InjectableConfig::singleton(), force)
            .unwrap();
    };

    register(1, false);
    register(2, false);
    assert_eq!(*facade::get_as::<u32>("Number", &args![]).unwrap().unwrap(), 1);

    register(3, true);
    assert_eq!(*facade::get_as::<u32>("Number", &args![]).unwrap().unwrap(), 3);

    // build always constructs, even for a singleton
    let built = facade::build("Number", &args![]).unwrap();
    assert_eq!(built.downcast_ref::<u32>(), Some(&3));
}
