use std::{env, sync::Arc};

use injectables::{Args, BoxError, Inject, Injectable, Injected, InjectablesError};

fn main() -> Result<(), InjectablesError> {
    let everything = Everything::default();

    let simple = everything.simple()?;
    assert!(Arc::ptr_eq(&simple, &everything.type_with_constructor()?.simple()?));
    assert!(Arc::ptr_eq(&simple, &everything.basic_type()?.simple()?));
    println!("Hello, {}", everything.type_with_constructor()?.custom_field);
    Ok(())
}

#[derive(Default, Injectable)]
struct SimplestObject {}

#[derive(Default, Injectable, Injected)]
struct BasicType {
    #[inject]
    simple: Inject<SimplestObject>,
}

#[derive(Injectable, Injected)]
#[constructor(build_type_with_constructor)]
struct TypeWithConstructor {
    #[inject]
    simple: Inject<SimplestObject>,
    custom_field: String,
}

fn build_type_with_constructor(_: &Args) -> Result<TypeWithConstructor, BoxError> {
    let custom_field = env::var("USER").unwrap_or_else(|_| String::new());
    Ok(TypeWithConstructor {
        simple: Inject::new(),
        custom_field,
    })
}

#[derive(Default, Injected)]
struct Everything {
    #[inject]
    simple: Inject<SimplestObject>,
    #[inject]
    basic_type: Inject<BasicType>,
    #[inject]
    type_with_constructor: Inject<TypeWithConstructor>,
}
