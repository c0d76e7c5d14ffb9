use std::{any::Any, sync::Arc};

use injectables::{BoxError, Inject, Injectable, Injected, Instance, facade, validate_injections};

fn main() -> Result<(), BoxError> {
    validate_injections()?;

    let first = Greeter {
        name: "first".to_string(),
        ..Default::default()
    };
    let second = Greeter {
        name: "second".to_string(),
        ..Default::default()
    };
    println!("{}", first.say_hello()?.say_hello());
    println!("{}", first.signed()?);
    println!("{}", second.signed()?);

    // the raw registration is untouched by the transformer
    let raw = facade::get_as::<Signature>("signature", &injectables::args![])?;
    println!("{:?}", raw.map(|signature| signature.0.clone()));
    Ok(())
}

trait SayHello {
    fn say_hello(&self) -> String;
}

#[derive(Default, Injectable)]
#[injectable(category = "hello")]
struct SayHelloImpl;

impl SayHello for SayHelloImpl {
    fn say_hello(&self) -> String {
        "Hello from the concrete impl".to_string()
    }
}

#[derive(Injectable)]
#[injectable(category = "signature")]
#[constructor(Signature::build)]
struct Signature(String);

impl Signature {
    fn build(_: &injectables::Args) -> Result<Signature, BoxError> {
        Ok(Signature("regards".to_string()))
    }
}

fn sign(value: Instance, owner: &dyn Any) -> Result<Instance, BoxError> {
    let signature = value.downcast_ref::<Signature>().ok_or("not a signature")?;
    let greeter = owner.downcast_ref::<Greeter>().ok_or("not a greeter")?;
    Ok(Arc::new(format!("{}, {}", signature.0, greeter.name)))
}

#[derive(Default, Injected)]
struct Greeter {
    name: String,
    #[inject(category = SayHelloImpl)]
    say_hello: Inject<SayHelloImpl>,
    #[inject(category = "signature", transformer = sign)]
    signed: Inject<String>,
}
