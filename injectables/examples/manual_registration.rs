use std::sync::Arc;

use injectables::{
    Args, BoxError, Constructor, Inject, InjectableConfig, InjectableRegistry, Injected,
    InstanceCallback, Registrant, args, facade,
};

fn main() -> Result<(), BoxError> {
    let manually = ManuallyInjectedValue {
        data: "Hello, world".to_string(),
    };
    let registry = InjectableRegistry::builder()
        .register(Registrant::instance(manually), None, InjectableConfig::default())?
        .register(
            Constructor::new(|args: &Args| {
                let greeting = args.get::<&str>(0).copied().unwrap_or("hi");
                Ok::<_, BoxError>(Greeting(greeting.to_string()))
            }),
            Some("greeting".into()),
            InjectableConfig::on_demand().with_callback(InstanceCallback::typed(
                |greeting: Arc<Greeting>, _| Arc::new(Greeting(greeting.0.to_uppercase())),
            )),
        )?
        .build();
    facade::set_registry(Arc::new(registry));

    let everything = Everything::default();
    println!("{}", everything.manually()?.data);

    let greeting = facade::get_as::<Greeting>("greeting", &args!["good morning"])?;
    println!("{:?}", greeting.map(|greeting| greeting.0.clone()));
    Ok(())
}

struct ManuallyInjectedValue {
    data: String,
}

struct Greeting(String);

#[derive(Default, Injected)]
struct Everything {
    #[inject]
    manually: Inject<ManuallyInjectedValue>,
}
