use std::sync::Arc;

use injectables::{BoxError, Inject, Injectable, Injected, args, facade};

fn main() -> Result<(), BoxError> {
    let empty = Empty::resolve(&args![])?;
    let everything = Everything::default();
    assert!(Arc::ptr_eq(&empty, &everything.holds()?.empty()?));
    assert_eq!("hello, world", everything.has()?.data);

    // on-demand types are rebuilt on every lookup
    let first = facade::get("Fresh", &args![])?;
    let second = facade::get("Fresh", &args![])?;
    assert!(first.zip(second).is_some_and(|(a, b)| !Arc::ptr_eq(&a, &b)));
    Ok(())
}

#[derive(Default, Injectable)]
struct Empty;

#[derive(Default, Injectable)]
#[injectable(on_demand)]
struct Fresh;

#[derive(Default, Injectable, Injected)]
struct HoldsAnEmpty {
    #[inject]
    empty: Inject<Empty>,
}

#[derive(Injectable)]
#[constructor(inject_has_data)]
struct NeedsCustomConstructor {
    data: String,
}

#[derive(Default, Injected)]
struct Everything {
    #[inject]
    holds: Inject<HoldsAnEmpty>,
    #[inject]
    has: Inject<NeedsCustomConstructor>,
}

fn inject_has_data(_: &injectables::Args) -> Result<NeedsCustomConstructor, BoxError> {
    Ok(NeedsCustomConstructor {
        data: "hello, world".to_string(),
    })
}
