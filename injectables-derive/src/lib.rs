mod derive_injectable;
mod derive_injected;
mod utils;

/// Makes a type injectable and registers it with the default registry.
///
/// `#[injectable(category = "Name")]` or `#[injectable(category = OtherType)]` registers under
/// another key, `#[injectable(on_demand)]` builds a new instance on every lookup, and
/// `#[injectable(callback = path)]` runs a callback over every instance handed out. The type is
/// built with `Default` unless it names a constructor with `#[constructor(path)]`, a function
/// taking `&Args` and returning `Result<Self, E>`.
#[proc_macro_derive(Injectable, attributes(injectable, constructor))]
pub fn derive_injectable(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = match derive_injectable::InjectableDeriveInputs::from_input(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error().into(),
    };

    match input.derive() {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Turns every `#[inject]` field of type `Inject<T>` into a lazily resolved property, read
/// through a generated method of the same name.
///
/// Options: `category = "Name"` or `category = OtherType` to resolve another key than `T`,
/// `args = expr` for the constructor arguments, and `transformer = path` to transform the
/// dependency before it is stored.
#[proc_macro_derive(Injected, attributes(inject))]
pub fn derive_injected(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = match derive_injected::InjectedDeriveInputs::from_input(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error().into(),
    };

    match input.derive() {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
