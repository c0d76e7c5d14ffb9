//! Decorators applied at runtime, for types a derive does not fit. Accessors generated by
//! `#[derive(Injected)]` are built on [`InjectionBinding`] and [`Inject`] as well.

mod inject;
mod injectable;

pub use inject::{Inject, InjectionBinding, Injected, validate_injections};
pub use injectable::{canonical_key, injectable, injectable_with, on_demand, singleton};
