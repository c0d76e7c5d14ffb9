//! A registry of injectable types, filled in by decorating types, and lazy injection of those
//! types into the properties of other types.
//!
//! Types become injectable by deriving [`Injectable`] (or by calling
//! [`injectable`](decorators::injectable) at runtime), and properties become injection points by
//! deriving [`Injected`] over `Inject<T>` fields. Everything resolves against one process-wide
//! registry, reachable through [`facade`].
//!
//! ```
//! use std::sync::Arc;
//! use injectables::{Inject, Injectable, Injected, InjectablesError};
//!
//! #[derive(Default, Injectable)]
//! #[injectable(category = "lib-doc::Clock")]
//! struct Clock;
//!
//! #[derive(Default, Injected)]
//! struct Scheduler {
//!     #[inject]
//!     clock: Inject<Clock>,
//! }
//!
//! fn main() -> Result<(), InjectablesError> {
//!     let scheduler = Scheduler::default();
//!     let clock: Arc<Clock> = scheduler.clock()?;
//!     assert!(Arc::ptr_eq(&clock, &scheduler.clock()?));
//!     Ok(())
//! }
//! ```

mod args;
mod config;
pub mod decorators;
#[doc(hidden)]
pub mod derive_api;
mod error;
pub mod facade;
pub mod key;
pub mod metadata;
pub mod registry;

use std::{
    any::{Any, type_name},
    sync::Arc,
};

pub use args::{Args, Instance};
pub use config::{InjectOptions, InjectableConfig, InstanceCallback, Transformer};
pub use decorators::{Inject, Injected, InjectionBinding, validate_injections};
pub use error::{BoxError, InjectablesError, Result};
pub use injectables_derive::{Injectable, Injected};
pub use key::{Identity, Symbol, TypeHandle};
pub use registry::{
    Constructor, InjectableRegistry, InjectablesRegistry, Registrant, RegistryBuilder,
};

/// A type that can be registered with, and resolved from, the registry. Deriving it registers the
/// type with the default registry; implementing it by hand requires calling
/// [`decorators::injectable`] before the type can be resolved.
pub trait Injectable: Any + Send + Sync + Sized {
    /// The key to register under instead of the type's own name. Another type can be named, in
    /// which case both share that type's key.
    fn category() -> Option<Identity> {
        None
    }

    fn config() -> InjectableConfig {
        InjectableConfig::default()
    }

    fn construct(args: &Args) -> std::result::Result<Self, BoxError>;

    /// The canonical key of this type.
    fn key() -> Symbol {
        decorators::canonical_key::<Self>()
    }

    /// Fetches this type from the active registry.
    fn resolve(args: &Args) -> Result<Arc<Self>> {
        let key = Self::key();
        facade::get(key, args)?
            .ok_or_else(|| InjectablesError::Unregistered { key: key.to_string() })?
            .downcast::<Self>()
            .map_err(|_| InjectablesError::TypeMismatch {
                key: key.to_string(),
                expected: type_name::<Self>(),
            })
    }
}
