//! APIs that the derive macros need to make things work, but that we would really rather users of
//! the crate not know about. They are public so the generated code can reach them, but they
//! should not be treated as visible **or stable**.

pub use linkme;
use linkme::distributed_slice;

use crate::{
    Identity, Injectable, InjectableConfig, Injected, InjectablesError, InjectionBinding, Result,
    key::TypeHandle,
    registry::Constructor,
};

/// Everything `#[derive(Injectable)]` declares about a type.
pub struct InjectableDecl {
    pub this: TypeHandle,
    pub category: Option<Identity>,
    pub config: InjectableConfig,
    pub constructor: Constructor,
}

impl InjectableDecl {
    pub fn of<T: Injectable>() -> Self {
        InjectableDecl {
            this: TypeHandle::of::<T>(),
            category: T::category(),
            config: T::config(),
            constructor: Constructor::of::<T>(),
        }
    }
}

/// Everything `#[derive(Injected)]` declares about one injected property.
pub struct InjectionDecl {
    pub owner: TypeHandle,
    pub property: &'static str,
    pub injectable: Identity,
}

impl InjectionDecl {
    pub fn of<O: Injected>(property: &'static str, injectable: Identity) -> Self {
        InjectionDecl {
            owner: TypeHandle::of::<O>(),
            property,
            injectable,
        }
    }
}

/// Declarations of every injectable type, aggregated into one spot by the linker. For more info,
/// see the [`linkme`] crate.
#[distributed_slice]
pub static INJECTABLE_REGISTRY: [fn() -> InjectableDecl];

/// Declarations of every injected property, aggregated into one spot by the linker.
#[distributed_slice]
pub static INJECTION_REGISTRY: [fn() -> InjectionDecl];

/// The binding an injected property accessor declared, or the error declaring it produced.
pub fn declared<'a, O: Injected>(
    binding: &'a Result<InjectionBinding>,
    property: &'static str,
) -> Result<&'a InjectionBinding> {
    binding.as_ref().map_err(|_| InjectablesError::Resolution {
        owner: TypeHandle::of::<O>().name().to_string(),
        property: property.to_string(),
    })
}
