use tracing::debug;

use crate::{
    Identity, Injectable, InjectableConfig, InjectablesError, Result, Symbol, facade,
    key::TypeHandle,
    metadata::{self, InjectableMetadata},
    registry::Constructor,
};

/// The key `T` is registered under: the one recorded in its metadata, or else the one its
/// declaration derives.
pub fn canonical_key<T: Injectable>() -> Symbol {
    let target = TypeHandle::of::<T>();
    if let Some(meta) = metadata::injectable_metadata(target.id()) {
        return meta.symbol;
    }
    describe(target, T::category().as_ref())
        .map(|meta| meta.symbol)
        .unwrap_or_else(|| Symbol::intern(target.name()))
}

fn describe(target: TypeHandle, category: Option<&Identity>) -> Option<InjectableMetadata> {
    metadata::derive_metadata(target, category, |other| {
        Identity::Type(other)
            .resolve()
            .unwrap_or_else(|| Symbol::intern(other.name()))
    })
}

/// Decorates `T` with the category and lifecycle it declares. See [`injectable_with`].
pub fn injectable<T: Injectable>() -> Result<Symbol> {
    injectable_with::<T>(T::category(), T::config())
}

/// Makes `T` injectable.
///
/// The key is derived from `category` (a name, a symbol, or another type), falling back on the
/// name of `T`. The key is recorded in the metadata of `T`, and `T`'s constructor is registered
/// with the active registry under it, so that [`Injectable::resolve`] has something to resolve
/// against. An existing registration under the same key is left alone.
pub fn injectable_with<T: Injectable>(
    category: Option<Identity>,
    config: InjectableConfig,
) -> Result<Symbol> {
    let target = TypeHandle::of::<T>();
    let meta = describe(target, category.as_ref()).ok_or_else(|| InjectablesError::Registration {
        reason: format!("{category:?} cannot be used as a key for {}", target.name()),
    })?;
    let symbol = meta.symbol;

    debug!(injectable = target.path(), class = %meta.class, "decorating injectable");
    metadata::define_injectable(meta);
    facade::register(Constructor::of::<T>(), Some(symbol.into()), config, false)?;
    Ok(symbol)
}

/// [`injectable_with`], pinned to the singleton lifecycle.
pub fn singleton<T: Injectable>(category: Option<Identity>) -> Result<Symbol> {
    let config = InjectableConfig {
        singleton: true,
        ..T::config()
    };
    injectable_with::<T>(category, config)
}

/// [`injectable_with`], pinned to the on-demand lifecycle.
pub fn on_demand<T: Injectable>(category: Option<Identity>) -> Result<Symbol> {
    let config = InjectableConfig {
        singleton: false,
        ..T::config()
    };
    injectable_with::<T>(category, config)
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use serial_test::serial;

    use super::*;
    use crate::{Args, BoxError, args};

    static BUILT: AtomicUsize = AtomicUsize::new(0);

    struct Mailer {
        sender: String,
    }

    impl Injectable for Mailer {
        fn category() -> Option<Identity> {
            Some("decorators::Mailer".into())
        }

        fn construct(args: &Args) -> std::result::Result<Self, BoxError> {
            BUILT.fetch_add(1, Ordering::SeqCst);
            let sender = args.get::<&str>(0).copied().unwrap_or("noreply");
            Ok(Mailer {
                sender: sender.to_string(),
            })
        }
    }

    struct Ledger;

    impl Injectable for Ledger {
        fn construct(_: &Args) -> std::result::Result<Self, BoxError> {
            Ok(Ledger)
        }
    }

    #[test]
    #[serial]
    fn decorated_types_resolve_through_the_facade() {
        facade::reset();
        let key = injectable::<Mailer>().unwrap();
        assert_eq!(key, Symbol::intern("decorators::Mailer"));
        assert_eq!(canonical_key::<Mailer>(), key);

        let meta = metadata::injectable(TypeHandle::of::<Mailer>()).unwrap();
        assert_eq!(meta.class, "decorators::Mailer");
        assert_eq!(meta.symbol, key);

        let before = BUILT.load(Ordering::SeqCst);
        let first = Mailer::resolve(&args!["ops@example.com"]).unwrap();
        let second = Mailer::resolve(&args!["ignored@example.com"]).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.sender, "ops@example.com");
        assert_eq!(BUILT.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    #[serial]
    fn on_demand_pins_the_lifecycle() {
        facade::reset();
        on_demand::<Ledger>(Some("decorators::Ledger".into())).unwrap();
        let first = Ledger::resolve(&args![]).unwrap();
        let second = Ledger::resolve(&args![]).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    #[serial]
    fn categories_can_be_other_types() {
        facade::reset();
        let ledger = singleton::<Ledger>(Some("decorators::Books".into())).unwrap();

        struct Audit;
        impl Injectable for Audit {
            fn construct(_: &Args) -> std::result::Result<Self, BoxError> {
                Ok(Audit)
            }
        }

        // the first registration under the shared key wins
        let category = Some(Identity::of::<Ledger>());
        let audit = injectable_with::<Audit>(category, InjectableConfig::default()).unwrap();
        assert_eq!(audit, ledger);
        assert!(matches!(Audit::resolve(&args![]), Err(InjectablesError::TypeMismatch { .. })));
        assert!(Ledger::resolve(&args![]).is_ok());
    }

    #[test]
    #[serial]
    fn resolving_without_registration_fails() {
        facade::reset();
        assert!(matches!(
            Mailer::resolve(&args![]),
            Err(InjectablesError::Unregistered { .. })
        ));
    }

    #[test]
    #[serial]
    fn empty_categories_are_rejected() {
        assert!(matches!(
            injectable_with::<Ledger>(Some("".into()), InjectableConfig::default()),
            Err(InjectablesError::Registration { .. })
        ));
    }
}
