use std::{
    any::{Any, type_name},
    fmt,
    sync::{Arc, OnceLock},
};

use tracing::{error, trace};

use crate::{
    Args, Identity, InjectOptions, InjectablesError, Instance, Result, Symbol, Transformer, facade,
    key::TypeHandle,
    metadata::{self, InjectMetadata},
};

/// Implemented by types with injected properties, normally through `#[derive(Injected)]`.
pub trait Injected: Any {
    /// The injection points declared on this type.
    fn injections() -> Vec<InjectMetadata>
    where
        Self: Sized,
    {
        metadata::injected::<Self>()
    }
}

/// The static half of an injected property: which key it resolves, with which arguments, and how
/// the result is transformed. Declared once per property and shared by every instance.
pub struct InjectionBinding {
    owner: TypeHandle,
    property: &'static str,
    injectable: Identity,
    key: Symbol,
    args: Args,
    transformer: Option<Transformer>,
}

impl InjectionBinding {
    /// Declares that `property` of `O` is filled from the registry.
    ///
    /// There is no way to discover the property's type at runtime, so `options.category` is
    /// required; `#[derive(Injected)]` fills it in from the declared field type.
    pub fn declare<O: Any>(property: &'static str, options: InjectOptions) -> Result<Self> {
        let owner = TypeHandle::of::<O>();
        let unresolvable = || InjectablesError::Resolution {
            owner: owner.name().to_string(),
            property: property.to_string(),
        };
        let injectable = options.category.ok_or_else(unresolvable)?;
        let key = injectable.resolve().ok_or_else(unresolvable)?;

        metadata::define_injection(InjectMetadata {
            owner,
            property,
            injectable: injectable.clone(),
        });

        Ok(InjectionBinding {
            owner,
            property,
            injectable,
            key,
            args: options.args,
            transformer: options.transformer,
        })
    }

    pub fn key(&self) -> Symbol {
        self.key
    }

    pub fn property(&self) -> &'static str {
        self.property
    }

    pub fn injectable(&self) -> &Identity {
        &self.injectable
    }

    /// Resolves the dependency for `owner`. A missing dependency is an error; a failing
    /// transformer is logged and the untransformed dependency is returned instead.
    pub fn resolve(&self, owner: &dyn Any) -> Result<Instance> {
        let value = facade::get(self.key, &self.args)?.ok_or_else(|| InjectablesError::Injection {
            key: self.key.to_string(),
            owner: self.owner.name().to_string(),
            property: self.property.to_string(),
        })?;

        let Some(transformer) = &self.transformer else {
            return Ok(value);
        };
        match transformer.apply(value.clone(), owner) {
            Ok(transformed) => Ok(transformed),
            Err(err) => {
                error!(
                    key = %self.key,
                    owner = self.owner.name(),
                    property = self.property,
                    %err,
                    "transformer failed, injecting the untransformed value"
                );
                Ok(value)
            }
        }
    }
}

impl fmt::Debug for InjectionBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionBinding")
            .field("owner", &self.owner)
            .field("property", &self.property)
            .field("key", &self.key)
            .field("args", &self.args)
            .field("transformer", &self.transformer.is_some())
            .finish()
    }
}

/// An injected property. It starts out unresolved and is resolved the first time it is read
/// through its binding; after that every read returns the same value. Each instance of the owning
/// type carries its own slot, so instances resolve independently, and a slot goes away with its
/// instance.
pub struct Inject<T> {
    slot: OnceLock<Arc<T>>,
}

impl<T: Any + Send + Sync> Inject<T> {
    pub const fn new() -> Self {
        Inject {
            slot: OnceLock::new(),
        }
    }

    /// The resolved value, without resolving it.
    pub fn peek(&self) -> Option<Arc<T>> {
        self.slot.get().cloned()
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Returns the memoised value, resolving it through `binding` on the first read. A failed
    /// read leaves the property unresolved, so the next read tries again.
    pub fn get_or_resolve<O: Any>(&self, binding: &InjectionBinding, owner: &O) -> Result<Arc<T>> {
        if let Some(value) = self.slot.get() {
            trace!(key = %binding.key, property = binding.property, "injected value memoised");
            return Ok(value.clone());
        }

        let value = binding
            .resolve(owner)?
            .downcast::<T>()
            .map_err(|_| InjectablesError::TypeMismatch {
                key: binding.key.to_string(),
                expected: type_name::<T>(),
            })?;
        // if the owner was read re-entrantly while resolving, the first value stored wins
        Ok(self.slot.get_or_init(|| value).clone())
    }
}

impl<T: Any + Send + Sync> Default for Inject<T> {
    fn default() -> Self {
        Inject::new()
    }
}

// A clone is a different instance, so it resolves its own value.
impl<T: Any + Send + Sync> Clone for Inject<T> {
    fn clone(&self) -> Self {
        Inject::new()
    }
}

impl<T> fmt::Debug for Inject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.slot.get().is_some() {
            "resolved"
        } else {
            "unresolved"
        };
        f.debug_tuple("Inject").field(&format_args!("{state}")).finish()
    }
}

/// Checks every declared injection point: its key has to resolve, and the active registry has to
/// hold something under it. Meant to be called once at startup, after registration.
pub fn validate_injections() -> Result<()> {
    for injection in metadata::all_injections() {
        let Some(key) = injection.injectable.resolve() else {
            return Err(InjectablesError::Resolution {
                owner: injection.owner.name().to_string(),
                property: injection.property.to_string(),
            });
        };
        if !facade::has(key) {
            return Err(InjectablesError::Injection {
                key: key.to_string(),
                owner: injection.owner.name().to_string(),
                property: injection.property.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{
        LazyLock,
        atomic::{AtomicUsize, Ordering},
    };

    use serial_test::serial;
    use tracing_test::traced_test;

    use super::*;
    use crate::{BoxError, Constructor, InjectableConfig, args};

    static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

    struct Repository {
        id: usize,
    }

    #[derive(Default)]
    struct Controller {
        repository: Inject<Repository>,
    }

    impl Injected for Controller {}

    impl Controller {
        fn repository(&self) -> Result<Arc<Repository>> {
            static BINDING: LazyLock<InjectionBinding> = LazyLock::new(|| {
                InjectionBinding::declare::<Controller>(
                    "repository",
                    InjectOptions::new().category("inject::Repository"),
                )
                .unwrap()
            });
            self.repository.get_or_resolve(&BINDING, self)
        }
    }

    fn register_repository(config: InjectableConfig) {
        facade::register(
            Constructor::new(|_: &Args| {
                let id = CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BoxError>(Repository { id })
            }),
            Some("inject::Repository".into()),
            config,
            true,
        )
        .unwrap();
    }

    #[test]
    #[serial]
    fn each_instance_resolves_once() {
        facade::reset();
        register_repository(InjectableConfig::on_demand());
        let before = CONSTRUCTED.load(Ordering::SeqCst);

        let first = Controller::default();
        let second = Controller::default();
        assert!(!first.repository.is_resolved());

        let a = first.repository().unwrap();
        let again = first.repository().unwrap();
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), before + 1);

        let b = second.repository().unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), before + 2);
    }

    #[test]
    #[serial]
    fn memoised_reads_skip_the_registry_and_transformer() {
        static TRANSFORMED: AtomicUsize = AtomicUsize::new(0);

        facade::reset();
        register_repository(InjectableConfig::on_demand());

        struct Owner;
        let counting = Transformer::new(|value: Instance, _: &dyn Any| {
            TRANSFORMED.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BoxError>(value)
        });
        let binding = InjectionBinding::declare::<Owner>(
            "counted",
            InjectOptions::new()
                .category("inject::Repository")
                .transformer(counting),
        )
        .unwrap();

        let first: Inject<Repository> = Inject::new();
        let value = first.get_or_resolve(&binding, &Owner).unwrap();
        assert_eq!(TRANSFORMED.load(Ordering::SeqCst), 1);

        // the memo answers even once the registry has forgotten the dependency
        facade::reset();
        let again = first.get_or_resolve(&binding, &Owner).unwrap();
        assert!(Arc::ptr_eq(&value, &again));
        assert_eq!(TRANSFORMED.load(Ordering::SeqCst), 1);

        register_repository(InjectableConfig::on_demand());
        let second: Inject<Repository> = Inject::new();
        let other = second.get_or_resolve(&binding, &Owner).unwrap();
        assert!(!Arc::ptr_eq(&value, &other));
        assert_eq!(TRANSFORMED.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[serial]
    fn missing_dependencies_fail_on_every_read() {
        facade::reset();
        let controller = Controller::default();
        assert!(matches!(controller.repository(), Err(InjectablesError::Injection { .. })));
        assert!(matches!(controller.repository(), Err(InjectablesError::Injection { .. })));
        assert!(!controller.repository.is_resolved());
        assert!(facade::get("inject::Repository", &args![]).unwrap().is_none());

        // registering later lets the next read succeed
        register_repository(InjectableConfig::singleton());
        assert!(controller.repository().is_ok());
    }

    #[test]
    #[serial]
    fn clones_resolve_independently() {
        facade::reset();
        register_repository(InjectableConfig::on_demand());
        let original = Controller::default();
        original.repository().unwrap();

        let copy = original.repository.clone();
        assert!(original.repository.is_resolved());
        assert!(!copy.is_resolved());
        assert!(copy.peek().is_none());
    }

    #[test]
    fn declarations_need_a_category() {
        struct Owner;
        assert!(matches!(
            InjectionBinding::declare::<Owner>("service", InjectOptions::new()),
            Err(InjectablesError::Resolution { .. })
        ));
        assert!(matches!(
            InjectionBinding::declare::<Owner>("service", InjectOptions::new().category("")),
            Err(InjectablesError::Resolution { .. })
        ));
    }

    #[test]
    #[serial]
    #[traced_test]
    fn failing_transformers_fall_back_to_the_raw_value() {
        facade::reset();
        facade::register(
            Constructor::new(|_: &Args| Ok::<_, BoxError>(7u32)),
            Some("inject::Seven".into()),
            InjectableConfig::singleton(),
            false,
        )
        .unwrap();

        struct Owner;
        let binding = InjectionBinding::declare::<Owner>(
            "seven",
            InjectOptions::new()
                .category("inject::Seven")
                .transformer(Transformer::new(|_, _| Err::<Instance, _>("refusing to transform"))),
        )
        .unwrap();

        let slot: Inject<u32> = Inject::new();
        assert_eq!(*slot.get_or_resolve(&binding, &Owner).unwrap(), 7);
        assert!(logs_contain("transformer failed"));
    }

    #[test]
    #[serial]
    fn transformers_see_the_owner() {
        facade::reset();
        facade::register(
            Constructor::new(|_: &Args| Ok::<_, BoxError>(String::from("base"))),
            Some("inject::Base".into()),
            InjectableConfig::singleton(),
            false,
        )
        .unwrap();

        struct Owner {
            suffix: &'static str,
        }
        let binding = InjectionBinding::declare::<Owner>(
            "decorated",
            InjectOptions::new()
                .category("inject::Base")
                .transformer(Transformer::new(|value: Instance, owner: &dyn Any| {
                    let base = value.downcast_ref::<String>().ok_or("not a string")?;
                    let owner = owner.downcast_ref::<Owner>().ok_or("unknown owner")?;
                    Ok::<Instance, BoxError>(Arc::new(format!("{base}-{}", owner.suffix)))
                })),
        )
        .unwrap();

        let first: Inject<String> = Inject::new();
        let second: Inject<String> = Inject::new();
        assert_eq!(*first.get_or_resolve(&binding, &Owner { suffix: "a" }).unwrap(), "base-a");
        assert_eq!(*second.get_or_resolve(&binding, &Owner { suffix: "b" }).unwrap(), "base-b");

        let raw = facade::get_as::<String>("inject::Base", &args![]).unwrap().unwrap();
        assert_eq!(raw.as_str(), "base");
    }

    #[test]
    #[serial]
    fn validation_reports_missing_registrations() {
        facade::reset();
        facade::register_declared();
        struct Unfilled;
        InjectionBinding::declare::<Unfilled>(
            "missing",
            InjectOptions::new().category("inject::NeverRegistered"),
        )
        .unwrap();
        assert!(matches!(validate_injections(), Err(InjectablesError::Injection { .. })));
    }
}
