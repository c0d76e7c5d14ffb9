//! The registry maps canonical keys onto registration records and enforces their lifecycle.
//!
//! Lookups are a single map access; there is no dependency graph to walk. The registry never
//! holds its lock while a constructor or callback runs, so a constructor is free to resolve other
//! injectables (through the facade) while it is being built. Concurrent first lookups of a
//! singleton wait on a per-record guard, so the constructor runs once; a constructor must not
//! look up its own key.

pub(crate) mod builder;
mod record;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use regex::Regex;
use tracing::{debug, trace};

pub use builder::RegistryBuilder;
pub use record::{Constructor, Registrant};
use record::Record;

use crate::{
    Args, InjectableConfig, InjectablesError, Instance, InstanceCallback, Result, Symbol,
};

/// A store of injectables. The [`crate::facade`] delegates to one of these, and it can be
/// swapped out wholesale with [`crate::facade::set_registry`].
pub trait InjectablesRegistry: Send + Sync {
    /// Fetch the injectable registered under `key`. Returns `Ok(None)` when nothing is registered;
    /// only a failing constructor produces an error.
    fn get(&self, key: Symbol, args: &Args) -> Result<Option<Instance>>;

    /// Add an injectable. When `key` is `None` it is derived from the registrant's name. An
    /// existing registration under the same key is kept unless `force` is set.
    fn register(
        &self,
        registrant: Registrant,
        key: Option<Symbol>,
        config: InjectableConfig,
        force: bool,
    ) -> Result<()>;

    /// Build a new instance of the injectable registered under `key`.
    fn build(&self, key: Symbol, args: &Args) -> Result<Instance>;

    fn has(&self, key: Symbol) -> bool;

    fn keys(&self) -> Vec<Symbol>;

    /// Drop every registration whose key description matches `pattern`, returning how many were
    /// removed.
    fn remove_matching(&self, pattern: &Regex) -> usize;
}

/// The default [`InjectablesRegistry`].
#[derive(Default)]
pub struct InjectableRegistry {
    cache: Mutex<HashMap<Symbol, Record>>,
}

impl InjectableRegistry {
    pub fn new() -> Self {
        InjectableRegistry::default()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new(InjectableRegistry::new())
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<Symbol, Record>> {
        // a panic while holding the lock cannot leave a record half written
        self.cache.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lookup(&self, key: Symbol) -> Lookup {
        let cache = self.cache();
        let Some(record) = cache.get(&key) else {
            return Lookup::Missing;
        };
        match (&record.instance, record.config.singleton) {
            (Some(instance), true) => {
                Lookup::Cached(instance.clone(), record.config.callback.clone())
            }
            (None, true) => Lookup::Unbuilt(record.building.clone()),
            (_, false) => Lookup::OnDemand,
        }
    }
}

enum Lookup {
    Missing,
    Cached(Instance, Option<InstanceCallback>),
    Unbuilt(Arc<Mutex<()>>),
    OnDemand,
}

fn with_callback(
    instance: Instance,
    callback: Option<&InstanceCallback>,
    args: &Args,
) -> Instance {
    match callback {
        Some(callback) => callback.call(instance, args),
        None => instance,
    }
}

impl InjectablesRegistry for InjectableRegistry {
    fn get(&self, key: Symbol, args: &Args) -> Result<Option<Instance>> {
        let building = match self.lookup(key) {
            Lookup::Missing => {
                trace!(%key, "no injectable registered");
                return Ok(None);
            }
            Lookup::Cached(instance, callback) => {
                trace!(%key, "returning cached singleton");
                return Ok(Some(with_callback(instance, callback.as_ref(), args)));
            }
            Lookup::OnDemand => return self.build(key, args).map(Some),
            Lookup::Unbuilt(building) => building,
        };

        let _building = building.lock().unwrap_or_else(|p| p.into_inner());
        // whoever held the guard before may have built and cached the singleton already
        match self.lookup(key) {
            Lookup::Missing => Ok(None),
            Lookup::Cached(instance, callback) => {
                trace!(%key, "singleton was built by a concurrent lookup");
                Ok(Some(with_callback(instance, callback.as_ref(), args)))
            }
            Lookup::OnDemand | Lookup::Unbuilt(_) => self.build(key, args).map(Some),
        }
    }

    fn register(
        &self,
        registrant: Registrant,
        key: Option<Symbol>,
        config: InjectableConfig,
        force: bool,
    ) -> Result<()> {
        let key = match key {
            Some(key) => key,
            None => match registrant.name() {
                Some(name) if !name.is_empty() => Symbol::intern(name),
                _ => {
                    return Err(InjectablesError::Registration {
                        reason: "missing class name or constructor".to_string(),
                    });
                }
            },
        };

        let mut cache = self.cache();
        if cache.contains_key(&key) && !force {
            debug!(%key, "already registered, keeping the existing registration");
            return Ok(());
        }

        debug!(%key, singleton = config.singleton, force, "registering injectable");
        cache.insert(key, Record::new(registrant, config));
        Ok(())
    }

    fn build(&self, key: Symbol, args: &Args) -> Result<Instance> {
        let (constructor, config) = {
            let cache = self.cache();
            let record = cache.get(&key).ok_or_else(|| InjectablesError::Unregistered {
                key: key.to_string(),
            })?;
            (record.constructor.clone(), record.config.clone())
        };

        let Some(constructor) = constructor else {
            return Err(InjectablesError::Build {
                key: key.to_string(),
                source: "registered as an instance, it has no constructor".into(),
            });
        };

        debug!(%key, args = args.len(), "building injectable");
        let instance = constructor
            .construct(args)
            .map_err(|source| InjectablesError::Build {
                key: key.to_string(),
                source,
            })?;

        if config.singleton {
            let mut cache = self.cache();
            // the record may have been replaced while the constructor ran
            if let Some(record) = cache.get_mut(&key) {
                if record.constructor.as_ref().is_some_and(|c| c.same_as(&constructor)) {
                    record.instance = Some(instance.clone());
                }
            }
        }

        Ok(with_callback(instance, config.callback.as_ref(), args))
    }

    fn has(&self, key: Symbol) -> bool {
        self.cache().contains_key(&key)
    }

    fn keys(&self) -> Vec<Symbol> {
        self.cache().keys().copied().collect()
    }

    fn remove_matching(&self, pattern: &Regex) -> usize {
        let mut cache = self.cache();
        let before = cache.len();
        cache.retain(|key, _| !pattern.is_match(&key.description()));
        before - cache.len()
    }
}
