//! Process-wide access to the active registry.
//!
//! The decorators have no reference to a registry when they run, so they all go through here.
//! The active registry is created on first use and starts out holding every type that derives
//! [`crate::Injectable`]. It can be replaced wholesale ([`set_registry`]), emptied ([`reset`]) or
//! pruned ([`selective_reset`]).
//!
//! ```
//! use injectables::{Args, BoxError, Constructor, InjectableConfig, args, facade};
//!
//! facade::register(
//!     Constructor::new(|_: &Args| Ok::<_, BoxError>(String::from("db://"))),
//!     Some("facade-doc::Connection".into()),
//!     InjectableConfig::singleton(),
//!     false,
//! )?;
//! let url = facade::get_as::<String>("facade-doc::Connection", &args![])?.unwrap();
//! assert_eq!(url.as_str(), "db://");
//! # Ok::<_, injectables::InjectablesError>(())
//! ```

use std::{
    any::{Any, type_name},
    sync::{Arc, LazyLock, RwLock},
};

use regex::Regex;
use tracing::debug;

use crate::{
    Args, Identity, InjectableConfig, InjectableRegistry, InjectablesError, InjectablesRegistry,
    Instance, Registrant, Result, registry::builder,
};

static ACTIVE: LazyLock<RwLock<Option<Arc<dyn InjectablesRegistry>>>> =
    LazyLock::new(|| RwLock::new(None));

/// The registry every facade call currently delegates to.
pub fn active() -> Arc<dyn InjectablesRegistry> {
    if let Some(registry) = ACTIVE.read().unwrap_or_else(|p| p.into_inner()).as_ref() {
        return registry.clone();
    }

    let mut active = ACTIVE.write().unwrap_or_else(|p| p.into_inner());
    active
        .get_or_insert_with(|| {
            debug!("creating the default registry");
            Arc::new(InjectableRegistry::builder().with_declared().build())
        })
        .clone()
}

/// Fetches the injectable known under `key`. Nothing registered is `Ok(None)`, not an error.
pub fn get(key: impl Into<Identity>, args: &Args) -> Result<Option<Instance>> {
    let Some(key) = key.into().resolve() else {
        return Ok(None);
    };
    active().get(key, args)
}

/// Like [`get`], downcasting the result to `T`.
pub fn get_as<T: Any + Send + Sync>(
    key: impl Into<Identity>,
    args: &Args,
) -> Result<Option<Arc<T>>> {
    let key = key.into();
    let Some(instance) = get(key.clone(), args)? else {
        return Ok(None);
    };
    instance
        .downcast::<T>()
        .map(Some)
        .map_err(|_| InjectablesError::TypeMismatch {
            key: key.to_string(),
            expected: type_name::<T>(),
        })
}

pub fn register(
    registrant: impl Into<Registrant>,
    key: Option<Identity>,
    config: InjectableConfig,
    force: bool,
) -> Result<()> {
    let key = match key {
        Some(identity) => Some(identity.resolve().ok_or_else(|| InjectablesError::Registration {
            reason: format!("{identity:?} cannot be used as a key"),
        })?),
        None => None,
    };
    active().register(registrant.into(), key, config, force)
}

pub fn build(key: impl Into<Identity>, args: &Args) -> Result<Instance> {
    let key = key.into();
    let symbol = key
        .resolve()
        .ok_or_else(|| InjectablesError::Unregistered { key: key.to_string() })?;
    active().build(symbol, args)
}

pub fn has(key: impl Into<Identity>) -> bool {
    key.into().resolve().is_some_and(|key| active().has(key))
}

/// Replaces the active registry. Nothing is carried over from the previous one.
pub fn set_registry(registry: Arc<dyn InjectablesRegistry>) {
    debug!("replacing the active registry");
    *ACTIVE.write().unwrap_or_else(|p| p.into_inner()) = Some(registry);
}

/// Replaces the active registry with an empty one.
pub fn reset() {
    debug!("resetting the active registry");
    set_registry(Arc::new(InjectableRegistry::new()));
}

/// What [`selective_reset`] matches keys against. Text is compiled as a regular expression.
#[derive(Clone, Debug)]
pub enum KeyPattern {
    Text(String),
    Regex(Regex),
}

impl KeyPattern {
    fn compile(self) -> Result<Regex> {
        match self {
            KeyPattern::Text(text) => Ok(Regex::new(&text)?),
            KeyPattern::Regex(regex) => Ok(regex),
        }
    }
}

impl From<&str> for KeyPattern {
    fn from(text: &str) -> Self {
        KeyPattern::Text(text.to_string())
    }
}

impl From<String> for KeyPattern {
    fn from(text: String) -> Self {
        KeyPattern::Text(text)
    }
}

impl From<Regex> for KeyPattern {
    fn from(regex: Regex) -> Self {
        KeyPattern::Regex(regex)
    }
}

/// Removes every registration whose key matches `pattern` from the active registry, leaving the
/// rest (and the registry itself) in place. Returns how many registrations were removed.
pub fn selective_reset(pattern: impl Into<KeyPattern>) -> Result<usize> {
    let pattern = pattern.into().compile()?;
    let removed = active().remove_matching(&pattern);
    debug!(%pattern, removed, "selectively reset the active registry");
    Ok(removed)
}

/// Registers every derive-declared injectable with the active registry again, for instance after
/// a [`reset`]. Existing registrations are kept. Returns the number of declarations.
pub fn register_declared() -> usize {
    builder::register_declared(active().as_ref())
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::{BoxError, Constructor, Symbol, args};

    fn register_text(name: &str) {
        let value = name.to_string();
        register(
            Constructor::new(move |_: &Args| Ok::<_, BoxError>(value.clone())),
            Some(name.into()),
            InjectableConfig::singleton(),
            false,
        )
        .unwrap();
    }

    #[test]
    #[serial]
    fn reset_forgets_everything() {
        reset();
        register_text("facade::Reset");
        assert!(has("facade::Reset"));

        reset();
        assert!(!has("facade::Reset"));
        assert!(get("facade::Reset", &args![]).unwrap().is_none());
    }

    #[test]
    #[serial]
    fn selective_reset_keeps_the_registry() {
        reset();
        register_text("FooAlpha");
        register_text("FooBeta");
        register_text("Bar");
        let before = active();

        assert_eq!(selective_reset(Regex::new("^Foo").unwrap()).unwrap(), 2);
        assert!(!has("FooAlpha"));
        assert!(!has("FooBeta"));
        assert!(has("Bar"));
        assert!(Arc::ptr_eq(&before, &active()));

        register_text("Bar");
        assert_eq!(selective_reset("^Foo").unwrap(), 0);
        assert_eq!(get_as::<String>("Bar", &args![]).unwrap().unwrap().as_str(), "Bar");
    }

    #[test]
    #[serial]
    fn invalid_patterns_are_reported() {
        assert!(matches!(selective_reset("(unclosed"), Err(InjectablesError::Pattern(_))));
    }

    #[test]
    #[serial]
    fn set_registry_replaces_without_merging() {
        reset();
        register_text("facade::Replaced");

        let replacement = Arc::new(InjectableRegistry::new());
        set_registry(replacement.clone());
        assert!(!has("facade::Replaced"));

        register_text("facade::Fresh");
        assert!(replacement.has(Symbol::intern("facade::Fresh")));
    }

    #[test]
    #[serial]
    fn typed_lookups_check_the_type() {
        reset();
        register_text("facade::Typed");
        assert!(matches!(
            get_as::<u32>("facade::Typed", &args![]),
            Err(InjectablesError::TypeMismatch { .. })
        ));
        assert!(get_as::<u32>("facade::Untyped", &args![]).unwrap().is_none());
    }

    #[test]
    #[serial]
    fn empty_keys_cannot_register() {
        assert!(matches!(
            register(
                Constructor::new(|_: &Args| Ok::<_, BoxError>(())),
                Some("".into()),
                InjectableConfig::default(),
                false,
            ),
            Err(InjectablesError::Registration { .. })
        ));
    }
}
