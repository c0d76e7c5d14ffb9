use tracing::warn;

use super::{InjectableRegistry, InjectablesRegistry, Registrant};
use crate::{
    Identity, InjectableConfig, InjectablesError, Result,
    derive_api::{INJECTABLE_REGISTRY, InjectableDecl},
    metadata,
};

/// Assembles a registry before it is handed to the facade.
pub struct RegistryBuilder {
    registry: InjectableRegistry,
}

impl RegistryBuilder {
    pub fn new(registry: InjectableRegistry) -> Self {
        RegistryBuilder { registry }
    }

    /// Registers every type that derives [`crate::Injectable`], under the key its declaration
    /// derives. This is what the facade's default registry starts out with.
    pub fn with_declared(self) -> Self {
        register_declared(&self.registry);
        self
    }

    pub fn register(
        self,
        registrant: impl Into<Registrant>,
        key: Option<Identity>,
        config: InjectableConfig,
    ) -> Result<Self> {
        let key = key
            .map(|identity| {
                identity.resolve().ok_or_else(|| InjectablesError::Registration {
                    reason: format!("{identity:?} cannot be used as a key"),
                })
            })
            .transpose()?;
        self.registry.register(registrant.into(), key, config, false)?;
        Ok(self)
    }

    pub fn build(self) -> InjectableRegistry {
        self.registry
    }
}

/// Registers every derive-declared injectable with `registry`, returning how many declarations
/// were seen.
pub(crate) fn register_declared(registry: &dyn InjectablesRegistry) -> usize {
    let declarations = INJECTABLE_REGISTRY.iter().map(|declare| declare());
    let mut seen = 0;
    for InjectableDecl {
        this,
        config,
        constructor,
        ..
    } in declarations
    {
        seen += 1;
        let Some(meta) = metadata::injectable_metadata(this.id()) else {
            // the metadata store is loaded from the same slice, so this only happens if the
            // declaration changed underneath us
            warn!(injectable = this.path(), "declared injectable has no metadata");
            continue;
        };
        if let Err(err) = registry.register(
            Registrant::Constructor(constructor),
            Some(meta.symbol),
            config,
            false,
        ) {
            warn!(injectable = this.path(), %err, "failed to register declared injectable");
        }
    }
    seen
}
