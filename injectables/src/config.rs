//! Options accepted by the class and property decorators.

use std::{any::Any, fmt, sync::Arc};

use crate::{Args, BoxError, Identity, Instance};

/// Runs after an instance is built (and, for singletons, after it has been cached). Whatever it
/// returns is handed to the caller in place of the built instance.
#[derive(Clone)]
pub struct InstanceCallback(Arc<dyn Fn(Instance, &Args) -> Instance + Send + Sync>);

impl InstanceCallback {
    pub fn new(callback: impl Fn(Instance, &Args) -> Instance + Send + Sync + 'static) -> Self {
        InstanceCallback(Arc::new(callback))
    }

    /// A callback over a concrete type. Instances of any other type pass through untouched.
    pub fn typed<T: Any + Send + Sync>(
        callback: impl Fn(Arc<T>, &Args) -> Arc<T> + Send + Sync + 'static,
    ) -> Self {
        InstanceCallback::new(move |instance, args| match instance.downcast::<T>() {
            Ok(typed) => callback(typed, args) as Instance,
            Err(untyped) => untyped,
        })
    }

    pub fn call(&self, instance: Instance, args: &Args) -> Instance {
        (self.0)(instance, args)
    }
}

impl fmt::Debug for InstanceCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InstanceCallback")
    }
}

/// Lifecycle configuration of an injectable. Defaults to a singleton without a callback.
#[derive(Clone, Debug)]
pub struct InjectableConfig {
    pub singleton: bool,
    pub callback: Option<InstanceCallback>,
}

impl Default for InjectableConfig {
    fn default() -> Self {
        InjectableConfig {
            singleton: true,
            callback: None,
        }
    }
}

impl InjectableConfig {
    pub fn singleton() -> Self {
        InjectableConfig::default()
    }

    pub fn on_demand() -> Self {
        InjectableConfig {
            singleton: false,
            callback: None,
        }
    }

    pub fn with_callback(mut self, callback: InstanceCallback) -> Self {
        self.callback = Some(callback);
        self
    }
}

/// Transforms a resolved dependency before it is stored on the instance it is injected into.
/// The second argument is that owning instance.
#[derive(Clone)]
pub struct Transformer(Arc<dyn Fn(Instance, &dyn Any) -> Result<Instance, BoxError> + Send + Sync>);

impl Transformer {
    pub fn new<E>(
        transform: impl Fn(Instance, &dyn Any) -> Result<Instance, E> + Send + Sync + 'static,
    ) -> Self
    where
        E: Into<BoxError>,
    {
        Transformer(Arc::new(move |instance: Instance, owner: &dyn Any| {
            transform(instance, owner).map_err(Into::into)
        }))
    }

    pub fn apply(&self, instance: Instance, owner: &dyn Any) -> Result<Instance, BoxError> {
        (self.0)(instance, owner)
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transformer")
    }
}

/// Options for a single injection point.
#[derive(Clone, Debug, Default)]
pub struct InjectOptions {
    /// The key to look up. Without one the declaration has to supply the type to inject.
    pub category: Option<Identity>,
    /// Arguments forwarded to the constructor when the dependency is built on demand.
    pub args: Args,
    pub transformer: Option<Transformer>,
}

impl InjectOptions {
    pub fn new() -> Self {
        InjectOptions::default()
    }

    pub fn category(mut self, category: impl Into<Identity>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn args(mut self, args: Args) -> Self {
        self.args = args;
        self
    }

    pub fn transformer(mut self, transformer: Transformer) -> Self {
        self.transformer = Some(transformer);
        self
    }
}
