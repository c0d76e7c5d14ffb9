use std::{
    any::Any,
    fmt,
    sync::{Arc, Mutex},
};

use crate::{Args, BoxError, InjectableConfig, Injectable, Instance, key::TypeHandle};

type ConstructFn = dyn Fn(&Args) -> Result<Instance, BoxError> + Send + Sync;

/// A type-erased constructor, the thing a registry stores and calls to build instances.
#[derive(Clone)]
pub struct Constructor {
    name: Option<Arc<str>>,
    construct: Arc<ConstructFn>,
}

impl Constructor {
    /// The constructor of an injectable type, named after the type.
    pub fn of<T: Injectable>() -> Self {
        Constructor::new(T::construct)
    }

    /// A constructor producing `T`, named after `T`.
    pub fn new<T, F>(construct: impl Fn(&Args) -> Result<T, F> + Send + Sync + 'static) -> Self
    where
        T: Any + Send + Sync,
        F: Into<BoxError>,
    {
        Constructor {
            name: Some(Arc::from(TypeHandle::of::<T>().name())),
            construct: Arc::new(move |args: &Args| {
                construct(args)
                    .map(|value| Arc::new(value) as Instance)
                    .map_err(Into::into)
            }),
        }
    }

    /// A constructor with no name. Registering one requires an explicit key.
    pub fn anonymous(
        construct: impl Fn(&Args) -> Result<Instance, BoxError> + Send + Sync + 'static,
    ) -> Self {
        Constructor {
            name: None,
            construct: Arc::new(construct),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(Arc::from(name));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn construct(&self, args: &Args) -> Result<Instance, BoxError> {
        (self.construct)(args)
    }

    pub(crate) fn same_as(&self, other: &Constructor) -> bool {
        Arc::ptr_eq(&self.construct, &other.construct)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor").field("name", &self.name).finish()
    }
}

/// What can be handed to [`crate::InjectablesRegistry::register`]: either a way of building
/// instances, or a ready-made instance.
#[derive(Clone, Debug)]
pub enum Registrant {
    Constructor(Constructor),
    Instance {
        name: Option<Arc<str>>,
        value: Instance,
    },
}

impl Registrant {
    /// A ready-made value, named after its type.
    pub fn instance<T: Any + Send + Sync>(value: T) -> Self {
        Registrant::Instance {
            name: Some(Arc::from(TypeHandle::of::<T>().name())),
            value: Arc::new(value),
        }
    }

    /// An already shared value. It has no name, so it needs an explicit key.
    pub fn shared(value: Instance) -> Self {
        Registrant::Instance { name: None, value }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Registrant::Constructor(constructor) => constructor.name(),
            Registrant::Instance { name, .. } => name.as_deref(),
        }
    }
}

impl From<Constructor> for Registrant {
    fn from(constructor: Constructor) -> Self {
        Registrant::Constructor(constructor)
    }
}

/// A single entry in a registry.
#[derive(Clone, Debug)]
pub(crate) struct Record {
    pub constructor: Option<Constructor>,
    pub instance: Option<Instance>,
    pub config: InjectableConfig,
    /// Held while a singleton is being built from this record, so racing lookups wait for the
    /// first build instead of starting their own.
    pub building: Arc<Mutex<()>>,
}

impl Record {
    pub fn new(registrant: Registrant, config: InjectableConfig) -> Self {
        match registrant {
            Registrant::Constructor(constructor) => Record {
                constructor: Some(constructor),
                instance: None,
                config,
                building: Arc::default(),
            },
            // a pinned value can only ever be handed out as-is
            Registrant::Instance { value, .. } => Record {
                constructor: None,
                instance: Some(value),
                config: InjectableConfig {
                    singleton: true,
                    ..config
                },
                building: Arc::default(),
            },
        }
    }
}
