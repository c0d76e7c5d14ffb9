//! Reflection metadata written by the decorators.
//!
//! Every injectable type carries an [`InjectableMetadata`] record under the
//! `inject.db.injectable` key, and every injected property an [`InjectMetadata`] record under
//! `inject.db.inject`. Declarations made through the derive macros are loaded the first time the
//! store is touched; the runtime decorators add to it as they run.

use std::{
    any::TypeId,
    collections::HashMap,
    sync::{LazyLock, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use multimap::MultiMap;
use tracing::warn;

use crate::{
    Identity, Symbol,
    derive_api::{INJECTABLE_REGISTRY, INJECTION_REGISTRY, InjectableDecl},
    key::TypeHandle,
};

/// Prefix shared by every metadata key this crate writes.
pub const REFLECT: &str = "inject.db.";
/// Suffix marking a type as injectable.
pub const INJECTABLE: &str = "injectable";
/// Suffix marking a property as an injection point.
pub const INJECT: &str = "inject";

/// The full metadata key for `suffix`, e.g. `inject.db.injectable`.
pub fn key(suffix: &str) -> String {
    format!("{REFLECT}{suffix}")
}

pub fn injectable_key() -> String {
    key(INJECTABLE)
}

pub fn inject_key() -> String {
    key(INJECT)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InjectableMetadata {
    /// The category the type was declared under, or its name.
    pub class: String,
    pub symbol: Symbol,
    pub target: TypeHandle,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InjectMetadata {
    pub owner: TypeHandle,
    pub property: &'static str,
    pub injectable: Identity,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetadataValue {
    Injectable(InjectableMetadata),
    Inject(InjectMetadata),
}

static STORE: LazyLock<RwLock<MetadataStore>> =
    LazyLock::new(|| RwLock::new(MetadataStore::declared()));

struct MetadataStore {
    injectables: HashMap<TypeId, InjectableMetadata>,
    injections: MultiMap<TypeId, InjectMetadata>,
}

impl MetadataStore {
    fn declared() -> Self {
        let declarations = INJECTABLE_REGISTRY
            .iter()
            .map(|declare| declare())
            .map(|decl| (decl.this.id(), decl))
            .collect::<HashMap<_, _>>();

        let mut injectables = HashMap::new();
        for decl in declarations.values() {
            resolve_declared(decl.this, &declarations, &mut injectables, &mut Vec::new());
        }

        let mut injections = MultiMap::new();
        for decl in INJECTION_REGISTRY.iter().map(|declare| declare()) {
            injections.insert(
                decl.owner.id(),
                InjectMetadata {
                    owner: decl.owner,
                    property: decl.property,
                    injectable: decl.injectable,
                },
            );
        }

        MetadataStore {
            injectables,
            injections,
        }
    }
}

// Declared categories can name other declared types, which have to be resolved from the
// declarations themselves because the store is still being built. `visiting` breaks cycles.
fn resolve_declared(
    target: TypeHandle,
    declarations: &HashMap<TypeId, InjectableDecl>,
    done: &mut HashMap<TypeId, InjectableMetadata>,
    visiting: &mut Vec<TypeId>,
) -> Symbol {
    if let Some(meta) = done.get(&target.id()) {
        return meta.symbol;
    }
    let fallback = Symbol::intern(target.name());
    let Some(decl) = declarations.get(&target.id()) else {
        return fallback;
    };
    if visiting.contains(&target.id()) {
        return fallback;
    }

    visiting.push(target.id());
    let meta = derive_metadata(target, decl.category.as_ref(), |other| {
        resolve_declared(other, declarations, done, visiting)
    });
    visiting.pop();

    match meta {
        Some(meta) => {
            let symbol = meta.symbol;
            done.insert(target.id(), meta);
            symbol
        }
        None => {
            warn!(injectable = target.path(), "declared category cannot be used as a key");
            fallback
        }
    }
}

/// Works out the class name and canonical key of `target`: an explicit category wins, otherwise
/// the type's own name is used. `resolve_type` is used when the category is another type.
pub(crate) fn derive_metadata(
    target: TypeHandle,
    category: Option<&Identity>,
    resolve_type: impl FnOnce(TypeHandle) -> Symbol,
) -> Option<InjectableMetadata> {
    let (class, symbol) = match category {
        Some(Identity::Name(name)) if name.is_empty() => return None,
        Some(Identity::Name(name)) => (name.clone(), Symbol::intern(name)),
        Some(Identity::Symbol(symbol)) => (symbol.description().to_string(), *symbol),
        Some(Identity::Type(other)) => (other.name().to_string(), resolve_type(*other)),
        None => (target.name().to_string(), Symbol::intern(target.name())),
    };
    Some(InjectableMetadata {
        class,
        symbol,
        target,
    })
}

fn store() -> RwLockReadGuard<'static, MetadataStore> {
    STORE.read().unwrap_or_else(|p| p.into_inner())
}

fn store_mut() -> RwLockWriteGuard<'static, MetadataStore> {
    STORE.write().unwrap_or_else(|p| p.into_inner())
}

pub(crate) fn define_injectable(meta: InjectableMetadata) {
    store_mut().injectables.insert(meta.target.id(), meta);
}

pub(crate) fn define_injection(meta: InjectMetadata) {
    let mut store = store_mut();
    let owner = meta.owner.id();
    if let Some(existing) = store.injections.get_vec_mut(&owner) {
        existing.retain(|other| other.property != meta.property);
    }
    store.injections.insert(owner, meta);
}

/// The injectable metadata attached to a type, if it has been declared or decorated.
pub fn injectable_metadata(target: TypeId) -> Option<InjectableMetadata> {
    store().injectables.get(&target).cloned()
}

/// The metadata of the injectable known under `category`. When several types share the key, the
/// one declared under its own name is returned, then the one with the lowest type path.
pub fn injectable(category: impl Into<Identity>) -> Option<InjectableMetadata> {
    let category = category.into();
    if let Identity::Type(handle) = &category {
        if let Some(meta) = injectable_metadata(handle.id()) {
            return Some(meta);
        }
    }
    let symbol = category.resolve()?;
    store()
        .injectables
        .values()
        .filter(|meta| meta.symbol == symbol)
        .min_by_key(|meta| (meta.class != meta.target.name(), meta.target.path()))
        .cloned()
}

/// Every injectable type known to the store, ordered by class name.
pub fn injectables() -> Vec<InjectableMetadata> {
    let mut all = store().injectables.values().cloned().collect::<Vec<_>>();
    all.sort_by(|a, b| a.class.cmp(&b.class).then_with(|| a.target.path().cmp(b.target.path())));
    all
}

/// Every injection point declared on `T`, ordered by property name.
pub fn injected<T: 'static>() -> Vec<InjectMetadata> {
    let mut all = store()
        .injections
        .get_vec(&TypeId::of::<T>())
        .cloned()
        .unwrap_or_default();
    all.sort_by_key(|meta| meta.property);
    all
}

pub fn injected_property<T: 'static>(property: &str) -> Option<InjectMetadata> {
    store()
        .injections
        .get_vec(&TypeId::of::<T>())?
        .iter()
        .find(|meta| meta.property == property)
        .cloned()
}

/// Every injection point declared on any type.
pub fn all_injections() -> Vec<InjectMetadata> {
    store()
        .injections
        .iter_all()
        .flat_map(|(_, metas)| metas.iter().cloned())
        .collect()
}

/// Looks metadata up by its full key, the way an external tool would. Injection points are
/// keyed by property as well.
pub fn get(target: TypeHandle, key: &str, property: Option<&str>) -> Option<MetadataValue> {
    let suffix = key.strip_prefix(REFLECT)?;
    match (suffix, property) {
        (INJECTABLE, None) => injectable_metadata(target.id()).map(MetadataValue::Injectable),
        (INJECT, Some(property)) => store()
            .injections
            .get_vec(&target.id())?
            .iter()
            .find(|meta| meta.property == property)
            .cloned()
            .map(MetadataValue::Inject),
        _ => None,
    }
}
