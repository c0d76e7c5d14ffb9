//! Canonical keys. Every registration and lookup is keyed on a [`Symbol`], and every way a caller
//! can name an injectable (a string, a symbol, or a type) is normalised into one through
//! [`Identity::resolve`].

use std::{
    any::{TypeId, type_name},
    collections::HashMap,
    fmt,
    sync::{Arc, LazyLock, Mutex},
};

use crate::metadata;

static INTERNER: LazyLock<Mutex<Interner>> = LazyLock::new(|| Mutex::new(Interner::default()));

#[derive(Default)]
struct Interner {
    by_name: HashMap<Arc<str>, Symbol>,
    descriptions: Vec<(Arc<str>, bool)>,
}

impl Interner {
    fn push(&mut self, description: Arc<str>, interned: bool) -> Symbol {
        let symbol = Symbol(self.descriptions.len() as u32);
        self.descriptions.push((description, interned));
        symbol
    }
}

/// A process-unique key. Cheap to copy and compare; the string it was made from is kept in a
/// process-wide table and is available through [`Symbol::description`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    /// The interned symbol for `name`. Equal strings always produce the same symbol.
    pub fn intern(name: &str) -> Symbol {
        let mut interner = INTERNER.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(&symbol) = interner.by_name.get(name) {
            return symbol;
        }
        let name: Arc<str> = Arc::from(name);
        let symbol = interner.push(name.clone(), true);
        interner.by_name.insert(name, symbol);
        symbol
    }

    /// A fresh symbol that never compares equal to any other, even one with the same
    /// description.
    pub fn unique(description: &str) -> Symbol {
        let mut interner = INTERNER.lock().unwrap_or_else(|p| p.into_inner());
        interner.push(Arc::from(description), false)
    }

    pub fn description(&self) -> Arc<str> {
        let interner = INTERNER.lock().unwrap_or_else(|p| p.into_inner());
        // symbols are only ever created by the interner, so the index is always in range
        interner.descriptions[self.0 as usize].0.clone()
    }

    pub fn is_interned(&self) -> bool {
        let interner = INTERNER.lock().unwrap_or_else(|p| p.into_inner());
        interner.descriptions[self.0 as usize].1
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description())
    }
}

/// A handle on a concrete Rust type, standing in for a class constructor.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle {
    id: TypeId,
    name: &'static str,
}

impl TypeHandle {
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeHandle {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The full path of the type, e.g. `my_app::services::Mailer`.
    pub fn path(&self) -> &'static str {
        self.name
    }

    /// The name of the type without its module path, e.g. `Mailer`. Generic arguments are kept
    /// as written.
    pub fn name(&self) -> &'static str {
        short_type_name(self.name)
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub(crate) fn short_type_name(path: &str) -> &str {
    let generics_start = path.find('<').unwrap_or(path.len());
    let start = path[..generics_start].rfind("::").map_or(0, |at| at + 2);
    &path[start..]
}

/// Anything an injectable can be looked up by.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Name(String),
    Symbol(Symbol),
    Type(TypeHandle),
}

impl Identity {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Identity::Type(TypeHandle::of::<T>())
    }

    /// Normalise this identity into its canonical symbol.
    ///
    /// Types use the symbol recorded in their injectable metadata when there is one, and
    /// otherwise fall back on their name, which gives the same symbol every time. `None` means
    /// the identity cannot name anything (currently only the empty string).
    pub fn resolve(&self) -> Option<Symbol> {
        match self {
            Identity::Symbol(symbol) => Some(*symbol),
            Identity::Name(name) if name.is_empty() => None,
            Identity::Name(name) => Some(Symbol::intern(name)),
            Identity::Type(handle) => Some(
                metadata::injectable_metadata(handle.id())
                    .map(|meta| meta.symbol)
                    .unwrap_or_else(|| Symbol::intern(handle.name())),
            ),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Name(name) => f.write_str(name),
            Identity::Symbol(symbol) => write!(f, "{symbol}"),
            Identity::Type(handle) => f.write_str(handle.name()),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Name(name) => write!(f, "Name({name:?})"),
            Identity::Symbol(symbol) => write!(f, "{symbol:?}"),
            Identity::Type(handle) => write!(f, "Type({handle:?})"),
        }
    }
}

impl From<&str> for Identity {
    fn from(name: &str) -> Self {
        Identity::Name(name.to_string())
    }
}

impl From<String> for Identity {
    fn from(name: String) -> Self {
        Identity::Name(name)
    }
}

impl From<Symbol> for Identity {
    fn from(symbol: Symbol) -> Self {
        Identity::Symbol(symbol)
    }
}

impl From<TypeHandle> for Identity {
    fn from(handle: TypeHandle) -> Self {
        Identity::Type(handle)
    }
}

/// Shorthand for `input.into().resolve()`.
pub fn resolve(input: impl Into<Identity>) -> Option<Symbol> {
    input.into().resolve()
}
