use std::{
    any::Any,
    fmt,
    sync::Arc,
};

/// A resolved injectable. Instances are shared, so singletons can be handed to every caller.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// The positional arguments passed along to a constructor, callback or injection point.
/// Constructor arguments only matter when an instance is actually built; a cached singleton
/// ignores them.
#[derive(Clone, Default)]
pub struct Args {
    values: Vec<Instance>,
}

impl Args {
    pub fn new() -> Self {
        Args::default()
    }

    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.values.push(Arc::new(value));
        self
    }

    /// The argument at `index`, if there is one and it has type `T`.
    pub fn get<T: Any>(&self, index: usize) -> Option<&T> {
        self.values.get(index)?.downcast_ref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Args({})", self.values.len())
    }
}

/// Builds an [`Args`] list from a comma separated list of values.
///
/// ```
/// let args = injectables::args![42u32, "hello"];
/// assert_eq!(args.get::<u32>(0), Some(&42));
/// assert_eq!(args.get::<&str>(1), Some(&"hello"));
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::Args::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::Args::new()$(.with($value))+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_access_checks_the_type() {
        let args = crate::args![7i64, String::from("seven")];
        assert_eq!(args.len(), 2);
        assert_eq!(args.get::<i64>(0), Some(&7));
        assert_eq!(args.get::<u8>(0), None);
        assert_eq!(args.get::<String>(1).map(String::as_str), Some("seven"));
        assert_eq!(args.get::<String>(2), None);
    }

    #[test]
    fn empty_macro_invocation() {
        assert!(crate::args![].is_empty());
    }
}
