use thiserror::Error;

/// The error type constructors, callbacks and transformers report failures with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = InjectablesError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum InjectablesError {
    /// The value being registered has no name to derive a key from, and no key was given.
    #[error("injectable registering failed: {reason}")]
    Registration { reason: String },

    /// The stored constructor for `key` failed.
    #[error("failed to build injectable {key}")]
    Build {
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("no injectable is registered under {key}")]
    Unregistered { key: String },

    /// The type of an injected property could not be determined when it was declared.
    #[error("could not get type from declaration of {owner}'s {property}")]
    Resolution { owner: String, property: String },

    /// A required dependency was missing when an injected property was first read.
    #[error("could not get injectable {key} to inject in {owner}'s {property}")]
    Injection {
        key: String,
        owner: String,
        property: String,
    },

    #[error("injectable {key} is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("invalid key pattern")]
    Pattern(#[from] regex::Error),
}
