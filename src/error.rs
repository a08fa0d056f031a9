use thiserror::Error;

/// Result type alias for store and accessor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by stores, accessors and context providers.
#[derive(Debug, Error)]
pub enum Error {
    /// A context accessor was called outside of any matching provider.
    #[error("Context store must be used within the context provider")]
    MissingProvider,

    /// A provider built from an initializer that takes initial state was
    /// rendered without one.
    #[error("context provider requires an initial state")]
    MissingInitialState,

    #[error("no accessor named `{name}`")]
    UnknownAccessor { name: String },

    #[error("accessor `{name}` does not have the requested signature")]
    AccessorType { name: String },

    #[error("middleware `{name}` failed: {message}")]
    Middleware { name: String, message: String },

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn unknown(name: &str) -> Self {
        Error::UnknownAccessor {
            name: name.to_string(),
        }
    }

    pub(crate) fn signature(name: &str) -> Self {
        Error::AccessorType {
            name: name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_provider_message() {
        assert_eq!(
            Error::MissingProvider.to_string(),
            "Context store must be used within the context provider"
        );
    }

    #[test]
    fn accessor_errors_name_the_accessor() {
        assert_eq!(
            Error::unknown("useCount").to_string(),
            "no accessor named `useCount`"
        );
        assert!(Error::signature("count").to_string().contains("`count`"));
    }
}
