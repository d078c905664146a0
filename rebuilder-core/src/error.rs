//! Error types.
//!
//! Every fallible operation returns [`Result<T>`](crate::Result), an alias for
//! `Result<T, StateError>`. Failures produced by user mutations are carried as
//! [`MutationError`] so they can be stored in a [`Snapshot`](crate::Snapshot)
//! and cloned out to every reader.

use std::fmt;
use std::sync::Arc;

/// Result alias used throughout the crate.
pub type Result<T, E = StateError> = std::result::Result<T, E>;

/// The single error type for container and registry operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StateError {
    #[error("{0}")]
    Mutation(MutationError),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No tokio runtime available to drive the asynchronous mutation")]
    NoRuntime,

    #[error("Container has been disposed")]
    Disposed,

    #[error("Internal error: {0}")]
    Internal(#[source] Arc<dyn std::error::Error + Send + Sync>),
}

impl StateError {
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        StateError::InvalidOperation(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        StateError::Configuration(message.into())
    }

    pub(crate) fn internal(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        StateError::Internal(Arc::new(e))
    }

    /// The mutation failure wrapped by this error, if any.
    pub fn as_mutation(&self) -> Option<&MutationError> {
        match self {
            StateError::Mutation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MutationError> for StateError {
    fn from(e: MutationError) -> Self {
        StateError::Mutation(e)
    }
}

/// A failure raised by a user supplied mutation or producer.
///
/// `Display` prints the message verbatim, so a caller reading back
/// `snapshot.error()` sees exactly what the mutation reported.
#[derive(Clone)]
pub struct MutationError {
    message: Arc<str>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl MutationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Arc::from(message.into()),
            source: None,
        }
    }

    /// Wrap an arbitrary error, keeping it reachable through `source()`.
    pub fn from_error(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            message: Arc::from(e.to_string()),
            source: Some(Arc::new(e)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for MutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationError")
            .field("message", &self.message)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

impl fmt::Display for MutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for MutationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl PartialEq for MutationError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
    }
}

impl Eq for MutationError {}

impl From<&str> for MutationError {
    fn from(message: &str) -> Self {
        MutationError::new(message)
    }
}

impl From<String> for MutationError {
    fn from(message: String) -> Self {
        MutationError::new(message)
    }
}

impl From<std::io::Error> for MutationError {
    fn from(e: std::io::Error) -> Self {
        MutationError::from_error(e)
    }
}
