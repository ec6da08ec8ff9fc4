// ABOUTME: Provider error type shared by all provider capabilities.
// ABOUTME: Separates transient failures (retryable) from deterministic ones.

/// Errors from infrastructure provider calls.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The call failed for a non-deterministic reason (throttling, network).
    #[error("{operation} failed transiently: {message}")]
    Transient { operation: String, message: String },

    /// The provider rejected the call.
    #[error("{operation} failed: {message}")]
    Api { operation: String, message: String },

    /// The provider answered with something that does not decode.
    #[error("{operation} returned an undecodable response: {message}")]
    Decode { operation: String, message: String },

    /// A resource referenced by id does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
}

impl ProviderError {
    pub fn api(operation: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderError::Api {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn transient(operation: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderError::Transient {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        ProviderError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient { .. })
    }
}
