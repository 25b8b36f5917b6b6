//! Error types for the Trust SDK.

use thiserror::Error;

/// Errors surfaced by annotators, signature handling, and stream providers.
///
/// Construction errors (`Unknown*`, `InvalidKeyConfig`, `UnsupportedAlgorithm`,
/// `InvalidStreamConfig`) are raised by factories and constructors. Everything
/// else is a per-call error returned from `execute`/`publish`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown annotator type: {0}")]
    UnknownAnnotatorType(String),

    #[error("unknown stream type: {0}")]
    UnknownStreamType(String),

    #[error("invalid stream config: {0}")]
    InvalidStreamConfig(String),

    #[error("invalid key config: {0}")]
    InvalidKeyConfig(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("missing signature metadata: {0}")]
    MissingSignatureMetadata(String),

    #[error("no TLS connection info in context")]
    NoTlsContext,

    #[error("stream provider is not connected")]
    NotConnected,

    #[error("delivery failed after {attempts} attempt(s): {reason}")]
    DeliveryFailed { attempts: u32, reason: String },

    #[error("operation timed out")]
    Timeout,

    #[error("operation cancelled")]
    Cancelled,

    #[error("serialization error: {0}")]
    Serialization(String),

    /// The attestation collaborator could not be reached. Retryable.
    #[error("attestation unavailable: {0}")]
    AttestationUnavailable(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the caller may reasonably retry the same call later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::DeliveryFailed { .. }
                | Error::Timeout
                | Error::AttestationUnavailable(_)
                | Error::Io(_)
        )
    }

    /// Whether this error comes from static configuration and will recur on
    /// every call until the configuration changes.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnknownAnnotatorType(_)
                | Error::UnknownStreamType(_)
                | Error::InvalidStreamConfig(_)
                | Error::InvalidKeyConfig(_)
                | Error::UnsupportedAlgorithm(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type for Trust SDK operations.
pub type Result<T> = std::result::Result<T, Error>;
