//! Error types for the protocol crate.

use thiserror::Error;

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while building or decoding protocol values.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Unrecognized context type tag.
    #[error("unknown context type: {0}")]
    UnknownContextType(String),

    /// Unrecognized provider type tag.
    #[error("unknown provider type: {0}")]
    UnknownProviderType(String),

    /// Unrecognized message type tag.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// Confidence outside of `[0, 1]`.
    #[error("confidence out of range [0, 1]: {0}")]
    ConfidenceOutOfRange(f64),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
