//! Error types for the federation engine.

use carelink_protocol::{ContextType, ProviderType};
use thiserror::Error;

/// Result type alias for federation operations.
pub type Result<T> = std::result::Result<T, FederationError>;

/// Errors that can occur in the federation engine.
#[derive(Error, Debug)]
pub enum FederationError {
    /// Provider not registered.
    #[error("provider {0} not found")]
    NotFound(String),

    /// Provider cannot issue some of the requested context types.
    #[error("provider {provider_id} does not support context types: {}", join_types(.unsupported))]
    UnsupportedContextType {
        provider_id: String,
        unsupported: Vec<ContextType>,
    },

    /// Message recipient not registered.
    #[error("recipient provider {0} not found")]
    UnknownRecipient(String),

    /// No generator installed for a provider type.
    #[error("no context generator installed for {0}")]
    GeneratorMissing(ProviderType),

    /// A generator failed to produce context.
    #[error("context generation failed for {provider_id}: {reason}")]
    Generation { provider_id: String, reason: String },

    /// A provider did not answer in time.
    #[error("provider {provider_id} timed out after {timeout_ms}ms")]
    ProviderTimeout { provider_id: String, timeout_ms: u64 },

    /// A message signature did not match its contents.
    #[error("signature mismatch on message {0}")]
    SignatureMismatch(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] carelink_protocol::ProtocolError),

    /// TOML decoding error.
    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_types(types: &[ContextType]) -> String {
    types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
