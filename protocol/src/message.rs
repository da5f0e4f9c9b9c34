//! Message envelope exchanged between providers.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::context::Context;
use crate::error::{ProtocolError, Result};

/// Kind of protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    /// Ask a provider for context.
    ContextRequest,

    /// Answer to a context request.
    ContextResponse,

    /// Push new context into a provider.
    ContextUpdate,

    /// Replicate context from one provider to another.
    ContextSync,
}

impl MessageType {
    /// The wire tag for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::ContextRequest => "context-request",
            MessageType::ContextResponse => "context-response",
            MessageType::ContextUpdate => "context-update",
            MessageType::ContextSync => "context-sync",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "context-request" => Ok(MessageType::ContextRequest),
            "context-response" => Ok(MessageType::ContextResponse),
            "context-update" => Ok(MessageType::ContextUpdate),
            "context-sync" => Ok(MessageType::ContextSync),
            other => Err(ProtocolError::UnknownMessageType(other.to_string())),
        }
    }
}

/// Outcome of checking a message signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    /// The message carries no signature.
    Unsigned,

    /// The signature matches the message digest.
    Valid,

    /// The signature does not match the message digest.
    Invalid,
}

/// A protocol message.
///
/// Messages are audit records: once built they are only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique identifier (`msg_<uuid>`).
    pub id: String,

    #[serde(rename = "type")]
    pub message_type: MessageType,

    /// Id of the sending provider or engine.
    pub sender: String,

    /// Id of the receiving provider.
    pub recipient: String,

    pub payload: Vec<Context>,

    pub timestamp: DateTime<Utc>,

    /// Whether the transport is expected to encrypt this message.
    ///
    /// The engine carries this flag but never encrypts anything itself.
    pub encryption: bool,

    /// Hex SHA-256 digest over the envelope and payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Message {
    /// Create an unsigned message timestamped now.
    pub fn new(
        message_type: MessageType,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        payload: Vec<Context>,
    ) -> Self {
        Self {
            id: Self::generate_id(),
            message_type,
            sender: sender.into(),
            recipient: recipient.into(),
            payload,
            timestamp: Utc::now(),
            encryption: true,
            signature: None,
        }
    }

    /// Generate a fresh message identifier.
    pub fn generate_id() -> String {
        crate::prefixed_id("msg")
    }

    /// Set the encryption flag.
    pub fn with_encryption(mut self, encryption: bool) -> Self {
        self.encryption = encryption;
        self
    }

    /// Compute the digest of this message, ignoring any existing signature.
    pub fn digest(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        for field in [
            self.id.as_str(),
            self.message_type.as_str(),
            self.sender.as_str(),
            self.recipient.as_str(),
        ] {
            hasher.update(field.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update(serde_json::to_vec(&self.payload)?);
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Attach a signature computed from the current contents.
    pub fn sign(mut self) -> Result<Self> {
        self.signature = Some(self.digest()?);
        Ok(self)
    }

    /// Check the attached signature against the current contents.
    pub fn verify(&self) -> Result<SignatureCheck> {
        let Some(signature) = &self.signature else {
            return Ok(SignatureCheck::Unsigned);
        };
        if *signature == self.digest()? {
            Ok(SignatureCheck::Valid)
        } else {
            Ok(SignatureCheck::Invalid)
        }
    }
}
