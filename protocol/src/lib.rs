//! # CareLink Protocol
//!
//! Wire types shared by every participant of the clinical context
//! federation protocol:
//!
//! - **Context**: one normalized fact bundle sourced from a single clinical system
//! - **Provider**: a registered record, lab, imaging, pharmacy system or reasoning model
//! - **Message**: the request/response/update/sync envelope exchanged between providers
//!
//! Field names and enum tags serialize exactly as they travel on the wire
//! (`camelCase` fields, `kebab-case` tags), so JSON produced by other
//! participants deserializes without adapters.

pub mod context;
pub mod error;
pub mod message;
pub mod provider;

pub use context::{Confidence, Context, ContextFilters, ContextMetadata, ContextType, Urgency};
pub use error::{ProtocolError, Result};
pub use message::{Message, MessageType, SignatureCheck};
pub use provider::{Provider, ProviderType};

/// Generate an identifier of the form `<prefix>_<uuid>`.
pub(crate) fn prefixed_id(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}
