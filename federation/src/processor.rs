//! Message processor.
//!
//! Every message handed to the processor is appended to an audit log before
//! anything else happens, then routed to its recipient. A message moves
//! through `Queued → Routed → Delivered` or ends `Rejected`; there is no
//! retry and no dead-letter queue.

use std::sync::Arc;

use carelink_protocol::{Message, MessageType, SignatureCheck};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{FederationError, Result};
use crate::registry::ProviderRegistry;

/// Processing status of an audited message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MessageStatus {
    /// Recorded, not yet routed.
    Queued,

    /// Recipient resolved and the type handler ran.
    Delivered,

    /// Processing stopped; terminal.
    Rejected { reason: String },
}

/// One audit log record.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub message: Message,
    pub status: MessageStatus,
}

/// Routes protocol messages and keeps the append-only audit log.
#[derive(Clone)]
pub struct MessageProcessor {
    registry: ProviderRegistry,
    log: Arc<RwLock<Vec<AuditEntry>>>,
    verify_signatures: bool,
}

impl MessageProcessor {
    /// Create a processor resolving recipients through `registry`.
    pub fn new(registry: ProviderRegistry, verify_signatures: bool) -> Self {
        Self {
            registry,
            log: Arc::new(RwLock::new(Vec::new())),
            verify_signatures,
        }
    }

    /// Process a message, reporting success as a boolean.
    pub async fn process_message(&self, message: Message) -> bool {
        match self.try_process(message).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Message processing failed: {e}");
                false
            }
        }
    }

    /// Process a message, reporting why it was rejected.
    pub async fn try_process(&self, message: Message) -> Result<()> {
        let index = self.enqueue(message.clone()).await;

        let outcome = self.route(&message).await;
        let status = match &outcome {
            Ok(()) => MessageStatus::Delivered,
            Err(e) => MessageStatus::Rejected {
                reason: e.to_string(),
            },
        };
        if let Some(entry) = self.log.write().await.get_mut(index) {
            entry.status = status;
        }

        outcome
    }

    async fn enqueue(&self, message: Message) -> usize {
        let mut log = self.log.write().await;
        debug!(
            "Queued {} message {} ({} -> {})",
            message.message_type, message.id, message.sender, message.recipient
        );
        log.push(AuditEntry {
            message,
            status: MessageStatus::Queued,
        });
        log.len() - 1
    }

    async fn route(&self, message: &Message) -> Result<()> {
        if self.verify_signatures && message.verify()? == SignatureCheck::Invalid {
            return Err(FederationError::SignatureMismatch(message.id.clone()));
        }

        if !self.registry.contains(&message.recipient).await {
            return Err(FederationError::UnknownRecipient(message.recipient.clone()));
        }

        match message.message_type {
            MessageType::ContextRequest => {
                debug!("Context request {} acknowledged by {}", message.id, message.recipient);
            }
            MessageType::ContextResponse => {
                debug!(
                    "Context response {} carried {} contexts to {}",
                    message.id,
                    message.payload.len(),
                    message.recipient
                );
            }
            MessageType::ContextUpdate => {
                debug!(
                    "Context update {} delivered {} contexts to {}",
                    message.id,
                    message.payload.len(),
                    message.recipient
                );
            }
            MessageType::ContextSync => {
                debug!(
                    "Context sync {} replicated {} contexts from {} to {}",
                    message.id,
                    message.payload.len(),
                    message.sender,
                    message.recipient
                );
            }
        }

        Ok(())
    }

    /// Snapshot of every message recorded so far, in arrival order.
    pub async fn messages(&self) -> Vec<Message> {
        self.log
            .read()
            .await
            .iter()
            .map(|entry| entry.message.clone())
            .collect()
    }

    /// Snapshot of the audit log with processing status.
    pub async fn audit_log(&self) -> Vec<AuditEntry> {
        self.log.read().await.clone()
    }

    /// Number of recorded messages.
    pub async fn len(&self) -> usize {
        self.log.read().await.len()
    }

    /// Whether no message has been recorded.
    pub async fn is_empty(&self) -> bool {
        self.log.read().await.is_empty()
    }
}
