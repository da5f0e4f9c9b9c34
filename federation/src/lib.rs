//! # CareLink Federation
//!
//! This crate federates clinical context between healthcare data sources
//! (EHRs, labs, imaging, pharmacy) and AI models:
//!
//! - **Registry**: Providers and the context types they can issue
//! - **Router**: Capability-checked requests dispatched to generators
//! - **Processor**: Audited message routing for sync and update
//! - **Aggregator**: Per-patient fan-out across every data source
//! - **Transformer**: Clinical summary, FHIR bundle and HL7 v2 output
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Federation Hub                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │   Provider   │  │   Context    │  │   Message    │           │
//! │  │   Registry   │  │    Router    │  │  Processor   │           │
//! │  └──────────────┘  └──────────────┘  └──────────────┘           │
//! │         │                │                  │                   │
//! │         └────────────────┼──────────────────┘                   │
//! │                          ▼                                      │
//! │                  ┌──────────────┐  ┌──────────────┐             │
//! │                  │  Generators  │  │    Cache     │             │
//! │                  └──────────────┘  └──────────────┘             │
//! │                          │                                      │
//! │                          ▼                                      │
//! │                  ┌──────────────┐                               │
//! │                  │  Aggregator  │                               │
//! │                  └──────────────┘                               │
//! │                          │                                      │
//! │                          ▼                                      │
//! │                  ┌──────────────┐                               │
//! │                  │ Transformer  │                               │
//! │                  └──────────────┘                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use carelink_federation::{FederationConfig, FederationHub, TargetFormat};
//!
//! let hub = FederationHub::new(FederationConfig::default()).await?;
//!
//! let contexts = hub.get_patient_context("p-42").await;
//! let bundle = hub.transform_context_for_ai(contexts, &TargetFormat::FhirBundle);
//! ```

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod error;
pub mod generator;
pub mod hub;
pub mod processor;
pub mod registry;
pub mod router;
pub mod seed;
pub mod transform;

pub use aggregator::Aggregator;
pub use cache::{CacheKey, CacheStats, ContextCache};
pub use config::{
    AggregationConfig, AggregationMode, CacheConfig, FederationConfig, Hl7Config, MessagingConfig,
};
pub use error::{FederationError, Result};
pub use generator::{ContextGenerator, GeneratorSet};
pub use hub::{FederationHub, FederationHubBuilder, HubStatus, SyncOutcome};
pub use processor::{AuditEntry, MessageProcessor, MessageStatus};
pub use registry::ProviderRegistry;
pub use router::ContextRouter;
pub use seed::default_providers;
pub use transform::{
    ClinicalSummary, ContextTransformer, FhirBundle, TargetFormat, TransformOutput,
};

// Re-export the protocol types for convenience
pub use carelink_protocol::{
    Confidence, Context, ContextFilters, ContextMetadata, ContextType, Message, MessageType,
    Provider, ProviderType, Urgency,
};
