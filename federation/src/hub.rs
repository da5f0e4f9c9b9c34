//! Federation hub implementation.

use std::sync::Arc;

use carelink_protocol::{
    Context, ContextFilters, ContextType, Message, MessageType, Provider, ProviderType,
};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::aggregator::Aggregator;
use crate::cache::{CacheStats, ContextCache};
use crate::config::{AggregationMode, FederationConfig};
use crate::error::{FederationError, Result};
use crate::generator::{ContextGenerator, GeneratorSet};
use crate::processor::{AuditEntry, MessageProcessor};
use crate::registry::ProviderRegistry;
use crate::router::ContextRouter;
use crate::seed::default_providers;
use crate::transform::{ContextTransformer, TargetFormat, TransformOutput};

/// The federation engine.
///
/// A hub owns its registry, context cache and message log; nothing is
/// global, so separate hubs (one per tenant, one per test) never share
/// state. Clones share the same state.
#[derive(Clone)]
pub struct FederationHub {
    config: Arc<FederationConfig>,
    registry: ProviderRegistry,
    cache: ContextCache,
    router: ContextRouter,
    processor: MessageProcessor,
    aggregator: Aggregator,
    transformer: ContextTransformer,
}

impl FederationHub {
    /// Create a new hub builder.
    pub fn builder() -> FederationHubBuilder {
        FederationHubBuilder::new()
    }

    /// Create a hub with the built-in generators.
    pub async fn new(config: FederationConfig) -> Result<Self> {
        Self::builder().with_config(config).build().await
    }

    /// The configuration the hub was built with.
    pub fn config(&self) -> &FederationConfig {
        &self.config
    }

    /// Register a provider, replacing any provider with the same id.
    pub async fn register(&self, provider: Provider) -> Option<Provider> {
        self.registry.register(provider).await
    }

    /// Remove a provider.
    pub async fn unregister(&self, provider_id: &str) -> Result<Provider> {
        self.registry.unregister(provider_id).await
    }

    /// Get a provider by id.
    pub async fn provider(&self, provider_id: &str) -> Option<Provider> {
        self.registry.get(provider_id).await
    }

    /// List all providers.
    pub async fn list(&self) -> Vec<Provider> {
        self.registry.list().await
    }

    /// List providers of one type.
    pub async fn list_by_type(&self, provider_type: ProviderType) -> Vec<Provider> {
        self.registry.list_by_type(provider_type).await
    }

    /// Request context from a provider. See [`ContextRouter::request_context`].
    pub async fn request_context(
        &self,
        provider_id: &str,
        context_types: &[ContextType],
        filters: &ContextFilters,
    ) -> Result<Vec<Context>> {
        self.router
            .request_context(provider_id, context_types, filters)
            .await
    }

    /// Replicate context from `source_id` to `target_id`.
    ///
    /// Returns `false` on any failure; use [`Self::try_sync_context`] to
    /// learn which step failed.
    pub async fn sync_context(
        &self,
        source_id: &str,
        target_id: &str,
        context_types: &[ContextType],
    ) -> bool {
        let outcome = self
            .try_sync_context(source_id, target_id, context_types)
            .await;
        if !outcome.is_synced() {
            error!("Context sync {source_id} -> {target_id} failed: {outcome:?}");
        }
        outcome.is_synced()
    }

    /// Replicate context from `source_id` to `target_id`, reporting the outcome.
    pub async fn try_sync_context(
        &self,
        source_id: &str,
        target_id: &str,
        context_types: &[ContextType],
    ) -> SyncOutcome {
        let contexts = match self
            .request_context(source_id, context_types, &ContextFilters::default())
            .await
        {
            Ok(contexts) => contexts,
            Err(FederationError::NotFound(id)) => return SyncOutcome::SourceNotFound(id),
            Err(FederationError::UnsupportedContextType { unsupported, .. }) => {
                return SyncOutcome::Unsupported(unsupported);
            }
            Err(e) => return SyncOutcome::Failed(e.to_string()),
        };

        let count = contexts.len();
        let message =
            match self.outgoing(MessageType::ContextSync, source_id, target_id, contexts) {
                Ok(message) => message,
                Err(e) => return SyncOutcome::Failed(e.to_string()),
            };
        let message_id = message.id.clone();

        match self.processor.try_process(message).await {
            Ok(()) => {
                debug!("Synced {count} contexts {source_id} -> {target_id}");
                SyncOutcome::Synced {
                    message_id,
                    contexts: count,
                }
            }
            Err(FederationError::UnknownRecipient(id)) => SyncOutcome::TargetNotFound(id),
            Err(e) => SyncOutcome::Failed(e.to_string()),
        }
    }

    /// Push contexts into a provider.
    ///
    /// Returns `false` on any failure, including an unknown provider; use
    /// [`Self::try_update_context`] for the error.
    pub async fn update_context(&self, provider_id: &str, contexts: Vec<Context>) -> bool {
        match self.try_update_context(provider_id, contexts).await {
            Ok(()) => true,
            Err(e) => {
                error!("Context update for {provider_id} failed: {e}");
                false
            }
        }
    }

    /// Push contexts into a provider, reporting why it failed.
    pub async fn try_update_context(
        &self,
        provider_id: &str,
        contexts: Vec<Context>,
    ) -> Result<()> {
        if !self.registry.contains(provider_id).await {
            return Err(FederationError::NotFound(provider_id.to_string()));
        }

        let sender = self.config.engine_id.clone();
        let message = self.outgoing(MessageType::ContextUpdate, &sender, provider_id, contexts)?;
        self.processor.try_process(message).await
    }

    /// Route an externally built message. See [`MessageProcessor::process_message`].
    pub async fn process_message(&self, message: Message) -> bool {
        self.processor.process_message(message).await
    }

    /// Collect a patient's context from every non-model provider, skipping
    /// providers that fail.
    pub async fn get_patient_context(&self, patient_id: &str) -> Vec<Context> {
        self.aggregator.get_patient_context(patient_id).await
    }

    /// Collect a patient's context under an explicit failure policy.
    pub async fn aggregate(&self, patient_id: &str, mode: AggregationMode) -> Result<Vec<Context>> {
        self.aggregator.aggregate(patient_id, mode).await
    }

    /// Collect a patient's context under the configured `aggregation.mode`.
    pub async fn aggregate_default(&self, patient_id: &str) -> Result<Vec<Context>> {
        self.aggregate(patient_id, self.config.aggregation.mode).await
    }

    /// Transform contexts into an AI-ready format.
    pub fn transform_context_for_ai(
        &self,
        contexts: Vec<Context>,
        format: &TargetFormat,
    ) -> TransformOutput {
        self.transformer.transform(contexts, format)
    }

    /// Current engine counters.
    pub async fn status(&self) -> HubStatus {
        HubStatus {
            providers: self.registry.len().await,
            cached_contexts: self.cache.len().await,
            queued_messages: self.processor.len().await,
            supported_types: self.registry.supported_context_types().await,
        }
    }

    /// Cache statistics.
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Drop every cached context set.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// Snapshot of every message processed so far.
    pub async fn messages(&self) -> Vec<Message> {
        self.processor.messages().await
    }

    /// Snapshot of the audit log.
    pub async fn audit_log(&self) -> Vec<AuditEntry> {
        self.processor.audit_log().await
    }

    fn outgoing(
        &self,
        message_type: MessageType,
        sender: &str,
        recipient: &str,
        payload: Vec<Context>,
    ) -> Result<Message> {
        let message = Message::new(message_type, sender, recipient, payload)
            .with_encryption(self.config.messaging.encryption);
        if self.config.messaging.sign_messages {
            Ok(message.sign()?)
        } else {
            Ok(message)
        }
    }
}

/// Outcome of a sync between two providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The sync message was delivered.
    Synced { message_id: String, contexts: usize },

    /// The source provider is not registered.
    SourceNotFound(String),

    /// The target provider is not registered.
    TargetNotFound(String),

    /// The source cannot issue these context types.
    Unsupported(Vec<ContextType>),

    /// Any other failure.
    Failed(String),
}

impl SyncOutcome {
    /// Whether the sync succeeded.
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced { .. })
    }
}

/// Engine counters reported by [`FederationHub::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStatus {
    /// Number of registered providers.
    pub providers: usize,

    /// Number of cached context sets.
    pub cached_contexts: usize,

    /// Number of messages in the audit log.
    pub queued_messages: usize,

    /// Union of every provider's supported context types.
    pub supported_types: Vec<ContextType>,
}

/// Builder for [`FederationHub`].
pub struct FederationHubBuilder {
    config: FederationConfig,
    generators: GeneratorSet,
    providers: Vec<Provider>,
}

impl FederationHubBuilder {
    /// Create a new builder with default configuration and generators.
    pub fn new() -> Self {
        Self {
            config: FederationConfig::default(),
            generators: GeneratorSet::defaults(),
            providers: Vec::new(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: FederationConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable or disable the built-in provider set.
    pub fn with_default_providers(mut self, seed: bool) -> Self {
        self.config.seed_default_providers = seed;
        self
    }

    /// Substitute the generator for its provider type.
    pub fn with_generator(mut self, generator: Arc<dyn ContextGenerator>) -> Self {
        self.generators.insert(generator);
        self
    }

    /// Register a provider at startup, after the built-in set.
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.providers.push(provider);
        self
    }

    /// Build the hub.
    pub async fn build(self) -> Result<FederationHub> {
        let config = self.config;
        config.validate()?;

        let registry = ProviderRegistry::new();
        if config.seed_default_providers {
            registry.register_all(default_providers()).await;
        }
        for provider in self.providers {
            registry.register(provider).await;
        }

        let cache = ContextCache::new(config.cache.max_entries);
        let router = ContextRouter::new(registry.clone(), self.generators, cache.clone());
        let processor = MessageProcessor::new(registry.clone(), config.messaging.verify_signatures);
        let aggregator = Aggregator::new(
            registry.clone(),
            router.clone(),
            config.aggregation.clone(),
        );
        let transformer = ContextTransformer::new(config.hl7.clone());

        info!(
            "Federation hub {} ready with {} providers",
            config.engine_id,
            registry.len().await
        );

        Ok(FederationHub {
            config: Arc::new(config),
            registry,
            cache,
            router,
            processor,
            aggregator,
            transformer,
        })
    }
}

impl Default for FederationHubBuilder {
    fn default() -> Self {
        Self::new()
    }
}
