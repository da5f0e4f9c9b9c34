//! Patient context aggregation.
//!
//! Fans one patient request out to every registered data source (reasoning
//! models are skipped) and concatenates what comes back. Providers are
//! queried with bounded concurrency and a per-provider deadline; results
//! keep registry order.

use std::pin::pin;
use std::time::Duration;

use carelink_protocol::{Context, ContextFilters, Provider};
use futures::StreamExt;
use futures::stream;
use tracing::{debug, info, warn};

use crate::config::{AggregationConfig, AggregationMode};
use crate::error::{FederationError, Result};
use crate::registry::ProviderRegistry;
use crate::router::ContextRouter;

/// Collects a patient's context across providers.
#[derive(Clone)]
pub struct Aggregator {
    registry: ProviderRegistry,
    router: ContextRouter,
    config: AggregationConfig,
}

impl Aggregator {
    /// Create an aggregator.
    pub fn new(
        registry: ProviderRegistry,
        router: ContextRouter,
        config: AggregationConfig,
    ) -> Self {
        Self {
            registry,
            router,
            config,
        }
    }

    /// Best-effort aggregation: failing providers are logged and skipped.
    pub async fn get_patient_context(&self, patient_id: &str) -> Vec<Context> {
        let mut contexts = Vec::new();
        let mut results = pin!(self.fan_out(patient_id).await);
        while let Some((provider_id, outcome)) = results.next().await {
            match outcome {
                Ok(found) => contexts.extend(found),
                Err(e) => warn!("Failed to get context from {provider_id}: {e}"),
            }
        }

        info!("Aggregated {} contexts for patient {patient_id}", contexts.len());
        contexts
    }

    /// Aggregate under an explicit failure policy.
    ///
    /// In [`AggregationMode::Strict`] the first provider error is returned
    /// and outstanding provider calls are dropped.
    pub async fn aggregate(&self, patient_id: &str, mode: AggregationMode) -> Result<Vec<Context>> {
        if mode == AggregationMode::BestEffort {
            return Ok(self.get_patient_context(patient_id).await);
        }

        let mut contexts = Vec::new();
        let mut results = pin!(self.fan_out(patient_id).await);
        while let Some((provider_id, outcome)) = results.next().await {
            match outcome {
                Ok(found) => contexts.extend(found),
                Err(e) => {
                    warn!("Strict aggregation for {patient_id} stopped at {provider_id}: {e}");
                    return Err(e);
                }
            }
        }
        Ok(contexts)
    }

    async fn fan_out(
        &self,
        patient_id: &str,
    ) -> impl futures::Stream<Item = (String, Result<Vec<Context>>)> + '_ {
        let providers: Vec<Provider> = self
            .registry
            .list()
            .await
            .into_iter()
            .filter(|p| !p.provider_type.is_model())
            .collect();

        debug!(
            "Querying {} providers for patient {patient_id}",
            providers.len()
        );

        let filters = ContextFilters::for_patient(patient_id);
        let limit = self.config.max_concurrency.max(1);

        stream::iter(providers)
            .map(move |provider| {
                let filters = filters.clone();
                async move {
                    let outcome = self.fetch(&provider, &filters).await;
                    (provider.id, outcome)
                }
            })
            .buffered(limit)
    }

    async fn fetch(&self, provider: &Provider, filters: &ContextFilters) -> Result<Vec<Context>> {
        let timeout_ms = self.config.provider_timeout_ms;
        let request = self.router.request_context(
            &provider.id,
            &provider.supported_context_types,
            filters,
        );

        match tokio::time::timeout(Duration::from_millis(timeout_ms), request).await {
            Ok(result) => result,
            Err(_) => Err(FederationError::ProviderTimeout {
                provider_id: provider.id.clone(),
                timeout_ms,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use carelink_protocol::{ContextType, ProviderType};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::cache::ContextCache;
    use crate::generator::{ContextGenerator, GeneratorSet};

    struct SlowImaging;

    #[async_trait]
    impl ContextGenerator for SlowImaging {
        fn provider_type(&self) -> ProviderType {
            ProviderType::ImagingSystem
        }

        async fn generate(
            &self,
            _provider: &Provider,
            _context_type: ContextType,
            _filters: &ContextFilters,
        ) -> Result<Vec<Context>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        }
    }

    async fn aggregator(config: AggregationConfig) -> Aggregator {
        let registry = ProviderRegistry::new();
        registry
            .register_all([
                Provider::new("epic-ehr", "Epic", ProviderType::EhrSystem)
                    .with_supported_types([
                        ContextType::MedicalHistory,
                        ContextType::ClinicalNotes,
                    ]),
                Provider::new("pacs-imaging", "PACS", ProviderType::ImagingSystem)
                    .with_supported_types([ContextType::Imaging]),
                Provider::new("med-gemma-ai", "Gemma", ProviderType::AiModel)
                    .with_supported_types([ContextType::MedicalHistory]),
            ])
            .await;

        let mut generators = GeneratorSet::defaults();
        generators.insert(Arc::new(SlowImaging));
        let router = ContextRouter::new(registry.clone(), generators, ContextCache::new(16));
        Aggregator::new(registry, router, config)
    }

    fn short_timeout() -> AggregationConfig {
        AggregationConfig {
            provider_timeout_ms: 50,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_timed_out_provider_is_skipped() {
        let aggregator = aggregator(short_timeout()).await;
        let contexts = aggregator.get_patient_context("p-42").await;

        let sources: Vec<_> = contexts.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["epic-ehr", "epic-ehr"]);
        assert!(contexts.iter().all(|c| c.patient_id() == Some("p-42")));
    }

    #[tokio::test]
    async fn test_strict_mode_surfaces_timeout() {
        let aggregator = aggregator(short_timeout()).await;
        let err = aggregator
            .aggregate("p-42", AggregationMode::Strict)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FederationError::ProviderTimeout { provider_id, timeout_ms: 50 }
                if provider_id == "pacs-imaging"
        ));
    }

    /// Generator that records how many calls are running at once.
    struct Tracked {
        provider_type: ProviderType,
        delay: Duration,
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ContextGenerator for Tracked {
        fn provider_type(&self) -> ProviderType {
            self.provider_type
        }

        async fn generate(
            &self,
            provider: &Provider,
            context_type: ContextType,
            _filters: &ContextFilters,
        ) -> Result<Vec<Context>> {
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(running, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![Context::new(context_type, provider.id.clone(), json!({}))])
        }
    }

    #[tokio::test]
    async fn test_fan_out_keeps_registry_order_within_limit() {
        let registry = ProviderRegistry::new();
        registry
            .register_all([
                Provider::new("a", "Slow EHR", ProviderType::EhrSystem)
                    .with_supported_types([ContextType::MedicalHistory]),
                Provider::new("b", "Lab", ProviderType::LabSystem)
                    .with_supported_types([ContextType::LabResults]),
                Provider::new("c", "Pharmacy", ProviderType::PharmacySystem)
                    .with_supported_types([ContextType::Medications]),
            ])
            .await;

        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut generators = GeneratorSet::new();
        for (provider_type, delay_ms) in [
            (ProviderType::EhrSystem, 200),
            (ProviderType::LabSystem, 10),
            (ProviderType::PharmacySystem, 10),
        ] {
            generators.insert(Arc::new(Tracked {
                provider_type,
                delay: Duration::from_millis(delay_ms),
                in_flight: Arc::clone(&in_flight),
                peak: Arc::clone(&peak),
            }));
        }

        let router = ContextRouter::new(registry.clone(), generators, ContextCache::new(16));
        let config = AggregationConfig {
            max_concurrency: 2,
            ..Default::default()
        };
        let aggregator = Aggregator::new(registry, router, config);

        let contexts = aggregator.get_patient_context("p-42").await;

        let sources: Vec<_> = contexts.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["a", "b", "c"]);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }
}
