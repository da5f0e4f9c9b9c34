//! Command handlers for the CareLink CLI.
//!
//! Each handler drives one hub operation and renders the result as text for
//! stdout: pretty JSON for structured results, raw segments for HL7.

use anyhow::{Result, bail};
use carelink_federation::{
    AggregationMode, Context, ContextFilters, ContextType, FederationHub, ProviderType,
    TargetFormat, TransformOutput,
};
use serde_json::json;
use tracing::info;

/// Handler for CLI commands.
pub struct FederationHandler {
    hub: FederationHub,
}

impl FederationHandler {
    pub fn new(hub: FederationHub) -> Self {
        Self { hub }
    }

    pub async fn status(&self) -> Result<String> {
        let status = self.hub.status().await;
        let cache = self.hub.cache_stats().await;
        render(&json!({
            "engineId": self.hub.config().engine_id,
            "status": status,
            "cache": {
                "entries": cache.entries,
                "maxEntries": cache.max_entries,
                "contexts": cache.contexts,
            },
        }))
    }

    pub async fn providers(&self, provider_type: Option<ProviderType>) -> Result<String> {
        let providers = match provider_type {
            Some(provider_type) => self.hub.list_by_type(provider_type).await,
            None => self.hub.list().await,
        };
        render(&providers)
    }

    pub async fn context(
        &self,
        provider_id: &str,
        context_types: &[ContextType],
        filters: ContextFilters,
    ) -> Result<String> {
        let contexts = self
            .hub
            .request_context(provider_id, context_types, &filters)
            .await?;
        render(&contexts)
    }

    /// Aggregate and transform a patient's context.
    ///
    /// An unknown format name is passed through, which prints the raw
    /// aggregated contexts.
    pub async fn patient(&self, patient_id: &str, format: &str, strict: bool) -> Result<String> {
        let contexts = if strict {
            self.hub.aggregate(patient_id, AggregationMode::Strict).await?
        } else {
            self.hub.aggregate_default(patient_id).await?
        };
        info!("Transforming {} contexts as {format}", contexts.len());

        match self
            .hub
            .transform_context_for_ai(contexts, &TargetFormat::parse(format))
        {
            TransformOutput::Hl7Message(message) => Ok(message.replace('\r', "\n")),
            output => render(&output.to_json()?),
        }
    }

    pub async fn sync(
        &self,
        source_id: &str,
        target_id: &str,
        context_types: &[ContextType],
    ) -> Result<String> {
        let outcome = self
            .hub
            .try_sync_context(source_id, target_id, context_types)
            .await;
        if !outcome.is_synced() {
            bail!("sync {source_id} -> {target_id} failed: {outcome:?}");
        }
        render(&json!({ "synced": true, "source": source_id, "target": target_id }))
    }

    pub async fn update(&self, provider_id: &str, raw_contexts: &str) -> Result<String> {
        let contexts: Vec<Context> = serde_json::from_str(raw_contexts)?;
        let count = contexts.len();
        self.hub.try_update_context(provider_id, contexts).await?;
        render(&json!({ "updated": true, "provider": provider_id, "contexts": count }))
    }
}

/// Build request filters from `--patient` and repeated `--filter key=value`.
pub fn build_filters(patient_id: Option<String>, pairs: &[String]) -> Result<ContextFilters> {
    let mut filters = ContextFilters {
        patient_id,
        ..Default::default()
    };
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("filter `{pair}` must be key=value");
        };
        filters = filters.with(key.trim(), value.trim());
    }
    Ok(filters)
}

fn render<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
