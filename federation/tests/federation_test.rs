//! Integration tests for the federation hub.
//!
//! These tests drive the public hub API end to end:
//! - Registry upserts and capability checks
//! - Sync and update through the message processor
//! - Patient aggregation with a failing provider
//! - Summary, FHIR and HL7 transforms of aggregated context

use std::sync::Arc;

use async_trait::async_trait;
use carelink_federation::{
    AggregationMode, Context, ContextFilters, ContextGenerator, ContextType, FederationConfig,
    FederationError, FederationHub, MessageStatus, Provider, ProviderType, TargetFormat,
    TransformOutput,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn epic() -> Provider {
    Provider::new("epic-ehr", "Epic EHR System", ProviderType::EhrSystem).with_supported_types([
        ContextType::MedicalHistory,
        ContextType::ClinicalNotes,
    ])
}

fn lab() -> Provider {
    Provider::new("lab-system", "Laboratory Information System", ProviderType::LabSystem)
        .with_supported_types([ContextType::LabResults])
}

async fn two_provider_hub() -> FederationHub {
    FederationHub::builder()
        .with_default_providers(false)
        .with_provider(epic())
        .with_provider(lab())
        .build()
        .await
        .unwrap()
}

struct FailingLab;

#[async_trait]
impl ContextGenerator for FailingLab {
    fn provider_type(&self) -> ProviderType {
        ProviderType::LabSystem
    }

    async fn generate(
        &self,
        provider: &Provider,
        _context_type: ContextType,
        _filters: &ContextFilters,
    ) -> carelink_federation::Result<Vec<Context>> {
        Err(FederationError::Generation {
            provider_id: provider.id.clone(),
            reason: "interface engine offline".to_string(),
        })
    }
}

#[tokio::test]
async fn test_register_is_idempotent_upsert() {
    let hub = two_provider_hub().await;

    let replaced = hub
        .register(epic().with_version("2.0"))
        .await
        .unwrap();
    assert_eq!(replaced.version, "1.0");

    let ids: Vec<_> = hub.list().await.into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec!["epic-ehr", "lab-system"]);
    assert_eq!(hub.provider("epic-ehr").await.unwrap().version, "2.0");
}

#[tokio::test]
async fn test_unregister() {
    let hub = two_provider_hub().await;

    assert_eq!(hub.unregister("lab-system").await.unwrap().id, "lab-system");
    assert!(matches!(
        hub.unregister("lab-system").await,
        Err(FederationError::NotFound(_))
    ));
    assert_eq!(hub.list_by_type(ProviderType::LabSystem).await, Vec::new());
}

#[tokio::test]
async fn test_request_reports_unsupported_subset() {
    let hub = two_provider_hub().await;

    let err = hub
        .request_context(
            "epic-ehr",
            &[ContextType::MedicalHistory, ContextType::Imaging],
            &ContextFilters::default(),
        )
        .await
        .unwrap_err();

    match err {
        FederationError::UnsupportedContextType { unsupported, .. } => {
            assert_eq!(unsupported, vec![ContextType::Imaging]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_sync_between_missing_providers_fails() {
    let hub = two_provider_hub().await;

    assert!(
        !hub.sync_context("missing-src", "missing-dst", &[ContextType::MedicalHistory])
            .await
    );
    assert!(hub.messages().await.is_empty());
}

#[tokio::test]
async fn test_sync_to_missing_target_is_audited() {
    let hub = two_provider_hub().await;

    assert!(
        !hub.sync_context("epic-ehr", "missing-dst", &[ContextType::MedicalHistory])
            .await
    );

    let log = hub.audit_log().await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].message.recipient, "missing-dst");
    assert!(matches!(log[0].status, MessageStatus::Rejected { .. }));
}

#[tokio::test]
async fn test_update_delivers_to_known_provider() {
    let hub = two_provider_hub().await;
    let contexts = hub
        .request_context(
            "lab-system",
            &[ContextType::LabResults],
            &ContextFilters::for_patient("p-42"),
        )
        .await
        .unwrap();

    assert!(hub.update_context("epic-ehr", contexts.clone()).await);
    assert!(!hub.update_context("missing", contexts).await);

    let log = hub.audit_log().await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].message.sender, "mcp-service");
    assert_eq!(log[0].status, MessageStatus::Delivered);
}

#[tokio::test]
async fn test_patient_context_skips_failing_provider() {
    let hub = FederationHub::builder()
        .with_default_providers(false)
        .with_provider(epic())
        .with_provider(lab())
        .with_generator(Arc::new(FailingLab))
        .build()
        .await
        .unwrap();

    let contexts = hub.get_patient_context("p-42").await;
    let epic_only = hub
        .request_context(
            "epic-ehr",
            &[ContextType::MedicalHistory, ContextType::ClinicalNotes],
            &ContextFilters::for_patient("p-42"),
        )
        .await
        .unwrap();

    let types: Vec<_> = contexts.iter().map(|c| c.context_type).collect();
    let expected: Vec<_> = epic_only.iter().map(|c| c.context_type).collect();
    assert_eq!(types, expected);
    assert!(contexts.iter().all(|c| c.source == "epic-ehr"));

    let err = hub
        .aggregate("p-42", AggregationMode::Strict)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FederationError::Generation { provider_id, .. } if provider_id == "lab-system"
    ));
}

#[tokio::test]
async fn test_patient_context_excludes_models() {
    let hub = FederationHub::new(FederationConfig::default()).await.unwrap();

    let contexts = hub.get_patient_context("p-42").await;
    assert!(!contexts.is_empty());
    assert!(contexts.iter().all(|c| c.patient_id() == Some("p-42")));
    assert!(
        contexts
            .iter()
            .all(|c| c.source != "med-gemma-ai" && c.source != "clinical-bert")
    );
}

#[tokio::test]
async fn test_patient_scenario_transforms() {
    let hub = two_provider_hub().await;
    let contexts = hub.get_patient_context("p-42").await;

    let types: Vec<_> = contexts.iter().map(|c| c.context_type).collect();
    assert_eq!(
        types,
        vec![
            ContextType::MedicalHistory,
            ContextType::ClinicalNotes,
            ContextType::LabResults,
        ]
    );

    let TransformOutput::ClinicalSummary(summary) =
        hub.transform_context_for_ai(contexts.clone(), &TargetFormat::ClinicalSummary)
    else {
        panic!("expected a clinical summary");
    };
    assert_eq!(
        summary.patient_summary,
        "Medical History: Hypertension, Type 2 Diabetes, Hyperlipidemia\n\
         Current Medications: None documented\n\
         Recent Clinical Notes:\n\
         - Chest pain and shortness of breath"
    );
    assert_eq!(summary.recent_labs.len(), 1);
    assert!(summary.current_medications.is_empty());

    let TransformOutput::FhirBundle(bundle) =
        hub.transform_context_for_ai(contexts.clone(), &TargetFormat::FhirBundle)
    else {
        panic!("expected a FHIR bundle");
    };
    assert_eq!(bundle.entry.len(), contexts.len());
    assert_eq!(bundle.bundle_type, "collection");

    let TransformOutput::Hl7Message(hl7) =
        hub.transform_context_for_ai(contexts, &TargetFormat::Hl7Message)
    else {
        panic!("expected an HL7 message");
    };
    let segments: Vec<_> = hl7.split('\r').collect();
    assert_eq!(segments.len(), 2);
    assert!(segments[0].starts_with("MSH|^~\\&|MCP|SYSTEM|AI|MODEL|"));
    assert_eq!(segments[1], "OBX|1|NM|Troponin I||0.05|ng/mL|<0.04|H|||F");
}

#[tokio::test]
async fn test_empty_and_unknown_format_transforms() {
    let hub = two_provider_hub().await;

    let TransformOutput::FhirBundle(bundle) =
        hub.transform_context_for_ai(Vec::new(), &TargetFormat::FhirBundle)
    else {
        panic!("expected a FHIR bundle");
    };
    assert!(bundle.entry.is_empty());

    let contexts = hub.get_patient_context("p-7").await;
    assert_eq!(
        hub.transform_context_for_ai(contexts.clone(), &TargetFormat::parse("cda-document")),
        TransformOutput::Passthrough(contexts)
    );
}

#[tokio::test]
async fn test_status_and_clear_cache() {
    let hub = two_provider_hub().await;
    hub.get_patient_context("p-42").await;
    hub.sync_context("epic-ehr", "lab-system", &[ContextType::ClinicalNotes])
        .await;

    let status = hub.status().await;
    assert_eq!(status.providers, 2);
    assert_eq!(status.cached_contexts, 3);
    assert_eq!(status.queued_messages, 1);
    assert_eq!(
        status.supported_types,
        vec![
            ContextType::MedicalHistory,
            ContextType::ClinicalNotes,
            ContextType::LabResults,
        ]
    );

    hub.clear_cache().await;
    let status = hub.status().await;
    assert_eq!(status.cached_contexts, 0);
    assert_eq!(status.queued_messages, 1);
}

#[tokio::test]
async fn test_hub_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("carelink.toml");
    std::fs::write(
        &path,
        r#"
engine_id = "ward-7"
seed_default_providers = false

[messaging]
sign_messages = false
"#,
    )
    .unwrap();

    let config = FederationConfig::load(&path).await.unwrap();
    let hub = FederationHub::builder()
        .with_config(config)
        .with_provider(lab())
        .build()
        .await
        .unwrap();

    assert_eq!(hub.status().await.providers, 1);
    assert!(hub.update_context("lab-system", Vec::new()).await);

    let messages = hub.messages().await;
    assert_eq!(messages[0].sender, "ward-7");
    assert_eq!(messages[0].signature, None);
}
