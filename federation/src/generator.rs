//! Context generators.
//!
//! A generator turns a `(context type, filters)` request into normalized
//! [`Context`] entries for one kind of provider. The built-in generators
//! return illustrative records; a deployment swaps any of them for an
//! adapter to the real system through [`GeneratorSet::insert`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use carelink_protocol::{
    Context, ContextFilters, ContextMetadata, ContextType, Provider, ProviderType, Urgency,
};
use chrono::Utc;
use serde_json::json;

use crate::error::Result;

/// Trait for per-provider-type context sources.
#[async_trait]
pub trait ContextGenerator: Send + Sync {
    /// The provider type this generator serves.
    fn provider_type(&self) -> ProviderType;

    /// Produce the contexts of `context_type` that `provider` holds.
    ///
    /// Returning an empty list is valid; the router has already checked that
    /// the provider supports `context_type`.
    async fn generate(
        &self,
        provider: &Provider,
        context_type: ContextType,
        filters: &ContextFilters,
    ) -> Result<Vec<Context>>;
}

/// Metadata shared by every context a provider issues for a request.
fn base_metadata(provider: &Provider, filters: &ContextFilters) -> ContextMetadata {
    ContextMetadata::for_patient(filters.patient_id.clone()).with_provider(provider.id.clone())
}

/// Electronic health record generator.
#[derive(Debug, Default)]
pub struct EhrGenerator;

#[async_trait]
impl ContextGenerator for EhrGenerator {
    fn provider_type(&self) -> ProviderType {
        ProviderType::EhrSystem
    }

    async fn generate(
        &self,
        provider: &Provider,
        context_type: ContextType,
        filters: &ContextFilters,
    ) -> Result<Vec<Context>> {
        let context = match context_type {
            ContextType::MedicalHistory => Context::new(
                context_type,
                provider.id.clone(),
                json!({
                    "conditions": ["Hypertension", "Type 2 Diabetes", "Hyperlipidemia"],
                    "surgeries": ["Appendectomy (2015)", "Cholecystectomy (2020)"],
                    "familyHistory": ["Father: CAD", "Mother: Breast Cancer"],
                }),
            )
            .with_confidence(0.95)
            .with_metadata(base_metadata(provider, filters).with_compliance(["HIPAA", "FHIR R4"])),
            ContextType::ClinicalNotes => Context::new(
                context_type,
                provider.id.clone(),
                json!({
                    "chiefComplaint": "Chest pain and shortness of breath",
                    "assessment": "Rule out acute coronary syndrome",
                    "plan": "EKG, cardiac enzymes, chest X-ray",
                }),
            )
            .with_confidence(0.90)
            .with_metadata(
                base_metadata(provider, filters)
                    .with_encounter_type("emergency")
                    .with_specialty("cardiology")
                    .with_urgency(Urgency::High),
            ),
            _ => return Ok(Vec::new()),
        };
        Ok(vec![context])
    }
}

/// Laboratory information system generator.
#[derive(Debug, Default)]
pub struct LabGenerator;

#[async_trait]
impl ContextGenerator for LabGenerator {
    fn provider_type(&self) -> ProviderType {
        ProviderType::LabSystem
    }

    async fn generate(
        &self,
        provider: &Provider,
        context_type: ContextType,
        filters: &ContextFilters,
    ) -> Result<Vec<Context>> {
        if context_type != ContextType::LabResults {
            return Ok(Vec::new());
        }

        let now = Utc::now().to_rfc3339();
        let context = Context::new(
            context_type,
            provider.id.clone(),
            json!({
                "tests": [
                    { "name": "Troponin I", "value": 0.05, "units": "ng/mL", "reference": "<0.04", "flag": "H" },
                    { "name": "CK-MB", "value": 3.2, "units": "ng/mL", "reference": "0.0-3.6", "flag": "N" },
                    { "name": "BNP", "value": 150, "units": "pg/mL", "reference": "<100", "flag": "H" },
                ],
                "collectionTime": now,
                "resultTime": now,
            }),
        )
        .with_confidence(0.98)
        .with_metadata(
            base_metadata(provider, filters)
                .with_urgency(Urgency::High)
                .with_compliance(["HIPAA", "CLIA"]),
        );
        Ok(vec![context])
    }
}

/// Imaging archive generator.
#[derive(Debug, Default)]
pub struct ImagingGenerator;

#[async_trait]
impl ContextGenerator for ImagingGenerator {
    fn provider_type(&self) -> ProviderType {
        ProviderType::ImagingSystem
    }

    async fn generate(
        &self,
        provider: &Provider,
        context_type: ContextType,
        filters: &ContextFilters,
    ) -> Result<Vec<Context>> {
        if context_type != ContextType::Imaging {
            return Ok(Vec::new());
        }

        let context = Context::new(
            context_type,
            provider.id.clone(),
            json!({
                "studyType": "Chest CT with contrast",
                "findings": "No acute pulmonary embolism. Mild coronary calcifications.",
                "impression": "Negative for PE. Atherosclerotic disease present.",
                "radiologist": "Dr. Radiologist",
            }),
        )
        .with_confidence(0.92)
        .with_metadata(base_metadata(provider, filters).with_compliance(["HIPAA", "DICOM"]));
        Ok(vec![context])
    }
}

/// Pharmacy management system generator.
#[derive(Debug, Default)]
pub struct PharmacyGenerator;

#[async_trait]
impl ContextGenerator for PharmacyGenerator {
    fn provider_type(&self) -> ProviderType {
        ProviderType::PharmacySystem
    }

    async fn generate(
        &self,
        provider: &Provider,
        context_type: ContextType,
        filters: &ContextFilters,
    ) -> Result<Vec<Context>> {
        if context_type != ContextType::Medications {
            return Ok(Vec::new());
        }

        let context = Context::new(
            context_type,
            provider.id.clone(),
            json!({
                "currentMedications": [
                    { "name": "Lisinopril", "dose": "10mg", "frequency": "daily", "indication": "hypertension" },
                    { "name": "Metformin", "dose": "500mg", "frequency": "twice daily", "indication": "diabetes" },
                ],
                "allergies": ["Penicillin", "Sulfa drugs"],
                "interactions": [],
            }),
        )
        .with_confidence(0.96)
        .with_metadata(base_metadata(provider, filters).with_compliance(["HIPAA", "NCPDP"]));
        Ok(vec![context])
    }
}

/// Reasoning model generator. Answers with an analysis for any type.
#[derive(Debug, Default)]
pub struct ModelGenerator;

#[async_trait]
impl ContextGenerator for ModelGenerator {
    fn provider_type(&self) -> ProviderType {
        ProviderType::AiModel
    }

    async fn generate(
        &self,
        provider: &Provider,
        context_type: ContextType,
        filters: &ContextFilters,
    ) -> Result<Vec<Context>> {
        let context = Context::new(
            context_type,
            provider.id.clone(),
            json!({
                "analysis": "AI-generated clinical insights based on available data",
                "recommendations": ["Consider cardiac catheterization", "Monitor troponin levels"],
                "confidence": 0.85,
            }),
        )
        .with_confidence(0.85)
        .with_metadata(
            base_metadata(provider, filters).with_compliance(["HIPAA", "Medical AI Standards"]),
        );
        Ok(vec![context])
    }
}

/// Generators keyed by the provider type they serve.
#[derive(Clone, Default)]
pub struct GeneratorSet {
    generators: HashMap<ProviderType, Arc<dyn ContextGenerator>>,
}

impl GeneratorSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in generator for every provider type.
    pub fn defaults() -> Self {
        let mut set = Self::new();
        set.insert(Arc::new(EhrGenerator));
        set.insert(Arc::new(LabGenerator));
        set.insert(Arc::new(ImagingGenerator));
        set.insert(Arc::new(PharmacyGenerator));
        set.insert(Arc::new(ModelGenerator));
        set
    }

    /// Install a generator, replacing the one serving the same provider type.
    pub fn insert(&mut self, generator: Arc<dyn ContextGenerator>) {
        self.generators.insert(generator.provider_type(), generator);
    }

    /// The generator serving `provider_type`.
    pub fn get(&self, provider_type: ProviderType) -> Option<Arc<dyn ContextGenerator>> {
        self.generators.get(&provider_type).cloned()
    }
}
