//! Built-in healthcare providers registered when seeding is enabled.

use carelink_protocol::{ContextType, Provider, ProviderType};

/// The default provider set: two record systems, a lab, an imaging archive,
/// a pharmacy and two reasoning models.
pub fn default_providers() -> Vec<Provider> {
    use ContextType::*;

    vec![
        Provider::new("epic-ehr", "Epic EHR System", ProviderType::EhrSystem)
            .with_endpoint("/api/mcp/epic")
            .with_capabilities([
                "patient-data",
                "clinical-notes",
                "medication-list",
                "allergy-list",
            ])
            .with_supported_types([MedicalHistory, ClinicalNotes, Medications, Allergies])
            .with_compliance(["HIPAA", "FHIR R4", "HL7"]),
        Provider::new("cerner-ehr", "Cerner EHR System", ProviderType::EhrSystem)
            .with_endpoint("/api/mcp/cerner")
            .with_capabilities(["patient-data", "clinical-notes", "medication-list", "lab-results"])
            .with_supported_types([MedicalHistory, ClinicalNotes, Medications, LabResults])
            .with_compliance(["HIPAA", "FHIR R4", "HL7"]),
        Provider::new("lab-system", "Laboratory Information System", ProviderType::LabSystem)
            .with_endpoint("/api/mcp/lab")
            .with_capabilities(["lab-results", "critical-values", "trending"])
            .with_supported_types([LabResults])
            .with_compliance(["HIPAA", "CLIA", "HL7"]),
        Provider::new("pacs-imaging", "PACS Imaging System", ProviderType::ImagingSystem)
            .with_endpoint("/api/mcp/pacs")
            .with_capabilities(["imaging-reports", "dicom-data", "comparative-studies"])
            .with_supported_types([Imaging])
            .with_compliance(["HIPAA", "DICOM", "IHE"]),
        Provider::new("pharmacy-system", "Pharmacy Management System", ProviderType::PharmacySystem)
            .with_endpoint("/api/mcp/pharmacy")
            .with_capabilities(["medication-history", "drug-interactions", "formulary-check"])
            .with_supported_types([Medications])
            .with_compliance(["HIPAA", "NCPDP"]),
        Provider::new("med-gemma-ai", "Med-Gemma AI Model", ProviderType::AiModel)
            .with_endpoint("/api/mcp/med-gemma")
            .with_capabilities([
                "clinical-reasoning",
                "diagnosis-support",
                "treatment-recommendations",
            ])
            .with_supported_types([MedicalHistory, ClinicalNotes, LabResults, Imaging])
            .with_compliance(["HIPAA", "Medical AI Standards"]),
        Provider::new("clinical-bert", "ClinicalBERT Model", ProviderType::AiModel)
            .with_endpoint("/api/mcp/clinical-bert")
            .with_capabilities(["text-analysis", "entity-extraction", "clinical-coding"])
            .with_supported_types([ClinicalNotes])
            .with_compliance(["HIPAA", "Medical NLP Standards"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_provider_ids_unique() {
        let providers = default_providers();
        let ids: HashSet<_> = providers.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), 7);
        assert_eq!(
            providers.iter().filter(|p| p.provider_type.is_model()).count(),
            2
        );
    }
}
