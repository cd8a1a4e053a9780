use serde::{Deserialize, Serialize};

/// Base URLs of every provider service
///
/// Each field is the root the provider-specific path is appended to, so a
/// mirror (or a local test server) can be substituted per provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderEndpoints {
    /// MassIVE (dataset file lookups and downloads)
    pub massive: String,
    /// GNPS (task outputs and library provenance)
    pub gnps: String,
    /// GNPS quickstart conversion service
    pub gnps_quickstart: String,
    /// MetaboLights web service
    pub metabolights: String,
    /// GlycoPOST
    pub glycopost: String,
    /// Metabolomics Workbench
    pub workbench: String,
    /// ProteomeCentral (ProteomeXchange dataset metadata)
    pub proteomecentral: String,
    /// PRIDE archive web service
    pub pride: String,
    /// Per-request timeout in seconds for metadata lookups
    pub timeout_secs: u64,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            massive: "https://massive.ucsd.edu".to_string(),
            gnps: "https://gnps.ucsd.edu".to_string(),
            gnps_quickstart: "https://gnps-quickstart.ucsd.edu".to_string(),
            metabolights: "https://www.ebi.ac.uk/metabolights/ws".to_string(),
            glycopost: "https://glycopost.glycosmos.org".to_string(),
            workbench: "https://www.metabolomicsworkbench.org".to_string(),
            proteomecentral: "https://proteomecentral.proteomexchange.org".to_string(),
            pride: "https://www.ebi.ac.uk/pride/ws/archive/v2".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ProviderEndpoints {
    /// Point every provider at one base URL (mirrors, local test servers)
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            massive: base.clone(),
            gnps: base.clone(),
            gnps_quickstart: base.clone(),
            metabolights: base.clone(),
            glycopost: base.clone(),
            workbench: base.clone(),
            proteomecentral: base.clone(),
            pride: base,
            ..Self::default()
        }
    }
}
