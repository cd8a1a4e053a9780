use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// External converter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Open-format converter executable (ProteoWizard `msconvert`)
    pub converter: PathBuf,
    /// Vendor raw decoder executable (`ThermoRawFileParser`)
    pub raw_decoder: PathBuf,
    /// Fixed arguments passed to the converter before the output options
    pub converter_args: Vec<String>,
    /// Fixed arguments passed to the raw decoder before the input/output options
    pub raw_decoder_args: Vec<String>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            converter: PathBuf::from("msconvert"),
            raw_decoder: PathBuf::from("ThermoRawFileParser"),
            converter_args: [
                "--mzML",
                "--32",
                "--zlib",
                "--filter",
                "peakPicking true 1-",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            // 2 = indexed mzML
            raw_decoder_args: vec!["-f=2".to_string()],
        }
    }
}
