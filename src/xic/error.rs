//! Error types for chromatogram extraction

use thiserror::Error;

use crate::mzml::MzMLError;

/// Errors that can occur during chromatogram extraction
#[derive(Debug, Error)]
pub enum XicError {
    /// The cache cannot answer; callers retry on the stream
    #[error("Fast path unavailable: {0}")]
    FastPathUnavailable(String),

    /// Reading the mzML file failed
    #[error("Stream error: {0}")]
    Stream(#[from] MzMLError),

    /// CSV output failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
