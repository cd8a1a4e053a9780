//! Request-level errors
//!
//! Every user-visible failure names the identifier it was raised for and the
//! pipeline stage that could not produce data.

use std::fmt;

use thiserror::Error;

use crate::cache::CacheError;
use crate::convert::ConvertError;
use crate::mzml::MzMLError;
use crate::resolver::{LookupError, ResolveError};
use crate::usi::UsiError;
use crate::xic::XicError;

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Identifier parsing and provider lookup
    Resolution,
    /// Download, conversion and validation
    Conversion,
    /// Reading scans for a view
    Extraction,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Resolution => write!(f, "resolution"),
            Stage::Conversion => write!(f, "conversion"),
            Stage::Extraction => write!(f, "extraction"),
        }
    }
}

/// Underlying cause of a [`PipelineError`]
#[derive(Debug, Error)]
pub enum StageError {
    /// Malformed identifier
    #[error(transparent)]
    Identifier(#[from] UsiError),

    /// Provider lookup failed
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A provider client could not be set up
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// No canonical file could be produced
    #[error(transparent)]
    Convert(#[from] ConvertError),

    /// The canonical file could not be read
    #[error(transparent)]
    Stream(#[from] MzMLError),

    /// The peak cache could not be built
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Chromatogram extraction failed
    #[error(transparent)]
    Xic(#[from] XicError),

    /// The run has no readable scans
    #[error("run contains no readable scans")]
    NoScans,
}

/// A request that produced no data
#[derive(Debug, Error)]
#[error("{stage} failed for {identifier}: {source}")]
pub struct PipelineError {
    /// Identifier of the request
    pub identifier: String,
    /// Stage that failed
    pub stage: Stage,
    /// Cause
    #[source]
    pub source: StageError,
}

impl PipelineError {
    /// Wrap `source` for `identifier` at `stage`
    pub fn new(identifier: impl Into<String>, stage: Stage, source: impl Into<StageError>) -> Self {
        Self {
            identifier: identifier.into(),
            stage,
            source: source.into(),
        }
    }
}

/// Result type for request-level operations
pub type Result<T> = std::result::Result<T, PipelineError>;
