use std::path::PathBuf;

use crate::mzml::{MzMLError, MzMLWriterError};
use crate::mzxml::MzXmlError;

/// Errors raised while fetching and converting a run
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The remote asset could not be downloaded
    #[error("could not fetch {uri}: {reason}")]
    Fetch {
        /// Location that was requested
        uri: String,
        /// What went wrong
        reason: String,
    },

    /// An external tool could not be started
    #[error("could not run {tool}: {source}")]
    ToolLaunch {
        /// Executable
        tool: String,
        /// Spawn error
        #[source]
        source: std::io::Error,
    },

    /// An external tool exited unsuccessfully or produced nothing
    #[error("{tool} failed on {input}: {reason}")]
    ToolFailed {
        /// Executable
        tool: String,
        /// Input file
        input: PathBuf,
        /// Exit status or missing output
        reason: String,
    },

    /// Converted output did not parse as a usable mzML run
    #[error("{path} is not a usable mzML run: {reason}")]
    Validation {
        /// Output that failed validation
        path: PathBuf,
        /// What the parser reported
        reason: String,
    },

    /// The source format has no conversion route
    #[error("no conversion route for '{0}'")]
    UnsupportedFormat(String),

    /// Every conversion tier failed
    #[error("conversion of {source_name} failed after all tiers: {reason}")]
    ConversionFailure {
        /// Source file name
        source_name: String,
        /// Failure of the last tier
        reason: String,
    },

    /// I/O error in the working directory or while publishing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to persist a temporary file at its final name
    #[error("could not publish {0}")]
    Persist(#[from] tempfile::PersistError),

    /// mzML read error during re-encoding
    #[error("mzML error: {0}")]
    MzML(#[from] MzMLError),

    /// mzXML read error during re-encoding
    #[error("mzXML error: {0}")]
    MzXml(#[from] MzXmlError),

    /// mzML write error during re-encoding
    #[error("mzML write error: {0}")]
    Writer(#[from] MzMLWriterError),
}
