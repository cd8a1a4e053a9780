use crate::mzml::BinaryDecodeError;

/// Errors that can occur while reading mzXML
#[derive(Debug, thiserror::Error)]
pub enum MzXmlError {
    /// Error parsing XML
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 encoding error in an attribute
    #[error("UTF-8 encoding error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// The peak payload could not be Base64-decoded or inflated
    #[error("Scan {scan}: {source}")]
    Decode {
        /// Scan number
        scan: i64,
        /// Underlying decode error
        #[source]
        source: BinaryDecodeError,
    },

    /// The scan carries no usable retentionTime attribute
    #[error("Scan {0} has no retention time")]
    MissingRetentionTime(i64),

    /// The decoded peak list is inconsistent with its declaration
    #[error("Scan {scan}: invalid peak data ({reason})")]
    InvalidPeaks {
        /// Scan number
        scan: i64,
        /// What was wrong
        reason: String,
    },
}
