//! # mzML Module
//!
//! Streaming reading and indexed writing of mzML, the open spectral format every
//! run is normalized to before analysis.
//!
//! ## Design Goals
//!
//! - **Streaming**: Process arbitrarily large files without loading into memory
//! - **Random access**: Use the `indexList` offsets of indexed mzML to seek
//!   directly to a spectrum
//! - **Tolerant**: XML parsing and binary decoding are split, so a spectrum whose
//!   arrays are corrupt can be skipped without losing the rest of the run
//!
//! ## mzML Structure
//!
//! ```text
//! indexedmzML (optional wrapper)
//! ├── mzML
//! │   └── run
//! │       └── spectrumList
//! │           └── spectrum* (many)
//! │               ├── cvParam*
//! │               ├── scanList
//! │               ├── precursorList (for MS2+)
//! │               └── binaryDataArrayList
//! ├── indexList
//! │   └── index name="spectrum"
//! │       └── offset idRef="..." (byte offset of <spectrum>)
//! └── indexListOffset
//! ```

mod binary;
mod cv_params;
mod models;
pub mod streamer;
pub mod writer;

pub use binary::{
    BinaryDecodeError, BinaryDecoder, BinaryEncoder, BinaryEncoding,
    CompressionType as BinaryCompression,
};
pub use cv_params::{normalize_retention_time, CvParam, MS_CV_ACCESSIONS};
pub use models::*;
pub use streamer::{read_index, MzMLError, MzMLStreamer, RawSpectrumIterator, SpectrumIterator};
pub use writer::{MzMLWriter, MzMLWriterError};
