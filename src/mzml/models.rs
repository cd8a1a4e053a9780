//! Data models for mzML structures
//!
//! These models represent the parsed mzML data in a Rust-native format. A
//! spectrum is first captured as a [`RawMzMLSpectrum`] (XML parsed, arrays still
//! Base64) and decoded separately, so that a corrupt array only costs one scan.

use super::binary::{BinaryDecodeError, BinaryDecoder, BinaryEncoding, CompressionType};
use super::cv_params::CvParam;

/// Represents a single decoded spectrum
#[derive(Debug, Clone, Default)]
pub struct MzMLSpectrum {
    /// Spectrum index (0-based)
    pub index: i64,

    /// Native spectrum ID from the file
    pub id: String,

    /// Default array length (number of peaks)
    pub default_array_length: usize,

    /// MS level (1 for MS1, 2 for MS2, etc.)
    pub ms_level: i16,

    /// Whether this is a centroid (true) or profile (false) spectrum
    pub centroided: bool,

    /// Polarity: 1 for positive, -1 for negative, 0 for unknown
    pub polarity: i8,

    /// Retention time in seconds
    pub retention_time: Option<f64>,

    /// Total ion current
    pub total_ion_current: Option<f64>,

    /// Precursor information (for MS2+ spectra)
    pub precursors: Vec<Precursor>,

    /// m/z array (decoded)
    pub mz_array: Vec<f64>,

    /// Intensity array (decoded)
    pub intensity_array: Vec<f64>,
}

impl MzMLSpectrum {
    /// Get the scan number from the native ID
    pub fn scan_number(&self) -> Option<i64> {
        scan_number_from_id(&self.id, self.index)
    }

    /// Get the number of peaks
    pub fn peak_count(&self) -> usize {
        self.mz_array.len()
    }

    /// m/z of the first selected precursor ion, falling back to the isolation
    /// window target
    pub fn precursor_mz(&self) -> Option<f64> {
        self.precursors
            .first()
            .and_then(|p| p.selected_ion_mz.or(p.isolation_window_target))
    }
}

/// Precursor ion information for MS2+ spectra
#[derive(Debug, Clone, Default)]
pub struct Precursor {
    /// Reference to the precursor spectrum ID
    pub spectrum_ref: Option<String>,

    /// Isolation window target m/z
    pub isolation_window_target: Option<f64>,

    /// Selected ion m/z
    pub selected_ion_mz: Option<f64>,

    /// Selected ion charge state
    pub selected_ion_charge: Option<i16>,
}

/// Raw binary data container for deferred decoding
#[derive(Debug, Clone, Default)]
pub struct RawBinaryData {
    /// Raw Base64-encoded string from the mzML file
    pub base64: String,
    /// Binary encoding precision (Float32 or Float64)
    pub encoding: BinaryEncoding,
    /// Compression type (None, Zlib, etc.)
    pub compression: CompressionType,
}

impl RawBinaryData {
    /// Check if this container has data
    pub fn is_empty(&self) -> bool {
        self.base64.trim().is_empty()
    }

    fn decode(&self, expected_length: Option<usize>) -> Result<Vec<f64>, BinaryDecodeError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        BinaryDecoder::decode(&self.base64, self.encoding, self.compression, expected_length)
    }
}

/// Raw spectrum data with deferred binary decoding
///
/// Mirrors [`MzMLSpectrum`] but holds binary arrays as raw Base64 strings.
/// Parsing the XML is cheap compared to decoding, which is why index probes
/// (that only need the retention time) never decode.
#[derive(Debug, Clone, Default)]
pub struct RawMzMLSpectrum {
    /// Spectrum index (0-based)
    pub index: i64,

    /// Native spectrum ID from the file
    pub id: String,

    /// Default array length (number of peaks)
    pub default_array_length: usize,

    /// MS level (1 for MS1, 2 for MS2, etc.)
    pub ms_level: i16,

    /// Whether this is a centroid (true) or profile (false) spectrum
    pub centroided: bool,

    /// Polarity: 1 for positive, -1 for negative, 0 for unknown
    pub polarity: i8,

    /// Retention time in seconds
    pub retention_time: Option<f64>,

    /// Total ion current
    pub total_ion_current: Option<f64>,

    /// Precursor information (for MS2+ spectra)
    pub precursors: Vec<Precursor>,

    /// Raw m/z array data (Base64 + encoding info)
    pub mz_data: RawBinaryData,

    /// Raw intensity array data (Base64 + encoding info)
    pub intensity_data: RawBinaryData,

    /// All spectrum-level CV parameters
    pub cv_params: Vec<CvParam>,
}

impl RawMzMLSpectrum {
    /// Get the scan number from the native ID.
    pub fn scan_number(&self) -> Option<i64> {
        scan_number_from_id(&self.id, self.index)
    }

    /// Decode this raw spectrum into a fully decoded MzMLSpectrum
    ///
    /// # Errors
    /// Returns an error if decoding fails (invalid Base64, decompression error,
    /// length mismatch with `defaultArrayLength`).
    pub fn decode(self) -> Result<MzMLSpectrum, BinaryDecodeError> {
        let expected = (self.default_array_length > 0).then_some(self.default_array_length);
        let mz_array = self.mz_data.decode(expected)?;
        let intensity_array = self.intensity_data.decode(expected)?;

        Ok(MzMLSpectrum {
            index: self.index,
            id: self.id,
            default_array_length: self.default_array_length,
            ms_level: self.ms_level,
            centroided: self.centroided,
            polarity: self.polarity,
            retention_time: self.retention_time,
            total_ion_current: self.total_ion_current,
            precursors: self.precursors,
            mz_array,
            intensity_array,
        })
    }
}

fn scan_number_from_id(id: &str, index: i64) -> Option<i64> {
    // Common formats:
    // "scan=12345"
    // "controllerType=0 controllerNumber=1 scan=12345"
    // "S12345"
    if let Some(pos) = id.find("scan=") {
        let start = pos + 5;
        let end = id[start..]
            .find(|c: char| !c.is_ascii_digit())
            .map(|i| start + i)
            .unwrap_or(id.len());
        id[start..end].parse().ok()
    } else if let Some(rest) = id.strip_prefix('S') {
        rest.parse().ok()
    } else {
        // Fall back to index + 1
        Some(index + 1)
    }
}

/// File-level metadata read before the spectrum list
#[derive(Debug, Clone, Default)]
pub struct MzMLFileMetadata {
    /// mzML version
    pub version: Option<String>,

    /// Run ID
    pub run_id: Option<String>,
}

/// Index entry for indexed mzML files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Native ID referenced by the entry
    pub id: String,
    /// Byte offset of the element start tag
    pub offset: u64,
}

/// Complete index from indexedmzML
#[derive(Debug, Clone, Default)]
pub struct MzMLIndex {
    /// Spectrum offsets, in document order
    pub spectrum_index: Vec<IndexEntry>,
    /// Byte offset of the `indexList` element
    pub index_list_offset: Option<u64>,
}

impl MzMLIndex {
    /// Check if this is an indexed file
    pub fn is_indexed(&self) -> bool {
        self.index_list_offset.is_some() && !self.spectrum_index.is_empty()
    }

    /// Get spectrum count
    pub fn spectrum_count(&self) -> usize {
        self.spectrum_index.len()
    }
}
