//! Scan-level data model shared by the spectrum stream, the peak cache and the
//! aggregation/chromatogram engines.
//!
//! Retention times in this module are always expressed in **minutes**. The mzML
//! layer reports seconds; conversion happens once, in [`ScanRecord::from_spectrum`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::mzml::{BinaryDecodeError, MzMLSpectrum, RawMzMLSpectrum};

/// Lower bound at or below which a window is considered open-ended.
pub const DEGENERATE_WINDOW_LOWER: f64 = 0.0;

/// Upper bound above which a window is considered open-ended.
pub const DEGENERATE_WINDOW_UPPER: f64 = 1_000_000.0;

/// Scan polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Polarity {
    /// Positive ion mode
    Positive,
    /// Negative ion mode
    Negative,
    /// Polarity not annotated in the source file
    #[default]
    Unknown,
}

impl Polarity {
    /// Decode the signed representation used in mzML models and cache tables
    pub fn from_i8(value: i8) -> Self {
        match value {
            v if v > 0 => Polarity::Positive,
            v if v < 0 => Polarity::Negative,
            _ => Polarity::Unknown,
        }
    }

    /// Signed representation: 1 positive, -1 negative, 0 unknown
    pub fn as_i8(self) -> i8 {
        match self {
            Polarity::Positive => 1,
            Polarity::Negative => -1,
            Polarity::Unknown => 0,
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Positive => write!(f, "Positive"),
            Polarity::Negative => write!(f, "Negative"),
            Polarity::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Error returned when a polarity string is not recognized
#[derive(Debug, thiserror::Error)]
#[error("Unknown polarity: {0}")]
pub struct ParsePolarityError(String);

impl FromStr for Polarity {
    type Err = ParsePolarityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" | "pos" | "+" | "1" => Ok(Polarity::Positive),
            "negative" | "neg" | "-" | "-1" => Ok(Polarity::Negative),
            "unknown" | "none" | "0" => Ok(Polarity::Unknown),
            _ => Err(ParsePolarityError(s.to_string())),
        }
    }
}

/// A single centroid peak
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Mass-to-charge ratio
    pub mz: f64,
    /// Signal intensity
    pub intensity: f32,
}

/// A peak placed in retention time, as handed to the map and chromatogram engines
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakPoint {
    /// Scan number the peak belongs to
    pub scan: i64,
    /// Retention time in minutes
    pub rt: f64,
    /// Peak m/z
    pub mz: f64,
    /// Peak intensity
    pub intensity: f32,
}

/// A fragmentation event drawn on top of MS1 data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrecursorMarker {
    /// Scan number of the MSn scan
    pub scan: i64,
    /// Retention time in minutes
    pub rt: f64,
    /// Selected precursor m/z
    pub precursor_mz: f64,
}

/// Closed retention-time interval in minutes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RtWindow {
    /// Inclusive lower bound (minutes)
    pub start: f64,
    /// Inclusive upper bound (minutes)
    pub end: f64,
}

impl RtWindow {
    /// Create a window, swapping the bounds if they are given in reverse order
    pub fn new(start: f64, end: f64) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// A window that selects the whole run
    pub fn unbounded() -> Self {
        Self {
            start: 0.0,
            end: f64::MAX,
        }
    }

    /// Whether the window means "no real window requested"
    pub fn is_degenerate(&self) -> bool {
        self.start <= DEGENERATE_WINDOW_LOWER && self.end > DEGENERATE_WINDOW_UPPER
    }

    /// Width of the window in minutes
    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    /// Inclusive membership test
    #[inline]
    pub fn contains(&self, rt: f64) -> bool {
        rt >= self.start && rt <= self.end
    }
}

/// Per-scan extraction problems. These are recovered locally by skipping the
/// scan and are never surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum PeakExtractionFailure {
    /// The scan carries no scan start time
    #[error("Scan {0} has no retention time")]
    MissingRetentionTime(String),

    /// The m/z and intensity arrays have different lengths
    #[error("Scan {id}: m/z array has {mz} values, intensity array has {intensity}")]
    ArrayLengthMismatch {
        /// Native scan ID
        id: String,
        /// m/z array length
        mz: usize,
        /// Intensity array length
        intensity: usize,
    },

    /// A binary data array could not be decoded
    #[error("Scan {id}: {source}")]
    Decode {
        /// Native scan ID
        id: String,
        /// Underlying decode error
        #[source]
        source: BinaryDecodeError,
    },
}

/// One acquisition event with its peaks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Native spectrum ID
    pub id: String,
    /// Position of the spectrum in the file (0-based)
    pub index: i64,
    /// Scan number derived from the native ID
    pub scan: i64,
    /// MS level (1 for MS1, 2 for MS2, ...)
    pub ms_level: i16,
    /// Retention time in minutes
    pub retention_time: f64,
    /// Scan polarity
    pub polarity: Polarity,
    /// Selected precursor m/z for MSn scans
    pub precursor_mz: Option<f64>,
    /// Centroid peaks
    pub peaks: Vec<Peak>,
}

impl ScanRecord {
    /// Build a scan record from a decoded mzML spectrum
    pub fn from_spectrum(spectrum: MzMLSpectrum) -> Result<Self, PeakExtractionFailure> {
        let retention_time = spectrum
            .retention_time
            .ok_or_else(|| PeakExtractionFailure::MissingRetentionTime(spectrum.id.clone()))?
            / 60.0;

        if spectrum.mz_array.len() != spectrum.intensity_array.len() {
            return Err(PeakExtractionFailure::ArrayLengthMismatch {
                id: spectrum.id,
                mz: spectrum.mz_array.len(),
                intensity: spectrum.intensity_array.len(),
            });
        }

        let scan = spectrum.scan_number().unwrap_or(spectrum.index + 1);
        let precursor_mz = spectrum.precursor_mz();
        let peaks = spectrum
            .mz_array
            .iter()
            .zip(spectrum.intensity_array.iter())
            .map(|(&mz, &intensity)| Peak {
                mz,
                intensity: intensity as f32,
            })
            .collect();

        Ok(Self {
            id: spectrum.id,
            index: spectrum.index,
            scan,
            ms_level: spectrum.ms_level,
            retention_time,
            polarity: Polarity::from_i8(spectrum.polarity),
            precursor_mz,
            peaks,
        })
    }

    /// Decode a raw spectrum and build a scan record from it
    pub fn from_raw(raw: RawMzMLSpectrum) -> Result<Self, PeakExtractionFailure> {
        let id = raw.id.clone();
        let spectrum = raw
            .decode()
            .map_err(|source| PeakExtractionFailure::Decode { id, source })?;
        Self::from_spectrum(spectrum)
    }

    /// Sum of all peak intensities
    pub fn total_intensity(&self) -> f64 {
        self.peaks.iter().map(|p| p.intensity as f64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_window() {
        assert!(RtWindow::new(0.0, 2_000_000.0).is_degenerate());
        assert!(RtWindow::unbounded().is_degenerate());
        assert!(!RtWindow::new(0.0, 30.0).is_degenerate());
        assert!(!RtWindow::new(1.0, 2_000_000.0).is_degenerate());
    }

    #[test]
    fn test_window_swaps_reversed_bounds() {
        let window = RtWindow::new(6.0, 5.0);
        assert_eq!(window.start, 5.0);
        assert_eq!(window.end, 6.0);
        assert!(window.contains(5.0));
        assert!(window.contains(6.0));
        assert!(!window.contains(6.0001));
    }

    #[test]
    fn test_polarity_parsing() {
        assert_eq!("Positive".parse::<Polarity>().unwrap(), Polarity::Positive);
        assert_eq!("negative".parse::<Polarity>().unwrap(), Polarity::Negative);
        assert!("sideways".parse::<Polarity>().is_err());
        assert_eq!(Polarity::from_i8(-1), Polarity::Negative);
        assert_eq!(Polarity::Positive.as_i8(), 1);
    }

    #[test]
    fn test_from_spectrum_converts_seconds_to_minutes() {
        let spectrum = MzMLSpectrum {
            index: 4,
            id: "scan=5".to_string(),
            ms_level: 1,
            polarity: 1,
            retention_time: Some(330.0),
            mz_array: vec![100.0, 200.0],
            intensity_array: vec![10.0, 20.0],
            ..Default::default()
        };
        let record = ScanRecord::from_spectrum(spectrum).unwrap();
        assert_eq!(record.scan, 5);
        assert!((record.retention_time - 5.5).abs() < 1e-12);
        assert_eq!(record.peaks.len(), 2);
        assert_eq!(record.polarity, Polarity::Positive);
        assert!((record.total_intensity() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_spectrum_rejects_missing_rt() {
        let spectrum = MzMLSpectrum {
            id: "scan=1".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ScanRecord::from_spectrum(spectrum),
            Err(PeakExtractionFailure::MissingRetentionTime(_))
        ));
    }
}
