//! # Chromatogram Extractor
//!
//! Extracted and total ion chromatograms over a retention-time window.
//!
//! Two [`ChromatogramStrategy`] implementations produce the same table shape
//! (one row per MS1 scan in range, one column per target):
//!
//! - [`CacheStrategy`] sums matching peaks from the columnar cache and fails with
//!   [`XicError::FastPathUnavailable`] when no usable cache exists.
//! - [`StreamStrategy`] streams the scans from the mzML file.
//!
//! [`extract`] tries the cache first and falls back to streaming on that one
//! failure class.
//!
//! The cache keeps at most the build-time per-scan peak cap, so scans above
//! that cap can sum slightly lower on the fast path.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use crate::cache::CacheConfig;
use crate::scan::{Polarity, PrecursorMarker, RtWindow};

mod error;
mod fast;
mod slow;


pub use error::XicError;
pub use fast::CacheStrategy;
pub use slow::StreamStrategy;

/// Label of the single column of a total ion chromatogram
pub const TIC_LABEL: &str = "TIC";

/// A target m/z with its column label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct XicTarget {
    /// Column label
    pub label: String,
    /// Target m/z
    pub mz: f64,
}

impl XicTarget {
    /// Target labelled with its own m/z
    pub fn new(mz: f64) -> Self {
        Self {
            label: mz.to_string(),
            mz,
        }
    }

    /// Target with an explicit label
    pub fn labelled(label: impl Into<String>, mz: f64) -> Self {
        Self {
            label: label.into(),
            mz,
        }
    }
}

impl FromStr for XicTarget {
    type Err = String;

    /// Parses `mz` or `label=mz`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (label, value) = match s.split_once('=') {
            Some((label, value)) => (Some(label.trim()), value.trim()),
            None => (None, s.trim()),
        };
        let mz: f64 = value
            .parse()
            .map_err(|_| format!("invalid target m/z '{value}'"))?;
        Ok(match label {
            Some(label) if !label.is_empty() => Self::labelled(label, mz),
            _ => Self::labelled(value, mz),
        })
    }
}

/// Half-width of the m/z window around a target
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Tolerance {
    /// Absolute, in Daltons
    Da(f64),
    /// Relative, in parts per million of the target
    Ppm(f64),
}

impl Tolerance {
    /// Closed m/z bounds around `mz`
    pub fn bounds(&self, mz: f64) -> (f64, f64) {
        let half = match *self {
            Tolerance::Da(da) => da.abs(),
            Tolerance::Ppm(ppm) => mz * ppm.abs() * 1e-6,
        };
        (mz - half, mz + half)
    }

    /// Whether `mz` lies within tolerance of `target`
    pub fn matches(&self, target: f64, mz: f64) -> bool {
        let (low, high) = self.bounds(target);
        mz >= low && mz <= high
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance::Da(0.5)
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tolerance::Da(da) => write!(f, "{da}Da"),
            Tolerance::Ppm(ppm) => write!(f, "{ppm}ppm"),
        }
    }
}

impl FromStr for Tolerance {
    type Err = String;

    /// Parses `0.5`, `0.5da` or `10ppm`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let (number, ppm) = if let Some(n) = lower.strip_suffix("ppm") {
            (n, true)
        } else if let Some(n) = lower.strip_suffix("da") {
            (n, false)
        } else {
            (lower.as_str(), false)
        };
        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| format!("invalid tolerance '{s}'"))?;
        if value < 0.0 {
            return Err(format!("negative tolerance '{s}'"));
        }
        Ok(if ppm { Tolerance::Ppm(value) } else { Tolerance::Da(value) })
    }
}

/// What to extract
#[derive(Debug, Clone, PartialEq)]
pub struct XicRequest {
    /// Target m/z values; empty for a TIC
    pub targets: Vec<XicTarget>,
    /// m/z window around each target
    pub tolerance: Tolerance,
    /// Retention-time window (minutes)
    pub window: RtWindow,
    /// Scan polarity to keep
    pub polarity: Option<Polarity>,
    /// Divide every trace by its own maximum (multi-target only)
    pub normalize: bool,
}

impl XicRequest {
    /// Total ion chromatogram over `window`
    pub fn tic(window: RtWindow) -> Self {
        Self {
            targets: Vec::new(),
            tolerance: Tolerance::default(),
            window,
            polarity: None,
            normalize: false,
        }
    }

    /// Extracted ion chromatogram of `targets` over `window`
    pub fn targets(targets: Vec<XicTarget>, tolerance: Tolerance, window: RtWindow) -> Self {
        Self {
            targets,
            tolerance,
            window,
            polarity: None,
            normalize: false,
        }
    }

    /// Keep only scans of `polarity`
    pub fn with_polarity(mut self, polarity: Option<Polarity>) -> Self {
        self.polarity = polarity;
        self
    }

    /// Request normalisation
    pub fn normalized(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Whether this is a total ion chromatogram
    pub fn is_tic(&self) -> bool {
        self.targets.is_empty()
    }

    /// Column labels, in output order
    pub fn labels(&self) -> Vec<String> {
        if self.is_tic() {
            vec![TIC_LABEL.to_string()]
        } else {
            self.targets.iter().map(|t| t.label.clone()).collect()
        }
    }

    fn wants_polarity(&self, polarity: Polarity) -> bool {
        self.polarity.map_or(true, |wanted| wanted == polarity)
    }

    /// Whether a precursor at `mz` marks the single target
    fn marks(&self, mz: f64) -> bool {
        match self.targets.as_slice() {
            [target] => self.tolerance.matches(target.mz, mz),
            _ => false,
        }
    }
}

/// One intensity trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceColumn {
    /// Target label, or `TIC`
    pub label: String,
    /// Summed intensity per row
    pub values: Vec<f64>,
}

/// Chromatogram output: a retention-time column plus one column per target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChromatogramTable {
    /// Scan number of each row
    pub scans: Vec<i64>,
    /// Retention time of each row (minutes)
    pub retention_times: Vec<f64>,
    /// One trace per target
    pub columns: Vec<TraceColumn>,
    /// MSn events whose precursor falls within tolerance of a single target
    pub ms2_markers: Vec<PrecursorMarker>,
}

impl ChromatogramTable {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.retention_times.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.retention_times.is_empty()
    }

    /// Trace by label
    pub fn column(&self, label: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.values.as_slice())
    }

    /// Write as CSV with header `rt,<label...>`
    pub fn to_csv<W: Write>(&self, writer: W) -> Result<(), XicError> {
        let mut csv = csv::Writer::from_writer(writer);
        let mut header = vec!["rt".to_string()];
        header.extend(self.columns.iter().map(|c| c.label.clone()));
        csv.write_record(&header)?;

        for (row, rt) in self.retention_times.iter().enumerate() {
            let mut record = Vec::with_capacity(self.columns.len() + 1);
            record.push(rt.to_string());
            for column in &self.columns {
                record.push(column.values.get(row).copied().unwrap_or(0.0).to_string());
            }
            csv.write_record(&record)?;
        }
        csv.flush()?;
        Ok(())
    }
}

/// Accumulates per-scan sums in row order
pub(crate) struct TableBuilder<'a> {
    request: &'a XicRequest,
    ranges: Vec<(f64, f64)>,
    rows: HashMap<i64, usize>,
    scans: Vec<i64>,
    retention_times: Vec<f64>,
    sums: Vec<Vec<f64>>,
    markers: Vec<PrecursorMarker>,
}

impl<'a> TableBuilder<'a> {
    pub(crate) fn new(request: &'a XicRequest) -> Self {
        let ranges = request
            .targets
            .iter()
            .map(|t| request.tolerance.bounds(t.mz))
            .collect();
        let columns = request.targets.len().max(1);
        Self {
            request,
            ranges,
            rows: HashMap::new(),
            scans: Vec::new(),
            retention_times: Vec::new(),
            sums: vec![Vec::new(); columns],
            markers: Vec::new(),
        }
    }

    /// Closed m/z bounds of every target
    pub(crate) fn ranges(&self) -> &[(f64, f64)] {
        &self.ranges
    }

    /// Start a row for an MS1 scan
    pub(crate) fn row(&mut self, scan: i64, rt: f64) {
        self.rows.insert(scan, self.scans.len());
        self.scans.push(scan);
        self.retention_times.push(rt);
        for column in &mut self.sums {
            column.push(0.0);
        }
    }

    /// Add a peak of `scan` to every column it matches
    pub(crate) fn add(&mut self, scan: i64, mz: f64, intensity: f32) {
        let Some(&row) = self.rows.get(&scan) else {
            return;
        };
        if self.ranges.is_empty() {
            self.sums[0][row] += intensity as f64;
            return;
        }
        for (column, &(low, high)) in self.sums.iter_mut().zip(&self.ranges) {
            if mz >= low && mz <= high {
                column[row] += intensity as f64;
            }
        }
    }

    /// Record an MSn event if it marks the single target
    pub(crate) fn marker(&mut self, marker: PrecursorMarker) {
        if self.request.marks(marker.precursor_mz) {
            self.markers.push(marker);
        }
    }

    pub(crate) fn finish(self) -> ChromatogramTable {
        let normalize = self.request.normalize && self.request.targets.len() > 1;
        let columns = self
            .request
            .labels()
            .into_iter()
            .zip(self.sums)
            .map(|(label, mut values)| {
                if normalize {
                    let max = values.iter().copied().fold(0.0f64, f64::max);
                    if max > 0.0 {
                        values.iter_mut().for_each(|v| *v /= max);
                    }
                }
                TraceColumn { label, values }
            })
            .collect();
        ChromatogramTable {
            scans: self.scans,
            retention_times: self.retention_times,
            columns,
            ms2_markers: self.markers,
        }
    }
}

/// One way of computing a chromatogram
pub trait ChromatogramStrategy {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Compute the chromatogram of `asset`
    fn extract(&self, asset: &Path, request: &XicRequest) -> Result<ChromatogramTable, XicError>;
}

/// Chromatogram of `asset`, from the cache when possible
pub fn extract(
    asset: &Path,
    request: &XicRequest,
    config: &CacheConfig,
) -> Result<ChromatogramTable, XicError> {
    let fast = CacheStrategy::new(config.clone());
    match fast.extract(asset, request) {
        Err(XicError::FastPathUnavailable(reason)) => {
            log::warn!(
                "{} path unavailable for {}: {reason}; streaming",
                fast.name(),
                asset.display()
            );
            StreamStrategy.extract(asset, request)
        }
        result => result,
    }
}
