//! Routing between the peak cache and the spectrum stream
//!
//! Wide windows are served from the columnar cache when one exists; narrow
//! windows, and assets without a usable cache, are streamed from the mzML file.

use std::path::Path;

use crate::cache::{CacheConfig, PeakCache, PeakFilter};
use crate::mzml::MzMLError;
use crate::scan::{PeakPoint, Polarity, PrecursorMarker, RtWindow};
use crate::stream::WindowedScans;

/// Where a peak set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeakOrigin {
    /// Columnar cache
    Cache,
    /// Direct read of the mzML file
    Stream,
}

/// Region of a run to extract
#[derive(Debug, Clone, PartialEq)]
pub struct PeakQuery {
    /// Retention-time window (minutes)
    pub window: RtWindow,
    /// Closed m/z range, or everything
    pub mz_range: Option<(f64, f64)>,
    /// Scan polarity to keep
    pub polarity: Option<Polarity>,
}

impl PeakQuery {
    /// Everything inside `window`
    pub fn new(window: RtWindow) -> Self {
        Self {
            window,
            mz_range: None,
            polarity: None,
        }
    }

    fn keeps_mz(&self, mz: f64) -> bool {
        self.mz_range
            .map_or(true, |(low, high)| mz >= low && mz <= high)
    }

    fn keeps_polarity(&self, polarity: Polarity) -> bool {
        self.polarity.map_or(true, |wanted| wanted == polarity)
    }

    fn filter(&self) -> PeakFilter {
        let filter = PeakFilter::window(self.window).with_polarity(self.polarity);
        match self.mz_range {
            Some((low, high)) => filter.with_mz_range(low, high),
            None => filter,
        }
    }
}

/// MS1 peaks and precursor events of a query
#[derive(Debug, Clone, PartialEq)]
pub struct PeakSet {
    /// MS1 peaks inside the query
    pub points: Vec<PeakPoint>,
    /// MSn events inside the window (and m/z range, when given)
    pub precursors: Vec<PrecursorMarker>,
    /// Distinct MS1 scans contributing peaks
    pub spectra: usize,
    /// Where the data was read from
    pub origin: PeakOrigin,
}

fn count_scans(points: &[PeakPoint]) -> usize {
    let mut count = 0;
    let mut last = None;
    for point in points {
        if last != Some(point.scan) {
            count += 1;
            last = Some(point.scan);
        }
    }
    count
}

fn from_cache(cache: &PeakCache, query: &PeakQuery) -> Result<PeakSet, crate::cache::CacheError> {
    let points = cache.ms1_peaks(&query.filter())?;
    let precursors = cache
        .precursors(&query.window, query.polarity)?
        .into_iter()
        .filter(|m| query.keeps_mz(m.precursor_mz))
        .collect();
    Ok(PeakSet {
        spectra: count_scans(&points),
        points,
        precursors,
        origin: PeakOrigin::Cache,
    })
}

fn from_stream(asset: &Path, query: &PeakQuery) -> Result<PeakSet, MzMLError> {
    let mut points = Vec::new();
    let mut precursors = Vec::new();
    for scan in WindowedScans::open(asset, query.window)? {
        if !query.keeps_polarity(scan.polarity) {
            continue;
        }
        if scan.ms_level > 1 {
            if let Some(mz) = scan.precursor_mz.filter(|&mz| query.keeps_mz(mz)) {
                precursors.push(PrecursorMarker {
                    scan: scan.scan,
                    rt: scan.retention_time,
                    precursor_mz: mz,
                });
            }
            continue;
        }
        points.extend(
            scan.peaks
                .iter()
                .filter(|p| query.keeps_mz(p.mz))
                .map(|p| PeakPoint {
                    scan: scan.scan,
                    rt: scan.retention_time,
                    mz: p.mz,
                    intensity: p.intensity,
                }),
        );
    }
    Ok(PeakSet {
        spectra: count_scans(&points),
        points,
        precursors,
        origin: PeakOrigin::Stream,
    })
}

/// Peaks and precursor events of `asset` inside `query`
///
/// The cache serves windows at least [`CacheConfig::min_span_minutes`] wide;
/// a cache read error is logged and the file is streamed instead.
pub fn query_peaks(
    asset: &Path,
    query: &PeakQuery,
    config: &CacheConfig,
) -> Result<PeakSet, MzMLError> {
    if config.serves_span(query.window.span()) {
        if let Some(cache) = PeakCache::open(asset, config) {
            match from_cache(&cache, query) {
                Ok(set) => return Ok(set),
                Err(e) => log::warn!("Cache read for {} failed, streaming: {e}", asset.display()),
            }
        }
    }
    from_stream(asset, query)
}
