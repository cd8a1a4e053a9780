//! Cache-backed chromatogram path

use std::path::Path;

use crate::cache::{CacheConfig, PeakCache, PeakFilter};

use super::{ChromatogramStrategy, ChromatogramTable, TableBuilder, XicError, XicRequest};

/// Sums peaks from the columnar cache
#[derive(Debug, Clone, Default)]
pub struct CacheStrategy {
    config: CacheConfig,
}

impl CacheStrategy {
    /// Strategy reading caches written with `config`
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }
}

impl ChromatogramStrategy for CacheStrategy {
    fn name(&self) -> &'static str {
        "cache"
    }

    fn extract(&self, asset: &Path, request: &XicRequest) -> Result<ChromatogramTable, XicError> {
        let cache = PeakCache::open(asset, &self.config)
            .ok_or_else(|| XicError::FastPathUnavailable("no peak cache".to_string()))?;
        let unavailable = |e: crate::cache::CacheError| XicError::FastPathUnavailable(e.to_string());

        let mut table = TableBuilder::new(request);
        for (scan, rt) in cache.ms1_scans(&request.window, request.polarity).map_err(unavailable)? {
            table.row(scan, rt);
        }

        let mut filter = PeakFilter::window(request.window).with_polarity(request.polarity);
        for &(low, high) in table.ranges() {
            filter = filter.with_mz_range(low, high);
        }
        for peak in cache.ms1_peaks_uncapped(&filter).map_err(unavailable)? {
            table.add(peak.scan, peak.mz, peak.intensity);
        }

        if request.targets.len() == 1 {
            for marker in cache
                .precursors(&request.window, request.polarity)
                .map_err(unavailable)?
            {
                table.marker(marker);
            }
        }
        Ok(table.finish())
    }
}
