//! Whole-run overview used to pick default map bounds

use std::path::Path;

use serde::Serialize;

use crate::cache::{CacheConfig, PeakCache};
use crate::mzml::MzMLError;
use crate::scan::{RtWindow, ScanRecord};
use crate::stream::WindowedScans;

/// Counts and ranges of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// MS1 scans
    pub ms1_count: usize,
    /// MSn scans
    pub msn_count: usize,
    /// Earliest retention time (minutes)
    pub rt_min: Option<f64>,
    /// Latest retention time (minutes)
    pub rt_max: Option<f64>,
    /// Smallest MS1 peak m/z with non-zero intensity
    pub mz_min: Option<f64>,
    /// Largest MS1 peak m/z with non-zero intensity
    pub mz_max: Option<f64>,
}

fn widen(low: &mut Option<f64>, high: &mut Option<f64>, value: f64) {
    *low = Some(low.map_or(value, |l| l.min(value)));
    *high = Some(high.map_or(value, |h| h.max(value)));
}

impl RunSummary {
    pub(crate) fn observe_rt(&mut self, rt: f64) {
        widen(&mut self.rt_min, &mut self.rt_max, rt);
    }

    pub(crate) fn observe_mz(&mut self, mz: f64) {
        widen(&mut self.mz_min, &mut self.mz_max, mz);
    }

    /// Fold one scan into the summary
    pub fn observe(&mut self, scan: &ScanRecord) {
        self.observe_rt(scan.retention_time);
        if scan.ms_level > 1 {
            self.msn_count += 1;
            return;
        }
        self.ms1_count += 1;
        for peak in scan.peaks.iter().filter(|p| p.intensity > 0.0) {
            self.observe_mz(peak.mz);
        }
    }

    /// Whether no scan was seen
    pub fn is_empty(&self) -> bool {
        self.ms1_count == 0 && self.msn_count == 0
    }
}

/// Summarize `asset`, from its cache when present
pub fn summarize(asset: &Path, config: &CacheConfig) -> Result<RunSummary, MzMLError> {
    if let Some(cache) = PeakCache::open(asset, config) {
        match cache.summary() {
            Ok(summary) => return Ok(summary),
            Err(e) => log::warn!("Cache summary of {} failed, streaming: {e}", asset.display()),
        }
    }

    let mut summary = RunSummary::default();
    for scan in WindowedScans::open_linear(asset, RtWindow::unbounded())? {
        summary.observe(&scan);
    }
    Ok(summary)
}
