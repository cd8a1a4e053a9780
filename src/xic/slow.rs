//! Streaming chromatogram path

use std::path::Path;

use crate::scan::PrecursorMarker;
use crate::stream::WindowedScans;

use super::{ChromatogramStrategy, ChromatogramTable, TableBuilder, XicError, XicRequest};

/// Streams scans from the mzML file
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamStrategy;

impl ChromatogramStrategy for StreamStrategy {
    fn name(&self) -> &'static str {
        "stream"
    }

    fn extract(&self, asset: &Path, request: &XicRequest) -> Result<ChromatogramTable, XicError> {
        let mut table = TableBuilder::new(request);
        let mut scans = WindowedScans::open(asset, request.window)?;
        for scan in scans.by_ref() {
            if !request.wants_polarity(scan.polarity) {
                continue;
            }
            if scan.ms_level > 1 {
                if let Some(precursor_mz) = scan.precursor_mz {
                    table.marker(PrecursorMarker {
                        scan: scan.scan,
                        rt: scan.retention_time,
                        precursor_mz,
                    });
                }
                continue;
            }
            table.row(scan.scan, scan.retention_time);
            for peak in &scan.peaks {
                table.add(scan.scan, peak.mz, peak.intensity);
            }
        }
        if scans.skipped() > 0 {
            log::debug!("Skipped {} undecodable scans", scans.skipped());
        }
        Ok(table.finish())
    }
}
