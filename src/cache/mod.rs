//! # Columnar Cache
//!
//! Two Parquet tables derived once from a canonical mzML file and stored next to
//! it: `{asset}.ms1.parquet` (one row per MS1 peak) and `{asset}.msn.parquet`
//! (one row per fragmentation event).
//!
//! A cache is all-or-nothing: both tables are renamed into place only after the
//! whole file was read. A missing or stale cache is not an error; queries fall
//! back to streaming the mzML file.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lcms_explorer::cache::{build_cache, CacheConfig, PeakCache, PeakFilter};
//! use lcms_explorer::scan::RtWindow;
//!
//! let asset = std::path::Path::new("runs/run.mzML");
//! let config = CacheConfig::default();
//! build_cache(asset, &config)?;
//! if let Some(cache) = PeakCache::open(asset, &config) {
//!     let peaks = cache.ms1_peaks(&PeakFilter::window(RtWindow::new(5.0, 10.0)))?;
//!     println!("{} peaks", peaks.len());
//! }
//! # Ok::<(), lcms_explorer::cache::CacheError>(())
//! ```

use std::path::{Path, PathBuf};

pub use config::CacheConfig;
pub use error::CacheError;
pub use reader::{PeakCache, PeakFilter};
pub use schema::{CACHE_VERSION, MS1_SUFFIX, MSN_SUFFIX};
pub use writer::{build_cache, CacheBuildStats};

mod config;
mod error;
mod reader;
pub mod schema;
mod writer;

#[cfg(test)]
mod tests;

/// Locations of the two cache tables of an asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    /// MS1 peak table
    pub ms1: PathBuf,
    /// MSn event table
    pub msn: PathBuf,
}

impl CachePaths {
    /// Tables belonging to `asset`
    pub fn for_asset(asset: &Path) -> Self {
        let with_suffix = |suffix: &str| {
            let mut name = asset.as_os_str().to_os_string();
            name.push(suffix);
            PathBuf::from(name)
        };
        Self {
            ms1: with_suffix(MS1_SUFFIX),
            msn: with_suffix(MSN_SUFFIX),
        }
    }

    /// Whether both tables exist
    pub fn exist(&self) -> bool {
        self.ms1.is_file() && self.msn.is_file()
    }
}

/// The `cap` most intense items, in their original order
pub(crate) fn keep_strongest<T: Copy>(items: &[T], cap: usize, intensity: impl Fn(&T) -> f32) -> Vec<T> {
    if items.len() <= cap {
        return items.to_vec();
    }
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.select_nth_unstable_by(cap, |&a, &b| {
        intensity(&items[b]).total_cmp(&intensity(&items[a]))
    });
    order.truncate(cap);
    order.sort_unstable();
    order.into_iter().map(|i| items[i]).collect()
}
