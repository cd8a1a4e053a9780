//! Library configuration
//!
//! Every section derives `Deserialize` with `#[serde(default)]`, so a config
//! file only needs the keys it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::aggregation::AggregationConfig;
use crate::cache::CacheConfig;
use crate::convert::ConverterConfig;
use crate::resolver::ProviderEndpoints;

/// Where assets, uploads and scratch files live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Canonical mzML assets and their caches
    pub asset_dir: PathBuf,
    /// Root of local uploads (`mzspec:LOCAL:...`)
    pub upload_dir: PathBuf,
    /// Private working directories for downloads and conversions;
    /// defaults to `.scratch` inside `asset_dir`
    pub scratch_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::under("data")
    }
}

impl StorageConfig {
    /// Assets in `root/runs`, uploads in `root/uploads`
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            asset_dir: root.join("runs"),
            upload_dir: root.join("uploads"),
            scratch_dir: None,
        }
    }

    /// Directory that holds per-request working directories
    ///
    /// It sits on the same filesystem as `asset_dir` by default so a
    /// finished file can be renamed into place.
    pub fn temp_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| self.asset_dir.join(".scratch"))
    }
}

/// Complete configuration of an [`Explorer`](crate::explorer::Explorer)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Storage layout
    pub storage: StorageConfig,
    /// External conversion tools
    pub converter: ConverterConfig,
    /// Provider base URLs
    pub providers: ProviderEndpoints,
    /// Peak cache
    pub cache: CacheConfig,
    /// 2D map rendering
    pub aggregation: AggregationConfig,
}

impl ExplorerConfig {
    /// Defaults with all storage under `root`
    pub fn under(root: impl AsRef<Path>) -> Self {
        Self {
            storage: StorageConfig::under(root),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_layout() {
        let storage = StorageConfig::under("/srv/lcms");
        assert_eq!(storage.asset_dir, PathBuf::from("/srv/lcms/runs"));
        assert_eq!(storage.upload_dir, PathBuf::from("/srv/lcms/uploads"));
        assert_eq!(storage.temp_dir(), PathBuf::from("/srv/lcms/runs/.scratch"));

        let storage = StorageConfig {
            scratch_dir: Some(PathBuf::from("/tmp/lcms")),
            ..storage
        };
        assert_eq!(storage.temp_dir(), PathBuf::from("/tmp/lcms"));
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config: ExplorerConfig = serde_json::from_str(
            r#"{"cache": {"min_span_minutes": 2.5}, "aggregation": {"quality": "fine"}}"#,
        )
        .unwrap();
        assert_eq!(config.cache.min_span_minutes, 2.5);
        assert_eq!(config.cache.read_peak_cap, CacheConfig::default().read_peak_cap);
        assert_eq!(
            config.aggregation.quality,
            crate::aggregation::Quality::Fine
        );
        assert_eq!(config.storage, StorageConfig::default());
    }
}
