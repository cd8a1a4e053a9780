use serde::{Deserialize, Serialize};

/// Columnar cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Narrowest retention-time span (minutes) served from the cache;
    /// narrower windows stream the mzML file directly
    pub min_span_minutes: f64,
    /// Most intense peaks kept per scan when building
    pub build_peak_cap: usize,
    /// Most intense peaks returned per scan when reading
    pub read_peak_cap: usize,
    /// Rows per Parquet row group
    pub row_group_size: usize,
    /// ZSTD level
    pub compression_level: i32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            min_span_minutes: 1.0,
            build_peak_cap: 10_000,
            read_peak_cap: 1_000,
            row_group_size: 100_000,
            compression_level: 3,
        }
    }
}

impl CacheConfig {
    /// Whether a window of `span` minutes is wide enough for the cache
    pub fn serves_span(&self, span: f64) -> bool {
        span >= self.min_span_minutes
    }
}
