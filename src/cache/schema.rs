//! # Cache Table Schemas
//!
//! Both tables are "long": one row per peak (MS1) or per precursor event (MSn),
//! sorted by scan so that per-scan values repeat and compress well.
//!
//! ## MS1 table
//!
//! | Column | Type | Description |
//! |--------|------|-------------|
//! | scan | Int64 | Scan number |
//! | mz | Float64 | Peak m/z |
//! | intensity | Float32 | Peak intensity |
//! | rt | Float64 | Retention time in minutes |
//! | polarity | Int8 | 1 positive, -1 negative, 0 unknown |
//!
//! ## MSn table
//!
//! | Column | Type | Description |
//! |--------|------|-------------|
//! | scan | Int64 | Scan number |
//! | precursor_mz | Float64 (nullable) | Selected precursor m/z |
//! | rt | Float64 | Retention time in minutes |
//! | ms_level | Int16 | MS level (2 or higher) |
//! | polarity | Int8 | 1 positive, -1 negative, 0 unknown |

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema};

/// Version of the cache layout; tables written with another version are ignored
pub const CACHE_VERSION: &str = "1";

/// Footer key holding [`CACHE_VERSION`]
pub const KEY_CACHE_VERSION: &str = "lcms:cache_version";

/// Footer key holding the name of the mzML file the table was built from
pub const KEY_SOURCE_FILE: &str = "lcms:source_file";

/// Footer key holding the build timestamp (RFC 3339)
pub const KEY_CREATED_AT: &str = "lcms:created_at";

/// Suffix appended to the asset file name for the MS1 table
pub const MS1_SUFFIX: &str = ".ms1.parquet";

/// Suffix appended to the asset file name for the MSn table
pub const MSN_SUFFIX: &str = ".msn.parquet";

/// Column names
pub mod columns {
    /// Scan number
    pub const SCAN: &str = "scan";
    /// Peak m/z
    pub const MZ: &str = "mz";
    /// Peak intensity
    pub const INTENSITY: &str = "intensity";
    /// Retention time (minutes)
    pub const RT: &str = "rt";
    /// Polarity code
    pub const POLARITY: &str = "polarity";
    /// Precursor m/z
    pub const PRECURSOR_MZ: &str = "precursor_mz";
    /// MS level
    pub const MS_LEVEL: &str = "ms_level";
}

/// Schema of the MS1 peak table
pub fn ms1_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(columns::SCAN, DataType::Int64, false),
        Field::new(columns::MZ, DataType::Float64, false),
        Field::new(columns::INTENSITY, DataType::Float32, false),
        Field::new(columns::RT, DataType::Float64, false),
        Field::new(columns::POLARITY, DataType::Int8, false),
    ]))
}

/// Schema of the MSn precursor table
pub fn msn_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(columns::SCAN, DataType::Int64, false),
        Field::new(columns::PRECURSOR_MZ, DataType::Float64, true),
        Field::new(columns::RT, DataType::Float64, false),
        Field::new(columns::MS_LEVEL, DataType::Int16, false),
        Field::new(columns::POLARITY, DataType::Int8, false),
    ]))
}
