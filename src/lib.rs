//! # lcms-explorer - Windowed Views of Public LC-MS Runs
//!
//! `lcms_explorer` turns a Universal Spectrum Identifier (USI) into a local,
//! normalized mzML file and serves bounded-size views of it: 2D intensity maps
//! and extracted or total ion chromatograms.
//!
//! ## Key Features
//!
//! - **Multi-provider resolution**: MassIVE, GNPS task outputs and library
//!   spectra, MetaboLights, GlycoPOST, Metabolomics Workbench, ProteomeXchange
//!   and local uploads, each behind its own strategy.
//!
//! - **Tiered conversion**: vendor and legacy formats go through an external
//!   converter first and a tolerant in-process re-encode second; every published
//!   file has passed a parse check and is renamed into place atomically.
//!
//! - **Indexed streaming**: retention-time windows are located by binary search
//!   over the mzML offset index, with a linear scan whenever the index cannot be
//!   trusted.
//!
//! - **Columnar cache**: two Parquet tables per run (MS1 peaks and MSn events)
//!   answer wide windows with filtered, partial-column reads.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lcms_explorer::prelude::*;
//!
//! let explorer = Explorer::with_defaults(ExplorerConfig::under("data"))?;
//! let usi = "mzspec:MSV000084494:GNPS00002_A3_p:scan:1";
//!
//! explorer.build_cache(usi)?;
//! let map = explorer.map(usi, &MapRequest::default())?;
//! println!("{}x{} grid", map.grid.width, map.grid.height);
//!
//! let request = XicRequest::targets(
//!     vec![XicTarget::new(278.1902)],
//!     Tolerance::Da(0.5),
//!     RtWindow::new(5.0, 6.0),
//! );
//! let xic = explorer.xic(usi, &request)?;
//! println!("{} rows", xic.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`usi`]: identifier parsing and canonical file names
//! - [`resolver`]: provider strategies producing a [`resolver::FetchDescriptor`]
//! - [`convert`]: download, conversion tiers, validation and publish
//! - [`mzml`] / [`mzxml`]: streaming readers and the indexed mzML writer
//! - [`stream`]: windowed scan iteration over an mzML file
//! - [`cache`]: the Parquet peak cache
//! - [`query`]: routing between cache and stream
//! - [`aggregation`]: 2D binning with overlays
//! - [`xic`]: chromatogram extraction with fast and slow paths
//! - [`explorer`]: the stages wired together
//!
//! ## Cache Layout
//!
//! | File | Columns |
//! |------|---------|
//! | `<asset>.ms1.parquet` | scan, mz, intensity, rt, polarity |
//! | `<asset>.msn.parquet` | scan, precursor_mz, rt, ms_level, polarity |
//!
//! Both footers carry `lcms:cache_version`, `lcms:source_file` and
//! `lcms:created_at`.

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod aggregation;
pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod explorer;
pub mod mzml;
pub mod mzxml;
pub mod query;
pub mod resolver;
pub mod scan;
pub mod stream;
pub mod summary;
pub mod usi;
pub mod xic;

#[cfg(test)]
mod test_support;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::aggregation::{
        aggregate, build_map, AggregationConfig, AggregationGrid, MapView, Quality, Rect,
    };
    pub use crate::cache::{build_cache, CacheConfig, PeakCache, PeakFilter};
    pub use crate::config::{ExplorerConfig, StorageConfig};
    pub use crate::convert::{ConversionReport, ConversionTier, ConverterConfig, Materializer};
    pub use crate::error::{PipelineError, Stage};
    pub use crate::explorer::{Explorer, MapRequest};
    pub use crate::query::{query_peaks, PeakQuery, PeakSet};
    pub use crate::resolver::{FetchDescriptor, ProviderEndpoints, ResolveOptions, Resolver};
    pub use crate::scan::{Polarity, RtWindow, ScanRecord};
    pub use crate::stream::WindowedScans;
    pub use crate::summary::{summarize, RunSummary};
    pub use crate::usi::{canonical_filename, ProviderKind, Usi};
    pub use crate::xic::{extract, ChromatogramTable, Tolerance, XicRequest, XicTarget};
}
