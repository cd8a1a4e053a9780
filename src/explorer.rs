//! # Explorer
//!
//! One object wiring the stages together: identifier → provider location →
//! canonical mzML → peak cache → map or chromatogram.
//!
//! Each public method returns a [`PipelineError`] naming the identifier and the
//! failing stage. Conditions the pipeline recovers from on its own (an
//! unusable index, a missing cache, a corrupt scan) only show up in the log.

use std::path::PathBuf;
use std::time::Duration;

use crate::aggregation::{build_map, MapView, Rect};
use crate::cache::{build_cache, CacheBuildStats};
use crate::config::ExplorerConfig;
use crate::convert::{
    ConversionTool, Downloader, ExternalTools, HttpDownloader, MaterializedRun, Materializer,
};
use crate::error::{PipelineError, Result, Stage, StageError};
use crate::query::{query_peaks, PeakQuery};
use crate::resolver::{
    FetchDescriptor, HttpMetadataClient, MetadataClient, ResolveError, ResolveOptions, Resolver,
};
use crate::scan::{Polarity, RtWindow};
use crate::summary::{summarize, RunSummary};
use crate::usi::{ProviderKind, Usi};
use crate::xic::{self, ChromatogramTable, XicRequest};

/// Region and overlays of a 2D map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapRequest {
    /// Retention-time window; the whole run when absent or degenerate
    pub window: Option<RtWindow>,
    /// m/z range; the run's MS1 m/z extent when absent
    pub mz_range: Option<(f64, f64)>,
    /// Scan polarity to keep
    pub polarity: Option<Polarity>,
    /// Region drawn on top of the map
    pub highlight: Option<Rect>,
}

/// Resolves, materializes and renders runs
pub struct Explorer {
    config: ExplorerConfig,
    resolver: Resolver,
    materializer: Materializer,
}

impl Explorer {
    /// Explorer with explicit transports and conversion tools
    pub fn new(
        config: ExplorerConfig,
        client: impl MetadataClient + 'static,
        downloader: impl Downloader + 'static,
        tool: impl ConversionTool + 'static,
    ) -> Self {
        let resolver = Resolver::new(
            config.providers.clone(),
            config.storage.upload_dir.clone(),
            client,
        );
        let materializer = Materializer::new(config.storage.clone(), downloader, tool);
        Self {
            config,
            resolver,
            materializer,
        }
    }

    /// Explorer talking HTTP and running the configured converters
    pub fn with_defaults(config: ExplorerConfig) -> std::result::Result<Self, StageError> {
        let timeout = Duration::from_secs(config.providers.timeout_secs);
        let client = HttpMetadataClient::new(timeout)?;
        let downloader = HttpDownloader::new(timeout)?;
        let tools = ExternalTools::new(config.converter.clone());
        Ok(Self::new(config, client, downloader, tools))
    }

    /// Configuration in use
    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    fn parse(&self, identifier: &str) -> Result<Usi> {
        Usi::parse(identifier).map_err(|e| PipelineError::new(identifier, Stage::Resolution, e))
    }

    /// Locate the run behind `identifier`
    ///
    /// A failed archive lookup is retried once in best-effort mode.
    pub fn resolve(&self, identifier: &str) -> Result<FetchDescriptor> {
        let usi = self.parse(identifier)?;
        self.resolve_usi(&usi)
    }

    fn resolve_usi(&self, usi: &Usi) -> Result<FetchDescriptor> {
        let failed = |e: ResolveError| PipelineError::new(usi.to_string(), Stage::Resolution, e);
        match self.resolver.resolve(usi, &ResolveOptions::default()) {
            Err(e) if e.kind() == Some(ProviderKind::ArchiveDataset) => {
                log::info!("Retrying {usi} with best-effort location");
                self.resolver
                    .resolve(usi, &ResolveOptions::best_effort())
                    .map_err(failed)
            }
            result => result.map_err(failed),
        }
    }

    /// Canonical mzML file for `identifier`, converting it if needed
    ///
    /// An already published file is reused without contacting any provider.
    pub fn fetch(&self, identifier: &str) -> Result<MaterializedRun> {
        let usi = self.parse(identifier)?;
        if let Some(run) = self.materializer.cached(&usi) {
            return Ok(run);
        }
        let descriptor = self.resolve_usi(&usi)?;
        self.materializer
            .materialize(&usi, &descriptor)
            .map_err(|e| PipelineError::new(identifier, Stage::Conversion, e))
    }

    fn asset(&self, identifier: &str) -> Result<PathBuf> {
        Ok(self.fetch(identifier)?.path)
    }

    /// Build (or rebuild) the peak cache of a run
    pub fn build_cache(&self, identifier: &str) -> Result<CacheBuildStats> {
        let asset = self.asset(identifier)?;
        build_cache(&asset, &self.config.cache)
            .map_err(|e| PipelineError::new(identifier, Stage::Extraction, e))
    }

    /// Counts and ranges of a run
    pub fn summary(&self, identifier: &str) -> Result<RunSummary> {
        let asset = self.asset(identifier)?;
        let summary = summarize(&asset, &self.config.cache)
            .map_err(|e| PipelineError::new(identifier, Stage::Extraction, e))?;
        if summary.is_empty() {
            return Err(PipelineError::new(identifier, Stage::Extraction, StageError::NoScans));
        }
        Ok(summary)
    }

    /// 2D intensity map of a run
    pub fn map(&self, identifier: &str, request: &MapRequest) -> Result<MapView> {
        let asset = self.asset(identifier)?;
        let extraction = |e: StageError| PipelineError::new(identifier, Stage::Extraction, e);

        let window = request.window.filter(|w| !w.is_degenerate());
        let (rt, mz) = match (window, request.mz_range) {
            (Some(w), Some(mz)) => ((w.start, w.end), mz),
            _ => {
                let summary = self.summary(identifier)?;
                let rt = window
                    .map(|w| (w.start, w.end))
                    .or(summary.rt_min.zip(summary.rt_max));
                let mz = request.mz_range.or(summary.mz_min.zip(summary.mz_max));
                match rt.zip(mz) {
                    Some(bounds) => bounds,
                    None => return Err(extraction(StageError::NoScans)),
                }
            }
        };
        let bounds = Rect::new(rt, mz);

        let query = PeakQuery {
            window: bounds.window(),
            mz_range: Some((bounds.mz_min, bounds.mz_max)),
            polarity: request.polarity,
        };
        let peaks = query_peaks(&asset, &query, &self.config.cache)
            .map_err(|e| extraction(e.into()))?;
        Ok(build_map(&peaks, bounds, request.highlight, &self.config.aggregation))
    }

    /// Extracted or total ion chromatogram of a run
    pub fn xic(&self, identifier: &str, request: &XicRequest) -> Result<ChromatogramTable> {
        let asset = self.asset(identifier)?;
        xic::extract(&asset, request, &self.config.cache)
            .map_err(|e| PipelineError::new(identifier, Stage::Extraction, e))
    }
}
