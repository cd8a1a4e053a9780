//! # Fetch & Convert
//!
//! Materializes a resolved run as a validated, indexed mzML file under a
//! deterministic name derived from its identifier.
//!
//! ## Pipeline
//!
//! 1. If the canonical file already exists, it is returned as is.
//! 2. Remote assets are downloaded under a private temporary name inside a
//!    per-call working directory, then renamed to their source name.
//! 3. The **direct** tier runs the external converter (vendor binaries are
//!    decoded first) and validates the result.
//! 4. If that fails, the **re-encode** tier reads the run with the native
//!    tolerant readers and writes a fresh indexed mzML, dropping scans that
//!    cannot be decoded.
//! 5. The validated output is published with an atomic rename.
//!
//! The working directory and every intermediate file are removed when the call
//! returns, whether it succeeds or not.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::{NamedTempFile, TempDir};

use crate::config::StorageConfig;
use crate::resolver::FetchDescriptor;
use crate::usi::{canonical_filename, Usi};

pub use config::ConverterConfig;
pub use download::{Downloader, HttpDownloader, StaticDownloader};
pub use error::ConvertError;
pub use reencode::{reencode, NativeFormat, ReencodeCounts};
pub use tools::{ConversionTool, ExternalTools, PassthroughTool};
pub use validate::validate_mzml;

mod config;
mod download;
mod error;
mod reencode;
mod tools;
mod validate;

#[cfg(test)]
mod tests;

/// Source formats and how they are converted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// mzML
    MzML,
    /// mzXML
    MzXml,
    /// mzData
    MzData,
    /// Thermo `.raw`, Bruker `.d` or Sciex `.wiff`
    Vendor,
}

impl SourceFormat {
    /// Classify a file by its extension
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim_end_matches(['/', '\\']).to_ascii_lowercase();
        let ext = lower.rsplit_once('.').map(|(_, ext)| ext)?;
        match ext {
            "mzml" => Some(Self::MzML),
            "mzxml" => Some(Self::MzXml),
            "mzdata" => Some(Self::MzData),
            "raw" | "d" | "wiff" => Some(Self::Vendor),
            _ => None,
        }
    }
}

/// Which tier produced the published file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionTier {
    /// The canonical file already existed
    CacheHit,
    /// External converter output passed validation
    Direct,
    /// Native re-encode after the direct tier failed
    Reencoded,
}

/// Outcome of materializing a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    /// Tier that produced the file
    pub tier: ConversionTier,
    /// Spectra in the published file (0 on a cache hit)
    pub records_written: usize,
    /// Scans dropped by the re-encode tier
    pub records_dropped: usize,
}

/// A canonical mzML file on local storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterializedRun {
    /// Path of the canonical file
    pub path: PathBuf,
    /// How it was produced
    pub report: ConversionReport,
}

/// Downloads and converts runs into canonical mzML files
pub struct Materializer {
    storage: StorageConfig,
    downloader: Box<dyn Downloader>,
    tool: Box<dyn ConversionTool>,
}

impl Materializer {
    /// Create a materializer
    pub fn new(
        storage: StorageConfig,
        downloader: impl Downloader + 'static,
        tool: impl ConversionTool + 'static,
    ) -> Self {
        Self {
            storage,
            downloader: Box::new(downloader),
            tool: Box::new(tool),
        }
    }

    /// Storage layout in use
    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    /// Path the canonical file for `usi` is (or would be) published at
    pub fn canonical_path(&self, usi: &Usi) -> PathBuf {
        self.storage.asset_dir.join(canonical_filename(usi))
    }

    /// The published file for `usi`, if there is one
    pub fn cached(&self, usi: &Usi) -> Option<MaterializedRun> {
        let path = self.canonical_path(usi);
        if !path.is_file() {
            return None;
        }
        log::debug!("Reusing {}", path.display());
        Some(MaterializedRun {
            path,
            report: ConversionReport {
                tier: ConversionTier::CacheHit,
                records_written: 0,
                records_dropped: 0,
            },
        })
    }

    /// Produce the canonical mzML file for `usi`
    pub fn materialize(
        &self,
        usi: &Usi,
        descriptor: &FetchDescriptor,
    ) -> Result<MaterializedRun, ConvertError> {
        if let Some(run) = self.cached(usi) {
            return Ok(run);
        }
        let target = self.canonical_path(usi);

        let format = SourceFormat::from_name(&descriptor.source_name)
            .ok_or_else(|| ConvertError::UnsupportedFormat(descriptor.source_name.clone()))?;

        std::fs::create_dir_all(&self.storage.asset_dir)?;
        let temp_root = self.storage.temp_dir();
        std::fs::create_dir_all(&temp_root)?;
        let work = tempfile::Builder::new()
            .prefix("convert-")
            .tempdir_in(&temp_root)?;

        let input = self.fetch(descriptor, &work)?;
        let (output, report) = self.convert(&input, format, descriptor, &work)?;
        publish(&output, &target)?;

        log::info!(
            "Published {} ({:?}, {} spectra, {} dropped)",
            target.display(),
            report.tier,
            report.records_written,
            report.records_dropped
        );
        Ok(MaterializedRun {
            path: target,
            report,
        })
    }

    fn fetch(&self, descriptor: &FetchDescriptor, work: &TempDir) -> Result<PathBuf, ConvertError> {
        if descriptor.is_local() {
            return Ok(PathBuf::from(&descriptor.remote_uri));
        }

        let mut partial = NamedTempFile::new_in(work.path())?;
        {
            let mut out = BufWriter::new(partial.as_file_mut());
            self.downloader.download(&descriptor.remote_uri, &mut out)?;
            out.flush()?;
        }
        let target = work.path().join(&descriptor.source_name);
        partial.persist(&target)?;
        Ok(target)
    }

    fn convert(
        &self,
        input: &Path,
        format: SourceFormat,
        descriptor: &FetchDescriptor,
        work: &TempDir,
    ) -> Result<(PathBuf, ConversionReport), ConvertError> {
        let direct = work.path().join("direct.mzML");
        match self.direct(input, format, &direct, work) {
            Ok(records) => {
                return Ok((
                    direct,
                    ConversionReport {
                        tier: ConversionTier::Direct,
                        records_written: records,
                        records_dropped: 0,
                    },
                ))
            }
            Err(e) => log::warn!(
                "Direct conversion of {} failed, re-encoding: {e}",
                descriptor.source_name
            ),
        }

        let failure = |reason: String| ConvertError::ConversionFailure {
            source_name: descriptor.source_name.clone(),
            reason,
        };

        let (native_input, native_format) = match format {
            SourceFormat::MzML => (input.to_path_buf(), NativeFormat::MzML),
            SourceFormat::MzXml => (input.to_path_buf(), NativeFormat::MzXml),
            SourceFormat::Vendor => {
                let decoded = work.path().join("decoded.mzML");
                self.tool
                    .decode_raw(input, &decoded)
                    .map_err(|e| failure(e.to_string()))?;
                (decoded, NativeFormat::MzML)
            }
            SourceFormat::MzData => {
                return Err(failure("no native reader for mzData".to_string()))
            }
        };

        let output = work.path().join("reencoded.mzML");
        let run_id = run_id_of(&descriptor.source_name);
        let counts = reencode(&native_input, native_format, &output, &run_id)
            .map_err(|e| failure(e.to_string()))?;
        if counts.dropped > 0 {
            log::warn!(
                "Re-encoding {} dropped {} of {} scans",
                descriptor.source_name,
                counts.dropped,
                counts.dropped + counts.written
            );
        }
        let records = validate_mzml(&output).map_err(|e| failure(e.to_string()))?;

        Ok((
            output,
            ConversionReport {
                tier: ConversionTier::Reencoded,
                records_written: records,
                records_dropped: counts.dropped,
            },
        ))
    }

    fn direct(
        &self,
        input: &Path,
        format: SourceFormat,
        output: &Path,
        work: &TempDir,
    ) -> Result<usize, ConvertError> {
        match format {
            SourceFormat::Vendor => {
                let decoded = work.path().join("vendor.mzML");
                self.tool.decode_raw(input, &decoded)?;
                self.tool.convert(&decoded, output)?;
            }
            _ => self.tool.convert(input, output)?,
        }
        validate_mzml(output)
    }
}

fn run_id_of(source_name: &str) -> String {
    match source_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => source_name.to_string(),
    }
}

/// Copy `output` next to `target` and rename it into place
fn publish(output: &Path, target: &Path) -> Result<(), ConvertError> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let mut staged = NamedTempFile::new_in(dir)?;
    {
        let mut reader = BufReader::new(File::open(output)?);
        let mut writer = BufWriter::new(staged.as_file_mut());
        std::io::copy(&mut reader, &mut writer)?;
        writer.flush()?;
    }
    staged.as_file().sync_all()?;
    staged.persist(target)?;
    Ok(())
}
