//! One-pass cache build

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float32Builder, Float64Builder, Int16Builder, Int64Builder, Int8Builder};
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use parquet::format::KeyValue;
use tempfile::NamedTempFile;

use crate::mzml::MzMLStreamer;
use crate::scan::{Peak, ScanRecord};

use super::config::CacheConfig;
use super::error::CacheError;
use super::schema::{
    ms1_schema, msn_schema, CACHE_VERSION, KEY_CACHE_VERSION, KEY_CREATED_AT, KEY_SOURCE_FILE,
};
use super::{keep_strongest, CachePaths};

/// Rows buffered before a record batch is written
const BATCH_ROWS: usize = 64 * 1024;

/// Counters from a cache build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheBuildStats {
    /// MS1 scans written
    pub ms1_scans: usize,
    /// Rows in the MS1 table
    pub ms1_rows: usize,
    /// Rows in the MSn table
    pub msn_rows: usize,
    /// Scans skipped because their arrays could not be decoded
    pub skipped_scans: usize,
    /// MS1 scans that lost peaks to the build cap
    pub capped_scans: usize,
}

fn writer_properties(config: &CacheConfig, metadata: &HashMap<String, String>) -> WriterProperties {
    let compression = Compression::ZSTD(
        ZstdLevel::try_new(config.compression_level).unwrap_or_default(),
    );
    let kv_metadata: Vec<KeyValue> = metadata
        .iter()
        .map(|(k, v)| KeyValue {
            key: k.clone(),
            value: Some(v.clone()),
        })
        .collect();

    WriterProperties::builder()
        .set_compression(compression)
        .set_statistics_enabled(EnabledStatistics::Chunk)
        .set_max_row_group_size(config.row_group_size)
        .set_key_value_metadata(Some(kv_metadata))
        .build()
}

#[derive(Default)]
struct Ms1Columns {
    scan: Int64Builder,
    mz: Float64Builder,
    intensity: Float32Builder,
    rt: Float64Builder,
    polarity: Int8Builder,
    rows: usize,
}

impl Ms1Columns {
    fn push(&mut self, record: &ScanRecord, peak: Peak) {
        self.scan.append_value(record.scan);
        self.mz.append_value(peak.mz);
        self.intensity.append_value(peak.intensity);
        self.rt.append_value(record.retention_time);
        self.polarity.append_value(record.polarity.as_i8());
        self.rows += 1;
    }

    fn finish(&mut self, schema: &Arc<Schema>) -> Result<RecordBatch, CacheError> {
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(self.scan.finish()),
            Arc::new(self.mz.finish()),
            Arc::new(self.intensity.finish()),
            Arc::new(self.rt.finish()),
            Arc::new(self.polarity.finish()),
        ];
        self.rows = 0;
        Ok(RecordBatch::try_new(schema.clone(), arrays)?)
    }
}

#[derive(Default)]
struct MsnColumns {
    scan: Int64Builder,
    precursor_mz: Float64Builder,
    rt: Float64Builder,
    ms_level: Int16Builder,
    polarity: Int8Builder,
    rows: usize,
}

impl MsnColumns {
    fn push(&mut self, record: &ScanRecord) {
        self.scan.append_value(record.scan);
        self.precursor_mz.append_option(record.precursor_mz);
        self.rt.append_value(record.retention_time);
        self.ms_level.append_value(record.ms_level);
        self.polarity.append_value(record.polarity.as_i8());
        self.rows += 1;
    }

    fn finish(&mut self, schema: &Arc<Schema>) -> Result<RecordBatch, CacheError> {
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(self.scan.finish()),
            Arc::new(self.precursor_mz.finish()),
            Arc::new(self.rt.finish()),
            Arc::new(self.ms_level.finish()),
            Arc::new(self.polarity.finish()),
        ];
        self.rows = 0;
        Ok(RecordBatch::try_new(schema.clone(), arrays)?)
    }
}

/// Build both cache tables for `asset` in one pass over the file
///
/// The tables are written under temporary names next to the asset and renamed
/// into place only after the whole file was read, MSn table first, so an
/// existing MS1 table implies a complete cache.
pub fn build_cache(asset: &Path, config: &CacheConfig) -> Result<CacheBuildStats, CacheError> {
    let paths = CachePaths::for_asset(asset);
    let dir = asset.parent().unwrap_or_else(|| Path::new("."));
    let source_name = asset
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let metadata = HashMap::from([
        (KEY_CACHE_VERSION.to_string(), CACHE_VERSION.to_string()),
        (KEY_SOURCE_FILE.to_string(), source_name),
        (KEY_CREATED_AT.to_string(), chrono::Utc::now().to_rfc3339()),
    ]);
    let props = writer_properties(config, &metadata);

    let ms1_file = NamedTempFile::new_in(dir)?;
    let msn_file = NamedTempFile::new_in(dir)?;
    let ms1_schema = ms1_schema();
    let msn_schema = msn_schema();
    let mut ms1_writer: ArrowWriter<File> =
        ArrowWriter::try_new(ms1_file.reopen()?, ms1_schema.clone(), Some(props.clone()))?;
    let mut msn_writer: ArrowWriter<File> =
        ArrowWriter::try_new(msn_file.reopen()?, msn_schema.clone(), Some(props))?;

    let mut ms1 = Ms1Columns::default();
    let mut msn = MsnColumns::default();
    let mut stats = CacheBuildStats::default();

    for raw in MzMLStreamer::open(asset)?.raw_spectra() {
        let record = match ScanRecord::from_raw(raw?) {
            Ok(record) => record,
            Err(failure) => {
                log::debug!("Not caching scan: {failure}");
                stats.skipped_scans += 1;
                continue;
            }
        };

        if record.ms_level > 1 {
            msn.push(&record);
            stats.msn_rows += 1;
            if msn.rows >= BATCH_ROWS {
                msn_writer.write(&msn.finish(&msn_schema)?)?;
            }
            continue;
        }

        stats.ms1_scans += 1;
        if record.peaks.is_empty() {
            // Keeps the scan visible to per-scan queries
            ms1.push(&record, Peak { mz: 0.0, intensity: 0.0 });
            stats.ms1_rows += 1;
        } else {
            if record.peaks.len() > config.build_peak_cap {
                stats.capped_scans += 1;
            }
            let peaks = keep_strongest(&record.peaks, config.build_peak_cap, |p| p.intensity);
            for peak in peaks {
                ms1.push(&record, peak);
            }
            stats.ms1_rows += record.peaks.len().min(config.build_peak_cap);
        }
        if ms1.rows >= BATCH_ROWS {
            ms1_writer.write(&ms1.finish(&ms1_schema)?)?;
        }
    }

    if ms1.rows > 0 {
        ms1_writer.write(&ms1.finish(&ms1_schema)?)?;
    }
    if msn.rows > 0 {
        msn_writer.write(&msn.finish(&msn_schema)?)?;
    }
    ms1_writer.close()?;
    msn_writer.close()?;

    msn_file.persist(&paths.msn)?;
    ms1_file.persist(&paths.ms1)?;

    log::info!(
        "Cached {} ({} MS1 scans, {} MS1 rows, {} MSn rows, {} skipped)",
        asset.display(),
        stats.ms1_scans,
        stats.ms1_rows,
        stats.msn_rows,
        stats.skipped_scans
    );
    if stats.capped_scans > 0 {
        log::debug!(
            "{} scans kept only their {} strongest peaks",
            stats.capped_scans,
            config.build_peak_cap
        );
    }
    Ok(stats)
}
