//! Filtered, partial-column reads of the cache tables

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrowPrimitiveType, AsArray, BooleanArray, Float64Array, Int8Array, PrimitiveArray};
use arrow::compute::kernels::cmp::{eq, gt_eq, lt_eq};
use arrow::compute::{and, or};
use arrow::datatypes::{Float32Type, Float64Type, Int64Type, Int8Type};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::{ArrowPredicateFn, ParquetRecordBatchReaderBuilder, RowFilter};
use parquet::arrow::ProjectionMask;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::schema::types::SchemaDescriptor;

use crate::scan::{PeakPoint, Polarity, PrecursorMarker, RtWindow};
use crate::summary::RunSummary;

use super::config::CacheConfig;
use super::error::CacheError;
use super::schema::{columns, CACHE_VERSION, KEY_CACHE_VERSION};
use super::{keep_strongest, CachePaths};

/// Row selection applied while reading
#[derive(Debug, Clone, PartialEq)]
pub struct PeakFilter {
    /// Retention-time window (minutes)
    pub window: RtWindow,
    /// Keep peaks inside any of these closed m/z ranges; empty keeps all
    pub mz_ranges: Vec<(f64, f64)>,
    /// Keep only scans of this polarity
    pub polarity: Option<Polarity>,
}

impl PeakFilter {
    /// Every peak inside `window`
    pub fn window(window: RtWindow) -> Self {
        Self {
            window,
            mz_ranges: Vec::new(),
            polarity: None,
        }
    }

    /// Restrict to one m/z range
    pub fn with_mz_range(mut self, low: f64, high: f64) -> Self {
        self.mz_ranges.push((low.min(high), low.max(high)));
        self
    }

    /// Restrict to one polarity
    pub fn with_polarity(mut self, polarity: Option<Polarity>) -> Self {
        self.polarity = polarity;
        self
    }
}

fn primitive_column<'a, T: ArrowPrimitiveType>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a PrimitiveArray<T>, ArrowError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| ArrowError::SchemaError(format!("Column not found: {name}")))?
        .as_primitive_opt::<T>()
        .ok_or_else(|| ArrowError::SchemaError(format!("{name} has type {}", T::DATA_TYPE)))
}

fn leaf_mask(descr: &SchemaDescriptor, names: &[&str]) -> Result<ProjectionMask, CacheError> {
    let mut leaves = Vec::with_capacity(names.len());
    for name in names {
        let leaf = descr
            .columns()
            .iter()
            .position(|c| c.name() == *name)
            .ok_or_else(|| CacheError::ColumnNotFound(name.to_string()))?;
        leaves.push(leaf);
    }
    Ok(ProjectionMask::leaves(descr, leaves))
}

/// Row mask for `filter`; only columns the filter needs are read
fn filter_mask(batch: &RecordBatch, filter: &PeakFilter) -> Result<BooleanArray, ArrowError> {
    let rt = primitive_column::<Float64Type>(batch, columns::RT)?;
    let mut mask = and(
        &gt_eq(rt, &Float64Array::new_scalar(filter.window.start))?,
        &lt_eq(rt, &Float64Array::new_scalar(filter.window.end))?,
    )?;

    if let Some(polarity) = filter.polarity {
        let column = primitive_column::<Int8Type>(batch, columns::POLARITY)?;
        mask = and(&mask, &eq(column, &Int8Array::new_scalar(polarity.as_i8()))?)?;
    }

    if !filter.mz_ranges.is_empty() {
        let mz = primitive_column::<Float64Type>(batch, columns::MZ)?;
        let mut any: Option<BooleanArray> = None;
        for &(low, high) in &filter.mz_ranges {
            let inside = and(
                &gt_eq(mz, &Float64Array::new_scalar(low))?,
                &lt_eq(mz, &Float64Array::new_scalar(high))?,
            )?;
            any = Some(match any {
                Some(previous) => or(&previous, &inside)?,
                None => inside,
            });
        }
        if let Some(any) = any {
            mask = and(&mask, &any)?;
        }
    }
    Ok(mask)
}

/// Open a table with `filter` pushed down as a row filter
fn filtered_batches(
    path: &Path,
    filter: &PeakFilter,
    filter_columns: &[&str],
    output_columns: &[&str],
) -> Result<impl Iterator<Item = Result<RecordBatch, ArrowError>>, CacheError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
    let descr = builder.parquet_schema();
    let predicate_mask = leaf_mask(descr, filter_columns)?;
    let projection = leaf_mask(descr, output_columns)?;

    let owned = filter.clone();
    let predicate = ArrowPredicateFn::new(predicate_mask, move |batch| filter_mask(&batch, &owned));
    Ok(builder
        .with_projection(projection)
        .with_row_filter(RowFilter::new(vec![Box::new(predicate)]))
        .build()?)
}

fn predicate_columns(filter: &PeakFilter) -> Vec<&'static str> {
    let mut names = vec![columns::RT];
    if filter.polarity.is_some() {
        names.push(columns::POLARITY);
    }
    if !filter.mz_ranges.is_empty() {
        names.push(columns::MZ);
    }
    names
}

/// Cache version stored in a table footer
fn table_version(path: &Path) -> Result<Option<String>, CacheError> {
    let reader = SerializedFileReader::new(File::open(path)?)?;
    let version = reader
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .and_then(|kv| kv.iter().find(|kv| kv.key == KEY_CACHE_VERSION))
        .and_then(|kv| kv.value.clone());
    Ok(version)
}

fn table_rows(path: &Path) -> Result<i64, CacheError> {
    let reader = SerializedFileReader::new(File::open(path)?)?;
    Ok(reader.metadata().file_metadata().num_rows())
}

/// Read access to a complete cache
#[derive(Debug, Clone)]
pub struct PeakCache {
    paths: CachePaths,
    read_peak_cap: usize,
}

impl PeakCache {
    /// Open the cache of `asset`, or `None` when it is absent or stale
    ///
    /// Absence is not an error: callers fall back to streaming.
    pub fn open(asset: &Path, config: &CacheConfig) -> Option<Self> {
        let paths = CachePaths::for_asset(asset);
        if !paths.exist() {
            log::debug!("No cache for {}", asset.display());
            return None;
        }
        for table in [&paths.ms1, &paths.msn] {
            match table_version(table) {
                Ok(Some(version)) if version == CACHE_VERSION => {}
                Ok(other) => {
                    log::info!(
                        "Ignoring cache table {} with version {other:?}",
                        table.display()
                    );
                    return None;
                }
                Err(e) => {
                    log::warn!("Unreadable cache table {}: {e}", table.display());
                    return None;
                }
            }
        }
        log::debug!("Cache hit for {}", asset.display());
        Some(Self {
            paths,
            read_peak_cap: config.read_peak_cap,
        })
    }

    /// Table locations
    pub fn paths(&self) -> &CachePaths {
        &self.paths
    }

    /// MS1 peaks matching `filter`, at most the read cap per scan
    pub fn ms1_peaks(&self, filter: &PeakFilter) -> Result<Vec<PeakPoint>, CacheError> {
        self.read_ms1_peaks(filter, Some(self.read_peak_cap))
    }

    /// MS1 peaks matching `filter` with no per-scan cap
    pub fn ms1_peaks_uncapped(&self, filter: &PeakFilter) -> Result<Vec<PeakPoint>, CacheError> {
        self.read_ms1_peaks(filter, None)
    }

    fn read_ms1_peaks(
        &self,
        filter: &PeakFilter,
        cap: Option<usize>,
    ) -> Result<Vec<PeakPoint>, CacheError> {
        let batches = filtered_batches(
            &self.paths.ms1,
            filter,
            &predicate_columns(filter),
            &[columns::SCAN, columns::MZ, columns::INTENSITY, columns::RT],
        )?;

        let mut points = Vec::new();
        let mut current: Vec<PeakPoint> = Vec::new();
        let flush = |current: &mut Vec<PeakPoint>, points: &mut Vec<PeakPoint>| {
            match cap {
                Some(cap) => points.extend(keep_strongest(current.as_slice(), cap, |p| p.intensity)),
                None => points.extend_from_slice(current.as_slice()),
            }
            current.clear();
        };

        for batch in batches {
            let batch = batch?;
            let scan = primitive_column::<Int64Type>(&batch, columns::SCAN)?;
            let mz = primitive_column::<Float64Type>(&batch, columns::MZ)?;
            let intensity = primitive_column::<Float32Type>(&batch, columns::INTENSITY)?;
            let rt = primitive_column::<Float64Type>(&batch, columns::RT)?;

            for i in 0..batch.num_rows() {
                let point = PeakPoint {
                    scan: scan.value(i),
                    rt: rt.value(i),
                    mz: mz.value(i),
                    intensity: intensity.value(i),
                };
                if current.last().is_some_and(|last| last.scan != point.scan) {
                    flush(&mut current, &mut points);
                }
                current.push(point);
            }
        }
        flush(&mut current, &mut points);
        Ok(points)
    }

    /// Scan numbers and retention times of the MS1 scans in `window`
    pub fn ms1_scans(
        &self,
        window: &RtWindow,
        polarity: Option<Polarity>,
    ) -> Result<Vec<(i64, f64)>, CacheError> {
        let filter = PeakFilter::window(*window).with_polarity(polarity);
        let batches = filtered_batches(
            &self.paths.ms1,
            &filter,
            &predicate_columns(&filter),
            &[columns::SCAN, columns::RT],
        )?;

        let mut scans: Vec<(i64, f64)> = Vec::new();
        for batch in batches {
            let batch = batch?;
            let scan = primitive_column::<Int64Type>(&batch, columns::SCAN)?;
            let rt = primitive_column::<Float64Type>(&batch, columns::RT)?;
            for i in 0..batch.num_rows() {
                if scans.last().map(|&(s, _)| s) != Some(scan.value(i)) {
                    scans.push((scan.value(i), rt.value(i)));
                }
            }
        }
        Ok(scans)
    }

    /// Precursor events in `window`; events without a precursor m/z are omitted
    pub fn precursors(
        &self,
        window: &RtWindow,
        polarity: Option<Polarity>,
    ) -> Result<Vec<PrecursorMarker>, CacheError> {
        let filter = PeakFilter::window(*window).with_polarity(polarity);
        let batches = filtered_batches(
            &self.paths.msn,
            &filter,
            &predicate_columns(&filter),
            &[columns::SCAN, columns::PRECURSOR_MZ, columns::RT],
        )?;

        let mut markers = Vec::new();
        for batch in batches {
            let batch = batch?;
            let scan = primitive_column::<Int64Type>(&batch, columns::SCAN)?;
            let precursor = primitive_column::<Float64Type>(&batch, columns::PRECURSOR_MZ)?;
            let rt = primitive_column::<Float64Type>(&batch, columns::RT)?;
            for i in 0..batch.num_rows() {
                if precursor.is_valid(i) {
                    markers.push(PrecursorMarker {
                        scan: scan.value(i),
                        rt: rt.value(i),
                        precursor_mz: precursor.value(i),
                    });
                }
            }
        }
        Ok(markers)
    }

    /// Whole-run counts and ranges
    pub fn summary(&self) -> Result<RunSummary, CacheError> {
        let mut summary = RunSummary::default();
        let all = PeakFilter::window(RtWindow::unbounded());

        let mut ms1_scans = HashSet::new();
        let batches = filtered_batches(
            &self.paths.ms1,
            &all,
            &[columns::RT],
            &[columns::SCAN, columns::MZ, columns::INTENSITY, columns::RT],
        )?;
        for batch in batches {
            let batch = batch?;
            let scan = primitive_column::<Int64Type>(&batch, columns::SCAN)?;
            let mz = primitive_column::<Float64Type>(&batch, columns::MZ)?;
            let intensity = primitive_column::<Float32Type>(&batch, columns::INTENSITY)?;
            let rt = primitive_column::<Float64Type>(&batch, columns::RT)?;
            for i in 0..batch.num_rows() {
                ms1_scans.insert(scan.value(i));
                summary.observe_rt(rt.value(i));
                if intensity.value(i) > 0.0 {
                    summary.observe_mz(mz.value(i));
                }
            }
        }
        summary.ms1_count = ms1_scans.len();

        let msn_rows = table_rows(&self.paths.msn)?;
        summary.msn_count = usize::try_from(msn_rows).unwrap_or_default();
        let batches = filtered_batches(&self.paths.msn, &all, &[columns::RT], &[columns::RT])?;
        for batch in batches {
            let batch = batch?;
            let rt = primitive_column::<Float64Type>(&batch, columns::RT)?;
            for i in 0..batch.num_rows() {
                summary.observe_rt(rt.value(i));
            }
        }
        Ok(summary)
    }
}
