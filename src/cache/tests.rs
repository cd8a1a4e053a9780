use super::*;

use std::sync::Arc;

use arrow::array::{Float32Array, Float64Array, Int64Array, Int8Array};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use crate::scan::{Polarity, RtWindow};
use crate::stream::WindowedScans;
use crate::summary::RunSummary;
use crate::test_support::{scan, synthetic_scans, write_run};

fn cached_run(records: &[crate::scan::ScanRecord], config: &CacheConfig) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let asset = dir.path().join("run.mzML");
    write_run(&asset, records);
    build_cache(&asset, config).unwrap();
    (dir, asset)
}

#[test]
fn test_cache_paths_append_suffixes() {
    let paths = CachePaths::for_asset(Path::new("/data/mzspec__MSV1__a.mzML"));
    assert_eq!(paths.ms1, PathBuf::from("/data/mzspec__MSV1__a.mzML.ms1.parquet"));
    assert_eq!(paths.msn, PathBuf::from("/data/mzspec__MSV1__a.mzML.msn.parquet"));
}

#[test]
fn test_keep_strongest_preserves_order() {
    let values = [5.0f32, 1.0, 9.0, 3.0, 7.0];
    assert_eq!(keep_strongest(&values, 3, |v| *v), vec![5.0, 9.0, 7.0]);
    assert_eq!(keep_strongest(&values, 10, |v| *v), values.to_vec());
    assert!(keep_strongest(&values, 0, |v| *v).is_empty());
}

#[test]
fn test_build_and_filter() {
    let config = CacheConfig::default();
    let (_dir, asset) = cached_run(&synthetic_scans(10), &config);
    let cache = PeakCache::open(&asset, &config).unwrap();

    let window = RtWindow::new(2.0, 5.0);
    let peaks = cache.ms1_peaks(&PeakFilter::window(window)).unwrap();
    assert_eq!(peaks.len(), 6);
    assert!(peaks.iter().all(|p| window.contains(p.rt)));

    let peaks = cache
        .ms1_peaks(&PeakFilter::window(window).with_mz_range(99.5, 100.5))
        .unwrap();
    let intensities: Vec<f32> = peaks.iter().map(|p| p.intensity).collect();
    assert_eq!(intensities, vec![2.0, 4.0, 5.0]);

    let negative = PeakFilter::window(window).with_polarity(Some(Polarity::Negative));
    assert!(cache.ms1_peaks(&negative).unwrap().is_empty());

    assert_eq!(cache.ms1_scans(&RtWindow::unbounded(), None).unwrap().len(), 7);

    let markers = cache.precursors(&RtWindow::unbounded(), Some(Polarity::Positive)).unwrap();
    let rts: Vec<f64> = markers.iter().map(|m| m.rt).collect();
    assert_eq!(rts, vec![3.0, 6.0, 9.0]);
    assert!((markers[0].precursor_mz - 447.12).abs() < 1e-9);
}

#[test]
fn test_peak_caps() {
    let peaks = [(100.0, 1.0), (101.0, 50.0), (102.0, 3.0), (103.0, 40.0), (104.0, 2.0)];
    let records = vec![scan(0, 1.0, 1, &peaks), scan(1, 2.0, 1, &peaks[..2])];

    let config = CacheConfig {
        build_peak_cap: 4,
        read_peak_cap: 2,
        ..CacheConfig::default()
    };
    let dir = tempfile::tempdir().unwrap();
    let asset = dir.path().join("run.mzML");
    write_run(&asset, &records);
    let stats = build_cache(&asset, &config).unwrap();
    assert_eq!(stats.capped_scans, 1);
    assert_eq!(stats.ms1_rows, 6);

    let cache = PeakCache::open(&asset, &config).unwrap();
    let all = PeakFilter::window(RtWindow::unbounded());
    let uncapped = cache.ms1_peaks_uncapped(&all).unwrap();
    assert_eq!(uncapped.len(), 6);

    let capped = cache.ms1_peaks(&all).unwrap();
    let first_scan: Vec<f64> = capped.iter().filter(|p| p.scan == 1).map(|p| p.mz).collect();
    assert_eq!(first_scan, vec![101.0, 103.0]);
    assert_eq!(capped.iter().filter(|p| p.scan == 2).count(), 2);
}

#[test]
fn test_empty_scan_keeps_a_row() {
    let records = vec![scan(0, 1.0, 1, &[]), scan(1, 2.0, 1, &[(150.0, 4.0)])];
    let config = CacheConfig::default();
    let (_dir, asset) = cached_run(&records, &config);
    let cache = PeakCache::open(&asset, &config).unwrap();

    assert_eq!(
        cache.ms1_scans(&RtWindow::unbounded(), None).unwrap(),
        vec![(1, 1.0), (2, 2.0)]
    );
    let summary = cache.summary().unwrap();
    assert_eq!(summary.mz_min, Some(150.0));
}

#[test]
fn test_summary_matches_stream() {
    let config = CacheConfig::default();
    let (_dir, asset) = cached_run(&synthetic_scans(12), &config);
    let cached = PeakCache::open(&asset, &config).unwrap().summary().unwrap();

    let mut streamed = RunSummary::default();
    for scan in WindowedScans::open_linear(&asset, RtWindow::unbounded()).unwrap() {
        streamed.observe(&scan);
    }
    assert_eq!(cached, streamed);
    assert_eq!(cached.ms1_count, 8);
    assert_eq!(cached.msn_count, 4);
    assert_eq!(cached.rt_min, Some(1.0));
    assert_eq!(cached.rt_max, Some(12.0));
}

#[test]
fn test_missing_table_means_no_cache() {
    let config = CacheConfig::default();
    let (_dir, asset) = cached_run(&synthetic_scans(4), &config);
    std::fs::remove_file(CachePaths::for_asset(&asset).msn).unwrap();
    assert!(PeakCache::open(&asset, &config).is_none());
}

#[test]
fn test_foreign_table_is_ignored() {
    let config = CacheConfig::default();
    let (_dir, asset) = cached_run(&synthetic_scans(4), &config);

    // Overwrite the MS1 table with one that carries no version footer
    let batch = RecordBatch::try_new(
        schema::ms1_schema(),
        vec![
            Arc::new(Int64Array::from(vec![1])),
            Arc::new(Float64Array::from(vec![100.0])),
            Arc::new(Float32Array::from(vec![1.0])),
            Arc::new(Float64Array::from(vec![1.0])),
            Arc::new(Int8Array::from(vec![1])),
        ],
    )
    .unwrap();
    let file = std::fs::File::create(CachePaths::for_asset(&asset).ms1).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema::ms1_schema(), None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    assert!(PeakCache::open(&asset, &config).is_none());
}
