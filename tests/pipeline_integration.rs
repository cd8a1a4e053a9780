//! Integration tests for lcms-explorer
//!
//! These tests drive the full pipeline from identifier to map and chromatogram,
//! with in-memory providers and downloads standing in for the network.

use lcms_explorer::aggregation::OverlayKind;
use lcms_explorer::cache::CachePaths;
use lcms_explorer::config::ExplorerConfig;
use lcms_explorer::convert::{ConversionTier, PassthroughTool, StaticDownloader};
use lcms_explorer::error::{Stage, StageError};
use lcms_explorer::explorer::{Explorer, MapRequest};
use lcms_explorer::mzml::MzMLWriter;
use lcms_explorer::resolver::{ProviderEndpoints, ResolveOptions, Resolver, StaticMetadataClient};
use lcms_explorer::scan::{Peak, Polarity, RtWindow, ScanRecord};
use lcms_explorer::xic::{Tolerance, XicRequest, XicTarget};
use tempfile::tempdir;

const BASE: &str = "http://mock.test";
const USI: &str = "mzspec:MSV000084494:run:scan:3";
const LISTING: &str = r#"{"row_data": [{"file_descriptor": "f.MSV000084494/peak/run.mzML"}]}"#;

/// 30 scans 0.5 min apart from 0.5 min; every fifth is MS2 of 278.2
fn synthetic_run() -> Vec<u8> {
    let mut writer = MzMLWriter::new(Vec::new(), "run").unwrap();
    for i in 0..30i64 {
        let ms2 = i % 5 == 4;
        let peaks = if ms2 {
            vec![Peak { mz: 110.0, intensity: 7.0 }]
        } else {
            vec![
                Peak { mz: 120.0, intensity: 50.0 },
                Peak { mz: 278.19, intensity: 1000.0 + i as f32 },
                Peak { mz: 350.0, intensity: 500.0 },
            ]
        };
        let record = ScanRecord {
            id: format!("controllerType=0 controllerNumber=1 scan={}", i + 1),
            index: i,
            scan: i + 1,
            ms_level: if ms2 { 2 } else { 1 },
            retention_time: 0.5 + i as f64 * 0.5,
            polarity: Polarity::Positive,
            precursor_mz: ms2.then_some(278.2),
            peaks,
        };
        writer.write_scan(&record).unwrap();
    }
    writer.finish().unwrap()
}

fn client() -> StaticMetadataClient {
    StaticMetadataClient::new().respond("QuerySpectrum", LISTING)
}

/// Explorer whose archive lists `run.mzML` and whose downloader serves it
fn remote_explorer(config: ExplorerConfig) -> Explorer {
    let resolver = Resolver::new(config.providers.clone(), "/nonexistent", client());
    let descriptor = resolver.resolve_str(USI, &ResolveOptions::default()).unwrap();
    let downloader = StaticDownloader::new().serve(descriptor.remote_uri, synthetic_run());
    Explorer::new(config, client(), downloader, PassthroughTool)
}

fn config_under(root: &std::path::Path) -> ExplorerConfig {
    ExplorerConfig {
        providers: ProviderEndpoints::all_at(BASE),
        ..ExplorerConfig::under(root)
    }
}

/// Identifier to map and chromatogram through a remote archive
#[test]
fn test_remote_run_end_to_end() {
    let dir = tempdir().unwrap();
    let explorer = remote_explorer(config_under(dir.path()));

    let run = explorer.fetch(USI).unwrap();
    assert_eq!(run.report.tier, ConversionTier::Direct);
    assert_eq!(run.report.records_written, 30);
    assert!(run.path.starts_with(dir.path().join("runs")));

    let again = explorer.fetch(USI).unwrap();
    assert_eq!(again.report.tier, ConversionTier::CacheHit);
    assert_eq!(again.path, run.path);

    let stats = explorer.build_cache(USI).unwrap();
    assert_eq!(stats.ms1_scans, 24);
    assert!(CachePaths::for_asset(&run.path).exist());

    let summary = explorer.summary(USI).unwrap();
    assert_eq!(summary.ms1_count, 24);
    assert_eq!(summary.msn_count, 6);
    assert_eq!(summary.mz_min, Some(120.0));
    assert_eq!(summary.mz_max, Some(350.0));

    let view = explorer.map(USI, &MapRequest::default()).unwrap();
    assert_eq!(view.grid.width, 100);
    assert_eq!(view.grid.height, 230);
    assert!(view.grid.occupied() > 0);
    assert_eq!(view.precursor_markers.as_ref().map(Vec::len), Some(6));
    assert_eq!(view.overlays.len(), 1);
    assert_eq!(view.overlays[0].kind, OverlayKind::QueryBounds);

    let request = XicRequest::targets(
        vec![XicTarget::new(278.19)],
        Tolerance::Da(0.5),
        RtWindow::new(1.9, 6.1),
    );
    let table = explorer.xic(USI, &request).unwrap();
    assert_eq!(table.len(), 7);
    assert_eq!(table.columns[0].values[0], 1003.0);
    assert_eq!(table.ms2_markers.len(), 2);

    let tic = explorer.xic(USI, &XicRequest::tic(RtWindow::new(1.9, 6.1))).unwrap();
    assert_eq!(tic.columns[0].values[0], 1553.0);
}

/// Local uploads skip the network and convert in place
#[test]
fn test_local_upload() {
    let dir = tempdir().unwrap();
    let config = config_under(dir.path());
    std::fs::create_dir_all(&config.storage.upload_dir).unwrap();
    std::fs::write(config.storage.upload_dir.join("upload.mzML"), synthetic_run()).unwrap();

    let explorer = Explorer::new(
        config,
        StaticMetadataClient::new(),
        StaticDownloader::new(),
        PassthroughTool,
    );
    let run = explorer.fetch("mzspec:LOCAL:upload.mzML").unwrap();
    assert_eq!(run.report.tier, ConversionTier::Direct);

    let view = explorer
        .map(
            "mzspec:LOCAL:upload.mzML",
            &MapRequest {
                window: Some(RtWindow::new(0.9, 3.1)),
                mz_range: Some((270.0, 290.0)),
                polarity: Some(Polarity::Positive),
                highlight: None,
            },
        )
        .unwrap();
    assert_eq!(view.grid.width, 100);
    assert_eq!(view.grid.height, 100);
    assert_eq!(view.grid.occupied(), 4);
}

/// Failures name the identifier and the stage
#[test]
fn test_errors_name_stage() {
    let dir = tempdir().unwrap();
    let explorer = Explorer::new(
        config_under(dir.path()),
        StaticMetadataClient::new(),
        StaticDownloader::new(),
        PassthroughTool,
    );

    let err = explorer.fetch("mzspec:ZENODO1:file.mzML").unwrap_err();
    assert_eq!(err.stage, Stage::Resolution);
    assert_eq!(err.identifier, "mzspec:ZENODO1:file.mzML");

    // The archive lookup fails, the best-effort location is tried, and the
    // download of it fails
    let err = explorer.fetch("mzspec:MSV000084494:peak/run.mzML").unwrap_err();
    assert_eq!(err.stage, Stage::Conversion);
    assert!(err.to_string().contains("mzspec:MSV000084494:peak/run.mzML"));

    let err = explorer.fetch("mzspec:LOCAL:missing.mzML").unwrap_err();
    assert_eq!(err.stage, Stage::Resolution);
    assert!(matches!(err.source, StageError::Resolve(_)));
}
