use super::*;

use crate::test_support::{synthetic_scans, write_run, PARTLY_CORRUPT_MZML};
use crate::usi::ProviderKind;

/// Converter whose direct tier always fails
struct BrokenConverter;

impl ConversionTool for BrokenConverter {
    fn convert(&self, input: &Path, _output: &Path) -> Result<(), ConvertError> {
        Err(ConvertError::ToolFailed {
            tool: "broken".to_string(),
            input: input.to_path_buf(),
            reason: "exit status 1".to_string(),
        })
    }

    fn decode_raw(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        self.convert(input, output)
    }
}

/// Vendor decoder that emits a fixed mzML document
struct FakeRawDecoder(Vec<u8>);

impl ConversionTool for FakeRawDecoder {
    fn convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        std::fs::copy(input, output)?;
        Ok(())
    }

    fn decode_raw(&self, _input: &Path, output: &Path) -> Result<(), ConvertError> {
        std::fs::write(output, &self.0)?;
        Ok(())
    }
}

fn local(path: &Path) -> FetchDescriptor {
    FetchDescriptor {
        remote_uri: path.display().to_string(),
        provider_kind: ProviderKind::Local,
        source_name: path.file_name().unwrap().to_string_lossy().into_owned(),
    }
}

fn remote(uri: &str, name: &str) -> FetchDescriptor {
    FetchDescriptor {
        remote_uri: uri.to_string(),
        provider_kind: ProviderKind::ArchiveDataset,
        source_name: name.to_string(),
    }
}

fn scratch_is_empty(storage: &StorageConfig) -> bool {
    match std::fs::read_dir(storage.temp_dir()) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

#[test]
fn test_source_format_from_name() {
    assert_eq!(SourceFormat::from_name("a.mzML"), Some(SourceFormat::MzML));
    assert_eq!(SourceFormat::from_name("a.MZXML"), Some(SourceFormat::MzXml));
    assert_eq!(SourceFormat::from_name("a.mzdata"), Some(SourceFormat::MzData));
    assert_eq!(SourceFormat::from_name("run.RAW"), Some(SourceFormat::Vendor));
    assert_eq!(SourceFormat::from_name("run.d/"), Some(SourceFormat::Vendor));
    assert_eq!(SourceFormat::from_name("spectra.mgf"), None);
    assert_eq!(SourceFormat::from_name("noext"), None);
}

#[test]
fn test_local_mzml_direct_then_cache_hit() {
    let dir = tempfile::tempdir().unwrap();
    let storage = StorageConfig::under(dir.path());
    let upload = dir.path().join("upload.mzML");
    write_run(&upload, &synthetic_scans(6));

    let usi = Usi::parse("mzspec:LOCAL:upload.mzML").unwrap();
    let materializer = Materializer::new(storage.clone(), StaticDownloader::new(), PassthroughTool);

    let run = materializer.materialize(&usi, &local(&upload)).unwrap();
    assert_eq!(run.report.tier, ConversionTier::Direct);
    assert_eq!(run.report.records_written, 6);
    assert_eq!(run.path, storage.asset_dir.join(canonical_filename(&usi)));
    assert_eq!(validate_mzml(&run.path).unwrap(), 6);
    assert!(scratch_is_empty(&storage));

    let again = materializer.materialize(&usi, &local(&upload)).unwrap();
    assert_eq!(again.report.tier, ConversionTier::CacheHit);
    assert_eq!(again.path, run.path);
}

#[test]
fn test_download_then_convert() {
    let dir = tempfile::tempdir().unwrap();
    let storage = StorageConfig::under(dir.path());
    let source = dir.path().join("source.mzML");
    write_run(&source, &synthetic_scans(3));
    let uri = "https://example.org/data/run.mzML";
    let downloader = StaticDownloader::new().serve(uri, std::fs::read(&source).unwrap());

    let usi = Usi::parse("mzspec:MSV000084494:run:scan:1").unwrap();
    let materializer = Materializer::new(storage.clone(), downloader, PassthroughTool);
    let run = materializer.materialize(&usi, &remote(uri, "run.mzML")).unwrap();

    assert_eq!(run.report.records_written, 3);
    assert!(run.path.is_file());
    assert!(scratch_is_empty(&storage));
}

#[test]
fn test_failed_converter_falls_back_to_reencode() {
    let dir = tempfile::tempdir().unwrap();
    let storage = StorageConfig::under(dir.path());
    let uri = "https://example.org/partly_corrupt.mzML";
    let downloader = StaticDownloader::new().serve(uri, PARTLY_CORRUPT_MZML);

    let usi = Usi::parse("mzspec:MSV000084494:partly_corrupt").unwrap();
    let materializer = Materializer::new(storage, downloader, BrokenConverter);
    let run = materializer
        .materialize(&usi, &remote(uri, "partly_corrupt.mzML"))
        .unwrap();

    assert_eq!(run.report.tier, ConversionTier::Reencoded);
    assert_eq!(run.report.records_written, 1);
    assert_eq!(run.report.records_dropped, 1);
}

#[test]
fn test_mzxml_without_converter_is_reencoded() {
    let dir = tempfile::tempdir().unwrap();
    let storage = StorageConfig::under(dir.path());
    let mzxml = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<mzXML>
  <msRun scanCount="1">
    <scan num="7" msLevel="1" peaksCount="0" polarity="-" retentionTime="PT90S">
      <peaks precision="32" byteOrder="network" compressionType="none"></peaks>
    </scan>
  </msRun>
</mzXML>"#;
    let uri = "https://example.org/old.mzXML";
    let downloader = StaticDownloader::new().serve(uri, mzxml);

    let usi = Usi::parse("mzspec:MSV000000001:old.mzXML").unwrap();
    let materializer = Materializer::new(storage, downloader, PassthroughTool);
    let run = materializer.materialize(&usi, &remote(uri, "old.mzXML")).unwrap();

    // A copied mzXML fails validation, so the native reader takes over
    assert_eq!(run.report.tier, ConversionTier::Reencoded);
    assert_eq!(run.report.records_written, 1);
}

#[test]
fn test_vendor_file_goes_through_decoder() {
    let dir = tempfile::tempdir().unwrap();
    let storage = StorageConfig::under(dir.path());
    let decoded = dir.path().join("decoded.mzML");
    write_run(&decoded, &synthetic_scans(4));
    let uri = "https://example.org/run.raw";
    let downloader = StaticDownloader::new().serve(uri, b"\x01\xa1vendor bytes".to_vec());

    let usi = Usi::parse("mzspec:MSV000000001:run.raw").unwrap();
    let tool = FakeRawDecoder(std::fs::read(&decoded).unwrap());
    let run = Materializer::new(storage, downloader, tool)
        .materialize(&usi, &remote(uri, "run.raw"))
        .unwrap();
    assert_eq!(run.report.tier, ConversionTier::Direct);
    assert_eq!(run.report.records_written, 4);
}

#[test]
fn test_empty_download_is_conversion_failure() {
    let dir = tempfile::tempdir().unwrap();
    let storage = StorageConfig::under(dir.path());
    let uri = "https://example.org/empty.mzML";
    let downloader = StaticDownloader::new().serve(uri, Vec::new());

    let usi = Usi::parse("mzspec:MSV000000001:empty.mzML").unwrap();
    let materializer = Materializer::new(storage.clone(), downloader, PassthroughTool);
    let err = materializer
        .materialize(&usi, &remote(uri, "empty.mzML"))
        .unwrap_err();

    assert!(matches!(err, ConvertError::ConversionFailure { .. }));
    assert!(!materializer.canonical_path(&usi).exists());
    assert!(scratch_is_empty(&storage));
}

#[test]
fn test_missing_remote_is_fetch_error() {
    let dir = tempfile::tempdir().unwrap();
    let usi = Usi::parse("mzspec:MSV000000001:gone.mzML").unwrap();
    let materializer = Materializer::new(
        StorageConfig::under(dir.path()),
        StaticDownloader::new(),
        PassthroughTool,
    );
    let err = materializer
        .materialize(&usi, &remote("https://example.org/gone.mzML", "gone.mzML"))
        .unwrap_err();
    assert!(matches!(err, ConvertError::Fetch { .. }));
}

#[test]
fn test_unsupported_format() {
    let dir = tempfile::tempdir().unwrap();
    let usi = Usi::parse("mzspec:MSV000000001:spectra.mgf").unwrap();
    let materializer = Materializer::new(
        StorageConfig::under(dir.path()),
        StaticDownloader::new(),
        PassthroughTool,
    );
    let err = materializer
        .materialize(&usi, &remote("https://example.org/spectra.mgf", "spectra.mgf"))
        .unwrap_err();
    assert!(matches!(err, ConvertError::UnsupportedFormat(_)));
}
