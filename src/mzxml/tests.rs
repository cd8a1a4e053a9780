use super::*;
use std::io::{Cursor, Write};

use byteorder::WriteBytesExt;
use flate2::write::ZlibEncoder;
use flate2::Compression;

fn encode_pairs(pairs: &[(f64, f64)], zlib: bool) -> String {
    let mut bytes = Vec::new();
    for &(mz, intensity) in pairs {
        bytes.write_f32::<BigEndian>(mz as f32).unwrap();
        bytes.write_f32::<BigEndian>(intensity as f32).unwrap();
    }
    if zlib {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&bytes).unwrap();
        bytes = encoder.finish().unwrap();
    }
    BASE64_STANDARD.encode(bytes)
}

fn document(second_payload: &str) -> String {
    let ms1 = encode_pairs(&[(100.0, 10.0), (278.25, 50.0)], false);
    let ms2 = encode_pairs(&[(80.5, 5.0)], true);
    format!(
        r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<mzXML xmlns="http://sashimi.sourceforge.net/schema_revision/mzXML_3.2">
  <msRun scanCount="3">
    <scan num="1" msLevel="1" peaksCount="2" polarity="+" retentionTime="PT300S">
      <peaks precision="32" byteOrder="network" compressionType="none" contentType="m/z-int">{ms1}</peaks>
      <scan num="2" msLevel="2" peaksCount="1" polarity="+" retentionTime="PT5M1.5S">
        <precursorMz precursorIntensity="50.0">278.25</precursorMz>
        <peaks precision="32" byteOrder="network" compressionType="zlib" contentType="m/z-int">{ms2}</peaks>
      </scan>
    </scan>
    <scan num="3" msLevel="1" peaksCount="2" polarity="+" retentionTime="PT330S">
      <peaks precision="32" byteOrder="network" compressionType="none" contentType="m/z-int">{second_payload}</peaks>
    </scan>
  </msRun>
</mzXML>"#
    )
}

#[test]
fn test_parse_duration() {
    assert_eq!(parse_duration_seconds("PT12.5S"), Some(12.5));
    assert_eq!(parse_duration_seconds("PT1M3S"), Some(63.0));
    assert_eq!(parse_duration_seconds("PT1H"), Some(3600.0));
    assert_eq!(parse_duration_seconds("garbage"), None);
    assert_eq!(parse_duration_seconds("PT"), None);
}

#[test]
fn test_nested_scans_in_document_order() {
    let payload = encode_pairs(&[(120.0, 1.0), (130.0, 2.0)], false);
    let xml = document(&payload);
    let reader = MzXmlReader::new(Cursor::new(xml.as_bytes()));
    let scans: Vec<_> = reader
        .raw_scans()
        .map(|r| r.unwrap().decode().unwrap())
        .collect();

    assert_eq!(scans.len(), 3);
    assert_eq!(scans.iter().map(|s| s.scan).collect::<Vec<_>>(), vec![1, 2, 3]);

    assert_eq!(scans[0].ms_level, 1);
    assert_eq!(scans[0].retention_time, 5.0);
    assert_eq!(scans[0].polarity, Polarity::Positive);
    assert_eq!(scans[0].peaks[1].mz, 278.25);

    assert_eq!(scans[1].ms_level, 2);
    assert_eq!(scans[1].precursor_mz, Some(278.25));
    assert_eq!(scans[1].peaks.len(), 1);
    assert!((scans[1].retention_time - 301.5 / 60.0).abs() < 1e-12);

    assert_eq!(scans[2].retention_time, 5.5);
}

#[test]
fn test_corrupt_payload_only_affects_its_scan() {
    let xml = document("####");
    let mut reader = MzXmlReader::new(Cursor::new(xml.as_bytes()));

    let mut decoded = Vec::new();
    let mut dropped = 0;
    while let Some(raw) = reader.next_raw_scan().unwrap() {
        match raw.decode() {
            Ok(record) => decoded.push(record.scan),
            Err(_) => dropped += 1,
        }
    }

    assert_eq!(decoded, vec![1, 2]);
    assert_eq!(dropped, 1);
    assert_eq!(reader.scan_count(), Some(3));
}

#[test]
fn test_peaks_count_mismatch_is_rejected() {
    let raw = RawMzXmlScan {
        num: 9,
        retention_time: Some(60.0),
        peaks_count: Some(4),
        peaks: encode_pairs(&[(1.0, 1.0)], false),
        precision: 32,
        big_endian: true,
        ..Default::default()
    };
    assert!(matches!(
        raw.decode(),
        Err(MzXmlError::InvalidPeaks { scan: 9, .. })
    ));
}
