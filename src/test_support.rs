//! Synthetic runs shared by unit tests

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::mzml::MzMLWriter;
use crate::scan::{Peak, Polarity, ScanRecord};

/// A scan with the given peaks
pub(crate) fn scan(index: i64, rt: f64, ms_level: i16, peaks: &[(f64, f32)]) -> ScanRecord {
    ScanRecord {
        id: format!("controllerType=0 controllerNumber=1 scan={}", index + 1),
        index,
        scan: index + 1,
        ms_level,
        retention_time: rt,
        polarity: Polarity::Positive,
        precursor_mz: (ms_level > 1).then_some(445.12 + index as f64),
        peaks: peaks
            .iter()
            .map(|&(mz, intensity)| Peak { mz, intensity })
            .collect(),
    }
}

/// Write `records` as an indexed mzML file
pub(crate) fn write_run(path: &Path, records: &[ScanRecord]) {
    let out = BufWriter::new(File::create(path).unwrap());
    let mut writer = MzMLWriter::new(out, "synthetic").unwrap();
    for record in records {
        writer.write_scan(record).unwrap();
    }
    writer.finish().unwrap();
}

/// `n` scans one minute apart starting at 1.0 min; every third scan is MS2
///
/// MS1 scans carry peaks at 100.0 (intensity = scan number) and 200.0
/// (intensity 10).
pub(crate) fn synthetic_scans(n: usize) -> Vec<ScanRecord> {
    (0..n as i64)
        .map(|i| {
            let rt = 1.0 + i as f64;
            if i % 3 == 2 {
                scan(i, rt, 2, &[(150.0, 3.0)])
            } else {
                scan(i, rt, 1, &[(100.0, (i + 1) as f32), (200.0, 10.0)])
            }
        })
        .collect()
}

/// mzML with one good MS1 spectrum and one whose m/z array is not Base64
pub(crate) const PARTLY_CORRUPT_MZML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mzML xmlns="http://psi.hupo.org/ms/mzml" version="1.1.0">
  <run id="partly_corrupt">
    <spectrumList count="2">
      <spectrum index="0" id="scan=1" defaultArrayLength="2">
        <cvParam cvRef="MS" accession="MS:1000511" name="ms level" value="1"/>
        <scanList count="1">
          <scan>
            <cvParam cvRef="MS" accession="MS:1000016" name="scan start time" value="60.0" unitCvRef="UO" unitAccession="UO:0000010" unitName="second"/>
          </scan>
        </scanList>
        <binaryDataArrayList count="2">
          <binaryDataArray>
            <cvParam cvRef="MS" accession="MS:1000523" name="64-bit float"/>
            <cvParam cvRef="MS" accession="MS:1000514" name="m/z array"/>
            <binary>AAAAAAAAWUAAAAAAAABpQA==</binary>
          </binaryDataArray>
          <binaryDataArray>
            <cvParam cvRef="MS" accession="MS:1000521" name="32-bit float"/>
            <cvParam cvRef="MS" accession="MS:1000515" name="intensity array"/>
            <binary>AADIQgAASEM=</binary>
          </binaryDataArray>
        </binaryDataArrayList>
      </spectrum>
      <spectrum index="1" id="scan=2" defaultArrayLength="2">
        <cvParam cvRef="MS" accession="MS:1000511" name="ms level" value="1"/>
        <scanList count="1">
          <scan>
            <cvParam cvRef="MS" accession="MS:1000016" name="scan start time" value="2.0" unitCvRef="UO" unitAccession="UO:0000031" unitName="minute"/>
          </scan>
        </scanList>
        <binaryDataArrayList count="2">
          <binaryDataArray>
            <cvParam cvRef="MS" accession="MS:1000523" name="64-bit float"/>
            <cvParam cvRef="MS" accession="MS:1000514" name="m/z array"/>
            <binary>not base64 at all!</binary>
          </binaryDataArray>
          <binaryDataArray>
            <cvParam cvRef="MS" accession="MS:1000521" name="32-bit float"/>
            <cvParam cvRef="MS" accession="MS:1000515" name="intensity array"/>
            <binary>AADIQgAASEM=</binary>
          </binaryDataArray>
        </binaryDataArrayList>
      </spectrum>
    </spectrumList>
  </run>
</mzML>"#;
