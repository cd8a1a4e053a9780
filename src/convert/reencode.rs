//! Native decode-and-re-encode fallback
//!
//! Reads a run with the crate's own tolerant readers and writes a fresh indexed
//! mzML. Scans whose arrays cannot be decoded are dropped and counted; a
//! structural XML error ends the read but keeps everything written so far.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::mzml::{MzMLStreamer, MzMLWriter};
use crate::mzxml::MzXmlReader;
use crate::scan::ScanRecord;

use super::error::ConvertError;

/// Open formats the native readers understand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeFormat {
    /// mzML (indexed or not)
    MzML,
    /// mzXML
    MzXml,
}

/// Outcome of a re-encode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReencodeCounts {
    /// Scans written to the output
    pub written: usize,
    /// Scans that could not be decoded
    pub dropped: usize,
}

fn record_or_drop<E: std::fmt::Display>(
    decoded: Result<ScanRecord, E>,
    counts: &mut ReencodeCounts,
    writer: &mut MzMLWriter<BufWriter<File>>,
) -> Result<(), ConvertError> {
    match decoded {
        Ok(record) => {
            writer.write_scan(&record)?;
            counts.written += 1;
        }
        Err(e) => {
            log::debug!("Dropping scan: {e}");
            counts.dropped += 1;
        }
    }
    Ok(())
}

/// Re-encode `input` as indexed mzML at `output`
pub fn reencode(
    input: &Path,
    format: NativeFormat,
    output: &Path,
    run_id: &str,
) -> Result<ReencodeCounts, ConvertError> {
    let out = BufWriter::new(File::create(output)?);
    let mut writer = MzMLWriter::new(out, run_id)?;
    let mut counts = ReencodeCounts::default();

    match format {
        NativeFormat::MzML => {
            for raw in MzMLStreamer::open(input)?.raw_spectra() {
                match raw {
                    Ok(raw) => record_or_drop(ScanRecord::from_raw(raw), &mut counts, &mut writer)?,
                    Err(e) => {
                        log::warn!("Stopping re-encode of {}: {e}", input.display());
                        counts.dropped += 1;
                        break;
                    }
                }
            }
        }
        NativeFormat::MzXml => {
            for raw in MzXmlReader::open(input)?.raw_scans() {
                match raw {
                    Ok(raw) => record_or_drop(raw.decode(), &mut counts, &mut writer)?,
                    Err(e) => {
                        log::warn!("Stopping re-encode of {}: {e}", input.display());
                        counts.dropped += 1;
                        break;
                    }
                }
            }
        }
    }

    let mut out = writer.finish()?;
    std::io::Write::flush(&mut out)?;
    Ok(counts)
}
