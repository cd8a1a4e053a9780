//! # mzXML Module
//!
//! Tolerant reader for legacy mzXML. Used by the reconversion fallback to
//! re-encode runs whose direct conversion produced unusable output.
//!
//! mzXML nests MSn `<scan>` elements inside their MS1 parent and stores each
//! peak list as a single Base64 payload of interleaved, network byte order
//! (m/z, intensity) pairs, optionally zlib-compressed:
//!
//! ```text
//! mzXML
//! └── msRun scanCount="N"
//!     └── scan num msLevel retentionTime="PT12.3S" polarity peaksCount
//!         ├── precursorMz (MSn only)
//!         ├── peaks precision="32|64" byteOrder compressionType
//!         └── scan* (nested MSn)
//! ```
//!
//! As with the mzML streamer, XML parsing and peak decoding are separate
//! steps, so one corrupt payload only costs its own scan.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

use base64::prelude::*;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::mzml::{BinaryCompression, BinaryDecodeError, BinaryDecoder};
use crate::scan::{Peak, Polarity, ScanRecord};

pub use error::MzXmlError;

mod error;

#[cfg(test)]
mod tests;

/// One `<scan>` element with its peak payload still encoded
#[derive(Debug, Clone, Default)]
pub struct RawMzXmlScan {
    /// Position of the scan in the document (0-based)
    pub index: i64,
    /// `num` attribute
    pub num: i64,
    /// `msLevel` attribute (defaults to 1)
    pub ms_level: i16,
    /// Retention time in seconds, if parseable
    pub retention_time: Option<f64>,
    /// `polarity` attribute
    pub polarity: Polarity,
    /// Declared number of peaks
    pub peaks_count: Option<usize>,
    /// Content of `<precursorMz>`
    pub precursor_mz: Option<f64>,
    /// Base64 peak payload
    pub peaks: String,
    /// Bits per value (32 or 64)
    pub precision: u8,
    /// Whether values are big-endian ("network" order)
    pub big_endian: bool,
    /// Payload compression
    pub compression: BinaryCompression,
}

impl RawMzXmlScan {
    /// Decode the peak payload into a [`ScanRecord`]
    pub fn decode(self) -> Result<ScanRecord, MzXmlError> {
        let scan = self.num;
        let retention_time = self
            .retention_time
            .ok_or(MzXmlError::MissingRetentionTime(scan))?
            / 60.0;

        let peaks = self.decode_peaks()?;
        if let Some(declared) = self.peaks_count {
            if declared != peaks.len() {
                return Err(MzXmlError::InvalidPeaks {
                    scan,
                    reason: format!("peaksCount is {declared}, payload holds {}", peaks.len()),
                });
            }
        }

        Ok(ScanRecord {
            id: format!("scan={scan}"),
            index: self.index,
            scan,
            ms_level: self.ms_level,
            retention_time,
            polarity: self.polarity,
            precursor_mz: self.precursor_mz,
            peaks,
        })
    }

    fn decode_peaks(&self) -> Result<Vec<Peak>, MzXmlError> {
        let trimmed = self.peaks.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        let scan = self.num;
        let bytes = BASE64_STANDARD
            .decode(trimmed)
            .map_err(|e| MzXmlError::Decode {
                scan,
                source: BinaryDecodeError::from(e),
            })?;
        let bytes = BinaryDecoder::decompress(bytes, self.compression)
            .map_err(|source| MzXmlError::Decode { scan, source })?;

        let width = match self.precision {
            64 => 8,
            _ => 4,
        };
        if bytes.len() % (2 * width) != 0 {
            return Err(MzXmlError::InvalidPeaks {
                scan,
                reason: format!("{} bytes is not a whole number of pairs", bytes.len()),
            });
        }

        let count = bytes.len() / (2 * width);
        let mut cursor = Cursor::new(bytes);
        let mut peaks = Vec::with_capacity(count);
        for _ in 0..count {
            let mz = read_value(&mut cursor, width, self.big_endian)?;
            let intensity = read_value(&mut cursor, width, self.big_endian)?;
            peaks.push(Peak {
                mz,
                intensity: intensity as f32,
            });
        }
        Ok(peaks)
    }
}

fn read_value(cursor: &mut Cursor<Vec<u8>>, width: usize, big_endian: bool) -> std::io::Result<f64> {
    match (width, big_endian) {
        (8, true) => cursor.read_f64::<BigEndian>(),
        (8, false) => cursor.read_f64::<LittleEndian>(),
        (_, true) => cursor.read_f32::<BigEndian>().map(f64::from),
        (_, false) => cursor.read_f32::<LittleEndian>().map(f64::from),
    }
}

/// Parse an `xs:duration` retention time such as `PT12.5S` or `PT1M3S` into seconds
pub fn parse_duration_seconds(value: &str) -> Option<f64> {
    let value = value.trim();
    let rest = value.strip_prefix("PT").or_else(|| value.strip_prefix('P'))?;
    if rest.is_empty() {
        return None;
    }

    let mut seconds = 0.0;
    let mut number = String::new();
    for c in rest.chars() {
        match c {
            'H' | 'M' | 'S' => {
                let n: f64 = number.parse().ok()?;
                seconds += match c {
                    'H' => n * 3600.0,
                    'M' => n * 60.0,
                    _ => n,
                };
                number.clear();
            }
            'T' => {}
            _ => number.push(c),
        }
    }
    // A bare number without designator is taken as seconds
    if !number.is_empty() {
        seconds += number.parse::<f64>().ok()?;
    }
    Some(seconds)
}

/// Streaming reader over the scans of an mzXML document
pub struct MzXmlReader<R: BufRead> {
    reader: Reader<R>,
    current: Option<RawMzXmlScan>,
    next_index: i64,
    scan_count: Option<usize>,
    finished: bool,
}

impl MzXmlReader<BufReader<File>> {
    /// Open an mzXML file for streaming
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MzXmlError> {
        let file = File::open(path.as_ref())?;
        Ok(Self::new(BufReader::with_capacity(64 * 1024, file)))
    }
}

impl<R: BufRead> MzXmlReader<R> {
    /// Create a reader from a BufRead source
    pub fn new(reader: R) -> Self {
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.config_mut().trim_text(true);
        Self {
            reader: xml_reader,
            current: None,
            next_index: 0,
            scan_count: None,
            finished: false,
        }
    }

    /// `scanCount` declared on `msRun`, once it has been read
    pub fn scan_count(&self) -> Option<usize> {
        self.scan_count
    }

    /// Read the next scan without decoding its peaks
    ///
    /// Nested MSn scans are returned after their parent, in document order.
    pub fn next_raw_scan(&mut self) -> Result<Option<RawMzXmlScan>, MzXmlError> {
        if self.finished {
            return Ok(None);
        }

        let mut buf = Vec::new();
        loop {
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => match e.name().as_ref() {
                    b"msRun" => {
                        self.scan_count = get_attribute(e, "scanCount")?.and_then(|s| s.parse().ok());
                    }
                    b"scan" => {
                        let scan = self.parse_scan_attributes(e)?;
                        // A nested scan closes the peak section of its parent
                        if let Some(parent) = self.current.replace(scan) {
                            return Ok(Some(parent));
                        }
                    }
                    b"precursorMz" => {
                        let text = self.read_text(b"precursorMz")?;
                        if let Some(scan) = self.current.as_mut() {
                            scan.precursor_mz = text.trim().parse().ok();
                        }
                    }
                    b"peaks" => {
                        let precision = get_attribute(e, "precision")?;
                        let byte_order = get_attribute(e, "byteOrder")?;
                        let compression = get_attribute(e, "compressionType")?;
                        let text = self.read_text(b"peaks")?;
                        if let Some(scan) = self.current.as_mut() {
                            scan.precision = match precision.as_deref() {
                                Some("64") => 64,
                                _ => 32,
                            };
                            scan.big_endian = !matches!(byte_order.as_deref(), Some("little"));
                            scan.compression = match compression.as_deref() {
                                Some("zlib") => BinaryCompression::Zlib,
                                _ => BinaryCompression::None,
                            };
                            scan.peaks = text;
                        }
                    }
                    _ => {}
                },
                Ok(Event::Empty(ref e)) if e.name().as_ref() == b"scan" => {
                    let scan = self.parse_scan_attributes(e)?;
                    if let Some(parent) = self.current.replace(scan) {
                        return Ok(Some(parent));
                    }
                    return Ok(self.current.take());
                }
                Ok(Event::End(ref e)) => match e.name().as_ref() {
                    b"scan" => {
                        if let Some(scan) = self.current.take() {
                            return Ok(Some(scan));
                        }
                    }
                    b"msRun" => {
                        self.finished = true;
                        return Ok(self.current.take());
                    }
                    _ => {}
                },
                Ok(Event::Eof) => {
                    self.finished = true;
                    return Ok(self.current.take());
                }
                Err(e) => return Err(MzXmlError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }
    }

    fn parse_scan_attributes(&mut self, e: &BytesStart) -> Result<RawMzXmlScan, MzXmlError> {
        let index = self.next_index;
        self.next_index += 1;

        let num = get_attribute(e, "num")?
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(index + 1);
        let ms_level = get_attribute(e, "msLevel")?
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1);
        let retention_time = get_attribute(e, "retentionTime")?
            .as_deref()
            .and_then(parse_duration_seconds);
        let polarity = match get_attribute(e, "polarity")?.as_deref() {
            Some("+") => Polarity::Positive,
            Some("-") => Polarity::Negative,
            _ => Polarity::Unknown,
        };
        let peaks_count = get_attribute(e, "peaksCount")?.and_then(|s| s.trim().parse().ok());

        Ok(RawMzXmlScan {
            index,
            num,
            ms_level,
            retention_time,
            polarity,
            peaks_count,
            precision: 32,
            big_endian: true,
            ..Default::default()
        })
    }

    /// Collect the text content of the element just opened
    fn read_text(&mut self, end: &[u8]) -> Result<String, MzXmlError> {
        let mut text = String::new();
        let mut buf = Vec::new();
        loop {
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Text(t)) => text.push_str(&t.unescape()?),
                Ok(Event::End(ref e)) if e.name().as_ref() == end => return Ok(text),
                Ok(Event::Eof) => return Ok(text),
                Err(e) => return Err(MzXmlError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }
    }

    /// Iterate over raw scans
    pub fn raw_scans(self) -> RawScanIterator<R> {
        RawScanIterator { reader: self }
    }
}

/// Iterator over raw (undecoded) mzXML scans
pub struct RawScanIterator<R: BufRead> {
    reader: MzXmlReader<R>,
}

impl<R: BufRead> Iterator for RawScanIterator<R> {
    type Item = Result<RawMzXmlScan, MzXmlError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_raw_scan().transpose()
    }
}

fn get_attribute(e: &BytesStart, name: &str) -> Result<Option<String>, MzXmlError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| MzXmlError::Xml(quick_xml::Error::from(e)))?;
        if attr.key.as_ref() == name.as_bytes() {
            return Ok(Some(std::str::from_utf8(&attr.value)?.to_string()));
        }
    }
    Ok(None)
}
