//! Indexed mzML writer
//!
//! Writes [`ScanRecord`]s as an `indexedmzML` document: every `<spectrum>` start
//! tag offset is recorded and emitted in the trailing `indexList`, followed by
//! `indexListOffset`. Arrays are written as 64-bit m/z and 32-bit intensity,
//! zlib-compressed.
//!
//! The spectrum count has to appear before the first spectrum, so spectra are
//! spooled to an anonymous temporary file and spliced behind the header in
//! [`MzMLWriter::finish`].

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::binary::{BinaryEncoder, BinaryEncoding, CompressionType};
use super::cv_params::MS_CV_ACCESSIONS;
use super::models::IndexEntry;
use crate::scan::{Polarity, ScanRecord};

/// Errors raised while writing mzML
#[derive(Debug, thiserror::Error)]
pub enum MzMLWriterError {
    /// I/O error on the output or the spool file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// XML serialization error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Byte-counting wrapper so index offsets are exact
struct CountingWriter<W: Write> {
    inner: W,
    position: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Streaming writer for indexed mzML
pub struct MzMLWriter<W: Write> {
    out: W,
    run_id: String,
    body: Writer<CountingWriter<BufWriter<File>>>,
    offsets: Vec<IndexEntry>,
    mz_encoding: BinaryEncoding,
    intensity_encoding: BinaryEncoding,
    compression: CompressionType,
}

impl<W: Write> MzMLWriter<W> {
    /// Create a writer for one run
    pub fn new(out: W, run_id: impl Into<String>) -> Result<Self, MzMLWriterError> {
        let spool = tempfile::tempfile()?;
        Ok(Self {
            out,
            run_id: run_id.into(),
            body: Writer::new(CountingWriter::new(BufWriter::new(spool))),
            offsets: Vec::new(),
            mz_encoding: BinaryEncoding::Float64,
            intensity_encoding: BinaryEncoding::Float32,
            compression: CompressionType::Zlib,
        })
    }

    /// Number of spectra written so far
    pub fn spectrum_count(&self) -> usize {
        self.offsets.len()
    }

    /// Append one spectrum
    pub fn write_scan(&mut self, record: &ScanRecord) -> Result<(), MzMLWriterError> {
        let index = self.offsets.len();
        let id = if record.id.is_empty() {
            format!("scan={}", record.scan)
        } else {
            record.id.clone()
        };
        self.offsets.push(IndexEntry {
            id: id.clone(),
            offset: self.body.get_ref().position,
        });

        let index_str = index.to_string();
        let length_str = record.peaks.len().to_string();
        let spectrum = BytesStart::new("spectrum").with_attributes([
            ("index", index_str.as_str()),
            ("id", id.as_str()),
            ("defaultArrayLength", length_str.as_str()),
        ]);
        self.body.write_event(Event::Start(spectrum))?;

        let ms_level = record.ms_level.to_string();
        write_cv(&mut self.body, MS_CV_ACCESSIONS::MS_LEVEL, "ms level", Some(&ms_level))?;
        if record.ms_level <= 1 {
            write_cv(&mut self.body, MS_CV_ACCESSIONS::MS1_SPECTRUM, "MS1 spectrum", None)?;
        } else {
            write_cv(&mut self.body, MS_CV_ACCESSIONS::MSN_SPECTRUM, "MSn spectrum", None)?;
        }
        write_cv(
            &mut self.body,
            MS_CV_ACCESSIONS::CENTROID_SPECTRUM,
            "centroid spectrum",
            None,
        )?;
        match record.polarity {
            Polarity::Positive => {
                write_cv(&mut self.body, MS_CV_ACCESSIONS::POSITIVE_SCAN, "positive scan", None)?
            }
            Polarity::Negative => {
                write_cv(&mut self.body, MS_CV_ACCESSIONS::NEGATIVE_SCAN, "negative scan", None)?
            }
            Polarity::Unknown => {}
        }
        let tic = record.total_intensity().to_string();
        write_cv(
            &mut self.body,
            MS_CV_ACCESSIONS::TOTAL_ION_CURRENT,
            "total ion current",
            Some(&tic),
        )?;

        self.write_scan_list(record.retention_time)?;
        if let Some(precursor_mz) = record.precursor_mz {
            self.write_precursor(precursor_mz)?;
        }

        let mz: Vec<f64> = record.peaks.iter().map(|p| p.mz).collect();
        let intensity: Vec<f64> = record.peaks.iter().map(|p| p.intensity as f64).collect();
        self.body.write_event(Event::Start(
            BytesStart::new("binaryDataArrayList").with_attributes([("count", "2")]),
        ))?;
        self.write_array(&mz, self.mz_encoding, MS_CV_ACCESSIONS::MZ_ARRAY, "m/z array")?;
        self.write_array(
            &intensity,
            self.intensity_encoding,
            MS_CV_ACCESSIONS::INTENSITY_ARRAY,
            "intensity array",
        )?;
        self.body
            .write_event(Event::End(BytesEnd::new("binaryDataArrayList")))?;

        self.body.write_event(Event::End(BytesEnd::new("spectrum")))?;
        Ok(())
    }

    fn write_scan_list(&mut self, retention_time_min: f64) -> Result<(), MzMLWriterError> {
        let rt = retention_time_min.to_string();
        self.body.write_event(Event::Start(
            BytesStart::new("scanList").with_attributes([("count", "1")]),
        ))?;
        self.body.write_event(Event::Start(BytesStart::new("scan")))?;
        let tag = BytesStart::new("cvParam").with_attributes([
            ("cvRef", "MS"),
            ("accession", MS_CV_ACCESSIONS::SCAN_START_TIME),
            ("name", "scan start time"),
            ("value", rt.as_str()),
            ("unitCvRef", "UO"),
            ("unitAccession", MS_CV_ACCESSIONS::UNIT_MINUTE),
            ("unitName", "minute"),
        ]);
        self.body.write_event(Event::Empty(tag))?;
        self.body.write_event(Event::End(BytesEnd::new("scan")))?;
        self.body.write_event(Event::End(BytesEnd::new("scanList")))?;
        Ok(())
    }

    fn write_precursor(&mut self, precursor_mz: f64) -> Result<(), MzMLWriterError> {
        let mz = precursor_mz.to_string();
        self.body.write_event(Event::Start(
            BytesStart::new("precursorList").with_attributes([("count", "1")]),
        ))?;
        self.body.write_event(Event::Start(BytesStart::new("precursor")))?;
        self.body.write_event(Event::Start(
            BytesStart::new("selectedIonList").with_attributes([("count", "1")]),
        ))?;
        self.body.write_event(Event::Start(BytesStart::new("selectedIon")))?;
        write_cv(
            &mut self.body,
            MS_CV_ACCESSIONS::SELECTED_ION_MZ,
            "selected ion m/z",
            Some(&mz),
        )?;
        for name in ["selectedIon", "selectedIonList", "precursor", "precursorList"] {
            self.body.write_event(Event::End(BytesEnd::new(name)))?;
        }
        Ok(())
    }

    fn write_array(
        &mut self,
        values: &[f64],
        encoding: BinaryEncoding,
        array_accession: &str,
        array_name: &str,
    ) -> Result<(), MzMLWriterError> {
        let payload = BinaryEncoder::encode(values, encoding, self.compression)?;
        let encoded_length = payload.len().to_string();
        self.body.write_event(Event::Start(
            BytesStart::new("binaryDataArray")
                .with_attributes([("encodedLength", encoded_length.as_str())]),
        ))?;
        let (enc_acc, enc_name) = encoding.cv_term();
        write_cv(&mut self.body, enc_acc, enc_name, None)?;
        let (comp_acc, comp_name) = self.compression.cv_term();
        write_cv(&mut self.body, comp_acc, comp_name, None)?;
        write_cv(&mut self.body, array_accession, array_name, None)?;
        self.body.write_event(Event::Start(BytesStart::new("binary")))?;
        self.body.write_event(Event::Text(BytesText::new(&payload)))?;
        self.body.write_event(Event::End(BytesEnd::new("binary")))?;
        self.body
            .write_event(Event::End(BytesEnd::new("binaryDataArray")))?;
        Ok(())
    }

    /// Write header, spooled spectra and index to the output
    pub fn finish(self) -> Result<W, MzMLWriterError> {
        let MzMLWriter {
            out,
            run_id,
            body,
            offsets,
            ..
        } = self;

        let mut spool = body
            .into_inner()
            .inner
            .into_inner()
            .map_err(|e| e.into_error())?;
        spool.flush()?;
        spool.seek(SeekFrom::Start(0))?;

        let mut xml = Writer::new(CountingWriter::new(out));
        write_header(&mut xml, &run_id, offsets.len())?;
        let body_start = xml.get_ref().position;
        io::copy(&mut spool, xml.get_mut())?;

        xml.write_event(Event::End(BytesEnd::new("spectrumList")))?;
        xml.write_event(Event::End(BytesEnd::new("run")))?;
        xml.write_event(Event::End(BytesEnd::new("mzML")))?;

        let index_list_offset = xml.get_ref().position;
        xml.write_event(Event::Start(
            BytesStart::new("indexList").with_attributes([("count", "1")]),
        ))?;
        xml.write_event(Event::Start(
            BytesStart::new("index").with_attributes([("name", "spectrum")]),
        ))?;
        for entry in &offsets {
            xml.write_event(Event::Start(
                BytesStart::new("offset").with_attributes([("idRef", entry.id.as_str())]),
            ))?;
            let offset = (body_start + entry.offset).to_string();
            xml.write_event(Event::Text(BytesText::new(&offset)))?;
            xml.write_event(Event::End(BytesEnd::new("offset")))?;
        }
        xml.write_event(Event::End(BytesEnd::new("index")))?;
        xml.write_event(Event::End(BytesEnd::new("indexList")))?;

        xml.write_event(Event::Start(BytesStart::new("indexListOffset")))?;
        let offset = index_list_offset.to_string();
        xml.write_event(Event::Text(BytesText::new(&offset)))?;
        xml.write_event(Event::End(BytesEnd::new("indexListOffset")))?;
        xml.write_event(Event::End(BytesEnd::new("indexedmzML")))?;

        let mut counting = xml.into_inner();
        counting.write_all(b"\n")?;
        counting.flush()?;
        Ok(counting.inner)
    }
}

fn write_cv<W: Write>(
    writer: &mut Writer<W>,
    accession: &str,
    name: &str,
    value: Option<&str>,
) -> Result<(), MzMLWriterError> {
    let mut tag = BytesStart::new("cvParam");
    tag.push_attribute(("cvRef", accession.split(':').next().unwrap_or("MS")));
    tag.push_attribute(("accession", accession));
    tag.push_attribute(("name", name));
    if let Some(value) = value {
        tag.push_attribute(("value", value));
    }
    writer.write_event(Event::Empty(tag))?;
    Ok(())
}

fn write_header<W: Write>(
    xml: &mut Writer<W>,
    run_id: &str,
    spectrum_count: usize,
) -> Result<(), MzMLWriterError> {
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    xml.write_event(Event::Start(BytesStart::new("indexedmzML").with_attributes([
        ("xmlns", "http://psi.hupo.org/ms/mzml"),
        ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
    ])))?;
    xml.write_event(Event::Start(BytesStart::new("mzML").with_attributes([
        ("xmlns", "http://psi.hupo.org/ms/mzml"),
        ("version", "1.1.0"),
    ])))?;

    xml.write_event(Event::Start(
        BytesStart::new("cvList").with_attributes([("count", "2")]),
    ))?;
    xml.write_event(Event::Empty(BytesStart::new("cv").with_attributes([
        ("id", "MS"),
        ("fullName", "Proteomics Standards Initiative Mass Spectrometry Ontology"),
        ("URI", "https://raw.githubusercontent.com/HUPO-PSI/psi-ms-CV/master/psi-ms.obo"),
    ])))?;
    xml.write_event(Event::Empty(BytesStart::new("cv").with_attributes([
        ("id", "UO"),
        ("fullName", "Unit Ontology"),
        ("URI", "http://ontologies.berkeleybop.org/uo.obo"),
    ])))?;
    xml.write_event(Event::End(BytesEnd::new("cvList")))?;

    xml.write_event(Event::Start(BytesStart::new("fileDescription")))?;
    xml.write_event(Event::Start(BytesStart::new("fileContent")))?;
    write_cv(xml, MS_CV_ACCESSIONS::MS1_SPECTRUM, "MS1 spectrum", None)?;
    xml.write_event(Event::End(BytesEnd::new("fileContent")))?;
    xml.write_event(Event::End(BytesEnd::new("fileDescription")))?;

    xml.write_event(Event::Start(
        BytesStart::new("softwareList").with_attributes([("count", "1")]),
    ))?;
    xml.write_event(Event::Start(BytesStart::new("software").with_attributes([
        ("id", "lcms_explorer"),
        ("version", env!("CARGO_PKG_VERSION")),
    ])))?;
    write_cv(
        xml,
        "MS:1000799",
        "custom unreleased software tool",
        Some("lcms-explorer"),
    )?;
    xml.write_event(Event::End(BytesEnd::new("software")))?;
    xml.write_event(Event::End(BytesEnd::new("softwareList")))?;

    xml.write_event(Event::Start(
        BytesStart::new("instrumentConfigurationList").with_attributes([("count", "1")]),
    ))?;
    xml.write_event(Event::Start(
        BytesStart::new("instrumentConfiguration").with_attributes([("id", "IC1")]),
    ))?;
    write_cv(xml, "MS:1000031", "instrument model", None)?;
    xml.write_event(Event::End(BytesEnd::new("instrumentConfiguration")))?;
    xml.write_event(Event::End(BytesEnd::new("instrumentConfigurationList")))?;

    xml.write_event(Event::Start(
        BytesStart::new("dataProcessingList").with_attributes([("count", "1")]),
    ))?;
    xml.write_event(Event::Start(
        BytesStart::new("dataProcessing").with_attributes([("id", "re_encoding")]),
    ))?;
    xml.write_event(Event::Start(BytesStart::new("processingMethod").with_attributes([
        ("order", "0"),
        ("softwareRef", "lcms_explorer"),
    ])))?;
    write_cv(xml, "MS:1000544", "Conversion to mzML", None)?;
    xml.write_event(Event::End(BytesEnd::new("processingMethod")))?;
    xml.write_event(Event::End(BytesEnd::new("dataProcessing")))?;
    xml.write_event(Event::End(BytesEnd::new("dataProcessingList")))?;

    xml.write_event(Event::Start(BytesStart::new("run").with_attributes([
        ("id", run_id),
        ("defaultInstrumentConfigurationRef", "IC1"),
    ])))?;
    let count = spectrum_count.to_string();
    xml.write_event(Event::Start(BytesStart::new("spectrumList").with_attributes([
        ("count", count.as_str()),
        ("defaultDataProcessingRef", "re_encoding"),
    ])))?;
    Ok(())
}
