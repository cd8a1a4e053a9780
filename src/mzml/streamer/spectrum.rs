use std::io::BufRead;

use quick_xml::errors::IllFormedError;
use quick_xml::events::{BytesStart, Event};

use super::helpers::{get_attribute, parse_cv_param};
use super::{MzMLError, MzMLStreamer};
use crate::mzml::binary::{BinaryEncoding, CompressionType};
use crate::mzml::cv_params::{normalize_retention_time, CvParam, MS_CV_ACCESSIONS};
use crate::mzml::models::{MzMLSpectrum, Precursor, RawBinaryData, RawMzMLSpectrum};

/// Where a cvParam was found inside a `<spectrum>` element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Spectrum,
    ScanList,
    PrecursorList,
    BinaryDataArray,
}

impl<R: BufRead> MzMLStreamer<R> {
    /// Read the next spectrum from the stream, decoding its arrays
    pub fn next_spectrum(&mut self) -> Result<Option<MzMLSpectrum>, MzMLError> {
        match self.next_raw_spectrum()? {
            Some(raw) => Ok(Some(raw.decode()?)),
            None => Ok(None),
        }
    }

    /// Read the next spectrum from the stream WITHOUT decoding binary data
    ///
    /// The XML is parsed and all metadata extracted, but Base64 decoding and
    /// decompression are deferred to [`RawMzMLSpectrum::decode`].
    pub fn next_raw_spectrum(&mut self) -> Result<Option<RawMzMLSpectrum>, MzMLError> {
        if !self.in_spectrum_list {
            if self.positioned {
                return Ok(None);
            }
            self.read_metadata()?;
            if !self.in_spectrum_list {
                return Ok(None);
            }
        }

        let mut buf = Vec::new();
        loop {
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    if e.name().as_ref() == b"spectrum" {
                        let start = e.into_owned();
                        let spectrum = self.parse_raw_spectrum(&start)?;
                        self.current_spectrum_index += 1;
                        return Ok(Some(spectrum));
                    }
                }
                Ok(Event::End(ref e)) => {
                    if e.name().as_ref() == b"spectrumList" {
                        self.in_spectrum_list = false;
                        return Ok(None);
                    }
                }
                Ok(Event::Eof) => return Ok(None),
                // After a seek, `</spectrumList>` closes an element this
                // reader never saw open
                Err(quick_xml::Error::IllFormed(IllFormedError::UnmatchedEndTag(_)))
                    if self.positioned =>
                {
                    self.in_spectrum_list = false;
                    return Ok(None);
                }
                Err(e) => return Err(MzMLError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }
    }

    /// Parse a single spectrum element WITHOUT decoding binary data
    fn parse_raw_spectrum(
        &mut self,
        start_event: &BytesStart,
    ) -> Result<RawMzMLSpectrum, MzMLError> {
        let mut spectrum = RawMzMLSpectrum {
            ms_level: 1,
            ..Default::default()
        };

        spectrum.index = get_attribute(start_event, "index")?
            .and_then(|s| s.parse().ok())
            .unwrap_or(self.current_spectrum_index);
        spectrum.id = get_attribute(start_event, "id")?.unwrap_or_default();
        spectrum.default_array_length = get_attribute(start_event, "defaultArrayLength")?
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        let mut depth = 1;
        let mut section = Section::Spectrum;
        let mut current_precursor: Option<Precursor> = None;

        let mut current_binary_cv_params: Vec<CvParam> = Vec::new();
        let mut current_binary_data = String::new();
        let mut buf = Vec::new();

        loop {
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    depth += 1;
                    match e.name().as_ref() {
                        b"cvParam" => {
                            let cv_param = parse_cv_param(e)?;
                            Self::route_cv_param(
                                section,
                                &mut spectrum,
                                &mut current_precursor,
                                &mut current_binary_cv_params,
                                cv_param,
                            );
                        }
                        b"scanList" => section = Section::ScanList,
                        b"precursorList" => section = Section::PrecursorList,
                        b"precursor" => {
                            current_precursor = Some(Precursor {
                                spectrum_ref: get_attribute(e, "spectrumRef")?,
                                ..Default::default()
                            });
                        }
                        b"binaryDataArray" => {
                            section = Section::BinaryDataArray;
                            current_binary_cv_params.clear();
                            current_binary_data.clear();
                        }
                        _ => {}
                    }
                }
                Ok(Event::Empty(ref e)) => {
                    if e.name().as_ref() == b"cvParam" {
                        let cv_param = parse_cv_param(e)?;
                        Self::route_cv_param(
                            section,
                            &mut spectrum,
                            &mut current_precursor,
                            &mut current_binary_cv_params,
                            cv_param,
                        );
                    }
                }
                Ok(Event::Text(ref t)) => {
                    if section == Section::BinaryDataArray {
                        // Base64 may be split across lines
                        current_binary_data.push_str(&t.unescape()?);
                    }
                }
                Ok(Event::End(ref e)) => {
                    depth -= 1;
                    match e.name().as_ref() {
                        b"spectrum" if depth == 0 => break,
                        b"scanList" | b"precursorList" => section = Section::Spectrum,
                        b"precursor" => {
                            if let Some(prec) = current_precursor.take() {
                                spectrum.precursors.push(prec);
                            }
                        }
                        b"binaryDataArray" => {
                            section = Section::Spectrum;
                            Self::store_raw_binary_array(
                                &mut spectrum,
                                &current_binary_cv_params,
                                &mut current_binary_data,
                            );
                            current_binary_cv_params.clear();
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => {
                    return Err(MzMLError::InvalidStructure(format!(
                        "Unexpected EOF in spectrum '{}'",
                        spectrum.id
                    )));
                }
                Err(e) => return Err(MzMLError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(spectrum)
    }

    fn route_cv_param(
        section: Section,
        spectrum: &mut RawMzMLSpectrum,
        precursor: &mut Option<Precursor>,
        binary_cv_params: &mut Vec<CvParam>,
        cv_param: CvParam,
    ) {
        match section {
            Section::BinaryDataArray => binary_cv_params.push(cv_param),
            Section::PrecursorList => {
                if let Some(prec) = precursor.as_mut() {
                    Self::apply_precursor_cv_param(prec, &cv_param);
                }
            }
            Section::ScanList => {
                Self::apply_scan_cv_param(spectrum, &cv_param);
                spectrum.cv_params.push(cv_param);
            }
            Section::Spectrum => {
                Self::apply_spectrum_cv_param(spectrum, &cv_param);
                spectrum.cv_params.push(cv_param);
            }
        }
    }

    /// Store raw binary array data in the RawMzMLSpectrum without decoding
    fn store_raw_binary_array(
        spectrum: &mut RawMzMLSpectrum,
        cv_params: &[CvParam],
        base64_data: &mut String,
    ) {
        let mut encoding = BinaryEncoding::Float64;
        let mut compression = CompressionType::None;
        let mut is_mz = false;
        let mut is_intensity = false;

        for cv in cv_params {
            match cv.accession.as_str() {
                MS_CV_ACCESSIONS::FLOAT_32_BIT => encoding = BinaryEncoding::Float32,
                MS_CV_ACCESSIONS::FLOAT_64_BIT => encoding = BinaryEncoding::Float64,
                MS_CV_ACCESSIONS::MZ_ARRAY => is_mz = true,
                MS_CV_ACCESSIONS::INTENSITY_ARRAY => is_intensity = true,
                accession => {
                    if let Some(c) = CompressionType::from_cv_accession(accession) {
                        compression = c;
                    }
                }
            }
        }

        let raw_data = RawBinaryData {
            base64: std::mem::take(base64_data),
            encoding,
            compression,
        };

        if is_mz {
            spectrum.mz_data = raw_data;
        } else if is_intensity {
            spectrum.intensity_data = raw_data;
        }
    }

    /// Apply CV param to spectrum-level properties
    fn apply_spectrum_cv_param(spectrum: &mut RawMzMLSpectrum, cv: &CvParam) {
        match cv.accession.as_str() {
            MS_CV_ACCESSIONS::MS_LEVEL => {
                spectrum.ms_level = cv.value_as_i64().unwrap_or(1) as i16;
            }
            MS_CV_ACCESSIONS::CENTROID_SPECTRUM => spectrum.centroided = true,
            MS_CV_ACCESSIONS::PROFILE_SPECTRUM => spectrum.centroided = false,
            MS_CV_ACCESSIONS::POSITIVE_SCAN => spectrum.polarity = 1,
            MS_CV_ACCESSIONS::NEGATIVE_SCAN => spectrum.polarity = -1,
            MS_CV_ACCESSIONS::TOTAL_ION_CURRENT => {
                spectrum.total_ion_current = cv.value_as_f64();
            }
            _ => {}
        }
    }

    /// Apply CV param to scan properties
    fn apply_scan_cv_param(spectrum: &mut RawMzMLSpectrum, cv: &CvParam) {
        match cv.accession.as_str() {
            MS_CV_ACCESSIONS::SCAN_START_TIME => {
                if let Some(val) = cv.value_as_f64() {
                    spectrum.retention_time =
                        Some(normalize_retention_time(val, cv.unit_accession.as_deref()));
                }
            }
            _ => Self::apply_spectrum_cv_param(spectrum, cv),
        }
    }

    /// Apply CV param to precursor properties
    fn apply_precursor_cv_param(precursor: &mut Precursor, cv: &CvParam) {
        match cv.accession.as_str() {
            MS_CV_ACCESSIONS::ISOLATION_WINDOW_TARGET_MZ => {
                precursor.isolation_window_target = cv.value_as_f64();
            }
            MS_CV_ACCESSIONS::SELECTED_ION_MZ => {
                precursor.selected_ion_mz = cv.value_as_f64();
            }
            MS_CV_ACCESSIONS::CHARGE_STATE => {
                precursor.selected_ion_charge = cv.value_as_i64().map(|v| v as i16);
            }
            _ => {}
        }
    }
}
