//! Streaming mzML parser using quick-xml
//!
//! This module provides a pull-based streaming parser for mzML files,
//! designed to handle arbitrarily large files with minimal memory usage.
//! A streamer can also be positioned at a byte offset taken from the
//! `indexList` of an indexed mzML file, in which case it starts directly
//! inside the spectrum list.

use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::models::{MzMLFileMetadata, MzMLIndex};

pub use error::MzMLError;
pub use index::{read_index, DEFAULT_INPUT_BUFFER_SIZE};
pub(crate) use index::parse_index_data;
pub use iterators::{RawSpectrumIterator, SpectrumIterator};

mod error;
pub(crate) mod helpers;
mod index;
mod iterators;
mod spectrum;


use helpers::get_attribute;

/// Streaming parser for mzML files
pub struct MzMLStreamer<R: BufRead> {
    reader: Reader<R>,
    metadata: MzMLFileMetadata,
    index: MzMLIndex,
    in_spectrum_list: bool,
    positioned: bool,
    spectrum_count: Option<usize>,
    current_spectrum_index: i64,
}

impl<R: BufRead> MzMLStreamer<R> {
    /// Create a new streamer from a BufRead source
    pub fn new(reader: R) -> Result<Self, MzMLError> {
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.config_mut().trim_text(true);

        Ok(Self {
            reader: xml_reader,
            metadata: MzMLFileMetadata::default(),
            index: MzMLIndex::default(),
            in_spectrum_list: false,
            positioned: false,
            spectrum_count: None,
            current_spectrum_index: 0,
        })
    }

    /// Create a streamer whose source is already positioned at a `<spectrum>`
    /// start tag. `first_index` is the document position of that spectrum.
    pub fn positioned(reader: R, first_index: i64) -> Result<Self, MzMLError> {
        let mut streamer = Self::new(reader)?;
        streamer.in_spectrum_list = true;
        streamer.positioned = true;
        streamer.current_spectrum_index = first_index;
        Ok(streamer)
    }

    /// Get the file metadata
    pub fn metadata(&self) -> &MzMLFileMetadata {
        &self.metadata
    }

    /// Get the index if available
    pub fn index(&self) -> &MzMLIndex {
        &self.index
    }

    /// Get expected spectrum count
    pub fn spectrum_count(&self) -> Option<usize> {
        if self.index.is_indexed() {
            Some(self.index.spectrum_count())
        } else {
            self.spectrum_count
        }
    }

    /// Iterate over all spectra, decoding binary arrays
    pub fn spectra(self) -> SpectrumIterator<R> {
        SpectrumIterator { streamer: self }
    }

    /// Iterate over all spectra as raw (undecoded) data
    pub fn raw_spectra(self) -> RawSpectrumIterator<R> {
        RawSpectrumIterator {
            streamer: self,
            remaining: None,
        }
    }

    /// Read file-level metadata (everything before spectrumList)
    pub fn read_metadata(&mut self) -> Result<&MzMLFileMetadata, MzMLError> {
        let mut buf = Vec::new();
        loop {
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => match e.name().as_ref() {
                    b"mzML" => {
                        self.metadata.version = get_attribute(e, "version")?;
                    }
                    b"run" => {
                        self.metadata.run_id = get_attribute(e, "id")?;
                    }
                    b"spectrumList" => {
                        self.in_spectrum_list = true;
                        self.spectrum_count =
                            get_attribute(e, "count")?.and_then(|s| s.parse().ok());
                        break;
                    }
                    _ => {}
                },
                Ok(Event::Empty(ref e)) if e.name().as_ref() == b"spectrumList" => {
                    // An empty run
                    self.spectrum_count = Some(0);
                    break;
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(MzMLError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(&self.metadata)
    }
}
