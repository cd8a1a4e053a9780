use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::helpers::get_attribute;
use super::{MzMLError, MzMLStreamer};
use crate::mzml::models::{IndexEntry, MzMLIndex};

/// Default input buffer size for mzML parsing (64KB)
pub const DEFAULT_INPUT_BUFFER_SIZE: usize = 64 * 1024;

/// Bytes read from the end of a file when looking for `indexListOffset`
const INDEX_TAIL_SIZE: u64 = 1024;

impl MzMLStreamer<BufReader<File>> {
    /// Open an mzML file for streaming with default buffer size (64KB)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MzMLError> {
        Self::open_with_buffer_size(path, DEFAULT_INPUT_BUFFER_SIZE)
    }

    /// Open an mzML file for streaming with custom buffer size
    ///
    /// # Example
    /// ```rust,no_run
    /// use lcms_explorer::mzml::MzMLStreamer;
    ///
    /// let streamer = MzMLStreamer::open_with_buffer_size("run.mzML", 256 * 1024)?;
    /// # Ok::<(), lcms_explorer::mzml::MzMLError>(())
    /// ```
    pub fn open_with_buffer_size<P: AsRef<Path>>(
        path: P,
        buffer_size: usize,
    ) -> Result<Self, MzMLError> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::with_capacity(buffer_size, file);
        Self::new(reader)
    }

    /// Open an indexed mzML file and read the index first
    ///
    /// A file without an index opens normally; [`MzMLStreamer::index`] is
    /// then empty.
    pub fn open_indexed<P: AsRef<Path>>(path: P) -> Result<Self, MzMLError> {
        let mut file = File::open(path.as_ref())?;
        let index = read_index_from_file(&mut file)?;
        file.seek(SeekFrom::Start(0))?;

        let reader = BufReader::with_capacity(DEFAULT_INPUT_BUFFER_SIZE, file);
        let mut streamer = Self::new(reader)?;
        streamer.index = index;

        Ok(streamer)
    }

    /// Open a file positioned at a `<spectrum>` start tag
    ///
    /// `offset` must come from the file's `indexList`; `first_index` is the
    /// document position of the spectrum found there.
    pub fn open_at<P: AsRef<Path>>(
        path: P,
        offset: u64,
        first_index: i64,
    ) -> Result<Self, MzMLError> {
        let mut file = File::open(path.as_ref())?;
        file.seek(SeekFrom::Start(offset))?;
        let reader = BufReader::with_capacity(DEFAULT_INPUT_BUFFER_SIZE, file);
        Self::positioned(reader, first_index)
    }
}

/// Read only the spectrum index of an indexed mzML file
pub fn read_index<P: AsRef<Path>>(path: P) -> Result<MzMLIndex, MzMLError> {
    let mut file = File::open(path.as_ref())?;
    read_index_from_file(&mut file)
}

/// Read the index from the end of an indexed mzML file
fn read_index_from_file(file: &mut File) -> Result<MzMLIndex, MzMLError> {
    let file_size = file.seek(SeekFrom::End(0))?;

    let read_size = std::cmp::min(INDEX_TAIL_SIZE, file_size);
    file.seek(SeekFrom::End(-(read_size as i64)))?;

    let mut tail = vec![0u8; read_size as usize];
    file.read_exact(&mut tail)?;

    let tail_str = String::from_utf8_lossy(&tail);

    let Some(pos) = tail_str.find("<indexListOffset>") else {
        return Ok(MzMLIndex::default());
    };
    let start = pos + "<indexListOffset>".len();
    let Some(end) = tail_str[start..].find("</indexListOffset>") else {
        return Ok(MzMLIndex::default());
    };
    let Ok(offset) = tail_str[start..start + end].trim().parse::<u64>() else {
        return Err(MzMLError::InvalidStructure(format!(
            "unreadable indexListOffset '{}'",
            tail_str[start..start + end].trim()
        )));
    };
    if offset >= file_size {
        return Err(MzMLError::InvalidStructure(format!(
            "indexListOffset {offset} is past the end of the file ({file_size} bytes)"
        )));
    }

    file.seek(SeekFrom::Start(offset))?;
    let mut index_data = Vec::new();
    file.read_to_end(&mut index_data)?;

    parse_index_data(&index_data, offset)
}

/// Parse the indexList from raw XML data
pub(crate) fn parse_index_data(data: &[u8], offset: u64) -> Result<MzMLIndex, MzMLError> {
    let mut reader = Reader::from_reader(data);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut index = MzMLIndex {
        index_list_offset: Some(offset),
        ..Default::default()
    };

    let mut in_spectrum_index = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"index" => {
                    in_spectrum_index = get_attribute(e, "name")?.as_deref() == Some("spectrum");
                }
                b"offset" if in_spectrum_index => {
                    let id = get_attribute(e, "idRef")?.unwrap_or_default();
                    let mut offset_buf = Vec::new();
                    let value = match reader.read_event_into(&mut offset_buf) {
                        Ok(Event::Text(t)) => t.unescape()?.trim().parse::<u64>().ok(),
                        _ => None,
                    };
                    let Some(value) = value else {
                        return Err(MzMLError::InvalidStructure(format!(
                            "index entry '{id}' has no readable offset"
                        )));
                    };
                    index.spectrum_index.push(IndexEntry { id, offset: value });
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"index" => in_spectrum_index = false,
                // The enclosing `indexedmzML` was opened before `data` starts
                b"indexList" => break,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(MzMLError::XmlError(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(index)
}

impl<R: BufRead> MzMLStreamer<R> {
    /// Attach an index read separately (e.g. from [`read_index`])
    pub fn with_index(mut self, index: MzMLIndex) -> Self {
        self.index = index;
        self
    }
}
