use std::io::BufRead;

use super::{MzMLError, MzMLStreamer};
use crate::mzml::models::{MzMLSpectrum, RawMzMLSpectrum};

/// Iterator over decoded spectra in an mzML file
pub struct SpectrumIterator<R: BufRead> {
    pub(super) streamer: MzMLStreamer<R>,
}

impl<R: BufRead> Iterator for SpectrumIterator<R> {
    type Item = Result<MzMLSpectrum, MzMLError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.streamer.next_spectrum().transpose()
    }
}

/// Iterator over raw (undecoded) spectra in an mzML file
///
/// Each item is a `RawMzMLSpectrum` that can later be decoded using `.decode()`,
/// which lets callers skip a spectrum whose arrays fail to decode.
pub struct RawSpectrumIterator<R: BufRead> {
    pub(super) streamer: MzMLStreamer<R>,
    pub(super) remaining: Option<usize>,
}

impl<R: BufRead> RawSpectrumIterator<R> {
    /// Stop after yielding at most `limit` spectra
    pub fn take_spectra(mut self, limit: usize) -> Self {
        self.remaining = Some(limit);
        self
    }
}

impl<R: BufRead> Iterator for RawSpectrumIterator<R> {
    type Item = Result<RawMzMLSpectrum, MzMLError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }
        self.streamer.next_raw_spectrum().transpose()
    }
}
