//! # Indexed Spectrum Stream
//!
//! Yields the [`ScanRecord`]s of a canonical mzML file that fall inside a
//! retention-time window.
//!
//! For a real window the `indexList` offsets are used to binary search the
//! first and last in-window spectrum by retention time, and only that
//! contiguous range is parsed and filtered. A degenerate window (see
//! [`RtWindow::is_degenerate`]) streams the whole file sequentially. Any
//! problem with the index ([`IndexingFailure`]) falls back to a full linear
//! scan with per-scan filtering, so callers always get the same scans.
//!
//! Scans whose peak arrays cannot be decoded are skipped.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::mzml::{read_index, MzMLError, MzMLIndex, MzMLStreamer, RawSpectrumIterator};
use crate::scan::{RtWindow, ScanRecord};


/// Why the offset index could not be used
#[derive(Debug, thiserror::Error)]
pub enum IndexingFailure {
    /// The file has no spectrum offsets
    #[error("file has no spectrum index")]
    NoIndex,

    /// A probed spectrum carried no retention time
    #[error("spectrum {0} has no retention time")]
    MissingRetentionTime(usize),

    /// An index offset did not lead to a spectrum
    #[error("index entry {0} does not point at a spectrum")]
    OutOfRange(usize),

    /// Retention times decrease somewhere along the probed spectra
    #[error("retention time decreases between spectra {earlier} and {later}")]
    NonMonotonic {
        /// Earlier probed position
        earlier: usize,
        /// Later probed position with a smaller retention time
        later: usize,
    },

    /// Reading the index or a probed spectrum failed
    #[error(transparent)]
    Reader(#[from] MzMLError),
}

/// How a window is going to be read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPlan {
    /// Every spectrum, filtered by retention time
    Linear,
    /// Spectra `first..=last` of the file, filtered by retention time
    Indexed {
        /// First in-window position
        first: usize,
        /// Last in-window position
        last: usize,
    },
    /// The index proves no spectrum lies in the window
    Empty,
}

/// Retention-time binary search over an indexed file
struct IndexProbe<'a> {
    path: &'a Path,
    index: &'a MzMLIndex,
    seen: BTreeMap<usize, f64>,
}

impl<'a> IndexProbe<'a> {
    fn new(path: &'a Path, index: &'a MzMLIndex) -> Self {
        Self {
            path,
            index,
            seen: BTreeMap::new(),
        }
    }

    /// Retention time (minutes) of the spectrum at `position`
    fn rt(&mut self, position: usize) -> Result<f64, IndexingFailure> {
        if let Some(&rt) = self.seen.get(&position) {
            return Ok(rt);
        }
        let entry = self
            .index
            .spectrum_index
            .get(position)
            .ok_or(IndexingFailure::OutOfRange(position))?;
        let mut streamer = MzMLStreamer::open_at(self.path, entry.offset, position as i64)?;
        let raw = streamer
            .next_raw_spectrum()?
            .ok_or(IndexingFailure::OutOfRange(position))?;
        if raw.id != entry.id {
            return Err(IndexingFailure::OutOfRange(position));
        }
        let rt = raw
            .retention_time
            .ok_or(IndexingFailure::MissingRetentionTime(position))?
            / 60.0;
        self.seen.insert(position, rt);
        Ok(rt)
    }

    /// First position whose retention time satisfies `pred`, assuming `pred`
    /// is false then true along the run
    fn partition_point(
        &mut self,
        mut pred: impl FnMut(f64) -> bool,
    ) -> Result<usize, IndexingFailure> {
        let (mut lo, mut hi) = (0usize, self.index.spectrum_count());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if pred(self.rt(mid)?) {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        Ok(lo)
    }

    /// Every probed retention time must be non-decreasing in position
    fn check_monotonic(&self) -> Result<(), IndexingFailure> {
        let mut previous: Option<(usize, f64)> = None;
        for (&position, &rt) in &self.seen {
            if let Some((earlier, earlier_rt)) = previous {
                if rt < earlier_rt {
                    return Err(IndexingFailure::NonMonotonic {
                        earlier,
                        later: position,
                    });
                }
            }
            previous = Some((position, rt));
        }
        Ok(())
    }
}

/// Locate the in-window range of an indexed file
pub fn plan_indexed(path: &Path, window: &RtWindow) -> Result<ReadPlan, IndexingFailure> {
    let index = read_index(path)?;
    if !index.is_indexed() {
        return Err(IndexingFailure::NoIndex);
    }

    let mut probe = IndexProbe::new(path, &index);
    let first = probe.partition_point(|rt| rt >= window.start)?;
    let end = probe.partition_point(|rt| rt > window.end)?;
    probe.check_monotonic()?;

    if first >= end {
        return Ok(ReadPlan::Empty);
    }
    Ok(ReadPlan::Indexed {
        first,
        last: end - 1,
    })
}

/// Choose how to read `window` from `path`
///
/// Never fails: index problems are logged and turn into [`ReadPlan::Linear`].
pub fn plan(path: &Path, window: &RtWindow) -> ReadPlan {
    if window.is_degenerate() {
        return ReadPlan::Linear;
    }
    match plan_indexed(path, window) {
        Ok(plan) => plan,
        Err(failure) => {
            log::warn!(
                "Index of {} unusable ({failure}), scanning linearly",
                path.display()
            );
            ReadPlan::Linear
        }
    }
}

enum Source {
    Linear(RawSpectrumIterator<BufReader<File>>),
    Indexed(RawSpectrumIterator<BufReader<File>>),
    Empty,
}

/// Lazy sequence of decoded in-window scans
pub struct WindowedScans {
    source: Source,
    window: RtWindow,
    path: PathBuf,
    skipped: usize,
}

impl WindowedScans {
    /// Open `path` for `window`, choosing the read plan automatically
    pub fn open(path: impl AsRef<Path>, window: RtWindow) -> Result<Self, MzMLError> {
        let path = path.as_ref();
        let plan = plan(path, &window);
        Self::with_plan(path, window, plan)
    }

    /// Open `path` for `window` with a linear scan, ignoring any index
    pub fn open_linear(path: impl AsRef<Path>, window: RtWindow) -> Result<Self, MzMLError> {
        Self::with_plan(path.as_ref(), window, ReadPlan::Linear)
    }

    /// Open `path` following an explicit plan
    pub fn with_plan(path: &Path, window: RtWindow, plan: ReadPlan) -> Result<Self, MzMLError> {
        log::debug!("Reading {} for {window:?} via {plan:?}", path.display());
        let source = match plan {
            ReadPlan::Linear => Source::Linear(MzMLStreamer::open(path)?.raw_spectra()),
            ReadPlan::Indexed { first, last } => {
                let index = read_index(path)?;
                let entry = index.spectrum_index.get(first).ok_or_else(|| {
                    MzMLError::InvalidStructure(format!("no index entry {first}"))
                })?;
                let streamer = MzMLStreamer::open_at(path, entry.offset, first as i64)?;
                Source::Indexed(streamer.raw_spectra().take_spectra(last - first + 1))
            }
            ReadPlan::Empty => Source::Empty,
        };
        Ok(Self {
            source,
            window,
            path: path.to_path_buf(),
            skipped: 0,
        })
    }

    /// Scans skipped so far because they could not be decoded
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for WindowedScans {
    type Item = ScanRecord;

    fn next(&mut self) -> Option<ScanRecord> {
        loop {
            let raw = match &mut self.source {
                Source::Linear(spectra) | Source::Indexed(spectra) => spectra.next()?,
                Source::Empty => return None,
            };
            let raw = match raw {
                Ok(raw) => raw,
                Err(e) => {
                    log::warn!("Stopped reading {}: {e}", self.path.display());
                    self.source = Source::Empty;
                    return None;
                }
            };

            // Scans the search never visited may still lie outside the window
            match raw.retention_time {
                Some(rt) if self.window.contains(rt / 60.0) => {}
                Some(_) => continue,
                None => {
                    self.skipped += 1;
                    continue;
                }
            }

            match ScanRecord::from_raw(raw) {
                Ok(record) => return Some(record),
                Err(failure) => {
                    log::debug!("Skipping scan in {}: {failure}", self.path.display());
                    self.skipped += 1;
                }
            }
        }
    }
}
