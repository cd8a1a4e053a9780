use std::path::Path;

use crate::mzml::MzMLStreamer;

use super::error::ConvertError;

/// Check that `path` parses as mzML with at least one spectrum
///
/// Every spectrum element is parsed structurally; binary arrays are not
/// decoded. Returns the number of spectra.
pub fn validate_mzml(path: &Path) -> Result<usize, ConvertError> {
    let invalid = |reason: String| ConvertError::Validation {
        path: path.to_path_buf(),
        reason,
    };

    let streamer = MzMLStreamer::open(path).map_err(|e| invalid(e.to_string()))?;
    let mut count = 0usize;
    for raw in streamer.raw_spectra() {
        raw.map_err(|e| invalid(e.to_string()))?;
        count += 1;
    }

    if count == 0 {
        return Err(invalid("no spectra".to_string()));
    }
    Ok(count)
}
