//! # lcms-explorer
//!
//! Command-line front end for resolving Universal Spectrum Identifiers,
//! normalizing runs to mzML and rendering maps and chromatograms.
//!
//! ## Usage
//!
//! ```bash
//! # Where does a USI live?
//! lcms-explorer resolve mzspec:MSV000084494:GNPS00002_A3_p:scan:1
//!
//! # Download, convert and cache a run
//! lcms-explorer fetch mzspec:MSV000084494:GNPS00002_A3_p
//! lcms-explorer build-cache mzspec:MSV000084494:GNPS00002_A3_p
//!
//! # Chromatogram of one target as CSV
//! lcms-explorer xic mzspec:MSV000084494:GNPS00002_A3_p -t 278.1902 --rt-start 5 --rt-end 6 --csv
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
