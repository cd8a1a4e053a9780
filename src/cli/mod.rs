use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use lcms_explorer::aggregation::{Quality, Rect};
use lcms_explorer::config::{ExplorerConfig, StorageConfig};
use lcms_explorer::explorer::{Explorer, MapRequest};
use lcms_explorer::resolver::{ResolveOptions, Resolver};
use lcms_explorer::scan::{Polarity, RtWindow};
use lcms_explorer::xic::{Tolerance, XicRequest, XicTarget};

mod config;

/// lcms-explorer - Resolve, normalize and view public LC-MS runs
#[derive(Parser)]
#[command(name = "lcms-explorer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Load settings from a TOML config file (default: ./lcms-explorer.toml if present)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Store assets under DIR/runs and read uploads from DIR/uploads
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Where to write a result
#[derive(Args)]
struct OutputArgs {
    /// Write to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

/// Retention-time window and polarity
#[derive(Args)]
struct WindowArgs {
    /// Window start in minutes
    #[arg(long)]
    rt_start: Option<f64>,

    /// Window end in minutes
    #[arg(long)]
    rt_end: Option<f64>,

    /// Keep only scans of this polarity (positive, negative)
    #[arg(long)]
    polarity: Option<Polarity>,
}

impl WindowArgs {
    /// Requested window; missing bounds are open
    fn window(&self) -> Option<RtWindow> {
        match (self.rt_start, self.rt_end) {
            (None, None) => None,
            (start, end) => Some(RtWindow::new(
                start.unwrap_or(0.0),
                end.unwrap_or(RtWindow::unbounded().end),
            )),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print where a USI can be downloaded from
    Resolve {
        /// Universal Spectrum Identifier
        #[arg(value_name = "USI")]
        usi: String,

        /// Build the location from the identifier when the archive lookup fails
        #[arg(long)]
        best_effort: bool,
    },

    /// Download and convert a run to canonical mzML
    Fetch {
        /// Universal Spectrum Identifier
        #[arg(value_name = "USI")]
        usi: String,
    },

    /// Build the Parquet peak cache of a run
    BuildCache {
        /// Universal Spectrum Identifier
        #[arg(value_name = "USI")]
        usi: String,
    },

    /// Print scan counts and retention-time / m/z ranges
    Summary {
        /// Universal Spectrum Identifier
        #[arg(value_name = "USI")]
        usi: String,
    },

    /// Render a binned 2D map as JSON
    Map {
        /// Universal Spectrum Identifier
        #[arg(value_name = "USI")]
        usi: String,

        #[command(flatten)]
        window: WindowArgs,

        /// Lower m/z bound
        #[arg(long, requires = "mz_max")]
        mz_min: Option<f64>,

        /// Upper m/z bound
        #[arg(long, requires = "mz_min")]
        mz_max: Option<f64>,

        /// Grid resolution (coarse, medium, fine)
        #[arg(short, long)]
        quality: Option<Quality>,

        /// Highlighted region as RT_START,RT_END,MZ_MIN,MZ_MAX
        #[arg(long, value_parser = parse_rect)]
        highlight: Option<Rect>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Extract ion chromatograms (a TIC when no target is given)
    Xic {
        /// Universal Spectrum Identifier
        #[arg(value_name = "USI")]
        usi: String,

        /// Target m/z, optionally labelled as LABEL=MZ (repeatable)
        #[arg(short, long = "target")]
        targets: Vec<XicTarget>,

        /// Tolerance in Da (0.5) or ppm (10ppm)
        #[arg(long, default_value = "0.5")]
        tolerance: Tolerance,

        #[command(flatten)]
        window: WindowArgs,

        /// Divide each trace by its maximum (with two or more targets)
        #[arg(long)]
        normalize: bool,

        /// Write CSV instead of JSON
        #[arg(long)]
        csv: bool,

        #[command(flatten)]
        output: OutputArgs,
    },
}

fn parse_rect(s: &str) -> std::result::Result<Rect, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid rectangle '{s}': {e}"))?;
    match values.as_slice() {
        &[rt0, rt1, mz0, mz1] => Ok(Rect::new((rt0, rt1), (mz0, mz1))),
        _ => Err(format!("expected RT_START,RT_END,MZ_MIN,MZ_MAX, got '{s}'")),
    }
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

fn open_output(output: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    })
}

fn print_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let mut out = open_output(output)?;
    serde_json::to_writer_pretty(&mut out, value).context("Failed to serialize result")?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn load_config(cli: &Cli) -> Result<ExplorerConfig> {
    let mut config = config::load(cli.config.as_deref())?;
    if let Some(root) = &cli.data_dir {
        config.storage = StorageConfig {
            scratch_dir: config.storage.scratch_dir.take(),
            ..StorageConfig::under(root)
        };
    }
    Ok(config)
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli)?;

    if let Commands::Resolve { usi, best_effort } = &cli.command {
        let resolver = Resolver::with_http(config.providers, config.storage.upload_dir)
            .context("Failed to create HTTP client")?;
        let options = if *best_effort {
            ResolveOptions::best_effort()
        } else {
            ResolveOptions::default()
        };
        let descriptor = resolver.resolve_str(usi, &options)?;
        return print_json(&descriptor, None);
    }

    if let Commands::Map {
        quality: Some(quality),
        ..
    } = &cli.command
    {
        config.aggregation.quality = *quality;
    }
    let explorer = Explorer::with_defaults(config).context("Failed to set up pipeline")?;

    match cli.command {
        Commands::Resolve { .. } => Ok(()),
        Commands::Fetch { usi } => {
            let run = explorer.fetch(&usi)?;
            print_json(&run, None)
        }
        Commands::BuildCache { usi } => {
            let stats = explorer.build_cache(&usi)?;
            log::info!(
                "Cached {} MS1 scans ({} peak rows, {} MSn rows)",
                stats.ms1_scans,
                stats.ms1_rows,
                stats.msn_rows
            );
            print_json(&stats, None)
        }
        Commands::Summary { usi } => {
            let summary = explorer.summary(&usi)?;
            print_json(&summary, None)
        }
        Commands::Map {
            usi,
            window,
            mz_min,
            mz_max,
            highlight,
            output,
            ..
        } => {
            let request = MapRequest {
                window: window.window(),
                mz_range: mz_min.zip(mz_max),
                polarity: window.polarity,
                highlight,
            };
            let view = explorer.map(&usi, &request)?;
            print_json(&view, output.output.as_deref())
        }
        Commands::Xic {
            usi,
            targets,
            tolerance,
            window,
            normalize,
            csv,
            output,
        } => {
            let request = XicRequest::targets(
                targets,
                tolerance,
                window.window().unwrap_or_else(RtWindow::unbounded),
            )
            .with_polarity(window.polarity)
            .normalized(normalize);
            let table = explorer.xic(&usi, &request)?;
            if csv {
                let out = open_output(output.output.as_deref())?;
                table.to_csv(out).context("Failed to write CSV")
            } else {
                print_json(&table, output.output.as_deref())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rect() {
        let rect = parse_rect("6, 5, 300, 200.5").unwrap();
        assert_eq!(rect, Rect::new((5.0, 6.0), (200.5, 300.0)));
        assert!(parse_rect("1,2,3").is_err());
        assert!(parse_rect("a,b,c,d").is_err());
    }

    #[test]
    fn test_cli_parses_xic() {
        let cli = Cli::try_parse_from([
            "lcms-explorer",
            "-vv",
            "xic",
            "mzspec:MSV000084494:run",
            "-t",
            "278.1902",
            "--target",
            "b=300",
            "--tolerance",
            "10ppm",
            "--rt-start",
            "5",
            "--rt-end",
            "6",
            "--polarity",
            "positive",
            "--csv",
        ])
        .unwrap();
        assert_eq!(cli.verbosity(), 2);
        match cli.command {
            Commands::Xic {
                targets,
                tolerance,
                window,
                csv,
                ..
            } => {
                assert_eq!(targets.len(), 2);
                assert_eq!(targets[1].label, "b");
                assert_eq!(tolerance, Tolerance::Ppm(10.0));
                assert_eq!(window.window(), Some(RtWindow::new(5.0, 6.0)));
                assert_eq!(window.polarity, Some(Polarity::Positive));
                assert!(csv);
            }
            _ => panic!("expected xic"),
        }
    }

    #[test]
    fn test_open_window_bound() {
        let cli = Cli::try_parse_from(["lcms-explorer", "map", "mzspec:LOCAL:a.mzML", "--rt-start", "3"])
            .unwrap();
        match cli.command {
            Commands::Map { window, quality, .. } => {
                let w = window.window().unwrap();
                assert_eq!(w.start, 3.0);
                assert_eq!(w.end, RtWindow::unbounded().end);
                assert!(quality.is_none());
            }
            _ => panic!("expected map"),
        }
    }
}
