//! TOML configuration file support.
//!
//! Every section is optional and every key inside a section defaults:
//!
//! ```toml
//! # lcms-explorer.toml
//! [storage]
//! asset_dir = "/srv/lcms/runs"
//! upload_dir = "/srv/lcms/uploads"
//!
//! [converter]
//! converter = "/opt/pwiz/msconvert"
//!
//! [providers]
//! massive = "https://massive-mirror.example.org"
//!
//! [cache]
//! min_span_minutes = 2.0
//!
//! [aggregation]
//! quality = "fine"
//! ```

use anyhow::{Context, Result};
use lcms_explorer::config::ExplorerConfig;
use std::path::Path;

/// File read when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "lcms-explorer.toml";

/// Load configuration from a TOML file.
pub fn from_file(path: &Path) -> Result<ExplorerConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    from_str(&content)
}

/// Parse configuration from a TOML string.
pub fn from_str(content: &str) -> Result<ExplorerConfig> {
    toml::from_str(content).context("Failed to parse TOML configuration")
}

/// Explicit file, else `lcms-explorer.toml` in the working directory if present, else defaults.
pub fn load(explicit: Option<&Path>) -> Result<ExplorerConfig> {
    match explicit {
        Some(path) => from_file(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                log::info!("Using {}", default.display());
                from_file(default)
            } else {
                Ok(ExplorerConfig::default())
            }
        }
    }
}
