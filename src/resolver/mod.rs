//! # Provider Resolver
//!
//! Turns a parsed [`Usi`] into a [`FetchDescriptor`]: the location the run can be
//! downloaded from (or read from, for local uploads).
//!
//! Dispatch is a closed match on [`ProviderKind`]; each kind has one
//! [`ProviderStrategy`]. Strategies only read: they issue GET requests through
//! a [`MetadataClient`] and never touch the local filesystem beyond checking
//! that a local upload exists.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lcms_explorer::resolver::{ProviderEndpoints, ResolveOptions, Resolver};
//! use lcms_explorer::usi::Usi;
//!
//! let resolver = Resolver::with_http(ProviderEndpoints::default(), "uploads")?;
//! let usi = Usi::parse("mzspec:MSV000084494:GNPS00002_A3_p:scan:1")?;
//! let descriptor = resolver.resolve(&usi, &ResolveOptions::default())?;
//! println!("{}", descriptor.remote_uri);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::usi::{ProviderKind, Usi};

pub use config::ProviderEndpoints;
pub use error::{LookupError, ResolveError};
pub use http::{build_url, HttpMetadataClient, MetadataClient, StaticMetadataClient};

mod config;
mod error;
mod glycopost;
mod gnps;
mod http;
mod local;
mod massive;
mod metabolights;
mod pxd;
mod workbench;

#[cfg(test)]
mod tests;

/// Where to fetch a run from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchDescriptor {
    /// Download URL, or the absolute path of a local upload
    pub remote_uri: String,
    /// Provider kind of the identifier
    pub provider_kind: ProviderKind,
    /// File name of the asset behind `remote_uri`; its extension selects the
    /// conversion route
    pub source_name: String,
}

impl FetchDescriptor {
    /// Whether the asset is already on local storage
    pub fn is_local(&self) -> bool {
        self.provider_kind == ProviderKind::Local
    }
}

/// Knobs for a resolution call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// When the archive lookup fails, build the download location from the
    /// identifier alone instead of failing
    pub force_best_effort: bool,
}

impl ResolveOptions {
    /// Options with best-effort fallback enabled
    pub fn best_effort() -> Self {
        Self {
            force_best_effort: true,
        }
    }
}

/// Everything a strategy may consult
pub struct ResolveContext<'a> {
    /// Metadata transport
    pub client: &'a dyn MetadataClient,
    /// Provider base URLs
    pub endpoints: &'a ProviderEndpoints,
    /// Root of local uploads
    pub local_dir: &'a Path,
}

/// One provider's way of locating a file
pub trait ProviderStrategy {
    /// Locate the file named by `usi`
    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        usi: &Usi,
        options: &ResolveOptions,
    ) -> Result<FetchDescriptor, LookupError>;
}

/// Strategy serving a provider kind
pub fn strategy_for(kind: ProviderKind) -> &'static dyn ProviderStrategy {
    match kind {
        ProviderKind::Local => &local::LocalUpload,
        ProviderKind::ArchiveDataset => &massive::MassiveDataset,
        ProviderKind::TaskOutput => &gnps::GnpsTask,
        ProviderKind::StudyRepository => &metabolights::MetaboLightsStudy,
        ProviderKind::GlycoRepository => &glycopost::GlycoPostProject,
        ProviderKind::Workbench => &workbench::WorkbenchStudy,
        ProviderKind::ProteomeExchange => &pxd::ProteomeExchangeDataset,
    }
}

/// Resolves identifiers against the configured providers
pub struct Resolver {
    endpoints: ProviderEndpoints,
    local_dir: PathBuf,
    client: Box<dyn MetadataClient>,
}

impl Resolver {
    /// Create a resolver with an explicit metadata client
    pub fn new(
        endpoints: ProviderEndpoints,
        local_dir: impl Into<PathBuf>,
        client: impl MetadataClient + 'static,
    ) -> Self {
        Self {
            endpoints,
            local_dir: local_dir.into(),
            client: Box::new(client),
        }
    }

    /// Create a resolver that talks HTTP
    pub fn with_http(
        endpoints: ProviderEndpoints,
        local_dir: impl Into<PathBuf>,
    ) -> Result<Self, LookupError> {
        let client = HttpMetadataClient::new(Duration::from_secs(endpoints.timeout_secs))?;
        Ok(Self::new(endpoints, local_dir, client))
    }

    /// Provider base URLs in use
    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    /// Resolve an identifier to a fetch location
    pub fn resolve(
        &self,
        usi: &Usi,
        options: &ResolveOptions,
    ) -> Result<FetchDescriptor, ResolveError> {
        let ctx = ResolveContext {
            client: self.client.as_ref(),
            endpoints: &self.endpoints,
            local_dir: &self.local_dir,
        };
        log::info!("Resolving {usi} via {} provider", usi.kind);
        strategy_for(usi.kind)
            .resolve(&ctx, usi, options)
            .map_err(|source| {
                log::warn!("Could not resolve {usi}: {source}");
                ResolveError::UnresolvedIdentifier {
                    usi: usi.to_string(),
                    kind: usi.kind,
                    source,
                }
            })
    }

    /// Parse and resolve an identifier string
    pub fn resolve_str(
        &self,
        usi: &str,
        options: &ResolveOptions,
    ) -> Result<FetchDescriptor, ResolveError> {
        let usi = Usi::parse(usi)?;
        self.resolve(&usi, options)
    }
}

/// Last path component of a listed file
pub(crate) fn file_name_of(path: &str) -> &str {
    path.trim_end_matches(';')
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(path)
}

fn stem_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

/// Whether a listed file is the one the identifier names
///
/// Identifiers often omit the extension, so a match on the stem counts.
pub(crate) fn names_file(listed: &str, usi: &Usi) -> bool {
    let listed = file_name_of(listed);
    let wanted = usi.file_name();
    listed == wanted || stem_of(listed) == wanted || stem_of(listed) == stem_of(wanted)
}

/// Open formats a run can be converted from, best first, then vendor formats
pub(crate) const FORMAT_PREFERENCE: [&str; 6] = [".mzml", ".mzxml", ".mzdata", ".raw", ".wiff", ".d"];

/// Rank of a file by its extension; lower is better, `None` if unusable
pub(crate) fn format_rank(path: &str) -> Option<usize> {
    let lower = file_name_of(path).to_ascii_lowercase();
    FORMAT_PREFERENCE.iter().position(|ext| lower.ends_with(ext))
}
