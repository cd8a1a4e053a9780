//! # Universal Spectrum Identifiers
//!
//! A USI names a spectral file (and optionally a scan) in a public repository:
//!
//! ```text
//! mzspec:MSV000084494:GNPS00002_A3_p:scan:1
//! ^^^^^^ ^^^^^^^^^^^^ ^^^^^^^^^^^^^^ ^^^^^^
//! scheme collection   path           locator
//! ```
//!
//! The collection field selects the provider by substring match against a
//! fixed, ordered list of tags; the first match wins.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use error::UsiError;
pub use filename::{canonical_filename, canonical_stem, FILENAME_HASH_PREFIX, FILENAME_STEM_CAP};

mod error;
mod filename;


/// Path marker of the library-spectrum provenance form
/// (`mzspec:GNPS:GNPS-LIBRARY:accession:<ID>`)
pub const LIBRARY_PATH_MARKER: &str = "GNPS-LIBRARY";

/// Repository family an identifier belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// A file already uploaded to local storage
    Local,
    /// MassIVE dataset (`MSV...`)
    ArchiveDataset,
    /// GNPS task output (`GNPS`)
    TaskOutput,
    /// MetaboLights study (`MTBLS...`)
    StudyRepository,
    /// GlycoPOST project (`GPST...`)
    GlycoRepository,
    /// Metabolomics Workbench study (`ST...`)
    Workbench,
    /// ProteomeXchange dataset (`PXD...`)
    ProteomeExchange,
}

impl ProviderKind {
    /// Tags tried in order against the collection field
    const PRECEDENCE: [(&'static str, ProviderKind); 7] = [
        ("LOCAL", ProviderKind::Local),
        ("MSV", ProviderKind::ArchiveDataset),
        ("GNPS", ProviderKind::TaskOutput),
        ("MTBLS", ProviderKind::StudyRepository),
        // Must precede ST
        ("GPST", ProviderKind::GlycoRepository),
        ("ST", ProviderKind::Workbench),
        ("PXD", ProviderKind::ProteomeExchange),
    ];

    /// Determine the provider from a collection field
    pub fn detect(collection: &str) -> Option<Self> {
        Self::PRECEDENCE
            .iter()
            .find(|(tag, _)| collection.contains(tag))
            .map(|(_, kind)| *kind)
    }

    /// Short name used in logs and errors
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Local => "local",
            ProviderKind::ArchiveDataset => "archive-dataset",
            ProviderKind::TaskOutput => "task-output",
            ProviderKind::StudyRepository => "study-repository",
            ProviderKind::GlycoRepository => "glyco-repository",
            ProviderKind::Workbench => "workbench",
            ProviderKind::ProteomeExchange => "proteome-exchange",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional trailing scan reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanLocator {
    /// `scan:<n>`
    Scan(i64),
    /// `index:<n>`
    Index(i64),
    /// `nativeId:<id>`
    NativeId(String),
}

impl ScanLocator {
    fn parse(usi: &str, kind: &str, value: &str) -> Result<Self, UsiError> {
        let invalid = || UsiError::InvalidLocator {
            usi: usi.to_string(),
            kind: kind.to_string(),
            value: value.to_string(),
        };
        match kind {
            "scan" => value.trim().parse().map(ScanLocator::Scan).map_err(|_| invalid()),
            "index" => value.trim().parse().map(ScanLocator::Index).map_err(|_| invalid()),
            "nativeId" if !value.is_empty() => Ok(ScanLocator::NativeId(value.to_string())),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for ScanLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanLocator::Scan(n) => write!(f, "scan:{n}"),
            ScanLocator::Index(n) => write!(f, "index:{n}"),
            ScanLocator::NativeId(id) => write!(f, "nativeId:{id}"),
        }
    }
}

/// A parsed Universal Spectrum Identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Usi {
    /// Scheme field (usually `mzspec`)
    pub scheme: String,
    /// Provider selected from the collection field
    pub kind: ProviderKind,
    /// Collection (dataset/study/task accession)
    pub collection: String,
    /// File path, task reference, or [`LIBRARY_PATH_MARKER`]
    pub path: String,
    /// Library spectrum accession for the provenance form
    pub library_accession: Option<String>,
    /// Optional scan locator
    pub locator: Option<ScanLocator>,
}

impl Usi {
    /// Parse a colon-delimited identifier
    pub fn parse(text: &str) -> Result<Self, UsiError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(UsiError::Empty);
        }

        let fields: Vec<&str> = text.split(':').collect();
        let field = |i: usize, name: &'static str| -> Result<&str, UsiError> {
            match fields.get(i) {
                Some(f) if !f.trim().is_empty() => Ok(f.trim()),
                _ => Err(UsiError::MissingField {
                    usi: text.to_string(),
                    field: name,
                }),
            }
        };

        let scheme = field(0, "scheme")?;
        let collection = field(1, "collection")?;
        let path = field(2, "path")?;

        let kind = ProviderKind::detect(collection).ok_or_else(|| UsiError::UnknownCollection {
            usi: text.to_string(),
            collection: collection.to_string(),
        })?;

        let mut library_accession = None;
        let mut rest = &fields[3..];
        if path == LIBRARY_PATH_MARKER && rest.first() == Some(&"accession") {
            library_accession = Some(field(4, "library accession")?.to_string());
            rest = &fields[5..];
        }

        let locator = match rest {
            [] => None,
            [locator_kind] => {
                return Err(UsiError::InvalidLocator {
                    usi: text.to_string(),
                    kind: locator_kind.to_string(),
                    value: String::new(),
                })
            }
            // nativeId values may themselves contain ':'
            [locator_kind, value @ ..] => {
                Some(ScanLocator::parse(text, locator_kind, &value.join(":"))?)
            }
        };

        Ok(Self {
            scheme: scheme.to_string(),
            kind,
            collection: collection.to_string(),
            path: path.to_string(),
            library_accession,
            locator,
        })
    }

    /// Whether this is the library-spectrum provenance form
    pub fn is_library_reference(&self) -> bool {
        self.library_accession.is_some()
    }

    /// File name component of the path (after the last `/`)
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

impl FromStr for Usi {
    type Err = UsiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Usi::parse(s)
    }
}

impl fmt::Display for Usi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.scheme, self.collection, self.path)?;
        if let Some(accession) = &self.library_accession {
            write!(f, ":accession:{accession}")?;
        }
        if let Some(locator) = &self.locator {
            write!(f, ":{locator}")?;
        }
        Ok(())
    }
}
