use crate::usi::{ProviderKind, UsiError};

/// Failure of a single provider lookup
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// The request could not be sent or the body not read
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Requested URL
        url: String,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The body is not valid JSON
    #[error("response from {url} is not valid JSON: {source}")]
    Json {
        /// Requested URL
        url: String,
        /// Parse error
        #[source]
        source: serde_json::Error,
    },

    /// The body is not a readable table
    #[error("response from {url} is not a readable table: {source}")]
    Table {
        /// Requested URL
        url: String,
        /// Parse error
        #[source]
        source: csv::Error,
    },

    /// The response lacks an expected field
    #[error("response from {url} has no '{field}'")]
    Schema {
        /// Requested URL
        url: String,
        /// Missing field name
        field: String,
    },

    /// The listing does not contain the requested file
    #[error("'{wanted}' is not listed by {url}")]
    NotListed {
        /// Requested URL
        url: String,
        /// File looked for
        wanted: String,
    },

    /// A provider endpoint or derived URL is malformed
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The identifier cannot be served by this provider
    #[error("{0}")]
    Invalid(String),
}

/// Resolution failure surfaced to the caller
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No strategy produced a location for the identifier
    #[error("unresolved identifier '{usi}' ({kind} provider): {source}")]
    UnresolvedIdentifier {
        /// The identifier
        usi: String,
        /// Provider kind that was attempted
        kind: ProviderKind,
        /// Why the last attempt failed
        #[source]
        source: LookupError,
    },

    /// The identifier text could not be parsed
    #[error(transparent)]
    Identifier(#[from] UsiError),
}

impl ResolveError {
    /// Provider kind attempted, if the identifier got that far
    pub fn kind(&self) -> Option<ProviderKind> {
        match self {
            ResolveError::UnresolvedIdentifier { kind, .. } => Some(*kind),
            ResolveError::Identifier(_) => None,
        }
    }
}
