//! Metadata transport used by the provider strategies

use std::sync::Mutex;
use std::time::Duration;

use reqwest::Url;

use super::error::LookupError;

/// Source of provider metadata responses
///
/// Strategies only ever issue plain GET requests; the response body is handed
/// back as text and interpreted by the caller.
pub trait MetadataClient: Send + Sync {
    /// GET `url` and return the body
    fn get_text(&self, url: &Url) -> Result<String, LookupError>;

    /// GET `url` and parse the body as JSON
    fn get_json(&self, url: &Url) -> Result<serde_json::Value, LookupError> {
        let body = self.get_text(url)?;
        serde_json::from_str(&body).map_err(|source| LookupError::Json {
            url: url.to_string(),
            source,
        })
    }
}

/// Blocking HTTP client
pub struct HttpMetadataClient {
    client: reqwest::blocking::Client,
}

impl HttpMetadataClient {
    /// Build a client with a per-request timeout
    pub fn new(timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lcms-explorer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| LookupError::Transport {
                url: String::new(),
                source,
            })?;
        Ok(Self { client })
    }
}

impl MetadataClient for HttpMetadataClient {
    fn get_text(&self, url: &Url) -> Result<String, LookupError> {
        log::debug!("GET {url}");
        let transport = |source| LookupError::Transport {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url.clone()).send().map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().map_err(transport)
    }
}

/// In-memory client answering from canned bodies
///
/// A request is answered by the first registered route whose fragment occurs
/// in the URL; unmatched requests fail with HTTP 404.
#[derive(Default)]
pub struct StaticMetadataClient {
    routes: Vec<(String, String)>,
    requests: Mutex<Vec<String>>,
}

impl StaticMetadataClient {
    /// Empty client; every request fails
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer URLs containing `fragment` with `body`
    pub fn respond(mut self, fragment: impl Into<String>, body: impl Into<String>) -> Self {
        self.routes.push((fragment.into(), body.into()));
        self
    }

    /// URLs requested so far
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl MetadataClient for StaticMetadataClient {
    fn get_text(&self, url: &Url) -> Result<String, LookupError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        self.routes
            .iter()
            .find(|(fragment, _)| url.as_str().contains(fragment.as_str()))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| LookupError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// Build `{base}/{segments...}?{params...}` with every segment and parameter
/// percent-encoded, so `/` inside an accession or path never reaches the URL
/// unescaped.
pub fn build_url(base: &str, segments: &[&str], params: &[(&str, &str)]) -> Result<Url, LookupError> {
    let mut url =
        Url::parse(base).map_err(|e| LookupError::InvalidUrl(format!("{base}: {e}")))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| LookupError::InvalidUrl(format!("{base} cannot take a path")))?;
        path.pop_if_empty();
        path.extend(segments);
    }
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params.iter());
    }
    Ok(url)
}
