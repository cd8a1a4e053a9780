//! Remote asset transport

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use super::error::ConvertError;

/// Copies a remote asset into a local writer
pub trait Downloader: Send + Sync {
    /// Stream `uri` into `out`, returning the number of bytes written
    fn download(&self, uri: &str, out: &mut dyn Write) -> Result<u64, ConvertError>;
}

/// Blocking HTTP(S) downloader
pub struct HttpDownloader {
    client: reqwest::blocking::Client,
}

impl HttpDownloader {
    /// Build a downloader; `timeout` bounds the whole transfer
    pub fn new(timeout: Duration) -> Result<Self, ConvertError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lcms-explorer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConvertError::Fetch {
                uri: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, uri: &str, out: &mut dyn Write) -> Result<u64, ConvertError> {
        let fetch = |e: reqwest::Error| ConvertError::Fetch {
            uri: uri.to_string(),
            reason: e.to_string(),
        };
        log::info!("Downloading {uri}");
        let mut response = self
            .client
            .get(uri)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(fetch)?;
        let bytes = response.copy_to(out).map_err(fetch)?;
        log::debug!("Downloaded {bytes} bytes from {uri}");
        Ok(bytes)
    }
}

/// In-memory downloader serving fixed bodies by exact URI
#[derive(Debug, Default, Clone)]
pub struct StaticDownloader {
    bodies: HashMap<String, Vec<u8>>,
}

impl StaticDownloader {
    /// Downloader with no assets
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `uri`
    pub fn serve(mut self, uri: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(uri.into(), body.into());
        self
    }
}

impl Downloader for StaticDownloader {
    fn download(&self, uri: &str, out: &mut dyn Write) -> Result<u64, ConvertError> {
        let body = self.bodies.get(uri).ok_or_else(|| ConvertError::Fetch {
            uri: uri.to_string(),
            reason: "not found".to_string(),
        })?;
        out.write_all(body)?;
        Ok(body.len() as u64)
    }
}
