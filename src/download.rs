//! Fetching release archives over HTTP

use std::time::Duration;

use crate::error::{Error, Result};

/// Largest archive accepted
const MAX_DOWNLOAD_SIZE: u64 = 128 * 1024 * 1024;

/// Something that can fetch a URL into memory
pub trait Fetcher {
    fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>>;
}

/// Fetcher backed by a blocking ureq agent
pub struct HttpFetcher;

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        log::info!(target: "franken::audit", "GET {url}");

        let failed = |message: String| Error::Download {
            url: url.to_string(),
            message,
        };

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        let mut response = agent
            .get(url)
            .header("User-Agent", "franken")
            .call()
            .map_err(|e| failed(e.to_string()))?;

        let bytes = response
            .body_mut()
            .with_config()
            .limit(MAX_DOWNLOAD_SIZE)
            .read_to_vec()
            .map_err(|e| failed(format!("cannot read response body: {e}")))?;

        log::debug!("Fetched {} bytes from {url}", bytes.len());
        Ok(bytes)
    }
}
