use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Where icon bytes come from.
#[async_trait]
pub trait IconSource: Send + Sync {
    /// Fetch the raw bytes of the icon at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetches icons through a CORS-style pass-through proxy: the original URL
/// is percent-encoded and appended to `proxy_base`.
pub struct ProxyIconSource {
    client: Client,
    proxy_base: String,
}

impl ProxyIconSource {
    /// # Panics
    /// Panics if the HTTP client cannot be created, which should only happen
    /// when no TLS backend is available.
    #[allow(clippy::expect_used)]
    pub fn new(proxy_base: String, request_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, proxy_base }
    }

    pub fn proxy_url(&self, original: &str) -> String {
        format!("{}{}", self.proxy_base, urlencoding::encode(original))
    }
}

#[async_trait]
impl IconSource for ProxyIconSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let proxied = self.proxy_url(url);
        debug!("Fetching icon via {}", proxied);

        let response = self
            .client
            .get(&proxied)
            .send()
            .await
            .map_err(|e| Error::IconFetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Icon proxy returned {} for {}", status, url);
            return Err(Error::IconFetch {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let body = response.bytes().await.map_err(|e| Error::IconFetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(body.to_vec())
    }
}
