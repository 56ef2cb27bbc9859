//! Icon normalization: remote vector icons become inline PNG data URIs.
//!
//! Set icons are SVGs on third-party hosts. The capture step cannot fetch
//! cross-origin images reliably, so every icon is fetched through a proxy,
//! rasterized off-screen and inlined before the snapshot is taken. Failures
//! never abort an export: the icon keeps its original reference.

mod cache;
mod raster;
mod source;

pub use cache::IconCache;
pub use raster::{RasterOutcome, png_data_uri, rasterize_svg, rasterize_with_timeout};
pub use source::{IconSource, ProxyIconSource};

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::IconConfig;
use crate::error::{Error, Result};

/// Progress callback: `(icons done, icons total)`. May borrow from the caller.
pub type ProgressFn<'a> = dyn Fn(usize, usize) + Send + Sync + 'a;

/// Result of normalizing one icon. Never an error: failures carry the
/// original reference so the caller can keep using it.
#[derive(Debug)]
pub enum IconOutcome {
    Converted { data_uri: String },
    Fallback { original: String, reason: Error },
}

impl IconOutcome {
    /// The reference the icon should point at after normalization.
    pub fn src(&self) -> &str {
        match self {
            Self::Converted { data_uri } => data_uri,
            Self::Fallback { original, .. } => original,
        }
    }

    pub const fn is_converted(&self) -> bool {
        matches!(self, Self::Converted { .. })
    }
}

/// Converts icon references into embeddable raster data URIs.
pub struct IconNormalizer {
    source: Arc<dyn IconSource>,
    cache: Option<IconCache>,
    raster_size: u32,
    timeout: Duration,
    concurrency: usize,
}

impl IconNormalizer {
    /// Normalizer fetching through the configured proxy.
    pub fn new(config: &IconConfig) -> Self {
        let source = ProxyIconSource::new(config.proxy_base.clone(), config.request_timeout());
        Self::with_source(Arc::new(source), config)
    }

    /// Normalizer with a custom icon source
    pub fn with_source(source: Arc<dyn IconSource>, config: &IconConfig) -> Self {
        let cache = config
            .cache_enabled
            .then(|| IconCache::new(config.cache_max_entries));

        Self {
            source,
            cache,
            raster_size: config.raster_size,
            timeout: config.timeout(),
            concurrency: config.concurrency.max(1),
        }
    }

    /// Normalize a single icon reference.
    pub async fn normalize(&self, src: &str) -> IconOutcome {
        if let Some(ref cache) = self.cache
            && let Some(data_uri) = cache.get(src).await
        {
            debug!("Icon cache hit for {}", src);
            return IconOutcome::Converted { data_uri };
        }

        match self.convert(src).await {
            Ok(data_uri) => {
                if let Some(ref cache) = self.cache {
                    cache.insert(src.to_string(), data_uri.clone()).await;
                }
                IconOutcome::Converted { data_uri }
            }
            Err(reason) => {
                warn!("Icon conversion failed for {}: {}", src, reason);
                IconOutcome::Fallback {
                    original: src.to_string(),
                    reason,
                }
            }
        }
    }

    async fn convert(&self, src: &str) -> Result<String> {
        let svg = self.source.fetch(src).await?;
        debug!("Fetched icon {} ({} bytes)", src, svg.len());

        let size = self.raster_size;
        match rasterize_with_timeout(move || rasterize_svg(&svg, size), self.timeout).await {
            RasterOutcome::Ready(png) => Ok(png_data_uri(&png)),
            RasterOutcome::DecodeFailed(reason) => Err(Error::IconDecode(reason)),
            RasterOutcome::TimedOut => Err(Error::IconTimeout(
                u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }

    /// Normalize a list of `(card index, src)` icons, at most `concurrency`
    /// at a time. Outcomes are returned sorted by card index.
    pub async fn normalize_all(
        &self,
        icons: Vec<(usize, String)>,
        progress: Option<&ProgressFn<'_>>,
    ) -> Vec<(usize, IconOutcome)> {
        let total = icons.len();
        let mut outcomes = Vec::with_capacity(total);

        let mut pending = futures::stream::iter(icons)
            .map(|(index, src)| async move { (index, self.normalize(&src).await) })
            .buffer_unordered(self.concurrency);

        while let Some(outcome) = pending.next().await {
            outcomes.push(outcome);
            if let Some(callback) = progress {
                callback(outcomes.len(), total);
            }
        }

        outcomes.sort_by_key(|(index, _)| *index);
        outcomes
    }

    pub fn clear_cache(&self) {
        if let Some(ref cache) = self.cache {
            cache.clear();
        }
    }
}
