use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default name of the downloaded sheet
pub const DEFAULT_FILENAME: &str = "mtg-divider-cards.pdf";

/// Default proxy used to work around cross-origin icon hosts
pub const DEFAULT_PROXY_BASE: &str = "https://corsproxy.io/?";

/// Physical card grid configuration (all lengths in millimeters)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_card_width_mm")]
    pub card_width_mm: f64,
    #[serde(default = "default_card_height_mm")]
    pub card_height_mm: f64,
    #[serde(default)]
    pub gap_mm: f64,
    #[serde(default = "default_max_columns")]
    pub max_columns: usize,
}

const fn default_card_width_mm() -> f64 {
    63.0
}

const fn default_card_height_mm() -> f64 {
    99.0
}

const fn default_max_columns() -> usize {
    3
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            card_width_mm: default_card_width_mm(),
            card_height_mm: default_card_height_mm(),
            gap_mm: 0.0,
            max_columns: default_max_columns(),
        }
    }
}

/// Icon normalization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IconConfig {
    /// Proxy base; the percent-encoded icon URL is appended to it
    #[serde(default = "default_proxy_base")]
    pub proxy_base: String,

    /// Edge length of the square raster the icon is drawn into
    #[serde(default = "default_raster_size")]
    pub raster_size: u32,

    /// Upper bound for rasterizing one icon
    #[serde(default = "default_icon_timeout_ms")]
    pub timeout_ms: u64,

    /// HTTP timeout for one proxy request
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Number of icons converted at once (1 = strictly sequential)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Keep converted icons in memory between exports
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Maximum cached icons
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: u64,
}

fn default_proxy_base() -> String {
    DEFAULT_PROXY_BASE.to_string()
}

const fn default_raster_size() -> u32 {
    256
}

const fn default_icon_timeout_ms() -> u64 {
    5000
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}

const fn default_concurrency() -> usize {
    1
}

const fn default_true() -> bool {
    true
}

const fn default_cache_max_entries() -> u64 {
    512
}

impl IconConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            proxy_base: default_proxy_base(),
            raster_size: default_raster_size(),
            timeout_ms: default_icon_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            concurrency: default_concurrency(),
            cache_enabled: true,
            cache_max_entries: default_cache_max_entries(),
        }
    }
}

/// Snapshot capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Device pixels per CSS pixel (4.0 keeps small glyphs legible in print)
    #[serde(default = "default_scale")]
    pub scale: f32,

    /// Upper bound for decoding the embedded images of one snapshot
    #[serde(default = "default_image_timeout_ms")]
    pub image_timeout_ms: u64,

    /// TrueType font used for card labels instead of the built-in face
    #[serde(default)]
    pub font_path: Option<PathBuf>,
}

const fn default_scale() -> f32 {
    4.0
}

const fn default_image_timeout_ms() -> u64 {
    15_000
}

impl SnapshotConfig {
    pub const fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.image_timeout_ms)
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            image_timeout_ms: default_image_timeout_ms(),
            font_path: None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub grid: GridConfig,

    #[serde(default)]
    pub icons: IconConfig,

    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// File name offered when the caller does not supply one
    #[serde(default = "default_filename")]
    pub default_filename: String,
}

fn default_filename() -> String {
    DEFAULT_FILENAME.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            icons: IconConfig::default(),
            snapshot: SnapshotConfig::default(),
            default_filename: default_filename(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations (~/.config/divider-cards/config.toml, ./config.toml)
    pub fn load() -> Self {
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("divider-cards").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, reason: &str| Error::ConfigInvalid {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if !positive(self.grid.card_width_mm) || !positive(self.grid.card_height_mm) {
            return Err(invalid(
                "grid.card_*_mm",
                "card dimensions must be positive and finite",
            ));
        }
        if !self.grid.gap_mm.is_finite() || self.grid.gap_mm < 0.0 {
            return Err(invalid("grid.gap_mm", "must be finite and not negative"));
        }
        if self.grid.max_columns == 0 {
            return Err(invalid("grid.max_columns", "must be at least 1"));
        }
        if self.icons.raster_size == 0 {
            return Err(invalid("icons.raster_size", "must be at least 1"));
        }
        if self.icons.concurrency == 0 {
            return Err(invalid("icons.concurrency", "must be at least 1"));
        }
        if !self.snapshot.scale.is_finite() || self.snapshot.scale <= 0.0 {
            return Err(invalid("snapshot.scale", "must be positive and finite"));
        }
        Ok(())
    }
}

fn positive(mm: f64) -> bool {
    mm.is_finite() && mm > 0.0
}
