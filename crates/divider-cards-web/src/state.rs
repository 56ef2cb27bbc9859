use anyhow::{Context, Result};
use divider_cards_core::{AppConfig, CardList, DividerExporter, Surface, SurfaceHandle};

/// Global application state
pub struct AppState {
    /// The live card grid shown to every client
    pub surface: SurfaceHandle,
    /// Single exporter; it rejects overlapping exports
    pub exporter: DividerExporter,
}

impl AppState {
    pub fn new(config: AppConfig, cards: &CardList) -> Result<Self> {
        let exporter = DividerExporter::new(config).context("Failed to initialize exporter")?;

        Ok(Self {
            surface: SurfaceHandle::new(Surface::from_cards(cards)),
            exporter,
        })
    }

    pub fn default_filename(&self) -> &str {
        &self.exporter.config().default_filename
    }
}
