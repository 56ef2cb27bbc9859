//! Divider Cards Core Library
//!
//! Print-layout export for trading-card set dividers:
//! - Grid layout of 63 x 99 mm cards, at most three per row
//! - Icon normalization (proxy fetch, off-screen rasterization, inlining)
//! - Scoped, self-restoring mutation of the live surface
//! - Raster capture at print scale
//! - Pagination onto A4 pages and PDF assembly

pub mod config;
pub mod document;
pub mod error;
pub mod icons;
pub mod layout;
pub mod model;
pub mod mutator;
pub mod paginate;
pub mod snapshot;
pub mod surface;
pub mod util;

pub use config::{
    AppConfig, DEFAULT_FILENAME, DEFAULT_PROXY_BASE, GridConfig, IconConfig, SnapshotConfig,
};
pub use document::assemble_pdf;
pub use error::{Error, Result};
pub use icons::{IconNormalizer, IconOutcome, IconSource, ProgressFn, ProxyIconSource};
pub use layout::GridLayout;
pub use model::{CardList, CardRecord, SortOrder};
pub use mutator::{IconSwap, LayoutOverride, PrintChrome};
pub use paginate::{PageBand, PagePlan, PageSize, paginate};
pub use snapshot::{FontFace, RasterRenderer, RasterSnapshot, SnapshotRenderer};
pub use surface::{Surface, SurfaceHandle};

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Runs the export pipeline against a live surface.
pub struct DividerExporter {
    icons: IconNormalizer,
    renderer: Arc<dyn SnapshotRenderer>,
    config: AppConfig,
    /// Held for the duration of one export
    running: Mutex<()>,
}

/// A finished export, ready to be written or downloaded.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub layout: GridLayout,
}

impl DividerExporter {
    /// Create an exporter with the proxy icon source and the raster renderer
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let renderer = RasterRenderer::new(&config.snapshot)?;

        Ok(Self {
            icons: IconNormalizer::new(&config.icons),
            renderer: Arc::new(renderer),
            config,
            running: Mutex::new(()),
        })
    }

    /// Create with a custom icon source and the raster renderer
    pub fn with_icon_source(config: AppConfig, source: Arc<dyn IconSource>) -> Result<Self> {
        let renderer = RasterRenderer::new(&config.snapshot)?;
        Ok(Self::with_components(config, source, Arc::new(renderer)))
    }

    /// Create with custom components
    pub fn with_components(
        config: AppConfig,
        source: Arc<dyn IconSource>,
        renderer: Arc<dyn SnapshotRenderer>,
    ) -> Self {
        Self {
            icons: IconNormalizer::with_source(source, &config.icons),
            renderer,
            config,
            running: Mutex::new(()),
        }
    }

    /// Export the surface as a multi-page PDF.
    pub async fn export(
        &self,
        surface: &SurfaceHandle,
        filename: Option<&str>,
    ) -> Result<ExportedDocument> {
        self.export_with_progress(surface, filename, None).await
    }

    /// Export, reporting icon normalization progress as `(done, total)`.
    ///
    /// Fails with [`Error::ExportInProgress`] while another export runs and
    /// with [`Error::NothingToExport`] for an empty grid; neither touches the
    /// surface. Every other failure is logged and returned as
    /// [`Error::ExportFailed`], after the surface has been restored.
    pub async fn export_with_progress(
        &self,
        surface: &SurfaceHandle,
        filename: Option<&str>,
        progress: Option<&ProgressFn<'_>>,
    ) -> Result<ExportedDocument> {
        let _running = self.running.try_lock().map_err(|_| Error::ExportInProgress)?;
        let filename = normalize_filename(filename, &self.config.default_filename);

        let mut surface = surface.lock().await;
        let card_count = surface.card_count();
        if card_count == 0 {
            return Err(Error::NothingToExport);
        }

        let layout = GridLayout::compute(card_count, &self.config.grid);
        info!(
            "Exporting {} divider cards as {}x{} grid ({}mm x {}mm)",
            card_count, layout.columns, layout.rows, layout.target_width_mm, layout.target_height_mm
        );

        let snapshot = self
            .capture(&mut surface, &layout, progress)
            .await
            .map_err(|e| {
                error!("Snapshot capture failed: {}", e);
                Error::export_failed(e)
            })?;
        drop(surface);

        let plan = paginate(layout.target_width_mm, layout.target_height_mm);
        if plan.scale < 1.0 {
            debug!("Snapshot downscaled by {:.3} to fit the page width", plan.scale);
        }

        let bytes = assemble_pdf(&snapshot, &plan, document_title(&filename)).map_err(|e| {
            error!("Document assembly failed: {}", e);
            Error::export_failed(e)
        })?;

        info!(
            "Exported {} ({} pages, {} bytes)",
            filename,
            plan.page_count(),
            bytes.len()
        );

        Ok(ExportedDocument {
            filename,
            bytes,
            page_count: plan.page_count(),
            layout,
        })
    }

    /// Override the layout, inline icons, hide chrome and capture. The
    /// guards restore the surface when this returns, on every path.
    async fn capture(
        &self,
        surface: &mut Surface,
        layout: &GridLayout,
        progress: Option<&ProgressFn<'_>>,
    ) -> Result<RasterSnapshot> {
        let mut fixed = LayoutOverride::apply(surface, layout)?;

        let icons = fixed.vector_icon_sources();
        let total = icons.len();
        let outcomes = self.icons.normalize_all(icons, progress).await;

        let mut swapped = IconSwap::new(&mut fixed);
        for (index, outcome) in outcomes {
            if let IconOutcome::Converted { data_uri } = outcome {
                swapped.substitute(index, data_uri);
            }
        }
        debug!("Inlined {}/{} icons", swapped.substituted(), total);

        let chrome = PrintChrome::hide(&mut swapped);
        self.renderer.capture(&chrome).await
    }

    /// Whether an export currently owns the pipeline.
    pub fn is_exporting(&self) -> bool {
        self.running.try_lock().is_err()
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn clear_icon_cache(&self) {
        self.icons.clear_cache();
    }
}

/// Resolve the download name: the requested one (trimmed) or `default`,
/// with a `.pdf` extension.
pub fn normalize_filename(requested: Option<&str>, default: &str) -> String {
    let name = requested
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(default);

    if name.to_ascii_lowercase().ends_with(".pdf") {
        name.to_string()
    } else {
        format!("{name}.pdf")
    }
}

/// The filename without one trailing `.pdf` (any case).
fn document_title(filename: &str) -> &str {
    let split = filename.len().saturating_sub(".pdf".len());
    match (filename.get(..split), filename.get(split..)) {
        (Some(stem), Some(ext)) if ext.eq_ignore_ascii_case(".pdf") => stem,
        _ => filename,
    }
}
