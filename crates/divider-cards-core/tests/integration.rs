//! Integration tests for divider-cards-core
//!
//! These tests drive the whole export pipeline against a live surface:
//! - Layout override, icon inlining and chrome hiding during capture
//! - Restoration of the surface on success, failure and panic
//! - Pagination into PDF pages
//! - Serialization of concurrent exports

#![allow(clippy::unwrap_used, clippy::panic)]

use async_trait::async_trait;
use divider_cards_core::surface::FixedGeometry;
use divider_cards_core::{
    AppConfig, CardList, CardRecord, DividerExporter, Error, IconSource, RasterSnapshot, Result,
    SnapshotRenderer, SortOrder, Surface, SurfaceHandle,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =============================================================================
// Mock Icon Source
// =============================================================================

const ICON_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 32 32"><circle cx="16" cy="16" r="14" fill="#000"/></svg>"##;

/// Serves a fixed SVG for every URL, except those containing "broken".
struct MockIconSource {
    requests: AtomicUsize,
}

impl MockIconSource {
    fn new() -> Self {
        Self {
            requests: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl IconSource for MockIconSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if url.contains("broken") {
            return Err(Error::IconFetch {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            });
        }
        Ok(ICON_SVG.as_bytes().to_vec())
    }
}

// =============================================================================
// Mock Renderer
// =============================================================================

/// What the renderer saw at capture time.
#[derive(Debug, Clone)]
struct Observed {
    geometry: Option<FixedGeometry>,
    codes: Vec<String>,
    icon_srcs: Vec<String>,
    remove_visible: bool,
    cut_guides_visible: bool,
}

enum Behavior {
    Blank,
    Fail,
    Panic,
    Slow(Duration),
}

/// Records the surface state it is asked to capture, then behaves as told.
struct MockRenderer {
    behavior: Behavior,
    seen: Mutex<Vec<Observed>>,
}

impl MockRenderer {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn observed(&self) -> Vec<Observed> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnapshotRenderer for MockRenderer {
    async fn capture(&self, surface: &Surface) -> Result<RasterSnapshot> {
        let geometry = surface.fixed_geometry();
        self.seen.lock().unwrap().push(Observed {
            geometry,
            codes: surface.cards().iter().map(|c| c.record.code.clone()).collect(),
            icon_srcs: surface.cards().iter().map(|c| c.icon.src.clone()).collect(),
            remove_visible: surface.cards().iter().any(|c| c.remove_visible),
            cut_guides_visible: surface.cards().iter().any(|c| c.cut_guides_visible()),
        });

        match self.behavior {
            Behavior::Blank => {}
            Behavior::Fail => return Err(Error::Render("root element detached".to_string())),
            Behavior::Panic => panic!("renderer crashed"),
            Behavior::Slow(delay) => tokio::time::sleep(delay).await,
        }

        let geometry = geometry.ok_or_else(|| Error::Render("no geometry".to_string()))?;
        Ok(RasterSnapshot::blank(geometry.width_mm, geometry.height_mm, 0.5))
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================

fn card_list(codes: &[&str]) -> CardList {
    let mut list = CardList::new();
    for code in codes {
        list.push(CardRecord::new(
            code,
            format!("Set {code}"),
            "2023-11-17",
            format!("https://svgs.example/sets/{code}.svg?1700000000"),
            "expansion",
            291,
        ))
        .unwrap();
    }
    list
}

fn live_surface(count: usize) -> SurfaceHandle {
    let codes: Vec<String> = (0..count).map(|i| format!("s{i:02}")).collect();
    let codes: Vec<&str> = codes.iter().map(String::as_str).collect();
    let mut surface = Surface::from_cards(&card_list(&codes));
    // on-screen state the export must leave untouched
    surface.style.set("width", "100%");
    surface.style.set("padding", "16px");
    SurfaceHandle::new(surface)
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.icons.cache_enabled = false;
    config.snapshot.scale = 1.0;
    config
}

fn exporter(renderer: Arc<MockRenderer>) -> DividerExporter {
    DividerExporter::with_components(test_config(), Arc::new(MockIconSource::new()), renderer)
}

fn pdf_page_count(bytes: &[u8]) -> usize {
    lopdf::Document::load_mem(bytes).unwrap().get_pages().len()
}

// =============================================================================
// End-to-End Export Tests
// =============================================================================

#[tokio::test]
async fn test_export_with_raster_renderer() {
    let surface = live_surface(4);
    let before = surface.snapshot().await;
    let exporter =
        DividerExporter::with_icon_source(test_config(), Arc::new(MockIconSource::new())).unwrap();

    let doc = exporter.export(&surface, None).await.unwrap();

    assert_eq!(doc.filename, "mtg-divider-cards.pdf");
    assert_eq!(doc.page_count, 1);
    assert_eq!((doc.layout.columns, doc.layout.rows), (3, 2));
    assert!(doc.bytes.starts_with(b"%PDF-1.5"));
    assert_eq!(pdf_page_count(&doc.bytes), 1);
    assert_eq!(surface.snapshot().await, before);
}

#[tokio::test]
async fn test_page_count_follows_rows() {
    let cases = [(3, 1), (9, 1), (10, 2), (18, 2), (19, 3)];
    for (cards, pages) in cases {
        let renderer = MockRenderer::new(Behavior::Blank);
        let doc = exporter(renderer)
            .export(&live_surface(cards), Some("binder"))
            .await
            .unwrap();

        assert_eq!(doc.page_count, pages, "{cards} cards");
        assert_eq!(pdf_page_count(&doc.bytes), pages, "{cards} cards");
        assert_eq!(doc.filename, "binder.pdf");
    }
}

#[tokio::test]
async fn test_capture_sees_print_state() {
    let surface = live_surface(5);
    surface.lock().await.cards_mut()[1].icon.src =
        "https://svgs.example/sets/broken.svg".to_string();
    let before = surface.snapshot().await;
    let renderer = MockRenderer::new(Behavior::Blank);

    exporter(Arc::clone(&renderer))
        .export(&surface, None)
        .await
        .unwrap();

    let observed = renderer.observed();
    assert_eq!(observed.len(), 1);
    let seen = &observed[0];

    let geometry = seen.geometry.unwrap();
    assert_eq!(geometry.columns, 3);
    assert!((geometry.width_mm - 189.0).abs() < 1e-9);
    assert!((geometry.height_mm - 198.0).abs() < 1e-9);
    assert!(!seen.remove_visible);
    assert!(!seen.cut_guides_visible);

    // failed conversion keeps the original reference, the rest are inlined
    assert_eq!(seen.icon_srcs[1], "https://svgs.example/sets/broken.svg");
    for (i, src) in seen.icon_srcs.iter().enumerate().filter(|(i, _)| *i != 1) {
        assert!(src.starts_with("data:image/png;base64,"), "icon {i}");
    }

    assert_eq!(surface.snapshot().await, before);
}

#[tokio::test]
async fn test_wide_grid_is_downscaled_onto_page() {
    let mut config = test_config();
    config.grid.max_columns = 4;
    let renderer = MockRenderer::new(Behavior::Blank);
    let exporter =
        DividerExporter::with_components(config, Arc::new(MockIconSource::new()), renderer);

    // 4 x 63mm = 252mm wide, scaled to 210mm: 3 rows become 247.5mm tall
    let doc = exporter.export(&live_surface(12), None).await.unwrap();
    assert_eq!(doc.layout.columns, 4);
    assert_eq!(doc.page_count, 1);
}

#[tokio::test]
async fn test_progress_reports_every_icon() {
    let surface = live_surface(6);
    let exporter = exporter(MockRenderer::new(Behavior::Blank));
    let last = Arc::new(Mutex::new((0, 0)));
    let sink = Arc::clone(&last);
    let progress = move |done: usize, total: usize| {
        *sink.lock().unwrap() = (done, total);
    };

    exporter
        .export_with_progress(&surface, None, Some(&progress))
        .await
        .unwrap();

    assert_eq!(*last.lock().unwrap(), (6, 6));
}

// =============================================================================
// Failure & Restoration Tests
// =============================================================================

#[tokio::test]
async fn test_render_failure_restores_surface() {
    let surface = live_surface(7);
    let before = surface.snapshot().await;

    let err = exporter(MockRenderer::new(Behavior::Fail))
        .export(&surface, None)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "PDF generation failed");
    match err {
        Error::ExportFailed { source } => assert!(matches!(*source, Error::Render(_))),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(surface.snapshot().await, before);
}

#[tokio::test]
async fn test_render_panic_restores_surface() {
    let surface = live_surface(3);
    let before = surface.snapshot().await;
    let exporter = Arc::new(exporter(MockRenderer::new(Behavior::Panic)));

    let task = {
        let surface = surface.clone();
        let exporter = Arc::clone(&exporter);
        tokio::spawn(async move { exporter.export(&surface, None).await.map(|_| ()) })
    };

    assert!(task.await.unwrap_err().is_panic());
    assert_eq!(surface.snapshot().await, before);
    assert!(!exporter.is_exporting());
}

#[tokio::test]
async fn test_empty_grid_is_rejected_untouched() {
    let surface = SurfaceHandle::new(Surface::from_cards(&CardList::new()));
    let before = surface.snapshot().await;
    let renderer = MockRenderer::new(Behavior::Blank);

    let err = exporter(Arc::clone(&renderer))
        .export(&surface, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NothingToExport));
    assert!(renderer.observed().is_empty());
    assert_eq!(surface.snapshot().await, before);
}

#[tokio::test]
async fn test_missing_grid_is_rejected() {
    let surface = SurfaceHandle::new(Surface::without_grid());
    let err = exporter(MockRenderer::new(Behavior::Blank))
        .export(&surface, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NothingToExport));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[tokio::test]
async fn test_concurrent_export_is_rejected() {
    let surface = live_surface(4);
    let exporter = Arc::new(exporter(MockRenderer::new(Behavior::Slow(
        Duration::from_millis(300),
    ))));

    let first = {
        let surface = surface.clone();
        let exporter = Arc::clone(&exporter);
        tokio::spawn(async move { exporter.export(&surface, None).await.map(|d| d.page_count) })
    };

    while !exporter.is_exporting() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let second = exporter.export(&surface, None).await;
    assert!(matches!(second, Err(Error::ExportInProgress)));

    // the UI cannot remove cards while the export owns the surface
    assert!(matches!(
        surface.try_remove_card("S00"),
        Err(Error::SurfaceBusy)
    ));

    assert_eq!(first.await.unwrap().unwrap(), 1);
    assert!(surface.try_remove_card("S00").unwrap().is_some());
    assert_eq!(surface.snapshot().await.card_count(), 3);
}

#[tokio::test]
async fn test_sort_is_rejected_while_exporting() {
    let surface = live_surface(4);
    let exporter = Arc::new(exporter(MockRenderer::new(Behavior::Slow(
        Duration::from_millis(300),
    ))));

    let running = {
        let surface = surface.clone();
        let exporter = Arc::clone(&exporter);
        tokio::spawn(async move { exporter.export(&surface, None).await.map(|_| ()) })
    };

    while !exporter.is_exporting() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert!(matches!(
        surface.try_sort_cards(SortOrder::Name),
        Err(Error::SurfaceBusy)
    ));

    running.await.unwrap().unwrap();
    assert_eq!(surface.snapshot().await.sort_order(), SortOrder::Added);
    surface.try_sort_cards(SortOrder::DateDesc).unwrap();
    assert_eq!(surface.snapshot().await.sort_order(), SortOrder::DateDesc);
}

#[tokio::test]
async fn test_export_follows_grid_order() {
    let list = card_list(&["zen", "akh", "mom"]);
    let surface = SurfaceHandle::new(Surface::from_cards(&list));
    surface.try_sort_cards(SortOrder::Name).unwrap();
    let renderer = MockRenderer::new(Behavior::Blank);

    exporter(Arc::clone(&renderer))
        .export(&surface, None)
        .await
        .unwrap();

    assert_eq!(renderer.observed()[0].codes, ["AKH", "MOM", "ZEN"]);
    // the sort survives the export
    let after = surface.snapshot().await;
    assert_eq!(after.sort_order(), SortOrder::Name);
    assert_eq!(after.cards()[0].record.code, "AKH");
}

#[tokio::test]
async fn test_icon_cache_avoids_refetch_across_exports() {
    let mut config = test_config();
    config.icons.cache_enabled = true;
    let source = Arc::new(MockIconSource::new());
    let exporter = DividerExporter::with_components(
        config,
        Arc::clone(&source) as Arc<dyn IconSource>,
        MockRenderer::new(Behavior::Blank),
    );
    let surface = live_surface(3);

    exporter.export(&surface, None).await.unwrap();
    exporter.export(&surface, None).await.unwrap();
    assert_eq!(source.requests.load(Ordering::SeqCst), 3);

    exporter.clear_icon_cache();
    exporter.export(&surface, None).await.unwrap();
    assert_eq!(source.requests.load(Ordering::SeqCst), 6);
}
