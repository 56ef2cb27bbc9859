//! Capture of the print-ready surface into a single raster image.
//!
//! The capture reads geometry back from the surface itself, so it only
//! works while a layout override is applied. Embedded images are decoded
//! from `data:` URIs; remote references are never fetched here.

mod face;
mod text;

pub use text::{Align, FontFace};

use async_trait::async_trait;
use base64::Engine;
use image::{Rgb, RgbImage};
use tiny_skia::{Color, ColorU8, Pixmap, Transform};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SnapshotConfig;
use crate::error::{Error, Result};
use crate::surface::{FixedGeometry, Surface};
use crate::util::{mm_to_px, px_extent};
use face::CardFace;

/// Opaque snapshot background.
pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// One capture of the surface, consumed by pagination.
#[derive(Debug, Clone)]
pub struct RasterSnapshot {
    pub image: RgbImage,
    pub scale: f32,
    pub width_mm: f64,
    pub height_mm: f64,
}

impl RasterSnapshot {
    /// An empty snapshot of the given physical size.
    pub fn blank(width_mm: f64, height_mm: f64, scale: f32) -> Self {
        let image = RgbImage::from_pixel(
            px_extent(mm_to_px(width_mm, scale)),
            px_extent(mm_to_px(height_mm, scale)),
            BACKGROUND,
        );
        Self {
            image,
            scale,
            width_mm,
            height_mm,
        }
    }

    pub fn pixel_width(&self) -> u32 {
        self.image.width()
    }

    pub fn pixel_height(&self) -> u32 {
        self.image.height()
    }
}

/// Captures a surface into a raster image.
#[async_trait]
pub trait SnapshotRenderer: Send + Sync {
    async fn capture(&self, surface: &Surface) -> Result<RasterSnapshot>;
}

/// Software renderer painting card faces with tiny-skia.
pub struct RasterRenderer {
    scale: f32,
    image_timeout: Duration,
    font: FontFace,
}

impl RasterRenderer {
    pub fn new(config: &SnapshotConfig) -> Result<Self> {
        let font = match config.font_path.as_deref() {
            Some(path) => {
                debug!("Card text font: {}", path.display());
                FontFace::from_file(path)?
            }
            None => FontFace::embedded(),
        };

        Ok(Self {
            scale: config.scale,
            image_timeout: config.image_timeout(),
            font,
        })
    }

    #[must_use]
    pub fn with_font(mut self, font: FontFace) -> Self {
        self.font = font;
        self
    }

    /// Decode every embedded image, bounded by the image timeout.
    async fn decode_images(&self, sources: Vec<Option<String>>) -> Result<Vec<Option<Pixmap>>> {
        let job = tokio::task::spawn_blocking(move || {
            sources
                .into_iter()
                .map(|src| {
                    let uri = src?;
                    decode_data_uri(&uri)
                        .inspect_err(|e| warn!("Skipping embedded image: {}", e))
                        .ok()
                })
                .collect::<Vec<_>>()
        });

        match tokio::time::timeout(self.image_timeout, job).await {
            Ok(Ok(images)) => Ok(images),
            Ok(Err(e)) => Err(Error::Render(format!("image decoding task failed: {e}"))),
            Err(_) => Err(Error::SnapshotTimeout(
                u64::try_from(self.image_timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }
}

#[async_trait]
impl SnapshotRenderer for RasterRenderer {
    async fn capture(&self, surface: &Surface) -> Result<RasterSnapshot> {
        let geometry = surface
            .fixed_geometry()
            .ok_or_else(|| Error::Render("surface has no fixed print geometry".to_string()))?;

        let cards = surface.cards();
        let sources = cards
            .iter()
            .map(|card| {
                if card.icon.src.starts_with("data:") {
                    Some(card.icon.src.clone())
                } else {
                    debug!("Not fetching remote image {} during capture", card.icon.src);
                    None
                }
            })
            .collect();
        let icons = self.decode_images(sources).await?;

        let faces: Vec<CardFace> = cards
            .iter()
            .zip(card_frames(&geometry, cards.len()))
            .zip(icons)
            .map(|((card, (x_mm, y_mm, width_mm, height_mm)), icon)| CardFace {
                record: card.record.clone(),
                x_mm,
                y_mm,
                width_mm,
                height_mm,
                icon,
                remove_visible: card.remove_visible,
                cut_guides_visible: card.cut_guides_visible(),
            })
            .collect();

        let scale = self.scale;
        let font = self.font.clone();
        tokio::task::spawn_blocking(move || paint_surface(&geometry, scale, &faces, &font))
            .await
            .map_err(|e| Error::Render(format!("paint task failed: {e}")))?
    }
}

/// `(x, y, width, height)` in mm of each grid cell, row-major.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn card_frames(geometry: &FixedGeometry, count: usize) -> Vec<(f32, f32, f32, f32)> {
    let columns = geometry.columns.max(1);
    let rows = count.div_ceil(columns).max(1);
    let gaps = (rows - 1) as f64 * geometry.gap_mm;
    let card_height = (geometry.height_mm - gaps) / rows as f64;

    (0..count)
        .map(|i| {
            let col = (i % columns) as f64;
            let row = (i / columns) as f64;
            (
                (col * (geometry.track_width_mm + geometry.gap_mm)) as f32,
                (row * (card_height + geometry.gap_mm)) as f32,
                geometry.track_width_mm as f32,
                card_height as f32,
            )
        })
        .collect()
}

#[allow(clippy::cast_possible_truncation)]
fn paint_surface(
    geometry: &FixedGeometry,
    scale: f32,
    faces: &[CardFace],
    font: &FontFace,
) -> Result<RasterSnapshot> {
    let width = px_extent(mm_to_px(geometry.width_mm, scale));
    let height = px_extent(mm_to_px(geometry.height_mm, scale));

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| Error::Render(format!("cannot allocate a {width}x{height} raster")))?;
    pixmap.fill(Color::WHITE);

    let px_per_mm = mm_to_px(1.0, scale) as f32;
    let base = Transform::from_scale(px_per_mm, px_per_mm);
    for face in faces {
        face::paint_card(&mut pixmap, base, face, font);
    }

    // The background is opaque, so premultiplied and straight RGB agree.
    let rgb = pixmap
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    let image = RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| Error::Render("raster buffer size mismatch".to_string()))?;

    debug!("Captured {}x{} px snapshot at {}x", width, height, scale);

    Ok(RasterSnapshot {
        image,
        scale,
        width_mm: geometry.width_mm,
        height_mm: geometry.height_mm,
    })
}

/// Decode a base64 `data:` URI into a premultiplied pixmap.
fn decode_data_uri(uri: &str) -> Result<Pixmap> {
    let (meta, payload) = uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(|| Error::Render("malformed data URI".to_string()))?;
    if !meta.ends_with(";base64") {
        return Err(Error::Render(format!("unsupported data URI encoding '{meta}'")));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::Render(format!("invalid base64 image data: {e}")))?;
    let rgba = image::load_from_memory(&bytes)
        .map_err(|e| Error::Render(format!("invalid embedded image: {e}")))?
        .to_rgba8();

    let mut pixmap = Pixmap::new(rgba.width(), rgba.height())
        .ok_or_else(|| Error::Render("empty embedded image".to_string()))?;
    for (dst, px) in pixmap.pixels_mut().iter_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = px.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::icons::png_data_uri;
    use crate::layout::GridLayout;
    use crate::model::{CardList, CardRecord};
    use crate::mutator::{LayoutOverride, PrintChrome};
    use face::{HEADER, HEADER_SAMPLE_MM, ICON_CENTER_MM, REMOVE, REMOVE_SAMPLE_MM, nominal_to_px};

    fn cards(count: usize) -> Surface {
        let mut list = CardList::new();
        for i in 0..count {
            list.push(CardRecord::new(
                &format!("t{i}"),
                format!("Test Set {i}"),
                "2021-02-05",
                format!("https://svgs.example/t{i}.svg"),
                "expansion",
                250,
            ))
            .unwrap();
        }
        Surface::from_cards(&list)
    }

    fn renderer(scale: f32) -> RasterRenderer {
        RasterRenderer::new(&SnapshotConfig {
            scale,
            ..SnapshotConfig::default()
        })
        .unwrap()
    }

    fn red_png_uri() -> String {
        let img = RgbImage::from_pixel(8, 8, Rgb([255, 0, 0]));
        let mut png = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        png_data_uri(&png)
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn sample(snapshot: &RasterSnapshot, card: usize, point: (f32, f32)) -> [u8; 3] {
        let columns = 3;
        let face = CardFace {
            record: CardRecord::new("x", "", "", "", "", 0),
            x_mm: (card % columns) as f32 * 63.0,
            y_mm: (card / columns) as f32 * 99.0,
            width_mm: 63.0,
            height_mm: 99.0,
            icon: None,
            remove_visible: false,
            cut_guides_visible: false,
        };
        let px_per_mm = mm_to_px(1.0, snapshot.scale) as f32;
        let (x, y) = nominal_to_px(&face, px_per_mm, point);
        snapshot.image.get_pixel(x, y).0
    }

    fn close(actual: [u8; 3], expected: [u8; 3]) -> bool {
        actual
            .iter()
            .zip(expected)
            .all(|(a, e)| a.abs_diff(e) <= 8)
    }

    #[tokio::test]
    async fn test_refuses_responsive_surface() {
        let surface = cards(2);
        let err = renderer(1.0).capture(&surface).await.unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[tokio::test]
    async fn test_pixel_size_at_print_scale() {
        let mut surface = cards(4);
        let layout = GridLayout::compute(4, &GridConfig::default());
        let guard = LayoutOverride::apply(&mut surface, &layout).unwrap();

        let snapshot = renderer(4.0).capture(&guard).await.unwrap();
        assert_eq!(snapshot.pixel_width(), 2857);
        assert_eq!(snapshot.pixel_height(), 2993);
        // the second row holds one card; the rest of it is background
        let corner = (snapshot.pixel_width() - 1, snapshot.pixel_height() - 1);
        assert_eq!(*snapshot.image.get_pixel(corner.0, corner.1), BACKGROUND);
    }

    #[tokio::test]
    async fn test_chrome_painted_only_when_visible() {
        let mut surface = cards(2);
        let layout = GridLayout::compute(2, &GridConfig::default());
        let mut guard = LayoutOverride::apply(&mut surface, &layout).unwrap();

        let shown = renderer(1.0).capture(&guard).await.unwrap();
        assert!(close(sample(&shown, 1, REMOVE_SAMPLE_MM), REMOVE));
        assert!(close(sample(&shown, 1, HEADER_SAMPLE_MM), HEADER));

        let chrome = PrintChrome::hide(&mut guard);
        let hidden = renderer(1.0).capture(&chrome).await.unwrap();
        assert!(!close(sample(&hidden, 1, REMOVE_SAMPLE_MM), REMOVE));
    }

    #[tokio::test]
    async fn test_only_inline_icons_are_painted() {
        let mut surface = cards(3);
        surface.cards_mut()[0].icon.src = red_png_uri();
        surface.cards_mut()[2].icon.src = "data:image/png;base64,!!!".to_string();
        let layout = GridLayout::compute(3, &GridConfig::default());
        let guard = LayoutOverride::apply(&mut surface, &layout).unwrap();

        let snapshot = renderer(1.0).capture(&guard).await.unwrap();
        assert!(close(sample(&snapshot, 0, ICON_CENTER_MM), [255, 0, 0]));
        // remote reference: never fetched
        assert!(close(sample(&snapshot, 1, ICON_CENTER_MM), [255, 255, 255]));
        // undecodable: skipped, capture still succeeds
        assert!(close(sample(&snapshot, 2, ICON_CENTER_MM), [255, 255, 255]));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn ink_in_area(snapshot: &RasterSnapshot, x_mm: (f64, f64), y_mm: (f64, f64)) -> usize {
        let px = |mm: f64| mm_to_px(mm, snapshot.scale).round() as u32;
        let mut ink = 0;
        for y in px(y_mm.0)..px(y_mm.1) {
            for x in px(x_mm.0)..px(x_mm.1) {
                if *snapshot.image.get_pixel(x, y) != BACKGROUND {
                    ink += 1;
                }
            }
        }
        ink
    }

    #[tokio::test]
    async fn test_default_config_paints_card_text() {
        let mut list = CardList::new();
        list.push(CardRecord::new(
            "mh3",
            "Modern Horizons 3",
            "2024-06-14",
            "https://svgs.example/mh3.svg",
            "draft_innovation",
            303,
        ))
        .unwrap();
        let mut surface = Surface::from_cards(&list);
        let layout = GridLayout::compute(1, &GridConfig::default());
        let guard = LayoutOverride::apply(&mut surface, &layout).unwrap();

        let renderer = RasterRenderer::new(&SnapshotConfig::default()).unwrap();
        let snapshot = renderer.capture(&guard).await.unwrap();

        // name and detail lines below the icon
        assert!(ink_in_area(&snapshot, (6.0, 57.0), (50.0, 90.0)) > 100);
    }

    #[test]
    fn test_unreadable_font_path_is_rejected() {
        let missing = SnapshotConfig {
            font_path: Some("/nonexistent/card.ttf".into()),
            ..SnapshotConfig::default()
        };
        assert!(matches!(
            RasterRenderer::new(&missing),
            Err(Error::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn test_card_frames_follow_geometry() {
        let geometry = FixedGeometry {
            width_mm: 131.0,
            height_mm: 203.0,
            columns: 2,
            track_width_mm: 63.0,
            gap_mm: 5.0,
        };
        let frames = card_frames(&geometry, 3);
        assert_eq!(frames.len(), 3);
        assert!((frames[1].0 - 68.0).abs() < 1e-4);
        assert!((frames[2].1 - 104.0).abs() < 1e-4);
        assert!((frames[2].3 - 99.0).abs() < 1e-4);
    }

    #[test]
    fn test_decode_rejects_non_base64_uri() {
        assert!(decode_data_uri("data:image/svg+xml,<svg/>").is_err());
        assert!(decode_data_uri("https://svgs.example/a.svg").is_err());
    }
}
