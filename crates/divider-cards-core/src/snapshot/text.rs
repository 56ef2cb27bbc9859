//! Glyph outlines for card text, via ttf-parser.

use tiny_skia::{Path, PathBuilder};
use std::path::Path as FsPath;
use std::sync::{Arc, LazyLock};
use ttf_parser::{Face, GlyphId, OutlineBuilder};

use crate::error::{Error, Result};

/// Horizontal anchoring of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// DejaVu Sans Condensed, embedded at compile time.
/// Free license (Bitstream Vera derivative), see `assets/DejaVuSansCondensed.LICENSE`.
const DEJAVU_SANS_CONDENSED: &[u8] = include_bytes!("../../assets/DejaVuSansCondensed.ttf");

static EMBEDDED: LazyLock<Arc<Vec<u8>>> =
    LazyLock::new(|| Arc::new(DEJAVU_SANS_CONDENSED.to_vec()));

/// A validated TrueType/OpenType font, shared between captures.
#[derive(Clone)]
pub struct FontFace {
    data: Arc<Vec<u8>>,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl FontFace {
    /// The built-in card font, used unless `snapshot.font_path` is set.
    pub fn embedded() -> Self {
        Self {
            data: Arc::clone(&EMBEDDED),
        }
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Face::parse(&data, 0).map_err(|e| Error::ConfigInvalid {
            field: "snapshot.font_path".to_string(),
            reason: format!("not a usable font: {e}"),
        })?;
        Ok(Self {
            data: Arc::new(data),
        })
    }

    pub fn from_file(path: &FsPath) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| Error::ConfigInvalid {
            field: "snapshot.font_path".to_string(),
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::from_bytes(data)
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, 0).ok()
    }

    /// Advance width of `text` at `size` (same unit as `size`).
    pub fn measure(&self, text: &str, size: f32) -> f32 {
        let Some(face) = self.face() else {
            return 0.0;
        };
        let scale = size / f32::from(face.units_per_em());
        text.chars()
            .map(|c| advance(&face, glyph(&face, c)))
            .sum::<f32>()
            * scale
    }

    /// Outline `text` with its baseline at `(x, baseline)`, shrinking the
    /// size when the run is wider than `max_width`. Returns `None` for runs
    /// without visible glyphs.
    pub fn text_path(
        &self,
        text: &str,
        x: f32,
        baseline: f32,
        size: f32,
        max_width: f32,
        align: Align,
    ) -> Option<Path> {
        let face = self.face()?;

        let natural = self.measure(text, size);
        let size = if natural > max_width && natural > 0.0 {
            size * max_width / natural
        } else {
            size
        };
        let width = natural.min(max_width);
        let start = match align {
            Align::Left => x,
            Align::Center => x - width / 2.0,
            Align::Right => x - width,
        };

        let mut sink = GlyphSink {
            builder: PathBuilder::new(),
            scale: size / f32::from(face.units_per_em()),
            pen_x: start,
            baseline,
        };
        for c in text.chars() {
            let id = glyph(&face, c);
            face.outline_glyph(id, &mut sink);
            sink.pen_x += advance(&face, id) * sink.scale;
        }
        sink.builder.finish()
    }
}

fn glyph(face: &Face<'_>, c: char) -> GlyphId {
    face.glyph_index(c).unwrap_or(GlyphId(0))
}

fn advance(face: &Face<'_>, id: GlyphId) -> f32 {
    f32::from(face.glyph_hor_advance(id).unwrap_or(0))
}

/// Collects glyph outlines into one path, flipping font units (y up) into
/// surface space (y down).
struct GlyphSink {
    builder: PathBuilder,
    scale: f32,
    pen_x: f32,
    baseline: f32,
}

impl GlyphSink {
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (x.mul_add(self.scale, self.pen_x), y.mul_add(-self.scale, self.baseline))
    }
}

impl OutlineBuilder for GlyphSink {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
