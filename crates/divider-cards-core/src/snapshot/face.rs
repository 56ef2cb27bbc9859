//! Painting a single divider card face.
//!
//! Everything is laid out on a nominal 63 x 99 mm card and scaled to the
//! captured track size, so non-default card sizes keep their proportions.

use tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, StrokeDash, Transform,
};

use super::text::{Align, FontFace};
use crate::model::CardRecord;

const NOMINAL_WIDTH_MM: f32 = 63.0;
const NOMINAL_HEIGHT_MM: f32 = 99.0;
const MARGIN_MM: f32 = 3.0;

const BORDER_MM: f32 = 0.3;
const HEADER_HEIGHT_MM: f32 = 11.0;
const HEADER_TEXT_MM: f32 = 5.0;
const ICON_TOP_MM: f32 = 16.0;
const ICON_SIZE_MM: f32 = 30.0;
const NAME_BASELINE_MM: f32 = 57.0;
const NAME_TEXT_MM: f32 = 4.2;
const DETAIL_BASELINE_MM: f32 = 65.0;
const DETAIL_STEP_MM: f32 = 6.0;
const DETAIL_TEXT_MM: f32 = 3.2;

const REMOVE_RADIUS_MM: f32 = 2.5;

const WHITE: [u8; 3] = [255, 255, 255];
const INK: [u8; 3] = [31, 41, 51];
pub(super) const HEADER: [u8; 3] = [31, 41, 51];
const MUTED: [u8; 3] = [82, 96, 109];
const BORDER: [u8; 3] = [51, 51, 51];
const CUT_GUIDE: [u8; 3] = [154, 165, 177];
pub(super) const REMOVE: [u8; 3] = [214, 69, 69];

/// Everything needed to paint one card, detached from the surface.
pub struct CardFace {
    pub record: CardRecord,
    pub x_mm: f32,
    pub y_mm: f32,
    pub width_mm: f32,
    pub height_mm: f32,
    pub icon: Option<Pixmap>,
    pub remove_visible: bool,
    pub cut_guides_visible: bool,
}

fn paint([r, g, b]: [u8; 3]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(Color::from_rgba8(r, g, b, 255));
    paint.anti_alias = true;
    paint
}

/// Paint `face` onto `pixmap`. `base` maps millimeters to pixels.
pub fn paint_card(pixmap: &mut Pixmap, base: Transform, face: &CardFace, font: &FontFace) {
    let t = base.pre_translate(face.x_mm, face.y_mm).pre_scale(
        face.width_mm / NOMINAL_WIDTH_MM,
        face.height_mm / NOMINAL_HEIGHT_MM,
    );

    if let Some(card) = Rect::from_xywh(0.0, 0.0, NOMINAL_WIDTH_MM, NOMINAL_HEIGHT_MM) {
        pixmap.fill_rect(card, &paint(WHITE), t, None);
        let outline = PathBuilder::from_rect(card);
        let stroke = Stroke {
            width: BORDER_MM,
            ..Stroke::default()
        };
        pixmap.stroke_path(&outline, &paint(BORDER), &stroke, t, None);
    }

    if let Some(header) = Rect::from_xywh(0.0, 0.0, NOMINAL_WIDTH_MM, HEADER_HEIGHT_MM) {
        pixmap.fill_rect(header, &paint(HEADER), t, None);
    }

    if let Some(ref icon) = face.icon {
        paint_icon(pixmap, t, icon);
    }

    paint_text(pixmap, t, &face.record, font);

    if face.cut_guides_visible {
        paint_cut_guides(pixmap, t);
    }
    if face.remove_visible {
        paint_remove_affordance(pixmap, t);
    }
}

#[allow(clippy::cast_precision_loss)]
fn paint_icon(pixmap: &mut Pixmap, t: Transform, icon: &Pixmap) {
    let (w, h) = (icon.width() as f32, icon.height() as f32);
    let fit = (ICON_SIZE_MM / w).min(ICON_SIZE_MM / h);
    let dx = (NOMINAL_WIDTH_MM - w * fit) / 2.0;
    let dy = h.mul_add(-fit, ICON_SIZE_MM) / 2.0 + ICON_TOP_MM;

    let placed = t.pre_translate(dx, dy).pre_scale(fit, fit);
    let paint = PixmapPaint {
        quality: tiny_skia::FilterQuality::Bicubic,
        ..PixmapPaint::default()
    };
    pixmap.draw_pixmap(0, 0, icon.as_ref(), &paint, placed, None);
}

fn paint_text(pixmap: &mut Pixmap, t: Transform, record: &CardRecord, font: &FontFace) {
    let inner = MARGIN_MM.mul_add(-2.0, NOMINAL_WIDTH_MM);
    let header_baseline = HEADER_HEIGHT_MM / 2.0 + HEADER_TEXT_MM * 0.35;
    let center = NOMINAL_WIDTH_MM / 2.0;

    let mut runs = vec![
        (
            record.code.clone(),
            MARGIN_MM,
            header_baseline,
            HEADER_TEXT_MM,
            inner / 2.0,
            Align::Left,
            WHITE,
        ),
        (
            record.header_date(),
            NOMINAL_WIDTH_MM - MARGIN_MM,
            header_baseline,
            HEADER_TEXT_MM * 0.8,
            inner / 2.0,
            Align::Right,
            WHITE,
        ),
        (
            record.name.clone(),
            center,
            NAME_BASELINE_MM,
            NAME_TEXT_MM,
            inner,
            Align::Center,
            INK,
        ),
    ];

    let details = [
        Some(record.set_type_label()),
        Some(record.full_date()),
        Some(format!("{} cards", record.card_count)),
        record.block.clone(),
    ];
    let mut baseline = DETAIL_BASELINE_MM;
    for detail in details.into_iter().flatten() {
        runs.push((detail, center, baseline, DETAIL_TEXT_MM, inner, Align::Center, MUTED));
        baseline += DETAIL_STEP_MM;
    }

    for (text, x, y, size, max_width, align, color) in runs {
        if let Some(path) = font.text_path(&text, x, y, size, max_width, align) {
            pixmap.fill_path(&path, &paint(color), FillRule::Winding, t, None);
        }
    }
}

fn paint_cut_guides(pixmap: &mut Pixmap, t: Transform) {
    let Some(card) = Rect::from_xywh(0.0, 0.0, NOMINAL_WIDTH_MM, NOMINAL_HEIGHT_MM) else {
        return;
    };
    let guides = PathBuilder::from_rect(card);
    let stroke = Stroke {
        width: 0.2,
        dash: StrokeDash::new(vec![1.5, 1.0], 0.0),
        ..Stroke::default()
    };
    pixmap.stroke_path(&guides, &paint(CUT_GUIDE), &stroke, t, None);
}

fn paint_remove_affordance(pixmap: &mut Pixmap, t: Transform) {
    let cx = NOMINAL_WIDTH_MM - MARGIN_MM - REMOVE_RADIUS_MM;
    let cy = HEADER_HEIGHT_MM / 2.0;

    if let Some(circle) = PathBuilder::from_circle(cx, cy, REMOVE_RADIUS_MM) {
        pixmap.fill_path(&circle, &paint(REMOVE), FillRule::Winding, t, None);
    }

    let arm = REMOVE_RADIUS_MM * 0.45;
    let mut cross = PathBuilder::new();
    cross.move_to(cx - arm, cy - arm);
    cross.line_to(cx + arm, cy + arm);
    cross.move_to(cx + arm, cy - arm);
    cross.line_to(cx - arm, cy + arm);
    if let Some(cross) = cross.finish() {
        let stroke = Stroke {
            width: 0.4,
            ..Stroke::default()
        };
        pixmap.stroke_path(&cross, &paint(WHITE), &stroke, t, None);
    }
}

/// Nominal-card point to pixel.
#[cfg(test)]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(super) fn nominal_to_px(face: &CardFace, px_per_mm: f32, (x, y): (f32, f32)) -> (u32, u32) {
    let px = x.mul_add(face.width_mm / NOMINAL_WIDTH_MM, face.x_mm) * px_per_mm;
    let py = y.mul_add(face.height_mm / NOMINAL_HEIGHT_MM, face.y_mm) * px_per_mm;
    (px.round() as u32, py.round() as u32)
}

#[cfg(test)]
#[allow(clippy::suboptimal_flops)]
pub(super) const REMOVE_SAMPLE_MM: (f32, f32) = (
    NOMINAL_WIDTH_MM - MARGIN_MM - REMOVE_RADIUS_MM,
    REMOVE_RADIUS_MM * 0.7 + HEADER_HEIGHT_MM / 2.0,
);

#[cfg(test)]
pub(super) const ICON_CENTER_MM: (f32, f32) =
    (NOMINAL_WIDTH_MM / 2.0, ICON_TOP_MM + ICON_SIZE_MM / 2.0);

#[cfg(test)]
pub(super) const HEADER_SAMPLE_MM: (f32, f32) = (NOMINAL_WIDTH_MM / 2.0, 1.0);
