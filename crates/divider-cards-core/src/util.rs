//! Utility functions shared across the crate.

use std::path::PathBuf;

/// CSS reference resolution used when sizing rasters.
pub const CSS_PX_PER_INCH: f64 = 96.0;

/// Millimeters per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// PDF user-space points per inch.
pub const PT_PER_INCH: f64 = 72.0;

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Convert millimeters to PDF points.
pub fn mm_to_pt(mm: f64) -> f64 {
    mm * PT_PER_INCH / MM_PER_INCH
}

/// Convert millimeters to device pixels at the given CSS scale factor.
pub fn mm_to_px(mm: f64, scale: f32) -> f64 {
    mm * CSS_PX_PER_INCH / MM_PER_INCH * f64::from(scale)
}

/// Convert a non-negative pixel extent to u32, clamping to at least one pixel.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn px_extent(value: f64) -> u32 {
    if value.is_nan() || value < 1.0 {
        1
    } else if value > f64::from(u32::MAX) {
        u32::MAX
    } else {
        value.round() as u32
    }
}

/// Format a millimeter length for CSS (`63mm`, `40.5mm`).
pub fn css_mm(mm: f64) -> String {
    format!("{mm}mm")
}
