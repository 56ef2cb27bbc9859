use base64::Engine;
use resvg::usvg;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};

/// Result of a bounded rasterization attempt.
#[derive(Debug)]
pub enum RasterOutcome {
    Ready(Vec<u8>),
    DecodeFailed(String),
    TimedOut,
}

/// Render SVG bytes into a `size`x`size` PNG on a white background, scaled
/// to fit with aspect ratio preserved and centered on both axes.
#[allow(clippy::cast_precision_loss)]
pub fn rasterize_svg(svg: &[u8], size: u32) -> Result<Vec<u8>> {
    let tree = usvg::Tree::from_data(svg, &usvg::Options::default())
        .map_err(|e| Error::IconDecode(e.to_string()))?;

    let mut pixmap = tiny_skia::Pixmap::new(size, size)
        .ok_or_else(|| Error::IconDecode(format!("invalid raster size {size}")))?;
    pixmap.fill(tiny_skia::Color::WHITE);

    let natural = tree.size();
    let edge = size as f32;
    let scale = (edge / natural.width()).min(edge / natural.height());
    let dx = natural.width().mul_add(-scale, edge) / 2.0;
    let dy = natural.height().mul_add(-scale, edge) / 2.0;

    let transform = tiny_skia::Transform::from_row(scale, 0.0, 0.0, scale, dx, dy);
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|e| Error::IconDecode(e.to_string()))
}

pub fn png_data_uri(png: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    )
}

/// Run a blocking rasterization with a deadline.
///
/// On timeout the blocking task is detached; its result is discarded.
pub async fn rasterize_with_timeout<F>(job: F, timeout: Duration) -> RasterOutcome
where
    F: FnOnce() -> Result<Vec<u8>> + Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(job)).await {
        Ok(Ok(Ok(png))) => RasterOutcome::Ready(png),
        Ok(Ok(Err(e))) => RasterOutcome::DecodeFailed(e.to_string()),
        Ok(Err(join)) => RasterOutcome::DecodeFailed(join.to_string()),
        Err(_) => {
            debug!("Rasterization exceeded {:?}", timeout);
            RasterOutcome::TimedOut
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const WIDE_BLUE_SVG: &[u8] = br##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 40 10"><rect width="40" height="10" fill="#0000ff"/></svg>"##;

    #[test]
    fn test_wide_icon_is_letterboxed() {
        let png = rasterize_svg(WIDE_BLUE_SVG, 64).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgba8();

        assert_eq!(img.dimensions(), (64, 64));
        // 40x10 scales to 64x16, rows 24..40 are painted
        assert_eq!(img.get_pixel(32, 4).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(32, 32).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_invalid_svg_is_decode_error() {
        assert!(matches!(
            rasterize_svg(b"not an svg", 64),
            Err(Error::IconDecode(_))
        ));
    }

    #[test]
    fn test_data_uri_prefix() {
        assert_eq!(png_data_uri(&[1, 2, 3]), "data:image/png;base64,AQID");
    }

    #[tokio::test]
    async fn test_slow_job_times_out() {
        let outcome = rasterize_with_timeout(
            || {
                std::thread::sleep(Duration::from_millis(500));
                Ok(Vec::new())
            },
            Duration::from_millis(20),
        )
        .await;
        assert!(matches!(outcome, RasterOutcome::TimedOut));
    }

    #[tokio::test]
    async fn test_failed_job_reports_reason() {
        let outcome =
            rasterize_with_timeout(|| Err(Error::IconDecode("bad".into())), Duration::from_secs(1))
                .await;
        assert!(matches!(outcome, RasterOutcome::DecodeFailed(r) if r.contains("bad")));
    }
}
