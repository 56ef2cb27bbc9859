//! Splitting one tall snapshot across fixed-size pages.
//!
//! Every page places the whole image, shifted up by the height of the pages
//! before it; the page boundary clips it to a sliding window.

/// Slack below which a leftover sliver is treated as float noise.
const EPSILON_MM: f64 = 1e-6;

/// Physical page size of the output document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PageSize {
    /// A4 portrait, the only output format
    pub const A4: Self = Self {
        width_mm: 210.0,
        height_mm: 297.0,
    };
}

/// One page's placement of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBand {
    pub page_index: usize,
    /// Vertical position of the image top relative to the page top. Zero on
    /// the first page, negative after.
    pub placement_offset_mm: f64,
    /// Offset of the visible window from the image top.
    pub visible_offset_mm: f64,
    /// Height of the visible window on this page.
    pub height_mm: f64,
}

/// Page placements for one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    pub page: PageSize,
    pub image_width_mm: f64,
    pub image_height_mm: f64,
    /// Uniform downscale applied to fit the page width; 1.0 when it fits.
    pub scale: f64,
    pub bands: Vec<PageBand>,
}

impl PagePlan {
    pub fn page_count(&self) -> usize {
        self.bands.len()
    }
}

/// Plan the A4 pages for an image of `width_mm` x `height_mm`.
pub fn paginate(width_mm: f64, height_mm: f64) -> PagePlan {
    let page = PageSize::A4;
    let scale = if width_mm > page.width_mm {
        page.width_mm / width_mm
    } else {
        1.0
    };
    let image_width_mm = width_mm * scale;
    let image_height_mm = height_mm * scale;

    let mut bands = vec![PageBand {
        page_index: 0,
        placement_offset_mm: 0.0,
        visible_offset_mm: 0.0,
        height_mm: image_height_mm.min(page.height_mm),
    }];

    let mut remaining = image_height_mm - page.height_mm;
    while remaining > EPSILON_MM {
        let placement_offset_mm = remaining - image_height_mm;
        bands.push(PageBand {
            page_index: bands.len(),
            placement_offset_mm,
            visible_offset_mm: -placement_offset_mm,
            height_mm: remaining.min(page.height_mm),
        });
        remaining -= page.height_mm;
    }

    PagePlan {
        page,
        image_width_mm,
        image_height_mm,
        scale,
        bands,
    }
}
