//! PDF assembly from a paginated snapshot.
//!
//! The snapshot is embedded once as an image XObject and every page draws
//! it at its band offset. PDF user space has a bottom-left origin, so a
//! placement offset measured down from the page top becomes:
//!
//! ```text
//! y_pt = page_height_pt - (offset_mm + image_height_mm) * MM_TO_PT
//! ```

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use tracing::debug;

use crate::error::{Error, Result};
use crate::paginate::PagePlan;
use crate::snapshot::RasterSnapshot;
use crate::util::mm_to_pt;

/// Resource name of the snapshot image on every page.
const IMAGE_NAME: &str = "Im0";

/// Producer recorded in the document info dictionary.
const PRODUCER: &str = concat!("divider-cards ", env!("CARGO_PKG_VERSION"));

#[allow(clippy::cast_possible_truncation)]
fn pt(mm: f64) -> f32 {
    mm_to_pt(mm) as f32
}

/// Serialize the snapshot into a PDF laid out according to `plan`.
pub fn assemble_pdf(snapshot: &RasterSnapshot, plan: &PagePlan, title: &str) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(snapshot.pixel_width()),
            "Height" => i64::from(snapshot.pixel_height()),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        snapshot.image.as_raw().clone(),
    );
    let image_id = doc.add_object(image);
    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! { IMAGE_NAME => image_id },
    });

    let page_width = pt(plan.page.width_mm);
    let page_height = pt(plan.page.height_mm);
    let image_width = pt(plan.image_width_mm);
    let image_height = pt(plan.image_height_mm);

    let mut kids = Vec::with_capacity(plan.bands.len());
    for band in &plan.bands {
        let y = page_height - pt(band.placement_offset_mm + plan.image_height_mm);
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        image_width.into(),
                        0.0_f32.into(),
                        0.0_f32.into(),
                        image_height.into(),
                        0.0_f32.into(),
                        y.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|e| Error::Assembly(format!("failed to encode page content: {e}")))?;
        let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.0_f32.into(), 0.0_f32.into(), page_width.into(), page_height.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(Object::Reference(page_id));
        debug!(
            "Page {} places image at y={:.2}pt (band {:.2}mm..{:.2}mm)",
            band.page_index + 1,
            y,
            band.visible_offset_mm,
            band.visible_offset_mm + band.height_mm
        );
    }

    let page_count = i64::try_from(kids.len())
        .map_err(|_| Error::Assembly("too many pages".to_string()))?;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
        "Producer" => Object::string_literal(PRODUCER),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    doc.compress();

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| Error::Assembly(format!("failed to save PDF: {e}")))?;

    Ok(output)
}
