//! HTTP route handlers for the divider cards web application.
//!
//! Page routes render the live surface with Askama templates; the remove
//! route returns an HTMX grid fragment and the export route a PDF download.

mod cards;
mod export;
mod pages;

pub use cards::{remove_card, sort_cards};
pub use export::export_pdf;
pub use pages::{index, print_view};

use divider_cards_core::SortOrder;
use serde::Deserialize;

/// Query params for the export download.
#[derive(Deserialize, Default)]
pub struct ExportQuery {
    /// Requested download name; `.pdf` is appended when missing
    #[serde(default)]
    pub filename: Option<String>,
}

/// Form body for reordering the grid.
#[derive(Deserialize)]
pub struct SortForm {
    pub order: SortOrder,
}
