//! Askama templates for the card grid.
//!
//! ## Template Structure
//!
//! - `base.html` - Common layout with CSS/JS
//! - `index.html` - On-screen grid with remove buttons and the export form
//! - `print.html` - The same grid, opening the browser's print dialog on load
//! - `partials/grid.html` - The grid itself, also returned as an HTMX fragment

use askama::Template;
use askama_web::WebTemplate;
use divider_cards_core::surface::CardNode;
use divider_cards_core::{SortOrder, Surface};

/// One card as rendered into HTML.
pub struct CardView {
    pub code: String,
    pub name: String,
    pub header_date: String,
    pub full_date: String,
    pub set_type: String,
    pub card_count: u32,
    /// Empty when the set has no block
    pub block: String,
    pub icon_src: String,
    pub wrapper_class: String,
    pub card_class: String,
    pub remove_visible: bool,
}

impl From<&CardNode> for CardView {
    fn from(card: &CardNode) -> Self {
        Self {
            code: card.record.code.clone(),
            name: card.record.name.clone(),
            header_date: card.record.header_date(),
            full_date: card.record.full_date(),
            set_type: card.record.set_type_label(),
            card_count: card.record.card_count,
            block: card.record.block.clone().unwrap_or_default(),
            icon_src: card.icon.src.clone(),
            wrapper_class: card.wrapper_class_attr(),
            card_class: card.card_class_attr(),
            remove_visible: card.remove_visible,
        }
    }
}

/// One entry of the sort selector.
pub struct SortOptionView {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

impl SortOptionView {
    pub fn all(current: SortOrder) -> Vec<Self> {
        SortOrder::ALL
            .into_iter()
            .map(|order| Self {
                value: order.as_str(),
                label: order.label(),
                selected: order == current,
            })
            .collect()
    }
}

/// Surface state shared by every grid-rendering template.
pub struct GridView {
    /// Inline style of the root container
    pub root_style: String,
    pub has_grid: bool,
    /// Inline style of the grid container
    pub grid_style: String,
    pub cards: Vec<CardView>,
    /// Render remove buttons
    pub interactive: bool,
}

impl From<&Surface> for GridView {
    fn from(surface: &Surface) -> Self {
        Self {
            root_style: surface.style.to_css(),
            has_grid: surface.grid.is_some(),
            grid_style: surface
                .grid
                .as_ref()
                .map(|g| g.style.to_css())
                .unwrap_or_default(),
            cards: surface.cards().iter().map(CardView::from).collect(),
            interactive: true,
        }
    }
}

impl GridView {
    /// Grid for the print view, without interactive controls.
    pub fn print(surface: &Surface) -> Self {
        Self {
            interactive: false,
            ..Self::from(surface)
        }
    }
}

// =============================================================================
// Full Page Templates
// =============================================================================

/// On-screen grid page.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub grid: GridView,
    pub default_filename: String,
    pub exporting: bool,
    pub sort_options: Vec<SortOptionView>,
}

/// Print view: the unmodified grid with `window.print()` on load.
#[derive(Template, WebTemplate)]
#[template(path = "print.html")]
pub struct PrintTemplate {
    pub grid: GridView,
}

// =============================================================================
// Fragment Templates (HTMX partial responses)
// =============================================================================

/// Grid fragment swapped in after a card is removed.
#[derive(Template, WebTemplate)]
#[template(path = "partials/grid_fragment.html")]
pub struct GridFragmentTemplate {
    pub grid: GridView,
}
