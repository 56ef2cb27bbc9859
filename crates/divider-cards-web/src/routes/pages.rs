//! Page routes - full HTML page renders.

use axum::extract::State;
use std::sync::Arc;

use crate::state::AppState;
use crate::templates::{GridView, IndexTemplate, PrintTemplate, SortOptionView};

/// On-screen grid with remove buttons and the export form.
///
/// While an export runs this waits for it, so the page never shows the
/// temporary print geometry.
pub async fn index(State(state): State<Arc<AppState>>) -> IndexTemplate {
    let exporting = state.exporter.is_exporting();
    let surface = state.surface.snapshot().await;

    IndexTemplate {
        grid: GridView::from(&surface),
        default_filename: state.default_filename().to_string(),
        exporting,
        sort_options: SortOptionView::all(surface.sort_order()),
    }
}

/// Alternate output: the unmodified grid, printed by the browser.
pub async fn print_view(State(state): State<Arc<AppState>>) -> PrintTemplate {
    let surface = state.surface.snapshot().await;

    PrintTemplate {
        grid: GridView::print(&surface),
    }
}
