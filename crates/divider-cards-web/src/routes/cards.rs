//! Card routes - mutations of the live grid.

use axum::{
    Form,
    extract::{Path, State},
};
use std::sync::Arc;
use tracing::info;

use super::SortForm;
use crate::helpers::{CoreResultExt, OptionExt, RouteResult};
use crate::state::AppState;
use crate::templates::{GridFragmentTemplate, GridView};

/// Remove a card from the grid and return the refreshed grid fragment.
///
/// Fails with 409 Conflict while an export owns the surface.
pub async fn remove_card(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> RouteResult<GridFragmentTemplate> {
    let removed = state
        .surface
        .try_remove_card(&code)
        .or_status()?
        .or_not_found("Card set not in the grid")?;
    info!("Removed card set {} ({})", removed.code, removed.name);

    let surface = state.surface.snapshot().await;
    Ok(GridFragmentTemplate {
        grid: GridView::from(&surface),
    })
}

/// Reorder the grid and return the refreshed grid fragment.
///
/// The order also decides the card order on the exported sheet, so it is
/// rejected with 409 Conflict while an export owns the surface.
pub async fn sort_cards(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SortForm>,
) -> RouteResult<GridFragmentTemplate> {
    state.surface.try_sort_cards(form.order).or_status()?;
    info!("Grid sorted by {}", form.order);

    let surface = state.surface.snapshot().await;
    Ok(GridFragmentTemplate {
        grid: GridView::from(&surface),
    })
}
