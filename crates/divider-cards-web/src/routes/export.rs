//! Export route - PDF download of the whole grid.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{StatusCode, header},
    response::Response,
};
use std::sync::Arc;

use super::ExportQuery;
use crate::helpers::{CoreResultExt, ResultExt, RouteResult};
use crate::state::AppState;

/// Run the export pipeline and serve the result as an attachment.
pub async fn export_pdf(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExportQuery>,
) -> RouteResult<Response> {
    let document = state
        .exporter
        .export(&state.surface, query.filename.as_deref())
        .await
        .or_status()?;

    let download_name = document.filename.replace('"', "");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{download_name}\""),
        )
        .body(Body::from(document.bytes))
        .or_internal_error()
}
