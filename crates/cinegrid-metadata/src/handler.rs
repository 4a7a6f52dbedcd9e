//! HTTP handlers for the metadata service.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use cinegrid_core::{ApiResponse, Metadata};
use serde::Deserialize;
use tracing::warn;

use crate::controller::MetadataController;
use crate::error::MetadataError;

/// Shared state for metadata handlers.
#[derive(Clone)]
pub struct MetadataState {
    pub controller: Arc<MetadataController>,
}

#[derive(Deserialize)]
pub struct IdQuery {
    #[serde(default)]
    pub id: String,
}

/// Build the metadata service router.
pub fn build_router(controller: Arc<MetadataController>) -> Router {
    Router::new()
        .route("/metadata", get(get_metadata).put(put_metadata))
        .route("/live", get(|| async { StatusCode::OK }))
        .route("/ready", get(|| async { StatusCode::OK }))
        .with_state(MetadataState { controller })
}

fn error_response(err: &MetadataError) -> Response {
    let status = match err {
        MetadataError::NotFound(_) => StatusCode::NOT_FOUND,
        MetadataError::InvalidInput(_) => StatusCode::BAD_REQUEST,
    };
    (status, Json(ApiResponse::<()>::error(err.to_string()))).into_response()
}

/// GET /metadata?id=
pub async fn get_metadata(
    State(state): State<MetadataState>,
    Query(query): Query<IdQuery>,
) -> Response {
    match state.controller.get(&query.id).await {
        Ok(metadata) => Json(ApiResponse::ok(metadata)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// PUT /metadata
pub async fn put_metadata(
    State(state): State<MetadataState>,
    Json(metadata): Json<Metadata>,
) -> Response {
    match state.controller.put(metadata).await {
        Ok(()) => Json(ApiResponse::ok("stored")).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to put metadata");
            error_response(&e)
        }
    }
}
