//! HTTP handlers for the movie service.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use cinegrid_core::ApiResponse;
use serde::Deserialize;
use tracing::warn;

use crate::controller::MovieController;
use crate::error::MovieError;

/// Shared state for movie handlers.
#[derive(Clone)]
pub struct MovieState {
    pub controller: Arc<MovieController>,
}

#[derive(Deserialize)]
pub struct IdQuery {
    #[serde(default)]
    pub id: String,
}

/// Build the movie service router.
pub fn build_router(controller: Arc<MovieController>) -> Router {
    Router::new()
        .route("/movie", get(get_movie))
        .route("/live", get(|| async { StatusCode::OK }))
        .route("/ready", get(|| async { StatusCode::OK }))
        .with_state(MovieState { controller })
}

/// HTTP status for each error kind.
pub fn status_for(err: &MovieError) -> StatusCode {
    match err {
        MovieError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        MovieError::NotFound(_) => StatusCode::NOT_FOUND,
        MovieError::UpstreamUnavailable(_) | MovieError::BackendUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        MovieError::UpstreamError { .. } | MovieError::Decode { .. } => StatusCode::BAD_GATEWAY,
    }
}

/// GET /movie?id=
pub async fn get_movie(
    State(state): State<MovieState>,
    Query(query): Query<IdQuery>,
) -> Response {
    match state.controller.get(&query.id).await {
        Ok(details) => Json(ApiResponse::ok(details)).into_response(),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                warn!(id = %query.id, error = %e, "movie composition failed");
            }
            (status, Json(ApiResponse::<()>::error(e.to_string()))).into_response()
        }
    }
}
