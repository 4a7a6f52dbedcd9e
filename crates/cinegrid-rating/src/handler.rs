//! HTTP handlers for the rating service.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use cinegrid_core::{ApiResponse, Rating, RatingValue};
use serde::Deserialize;
use tracing::warn;

use crate::controller::RatingController;
use crate::error::RatingError;

/// Shared state for rating handlers.
#[derive(Clone)]
pub struct RatingState {
    pub controller: Arc<RatingController>,
}

#[derive(Deserialize)]
pub struct RecordQuery {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "type")]
    pub record_type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutRatingQuery {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub value: String,
}

/// Build the rating service router.
pub fn build_router(controller: Arc<RatingController>) -> Router {
    Router::new()
        .route("/rating", get(get_aggregate_rating).put(put_rating))
        .route("/live", get(|| async { StatusCode::OK }))
        .route("/ready", get(|| async { StatusCode::OK }))
        .with_state(RatingState { controller })
}

fn error_response(err: &RatingError) -> Response {
    let status = match err {
        RatingError::NotFound { .. } => StatusCode::NOT_FOUND,
        RatingError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        RatingError::Ingest(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiResponse::<()>::error(err.to_string()))).into_response()
}

/// GET /rating?id=&type=
pub async fn get_aggregate_rating(
    State(state): State<RatingState>,
    Query(query): Query<RecordQuery>,
) -> Response {
    match state
        .controller
        .get_aggregate_rating(&query.id, &query.record_type)
        .await
    {
        Ok(rating) => Json(ApiResponse::ok(rating)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// PUT /rating?id=&type=&userId=&value=
pub async fn put_rating(
    State(state): State<RatingState>,
    Query(query): Query<PutRatingQuery>,
) -> Response {
    let value = match parse_value(&query.value) {
        Some(v) => v,
        None => {
            let err = RatingError::InvalidInput(format!("invalid rating value: {:?}", query.value));
            return error_response(&err);
        }
    };
    let rating = Rating::new(query.id.clone(), query.user_id, value);

    match state
        .controller
        .put_rating(&query.id, &query.record_type, rating)
        .await
    {
        Ok(()) => Json(ApiResponse::ok("stored")).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to put rating");
            error_response(&e)
        }
    }
}

/// Accepts integral values, including float spellings like `4.0`.
fn parse_value(raw: &str) -> Option<RatingValue> {
    let v: f64 = raw.trim().parse().ok()?;
    if !v.is_finite()
        || v.fract() != 0.0
        || v < f64::from(RatingValue::MIN)
        || v > f64::from(RatingValue::MAX)
    {
        return None;
    }
    Some(v as RatingValue)
}
