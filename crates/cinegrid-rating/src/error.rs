//! Rating service error types.

use thiserror::Error;

pub type RatingResult<T> = Result<T, RatingError>;

#[derive(Debug, Error)]
pub enum RatingError {
    #[error("no ratings for {record_type}/{record_id}")]
    NotFound {
        record_type: String,
        record_id: String,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("ingestion failed: {0}")]
    Ingest(String),
}
