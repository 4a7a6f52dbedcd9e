//! Movie composition controller.

use std::sync::Arc;

use cinegrid_core::{MovieDetails, RECORD_TYPE_MOVIE};
use tracing::{debug, warn};

use crate::error::{MovieError, MovieResult};
use crate::gateway::{MetadataGateway, RatingGateway};

/// Merges a movie's metadata with its aggregated rating.
pub struct MovieController {
    metadata: Arc<dyn MetadataGateway>,
    ratings: Arc<dyn RatingGateway>,
}

impl MovieController {
    pub fn new(metadata: Arc<dyn MetadataGateway>, ratings: Arc<dyn RatingGateway>) -> Self {
        Self { metadata, ratings }
    }

    /// Compose the details of one movie.
    ///
    /// Metadata is fetched first; if it is missing the rating service is not
    /// called. A movie without ratings is reported as `NotFound`.
    pub async fn get(&self, id: &str) -> MovieResult<MovieDetails> {
        if id.is_empty() {
            return Err(MovieError::InvalidInput("empty id".to_string()));
        }

        let metadata = self.metadata.get(id).await.inspect_err(|e| {
            if !matches!(e, MovieError::NotFound(_)) {
                warn!(%id, error = %e, "metadata lookup failed");
            }
        })?;

        let rating = self
            .ratings
            .get_aggregated_rating(id, RECORD_TYPE_MOVIE)
            .await
            .inspect_err(|e| {
                if !matches!(e, MovieError::NotFound(_)) {
                    warn!(%id, error = %e, "rating lookup failed");
                }
            })?;

        debug!(%id, rating, "composed movie details");
        Ok(MovieDetails {
            metadata,
            rating: Some(rating),
        })
    }
}
