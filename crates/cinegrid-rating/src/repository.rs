//! Rating storage.

use std::collections::HashMap;

use async_trait::async_trait;
use cinegrid_core::{Rating, RecordId, RecordType};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{RatingError, RatingResult};

/// Append-only storage for ratings, keyed by record type and record id.
#[async_trait]
pub trait RatingRepository: Send + Sync {
    /// All ratings stored for a record, in insertion order.
    ///
    /// Fails with `NotFound` when the record has no ratings.
    async fn get(&self, record_id: &str, record_type: &str) -> RatingResult<Vec<Rating>>;

    /// Append a rating. Earlier ratings for the record are kept.
    async fn put(&self, record_id: &str, record_type: &str, rating: Rating) -> RatingResult<()>;
}

/// record type → record id → ratings.
type RatingsByRecord = HashMap<RecordType, HashMap<RecordId, Vec<Rating>>>;

/// In-memory rating repository.
#[derive(Default)]
pub struct MemoryRatingRepository {
    data: RwLock<RatingsByRecord>,
}

impl MemoryRatingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RatingRepository for MemoryRatingRepository {
    async fn get(&self, record_id: &str, record_type: &str) -> RatingResult<Vec<Rating>> {
        let data = self.data.read().await;
        match data.get(record_type).and_then(|records| records.get(record_id)) {
            Some(ratings) if !ratings.is_empty() => Ok(ratings.clone()),
            _ => Err(RatingError::NotFound {
                record_type: record_type.to_string(),
                record_id: record_id.to_string(),
            }),
        }
    }

    async fn put(&self, record_id: &str, record_type: &str, rating: Rating) -> RatingResult<()> {
        let mut data = self.data.write().await;
        let ratings = data
            .entry(record_type.to_string())
            .or_default()
            .entry(record_id.to_string())
            .or_default();
        ratings.push(rating);
        debug!(%record_type, %record_id, count = ratings.len(), "rating stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_unknown_record_is_not_found() {
        let repo = MemoryRatingRepository::new();
        let err = repo.get("m1", "movie").await.unwrap_err();
        assert!(matches!(err, RatingError::NotFound { .. }));
    }

    #[tokio::test]
    async fn put_appends_in_order() {
        let repo = MemoryRatingRepository::new();
        repo.put("m1", "movie", Rating::new("m1", "u1", 5)).await.unwrap();
        repo.put("m1", "movie", Rating::new("m1", "u1", 2)).await.unwrap();

        let ratings = repo.get("m1", "movie").await.unwrap();
        let values: Vec<i32> = ratings.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![5, 2]);
    }

    #[tokio::test]
    async fn record_types_are_isolated() {
        let repo = MemoryRatingRepository::new();
        repo.put("m1", "movie", Rating::new("m1", "u1", 5)).await.unwrap();
        assert!(repo.get("m1", "series").await.is_err());
    }
}
