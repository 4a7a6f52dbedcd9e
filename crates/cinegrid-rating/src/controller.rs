//! Rating aggregation controller.

use std::sync::Arc;

use cinegrid_core::Rating;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{RatingError, RatingResult};
use crate::ingester::RateIngester;
use crate::repository::RatingRepository;

/// Computes aggregate ratings and stores new ones.
pub struct RatingController {
    repo: Arc<dyn RatingRepository>,
    ingester: Option<Arc<dyn RateIngester>>,
}

impl RatingController {
    pub fn new(repo: Arc<dyn RatingRepository>) -> Self {
        Self {
            repo,
            ingester: None,
        }
    }

    /// Attach an event source consumed by [`RatingController::start_ingestion`].
    pub fn with_ingester(mut self, ingester: Arc<dyn RateIngester>) -> Self {
        self.ingester = Some(ingester);
        self
    }

    /// Arithmetic mean of every rating stored for the record.
    pub async fn get_aggregate_rating(
        &self,
        record_id: &str,
        record_type: &str,
    ) -> RatingResult<f64> {
        validate_key(record_id, record_type)?;
        let ratings = self.repo.get(record_id, record_type).await?;
        if ratings.is_empty() {
            return Err(RatingError::NotFound {
                record_type: record_type.to_string(),
                record_id: record_id.to_string(),
            });
        }

        let sum: f64 = ratings.iter().map(|r| f64::from(r.value)).sum();
        let mean = sum / ratings.len() as f64;
        debug!(%record_type, %record_id, count = ratings.len(), mean, "aggregated rating");
        Ok(mean)
    }

    /// Append a rating for the record.
    pub async fn put_rating(
        &self,
        record_id: &str,
        record_type: &str,
        rating: Rating,
    ) -> RatingResult<()> {
        validate_key(record_id, record_type)?;
        self.repo.put(record_id, record_type, rating).await
    }

    /// Store every event from the configured ingester until the stream ends
    /// or `shutdown` fires.
    ///
    /// The first storage failure aborts ingestion. Returns the number of
    /// events stored.
    pub async fn start_ingestion(&self, mut shutdown: watch::Receiver<bool>) -> RatingResult<u64> {
        let ingester = self
            .ingester
            .as_ref()
            .ok_or_else(|| RatingError::Ingest("no ingester configured".to_string()))?;

        let mut events = ingester.ingest(shutdown.clone()).await?;
        let mut stored = 0u64;
        info!("rating ingestion started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => {
                    debug!("rating ingestion stopping");
                    break;
                }
                event = events.recv() => {
                    let Some(event) = event else { break };
                    self.put_rating(&event.record_id, &event.record_type, event.to_rating())
                        .await?;
                    stored += 1;
                }
            }
        }

        info!(stored, "rating ingestion finished");
        Ok(stored)
    }
}

fn validate_key(record_id: &str, record_type: &str) -> RatingResult<()> {
    if record_id.is_empty() {
        return Err(RatingError::InvalidInput("empty record id".to_string()));
    }
    if record_type.is_empty() {
        return Err(RatingError::InvalidInput("empty record type".to_string()));
    }
    Ok(())
}
