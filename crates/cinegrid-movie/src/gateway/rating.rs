//! HTTP gateway to the rating service.

use std::time::Duration;

use async_trait::async_trait;
use cinegrid_core::{RATING_SERVICE, Rating};
use cinegrid_discovery::{AddressSelector, transport};
use http::Method;
use tracing::debug;

use super::{RatingGateway, decode_response, transport_error};
use crate::error::{MovieError, MovieResult};

/// Default deadline for one rating call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Calls `/rating` on a live rating instance.
pub struct HttpRatingGateway {
    selector: AddressSelector,
    timeout: Duration,
}

impl HttpRatingGateway {
    pub fn new(selector: AddressSelector) -> Self {
        Self {
            selector,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn call(
        &self,
        method: Method,
        query: &[(&str, &str)],
    ) -> MovieResult<transport::RawResponse> {
        let address = self.selector.select(RATING_SERVICE).await?;
        let query = serde_urlencoded::to_string(query)
            .map_err(|e| MovieError::InvalidInput(e.to_string()))?;
        let path = format!("/rating?{query}");

        debug!(%address, %method, %path, "calling rating service");
        transport::send(&address, method, &path, None, self.timeout)
            .await
            .map_err(|e| transport_error(RATING_SERVICE, e))
    }
}

#[async_trait]
impl RatingGateway for HttpRatingGateway {
    async fn get_aggregated_rating(&self, record_id: &str, record_type: &str) -> MovieResult<f64> {
        let resp = self
            .call(Method::GET, &[("id", record_id), ("type", record_type)])
            .await?;
        decode_response(RATING_SERVICE, &format!("ratings for {record_type} {record_id}"), resp)
    }

    async fn put_rating(
        &self,
        record_id: &str,
        record_type: &str,
        rating: &Rating,
    ) -> MovieResult<()> {
        let value = rating.value.to_string();
        let resp = self
            .call(
                Method::PUT,
                &[
                    ("id", record_id),
                    ("type", record_type),
                    ("userId", rating.user_id.as_str()),
                    ("value", value.as_str()),
                ],
            )
            .await?;
        let target = format!("{record_type} {record_id}");
        let _: String = decode_response(RATING_SERVICE, &target, resp)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::Router;
    use cinegrid_core::RECORD_TYPE_MOVIE;
    use cinegrid_discovery::{MemoryRegistry, Registry};
    use cinegrid_rating::{MemoryRatingRepository, RatingController};

    async fn rating_gateway() -> (HttpRatingGateway, Arc<RatingController>) {
        let controller = Arc::new(RatingController::new(Arc::new(MemoryRatingRepository::new())));
        let router: Router = cinegrid_rating::build_router(controller.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let registry = Arc::new(MemoryRegistry::new());
        registry.register("rating-1", RATING_SERVICE, &addr).await.unwrap();
        (HttpRatingGateway::new(AddressSelector::new(registry)), controller)
    }

    #[tokio::test]
    async fn put_ratings_then_read_mean() {
        let (gateway, controller) = rating_gateway().await;
        gateway
            .put_rating("m1", RECORD_TYPE_MOVIE, &Rating::new("m1", "alice", 5))
            .await
            .unwrap();
        gateway
            .put_rating("m1", RECORD_TYPE_MOVIE, &Rating::new("m1", "bob", 2))
            .await
            .unwrap();

        let mean = gateway.get_aggregated_rating("m1", RECORD_TYPE_MOVIE).await.unwrap();
        assert_eq!(mean, 3.5);

        // The writes landed on the remote controller.
        let local = controller.get_aggregate_rating("m1", RECORD_TYPE_MOVIE).await.unwrap();
        assert_eq!(local, 3.5);
    }

    #[tokio::test]
    async fn unrated_record_is_not_found() {
        let (gateway, _) = rating_gateway().await;
        let err = gateway
            .get_aggregated_rating("m1", RECORD_TYPE_MOVIE)
            .await
            .unwrap_err();
        assert!(matches!(err, MovieError::NotFound(_)));
    }

    #[tokio::test]
    async fn record_types_are_independent() {
        let (gateway, _) = rating_gateway().await;
        gateway
            .put_rating("x1", "episode", &Rating::new("x1", "alice", 4))
            .await
            .unwrap();
        assert!(gateway.get_aggregated_rating("x1", RECORD_TYPE_MOVIE).await.is_err());
        assert_eq!(gateway.get_aggregated_rating("x1", "episode").await.unwrap(), 4.0);
    }

    #[tokio::test]
    async fn empty_record_type_is_rejected_remotely() {
        let (gateway, _) = rating_gateway().await;
        let err = gateway
            .put_rating("m1", "", &Rating::new("m1", "alice", 4))
            .await
            .unwrap_err();
        assert!(matches!(err, MovieError::UpstreamError { status: 400, .. }));
    }

    #[tokio::test]
    async fn resolves_the_rating_service_not_metadata() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.register("metadata-1", "metadata", "127.0.0.1:1").await.unwrap();
        let gateway = HttpRatingGateway::new(AddressSelector::new(registry));
        let err = gateway
            .get_aggregated_rating("m1", RECORD_TYPE_MOVIE)
            .await
            .unwrap_err();
        // Nothing registered under "rating", so discovery fails before any call.
        assert!(matches!(err, MovieError::NotFound(_)));
    }
}
