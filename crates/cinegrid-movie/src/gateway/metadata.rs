//! HTTP gateway to the metadata service.

use std::time::Duration;

use async_trait::async_trait;
use cinegrid_core::{METADATA_SERVICE, Metadata};
use cinegrid_discovery::{AddressSelector, transport};
use http::Method;
use tracing::debug;

use super::{MetadataGateway, decode_response, transport_error};
use crate::error::{MovieError, MovieResult};

/// Default deadline for one metadata call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Calls `GET /metadata?id=` on a live metadata instance.
pub struct HttpMetadataGateway {
    selector: AddressSelector,
    timeout: Duration,
}

impl HttpMetadataGateway {
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
}

#[async_trait]
impl MetadataGateway for HttpMetadataGateway {
    async fn get(&self, id: &str) -> MovieResult<Metadata> {
        let address = self.selector.select(METADATA_SERVICE).await?;
        let query = serde_urlencoded::to_string(&[("id", id)])
            .map_err(|e| MovieError::InvalidInput(e.to_string()))?;
        let path = format!("/metadata?{query}");

        debug!(%address, %id, "fetching metadata");
        let resp = transport::send(&address, Method::GET, &path, None, self.timeout)
            .await
            .map_err(|e| transport_error(METADATA_SERVICE, e))?;
        decode_response(METADATA_SERVICE, &format!("metadata {id}"), resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;
    use cinegrid_discovery::{MemoryRegistry, Registry};
    use cinegrid_metadata::{MemoryMetadataRepository, MetadataController};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr.to_string()
    }

    async fn gateway_for(router: Router) -> HttpMetadataGateway {
        let addr = serve(router).await;
        let registry = Arc::new(MemoryRegistry::new());
        registry.register("metadata-1", METADATA_SERVICE, &addr).await.unwrap();
        HttpMetadataGateway::new(AddressSelector::new(registry))
    }

    async fn metadata_router(records: Vec<Metadata>) -> Router {
        let repository = Arc::new(MemoryMetadataRepository::new());
        let controller = Arc::new(MetadataController::new(repository));
        for record in records {
            controller.put(record).await.unwrap();
        }
        cinegrid_metadata::build_router(controller)
    }

    fn sample() -> Metadata {
        Metadata {
            id: "m1".to_string(),
            title: "The Thing".to_string(),
            description: "Antarctic research station".to_string(),
            director: "John Carpenter".to_string(),
        }
    }

    #[tokio::test]
    async fn fetches_metadata_from_registered_instance() {
        let gateway = gateway_for(metadata_router(vec![sample()]).await).await;
        assert_eq!(gateway.get("m1").await.unwrap(), sample());
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let gateway = gateway_for(metadata_router(vec![]).await).await;
        let err = gateway.get("nope").await.unwrap_err();
        assert!(matches!(err, MovieError::NotFound(_)));
    }

    #[tokio::test]
    async fn ids_are_query_encoded() {
        let mut odd = sample();
        odd.id = "a b&c".to_string();
        let gateway = gateway_for(metadata_router(vec![odd.clone()]).await).await;
        assert_eq!(gateway.get("a b&c").await.unwrap(), odd);
    }

    #[tokio::test]
    async fn no_registered_instance_is_not_found() {
        let selector = AddressSelector::new(Arc::new(MemoryRegistry::new()));
        let gateway = HttpMetadataGateway::new(selector);
        let err = gateway.get("m1").await.unwrap_err();
        assert!(matches!(err, MovieError::NotFound(_)));
    }

    #[tokio::test]
    async fn server_failure_is_upstream_error() {
        let router = Router::new().route(
            "/metadata",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "db down") }),
        );
        let err = gateway_for(router).await.get("m1").await.unwrap_err();
        assert!(matches!(err, MovieError::UpstreamError { status: 500, .. }));
    }

    #[tokio::test]
    async fn slow_instance_hits_deadline() {
        let router = Router::new().route(
            "/metadata",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let gateway = gateway_for(router).await.with_timeout(Duration::from_millis(100));
        let err = gateway.get("m1").await.unwrap_err();
        assert!(matches!(err, MovieError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn dead_instance_is_upstream_unavailable() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.register("metadata-1", METADATA_SERVICE, "127.0.0.1:1").await.unwrap();
        let gateway = HttpMetadataGateway::new(AddressSelector::new(registry));
        let err = gateway.get("m1").await.unwrap_err();
        assert!(matches!(err, MovieError::UpstreamUnavailable(_)));
    }
}
