//! End-to-end tests.
//!
//! Runs the metadata, rating, and movie services over real HTTP, wired
//! together only through a shared memory registry.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use cinegrid_core::{METADATA_SERVICE, MOVIE_SERVICE, RATING_SERVICE};
use cinegrid_discovery::transport::{self, RawResponse};
use cinegrid_discovery::{
    AddressSelector, HeartbeatReporter, MemoryRegistry, Registry, generate_instance_id,
};
use cinegrid_metadata::{MemoryMetadataRepository, MetadataController};
use cinegrid_movie::{HttpMetadataGateway, HttpRatingGateway, MovieController};
use cinegrid_rating::{MemoryRatingRepository, RatingController};
use http::{Method, StatusCode};

const TIMEOUT: Duration = Duration::from_secs(2);

struct Cluster {
    registry: Arc<MemoryRegistry>,
    heartbeat: HeartbeatReporter,
    /// (instance id, service, address) of every started server.
    instances: Vec<(String, &'static str, String)>,
}

impl Cluster {
    fn new() -> Self {
        let registry = Arc::new(MemoryRegistry::new());
        let heartbeat = HeartbeatReporter::new(registry.clone());
        Self {
            registry,
            heartbeat,
            instances: Vec::new(),
        }
    }

    /// Serve `router` on an ephemeral port and register it under `service`.
    async fn start(&mut self, service: &'static str, router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let id = generate_instance_id(service);
        self.registry.register(&id, service, &addr).await.unwrap();
        self.heartbeat.start(&id, service).await;
        self.instances.push((id, service, addr.clone()));
        addr
    }

    async fn start_all(&mut self) -> String {
        let metadata = MetadataController::new(Arc::new(MemoryMetadataRepository::new()));
        self.start(METADATA_SERVICE, cinegrid_metadata::build_router(Arc::new(metadata)))
            .await;

        let rating = RatingController::new(Arc::new(MemoryRatingRepository::new()));
        self.start(RATING_SERVICE, cinegrid_rating::build_router(Arc::new(rating)))
            .await;

        let selector = AddressSelector::new(self.registry.clone());
        let movie = MovieController::new(
            Arc::new(HttpMetadataGateway::new(selector.clone()).with_timeout(TIMEOUT)),
            Arc::new(HttpRatingGateway::new(selector).with_timeout(TIMEOUT)),
        );
        self.start(MOVIE_SERVICE, cinegrid_movie::build_router(Arc::new(movie)))
            .await
    }

    /// Any live address of `service`, as the registry reports it.
    async fn address_of(&self, service: &str) -> String {
        AddressSelector::new(self.registry.clone())
            .select(service)
            .await
            .unwrap()
    }

    async fn stop(&self, service: &str) {
        for (id, svc, _) in &self.instances {
            if *svc == service {
                self.heartbeat.stop(id).await;
                self.registry.deregister(id, svc).await.unwrap();
            }
        }
    }
}

async fn call(
    addr: &str,
    method: Method,
    path: &str,
    body: Option<serde_json::Value>,
) -> RawResponse {
    let body = body.map(|b| serde_json::to_vec(&b).unwrap());
    transport::send(addr, method, path, body, TIMEOUT).await.unwrap()
}

fn json(resp: &RawResponse) -> serde_json::Value {
    serde_json::from_slice(&resp.body).unwrap()
}

async fn seed_movie(cluster: &Cluster) {
    let metadata = cluster.address_of(METADATA_SERVICE).await;
    let resp = call(
        &metadata,
        Method::PUT,
        "/metadata",
        Some(serde_json::json!({ "id": "m1", "title": "T" })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK);

    let rating = cluster.address_of(RATING_SERVICE).await;
    for (user, value) in [("u1", 5), ("u2", 1)] {
        let path = format!("/rating?id=m1&type=movie&userId={user}&value={value}");
        let resp = call(&rating, Method::PUT, &path, None).await;
        assert_eq!(resp.status, StatusCode::OK);
    }
}

#[tokio::test]
async fn movie_composes_metadata_and_mean_rating() {
    let mut cluster = Cluster::new();
    let movie = cluster.start_all().await;
    seed_movie(&cluster).await;

    let resp = call(&movie, Method::GET, "/movie?id=m1", None).await;
    assert_eq!(resp.status, StatusCode::OK);

    let body = json(&resp);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["metadata"]["id"], "m1");
    assert_eq!(body["data"]["metadata"]["title"], "T");
    assert_eq!(body["data"]["rating"], 3.0);

    cluster.heartbeat.shutdown().await;
}

#[tokio::test]
async fn unknown_movie_is_not_found() {
    let mut cluster = Cluster::new();
    let movie = cluster.start_all().await;

    let resp = call(&movie, Method::GET, "/movie?id=nope", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(json(&resp)["success"], false);

    cluster.heartbeat.shutdown().await;
}

#[tokio::test]
async fn movie_without_ratings_is_not_found() {
    let mut cluster = Cluster::new();
    let movie = cluster.start_all().await;

    let metadata = cluster.address_of(METADATA_SERVICE).await;
    call(
        &metadata,
        Method::PUT,
        "/metadata",
        Some(serde_json::json!({ "id": "m2", "title": "Unrated" })),
    )
    .await;

    let resp = call(&movie, Method::GET, "/movie?id=m2", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    cluster.heartbeat.shutdown().await;
}

#[tokio::test]
async fn empty_id_is_rejected() {
    let mut cluster = Cluster::new();
    let movie = cluster.start_all().await;

    let resp = call(&movie, Method::GET, "/movie?id=", None).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    cluster.heartbeat.shutdown().await;
}

#[tokio::test]
async fn deregistered_dependency_stops_being_resolved() {
    let mut cluster = Cluster::new();
    let movie = cluster.start_all().await;
    seed_movie(&cluster).await;

    cluster.stop(RATING_SERVICE).await;

    // The rating server is still up, but nothing can find it any more.
    let resp = call(&movie, Method::GET, "/movie?id=m1", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    cluster.heartbeat.shutdown().await;
}

#[tokio::test]
async fn dead_dependency_is_service_unavailable() {
    let mut cluster = Cluster::new();
    let movie = cluster.start_all().await;

    // Replace the metadata registration with an address nobody listens on.
    cluster.stop(METADATA_SERVICE).await;
    cluster
        .registry
        .register("metadata-dead", METADATA_SERVICE, "127.0.0.1:1")
        .await
        .unwrap();

    let resp = call(&movie, Method::GET, "/movie?id=m1", None).await;
    assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE);

    cluster.heartbeat.shutdown().await;
}

#[tokio::test]
async fn every_service_answers_health_checks() {
    let mut cluster = Cluster::new();
    cluster.start_all().await;

    for (_, service, addr) in &cluster.instances {
        for path in ["/live", "/ready"] {
            let resp = call(addr, Method::GET, path, None).await;
            assert_eq!(resp.status, StatusCode::OK, "{service} {path}");
        }
    }

    cluster.heartbeat.shutdown().await;
}
