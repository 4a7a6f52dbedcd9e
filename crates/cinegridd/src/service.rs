//! Service assembly: wires a router to the registry and runs it.
//!
//! For every service the daemon:
//! 1. Builds the service's controller and HTTP router
//! 2. Binds its listener and derives the address to advertise
//! 3. Registers a fresh instance id and starts its heartbeat
//! 4. Serves until the shutdown signal fires
//! 5. Stops heartbeats and deregisters (best-effort)

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use cinegrid_core::{
    CinegridConfig, IngestConfig, METADATA_SERVICE, MOVIE_SERVICE, RATING_SERVICE,
    RegistryBackend, RegistryConfig,
};
use cinegrid_discovery::{
    AddressSelector, ConsulRegistry, HeartbeatReporter, MemoryRegistry, Registry,
    generate_instance_id,
};
use cinegrid_metadata::{MemoryMetadataRepository, MetadataController};
use cinegrid_movie::{HttpMetadataGateway, HttpRatingGateway, MovieController};
use cinegrid_rating::{JsonLinesIngester, MemoryRatingRepository, RatingController};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Metadata,
    Rating,
    Movie,
}

impl ServiceKind {
    pub fn name(self) -> &'static str {
        match self {
            ServiceKind::Metadata => METADATA_SERVICE,
            ServiceKind::Rating => RATING_SERVICE,
            ServiceKind::Movie => MOVIE_SERVICE,
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            ServiceKind::Metadata => 8081,
            ServiceKind::Rating => 8082,
            ServiceKind::Movie => 8083,
        }
    }
}

/// Listen ports for standalone mode.
#[derive(Debug, Clone, Copy)]
pub struct StandalonePorts {
    pub metadata: u16,
    pub rating: u16,
    pub movie: u16,
}

// ── Entry points ───────────────────────────────────────────────────

/// Run one service against the configured registry backend.
pub async fn run_service(kind: ServiceKind, config: CinegridConfig) -> anyhow::Result<()> {
    info!(service = kind.name(), "Cinegrid daemon starting");

    let registry = build_registry(&config.registry)?;
    let heartbeat = HeartbeatReporter::new(registry.clone())
        .with_interval(config.registry.heartbeat_interval());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_handler(shutdown_tx);

    let (router, ingestion) = build_app(kind, &config, registry.clone(), shutdown_rx.clone());
    let port = config.server.port.unwrap_or(kind.default_port());
    let bound = BoundService::bind(kind, router, config.server.host(), port).await?;

    let result = bound.serve(registry, &heartbeat, shutdown_rx).await;

    heartbeat.shutdown().await;
    if let Some(handle) = ingestion {
        let _ = handle.await;
    }

    info!(service = kind.name(), "Cinegrid daemon stopped");
    result
}

/// Run all three services in one process, sharing one memory registry.
pub async fn run_standalone(config: CinegridConfig, ports: StandalonePorts) -> anyhow::Result<()> {
    info!("Cinegrid daemon starting in standalone mode");
    if config.registry.backend != RegistryBackend::Memory {
        warn!(
            backend = %config.registry.backend,
            "standalone mode always uses an in-process memory registry"
        );
    }

    let registry: Arc<dyn Registry> = Arc::new(
        MemoryRegistry::new().with_freshness_window(config.registry.freshness_window()),
    );
    let heartbeat = HeartbeatReporter::new(registry.clone())
        .with_interval(config.registry.heartbeat_interval());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_handler(shutdown_tx);

    let host = config.server.host();
    let (metadata_router, _) =
        build_app(ServiceKind::Metadata, &config, registry.clone(), shutdown_rx.clone());
    let (rating_router, ingestion) =
        build_app(ServiceKind::Rating, &config, registry.clone(), shutdown_rx.clone());
    let (movie_router, _) =
        build_app(ServiceKind::Movie, &config, registry.clone(), shutdown_rx.clone());

    // Bind everything before registering anything.
    let metadata =
        BoundService::bind(ServiceKind::Metadata, metadata_router, host, ports.metadata).await?;
    let rating = BoundService::bind(ServiceKind::Rating, rating_router, host, ports.rating).await?;
    let movie = BoundService::bind(ServiceKind::Movie, movie_router, host, ports.movie).await?;

    let result = tokio::try_join!(
        metadata.serve(registry.clone(), &heartbeat, shutdown_rx.clone()),
        rating.serve(registry.clone(), &heartbeat, shutdown_rx.clone()),
        movie.serve(registry.clone(), &heartbeat, shutdown_rx.clone()),
    );

    heartbeat.shutdown().await;
    if let Some(handle) = ingestion {
        let _ = handle.await;
    }

    info!("Cinegrid daemon stopped");
    result.map(|_| ())
}

// ── Assembly ───────────────────────────────────────────────────────

/// Registry client for the configured backend.
pub fn build_registry(config: &RegistryConfig) -> anyhow::Result<Arc<dyn Registry>> {
    match config.backend {
        RegistryBackend::Memory => {
            let memory = MemoryRegistry::new().with_freshness_window(config.freshness_window());
            info!(window = ?memory.freshness_window(), "using in-memory registry");
            Ok(Arc::new(memory))
        }
        RegistryBackend::Consul => {
            let consul = ConsulRegistry::new(&config.consul_address)?
                .with_check_ttl(config.check_ttl());
            info!(
                address = %config.consul_address,
                ttl = ?config.check_ttl(),
                "using consul registry"
            );
            Ok(Arc::new(consul))
        }
    }
}

/// Router for a service, plus the ingestion task when one was started.
fn build_app(
    kind: ServiceKind,
    config: &CinegridConfig,
    registry: Arc<dyn Registry>,
    shutdown: watch::Receiver<bool>,
) -> (Router, Option<JoinHandle<()>>) {
    match kind {
        ServiceKind::Metadata => {
            let controller = MetadataController::new(Arc::new(MemoryMetadataRepository::new()));
            (cinegrid_metadata::build_router(Arc::new(controller)), None)
        }
        ServiceKind::Rating => {
            let mut controller = RatingController::new(Arc::new(MemoryRatingRepository::new()));
            if let Some(ingest) = &config.ingest {
                let ingester = Arc::new(JsonLinesIngester::new(&ingest.path));
                controller = controller.with_ingester(ingester);
            }
            let controller = Arc::new(controller);
            let ingestion = config
                .ingest
                .as_ref()
                .map(|ingest| spawn_ingestion(controller.clone(), ingest, shutdown));
            (cinegrid_rating::build_router(controller), ingestion)
        }
        ServiceKind::Movie => {
            let selector = AddressSelector::new(registry);
            let timeout = config.gateway.timeout();
            let controller = MovieController::new(
                Arc::new(HttpMetadataGateway::new(selector.clone()).with_timeout(timeout)),
                Arc::new(HttpRatingGateway::new(selector).with_timeout(timeout)),
            );
            (cinegrid_movie::build_router(Arc::new(controller)), None)
        }
    }
}

fn spawn_ingestion(
    controller: Arc<RatingController>,
    ingest: &IngestConfig,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let path = ingest.path.clone();
    tokio::spawn(async move {
        match controller.start_ingestion(shutdown).await {
            Ok(stored) => info!(%path, stored, "rating ingestion complete"),
            Err(e) => error!(%path, error = %e, "rating ingestion aborted"),
        }
    })
}

// ── Serving ────────────────────────────────────────────────────────

/// A service whose listener is bound but not yet registered.
pub struct BoundService {
    kind: ServiceKind,
    listener: TcpListener,
    router: Router,
    advertise: String,
}

impl BoundService {
    pub async fn bind(
        kind: ServiceKind,
        router: Router,
        host: &str,
        port: u16,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| anyhow::anyhow!("bind {} on {host}:{port}: {e}", kind.name()))?;
        let local = listener.local_addr()?;
        let advertise = advertised_address(host, local);
        info!(service = kind.name(), addr = %local, %advertise, "listener bound");

        Ok(Self {
            kind,
            listener,
            router,
            advertise,
        })
    }

    /// Register, heartbeat, and serve until `shutdown` fires.
    ///
    /// Deregistration is left to [`HeartbeatReporter::shutdown`].
    pub async fn serve(
        self,
        registry: Arc<dyn Registry>,
        heartbeat: &HeartbeatReporter,
        shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let service = self.kind.name();
        let instance_id = generate_instance_id(service);

        registry.register(&instance_id, service, &self.advertise).await?;
        heartbeat.start(&instance_id, service).await;

        info!(%service, %instance_id, address = %self.advertise, "server starting");
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await?;
        info!(%service, %instance_id, "server stopped");
        Ok(())
    }
}

/// Wildcard binds are advertised as `localhost`.
fn advertised_address(host: &str, local: SocketAddr) -> String {
    let host = if local.ip().is_unspecified() { "localhost" } else { host };
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{}", local.port())
    } else {
        format!("{host}:{}", local.port())
    }
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Flip the shutdown signal on Ctrl-C.
fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                error!(error = %e, "failed to listen for Ctrl-C");
                // Dropping the sender would read as a shutdown.
                std::future::pending::<()>().await;
            }
        }
    });
}
