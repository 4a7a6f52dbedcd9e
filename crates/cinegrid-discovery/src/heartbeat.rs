//! Heartbeat reporter: keeps locally-owned instances alive in the registry.
//!
//! The `HeartbeatReporter` spawns a background task per instance that
//! calls `report_health_state` on a fixed interval until it is stopped.
//! Failed heartbeats are logged and retried on the next tick.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::registry::Registry;

/// Default interval between heartbeats.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Shortest interval accepted by [`HeartbeatReporter::with_interval`].
pub const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(10);

/// Per-instance heartbeat state.
struct HeartbeatSlot {
    service_name: String,
    /// Handle to the background heartbeat task.
    handle: JoinHandle<()>,
    /// Shutdown signal for this task.
    shutdown_tx: watch::Sender<bool>,
}

/// Runs heartbeat loops for the instances this process registered.
pub struct HeartbeatReporter {
    registry: Arc<dyn Registry>,
    interval: Duration,
    /// Active loops: instance_id → slot.
    slots: Arc<RwLock<HashMap<String, HeartbeatSlot>>>,
}

impl HeartbeatReporter {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self {
            registry,
            interval: DEFAULT_HEARTBEAT_INTERVAL,
            slots: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Set the interval between heartbeats, clamped to [`MIN_HEARTBEAT_INTERVAL`].
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_HEARTBEAT_INTERVAL);
        self
    }

    /// Start reporting heartbeats for an instance.
    ///
    /// Replaces any loop already running for the same instance id.
    pub async fn start(&self, instance_id: &str, service_name: &str) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let registry = self.registry.clone();
        let interval = self.interval;
        let instance = instance_id.to_string();
        let service = service_name.to_string();

        let handle = tokio::spawn(async move {
            run_heartbeat_loop(registry, &instance, &service, interval, shutdown_rx).await;
        });

        let mut slots = self.slots.write().await;
        if let Some(old) = slots.insert(
            instance_id.to_string(),
            HeartbeatSlot {
                service_name: service_name.to_string(),
                handle,
                shutdown_tx,
            },
        ) {
            let _ = old.shutdown_tx.send(true);
            old.handle.abort();
        }

        info!(
            %instance_id,
            service = %service_name,
            interval = ?self.interval,
            "heartbeat started"
        );
    }

    /// Stop reporting heartbeats for an instance.
    ///
    /// Waits for the loop to exit so no heartbeat lands after this returns.
    pub async fn stop(&self, instance_id: &str) {
        let slot = self.slots.write().await.remove(instance_id);
        if let Some(slot) = slot {
            let _ = slot.shutdown_tx.send(true);
            let _ = slot.handle.await;
            info!(%instance_id, "heartbeat stopped");
        }
    }

    /// Stop every heartbeat loop and deregister each instance.
    ///
    /// Deregistration is best-effort: failures are logged and the instance
    /// is left for the registry's own expiry to remove.
    pub async fn shutdown(&self) {
        let drained: Vec<(String, HeartbeatSlot)> = self.slots.write().await.drain().collect();
        for (instance_id, slot) in drained {
            let _ = slot.shutdown_tx.send(true);
            let _ = slot.handle.await;

            match self.registry.deregister(&instance_id, &slot.service_name).await {
                Ok(()) => {
                    debug!(%instance_id, service = %slot.service_name, "deregistered on shutdown")
                }
                Err(e) => warn!(
                    %instance_id,
                    service = %slot.service_name,
                    error = %e,
                    "failed to deregister on shutdown"
                ),
            }
        }
        info!("all heartbeats stopped");
    }

    /// Instance ids with an active heartbeat loop.
    pub async fn active(&self) -> Vec<String> {
        let slots = self.slots.read().await;
        slots.keys().cloned().collect()
    }

    pub async fn is_running(&self, instance_id: &str) -> bool {
        let slots = self.slots.read().await;
        slots.contains_key(instance_id)
    }
}

/// The heartbeat loop for a single instance.
async fn run_heartbeat_loop(
    registry: Arc<dyn Registry>,
    instance_id: &str,
    service_name: &str,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = registry.report_health_state(instance_id, service_name).await {
                    warn!(
                        %instance_id,
                        service = %service_name,
                        error = %e,
                        "failed to report healthy state"
                    );
                }
            }
            _ = shutdown.changed() => {
                debug!(%instance_id, "heartbeat loop shutting down");
                break;
            }
        }
    }
}
