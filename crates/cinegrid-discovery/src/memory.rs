//! In-memory registry: a process-local, heartbeat-expiring service table.
//!
//! Instances are listed only while their last heartbeat falls inside the
//! freshness window. Expired entries stay in the table until they are
//! re-registered, deregistered, or swept by [`MemoryRegistry::reap_expired`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{DiscoveryError, DiscoveryResult};
use crate::registry::{Registry, split_host_port};

/// Default freshness window for un-refreshed instances.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(15 * 60);

/// One registered instance of a service.
#[derive(Debug, Clone)]
struct ServiceInstance {
    host_port: String,
    last_heartbeat: Instant,
}

/// service name → instance id → instance.
type ServiceTable = HashMap<String, HashMap<String, ServiceInstance>>;

/// Thread-safe in-memory registry.
///
/// Lookups take the read lock; register, deregister, and heartbeats take the
/// write lock. No method calls back into the registry while holding it.
pub struct MemoryRegistry {
    services: RwLock<ServiceTable>,
    freshness_window: Duration,
}

impl MemoryRegistry {
    /// Create an empty registry with the default 15 minute freshness window.
    pub fn new() -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
        }
    }

    /// Set how long an instance stays listed without a heartbeat.
    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }

    /// How long an instance stays live after its last heartbeat.
    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    /// Service names that currently hold at least one instance, live or not.
    pub async fn services(&self) -> Vec<String> {
        let services = self.services.read().await;
        let mut names: Vec<String> = services.keys().cloned().collect();
        names.sort();
        names
    }

    /// Delete expired instances and any service left without instances.
    ///
    /// Returns the ids of the removed instances.
    pub async fn reap_expired(&self) -> Vec<String> {
        let now = Instant::now();
        let mut services = self.services.write().await;
        let mut reaped = Vec::new();

        services.retain(|service_name, instances| {
            instances.retain(|instance_id, instance| {
                let live = self.is_fresh(instance, now);
                if !live {
                    warn!(service = %service_name, %instance_id, "reaped expired instance");
                    reaped.push(instance_id.clone());
                }
                live
            });
            !instances.is_empty()
        });

        reaped
    }

    fn is_fresh(&self, instance: &ServiceInstance, now: Instant) -> bool {
        now.saturating_duration_since(instance.last_heartbeat) <= self.freshness_window
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn register(
        &self,
        instance_id: &str,
        service_name: &str,
        host_port: &str,
    ) -> DiscoveryResult<()> {
        split_host_port(host_port)?;

        let mut services = self.services.write().await;

        // An instance id lives under one service name at a time.
        services.retain(|name, instances| {
            if name != service_name {
                instances.remove(instance_id);
            }
            !instances.is_empty()
        });

        services.entry(service_name.to_string()).or_default().insert(
            instance_id.to_string(),
            ServiceInstance {
                host_port: host_port.to_string(),
                last_heartbeat: Instant::now(),
            },
        );

        info!(service = %service_name, %instance_id, %host_port, "instance registered");
        Ok(())
    }

    async fn deregister(&self, instance_id: &str, service_name: &str) -> DiscoveryResult<()> {
        let mut services = self.services.write().await;
        if let Some(instances) = services.get_mut(service_name) {
            let existed = instances.remove(instance_id).is_some();
            if instances.is_empty() {
                services.remove(service_name);
            }
            if existed {
                info!(service = %service_name, %instance_id, "instance deregistered");
            }
        }
        Ok(())
    }

    async fn service_addresses(&self, service_name: &str) -> DiscoveryResult<Vec<String>> {
        let now = Instant::now();
        let services = self.services.read().await;
        let instances = services
            .get(service_name)
            .ok_or_else(|| DiscoveryError::NotFound(service_name.to_string()))?;

        let addresses: Vec<String> = instances
            .values()
            .filter(|instance| self.is_fresh(instance, now))
            .map(|instance| instance.host_port.clone())
            .collect();

        if addresses.is_empty() {
            debug!(service = %service_name, registered = instances.len(), "all instances expired");
            return Err(DiscoveryError::NotFound(service_name.to_string()));
        }
        Ok(addresses)
    }

    async fn report_health_state(
        &self,
        instance_id: &str,
        service_name: &str,
    ) -> DiscoveryResult<()> {
        let mut services = self.services.write().await;
        let instance = services
            .get_mut(service_name)
            .and_then(|instances| instances.get_mut(instance_id))
            .ok_or_else(|| DiscoveryError::NotRegistered(service_name.to_string()))?;

        instance.last_heartbeat = Instant::now();
        debug!(service = %service_name, %instance_id, "heartbeat recorded");
        Ok(())
    }
}
