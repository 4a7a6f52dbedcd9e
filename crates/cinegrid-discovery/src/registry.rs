//! The registry capability shared by every discovery backend.

use async_trait::async_trait;

use crate::error::{DiscoveryError, DiscoveryResult};

/// Tracks which service instances are alive and where they listen.
///
/// Implementations are shared behind `Arc<dyn Registry>`; every call site
/// receives the registry explicitly so tests can build isolated instances.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Add or replace an instance of `service_name` listening on `host_port`.
    async fn register(
        &self,
        instance_id: &str,
        service_name: &str,
        host_port: &str,
    ) -> DiscoveryResult<()>;

    /// Remove an instance. Unknown instances are ignored.
    async fn deregister(&self, instance_id: &str, service_name: &str) -> DiscoveryResult<()>;

    /// Addresses of all live instances of `service_name`.
    ///
    /// Fails with [`DiscoveryError::NotFound`] when none are live.
    async fn service_addresses(&self, service_name: &str) -> DiscoveryResult<Vec<String>>;

    /// Refresh the liveness of a registered instance.
    async fn report_health_state(&self, instance_id: &str, service_name: &str)
    -> DiscoveryResult<()>;
}

/// Split a `host:port` string, accepting bracketed IPv6 hosts.
pub fn split_host_port(host_port: &str) -> DiscoveryResult<(&str, u16)> {
    let invalid = || DiscoveryError::InvalidAddress(host_port.to_string());

    let (host, port) = host_port.rsplit_once(':').ok_or_else(invalid)?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() || (host.contains(':') && !host_port.starts_with('[')) {
        return Err(invalid());
    }
    let port = port.parse::<u16>().map_err(|_| invalid())?;
    Ok((host, port))
}
