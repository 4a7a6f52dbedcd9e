//! Consul-backed registry: delegates the service catalog to a Consul agent.
//!
//! Every instance is registered with a TTL health check whose id equals the
//! instance id. Heartbeats pass that check; Consul itself expires instances
//! whose check is not refreshed within the TTL. Lookups only return
//! instances Consul currently reports as passing.

use std::time::Duration;

use async_trait::async_trait;
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DiscoveryError, DiscoveryResult};
use crate::registry::{Registry, split_host_port};
use crate::transport::{self, RawResponse, TransportError};

/// Default TTL of the per-instance health check.
pub const DEFAULT_CHECK_TTL: Duration = Duration::from_secs(5);

/// Registry client for a Consul agent's HTTP API.
#[derive(Debug, Clone)]
pub struct ConsulRegistry {
    /// Agent address as `host:port`.
    address: String,
    check_ttl: Duration,
    timeout: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AgentServiceRegistration<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    name: &'a str,
    address: &'a str,
    port: u16,
    check: AgentServiceCheck<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AgentServiceCheck<'a> {
    #[serde(rename = "CheckID")]
    check_id: &'a str,
    #[serde(rename = "TTL")]
    ttl: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceEntry {
    service: AgentService,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AgentService {
    address: String,
    port: u16,
}

impl ConsulRegistry {
    /// Create a client for the agent at `address` (`host:port`).
    pub fn new(address: &str) -> DiscoveryResult<Self> {
        split_host_port(address)?;
        Ok(Self {
            address: address.to_string(),
            check_ttl: DEFAULT_CHECK_TTL,
            timeout: Duration::from_secs(5),
        })
    }

    /// Set the TTL of the health check attached to each registration.
    pub fn with_check_ttl(mut self, ttl: Duration) -> Self {
        self.check_ttl = ttl;
        self
    }

    /// Set the deadline for each call to the agent.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Issue one request to the agent. Non-2xx responses are returned as-is.
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> DiscoveryResult<RawResponse> {
        transport::send(&self.address, method, path, body, self.timeout)
            .await
            .map_err(|e| match e {
                TransportError::InvalidRequest(msg) => DiscoveryError::Backend(msg),
                other => DiscoveryError::BackendUnavailable(other.to_string()),
            })
    }

    async fn call_ok(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> DiscoveryResult<RawResponse> {
        let resp = self.call(method, path, body).await?;
        if !resp.status.is_success() {
            return Err(unexpected_status(path, &resp));
        }
        Ok(resp)
    }
}

fn unexpected_status(path: &str, resp: &RawResponse) -> DiscoveryError {
    DiscoveryError::Backend(format!(
        "consul {path} returned {}: {}",
        resp.status,
        String::from_utf8_lossy(&resp.body).trim()
    ))
}

#[async_trait]
impl Registry for ConsulRegistry {
    async fn register(
        &self,
        instance_id: &str,
        service_name: &str,
        host_port: &str,
    ) -> DiscoveryResult<()> {
        path_segment(instance_id)?;
        path_segment(service_name)?;
        let (host, port) = split_host_port(host_port)?;
        let registration = AgentServiceRegistration {
            id: instance_id,
            name: service_name,
            address: host,
            port,
            check: AgentServiceCheck {
                check_id: instance_id,
                ttl: format_ttl(self.check_ttl),
            },
        };
        let body = serde_json::to_vec(&registration)
            .map_err(|e| DiscoveryError::Backend(e.to_string()))?;

        self.call_ok(Method::PUT, "/v1/agent/service/register", Some(body))
            .await?;
        info!(
            service = %service_name,
            %instance_id,
            %host_port,
            "instance registered with consul"
        );
        Ok(())
    }

    async fn deregister(&self, instance_id: &str, service_name: &str) -> DiscoveryResult<()> {
        let path = format!("/v1/agent/service/deregister/{}", path_segment(instance_id)?);
        self.call_ok(Method::PUT, &path, None).await?;
        info!(service = %service_name, %instance_id, "instance deregistered from consul");
        Ok(())
    }

    async fn service_addresses(&self, service_name: &str) -> DiscoveryResult<Vec<String>> {
        let path = format!("/v1/health/service/{}?passing=true", path_segment(service_name)?);
        let resp = self.call_ok(Method::GET, &path, None).await?;

        let entries: Vec<ServiceEntry> = serde_json::from_slice(&resp.body)
            .map_err(|e| DiscoveryError::Backend(format!("decode health response: {e}")))?;
        if entries.is_empty() {
            return Err(DiscoveryError::NotFound(service_name.to_string()));
        }

        let addresses: Vec<String> = entries
            .into_iter()
            .map(|entry| join_host_port(&entry.service.address, entry.service.port))
            .collect();
        debug!(service = %service_name, count = addresses.len(), "resolved passing instances");
        Ok(addresses)
    }

    async fn report_health_state(
        &self,
        instance_id: &str,
        service_name: &str,
    ) -> DiscoveryResult<()> {
        let path = format!("/v1/agent/check/pass/{}", path_segment(instance_id)?);
        let resp = self.call(Method::PUT, &path, None).await?;
        match resp.status {
            s if s.is_success() => {
                debug!(service = %service_name, %instance_id, "ttl check passed");
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(DiscoveryError::NotRegistered(service_name.to_string())),
            _ => Err(unexpected_status(&path, &resp)),
        }
    }
}

/// Names are interpolated into agent URL paths, so only unreserved
/// characters are accepted.
fn path_segment(name: &str) -> DiscoveryResult<&str> {
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    if valid {
        Ok(name)
    } else {
        Err(DiscoveryError::InvalidName(name.to_string()))
    }
}

/// Consul expects Go-style duration strings.
fn format_ttl(ttl: Duration) -> String {
    if ttl.subsec_millis() == 0 {
        format!("{}s", ttl.as_secs().max(1))
    } else {
        format!("{}ms", ttl.as_millis())
    }
}

fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
