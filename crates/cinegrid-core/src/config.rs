//! cinegrid.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CinegridConfig {
    pub registry: RegistryConfig,
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub ingest: Option<IngestConfig>,
}

/// Which registry implementation a service uses to find its peers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryBackend {
    #[default]
    Memory,
    Consul,
}

impl FromStr for RegistryBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(RegistryBackend::Memory),
            "consul" => Ok(RegistryBackend::Consul),
            other => Err(format!("unknown registry backend: {other}")),
        }
    }
}

impl fmt::Display for RegistryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryBackend::Memory => f.write_str("memory"),
            RegistryBackend::Consul => f.write_str("consul"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub backend: RegistryBackend,
    pub consul_address: String,
    /// How long a memory-registry instance stays listed without a heartbeat.
    pub freshness_window: String,
    pub heartbeat_interval: String,
    /// TTL of the Consul health check refreshed by each heartbeat.
    pub check_ttl: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: RegistryBackend::Memory,
            consul_address: "127.0.0.1:8500".to_string(),
            freshness_window: "15m".to_string(),
            heartbeat_interval: "1s".to_string(),
            check_ttl: "5s".to_string(),
        }
    }
}

impl RegistryConfig {
    pub fn freshness_window(&self) -> Duration {
        parse_duration(&self.freshness_window).unwrap_or(Duration::from_secs(15 * 60))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        parse_duration(&self.heartbeat_interval).unwrap_or(Duration::from_secs(1))
    }

    pub fn check_ttl(&self) -> Duration {
        parse_duration(&self.check_ttl).unwrap_or(Duration::from_secs(5))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: Option<String>,
    /// Listen port. Each service falls back to its own default when unset.
    pub port: Option<u16>,
}

impl ServerConfig {
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or("127.0.0.1")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Deadline applied to each remote call made by a gateway.
    pub timeout: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            timeout: "5s".to_string(),
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        parse_duration(&self.timeout).unwrap_or(Duration::from_secs(5))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// JSON-lines file of rating events consumed at rating-service start.
    pub path: String,
}

impl CinegridConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: CinegridConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject duration strings that would otherwise silently fall back to defaults.
    fn validate(&self) -> anyhow::Result<()> {
        let durations = [
            ("registry.freshness_window", &self.registry.freshness_window),
            ("registry.heartbeat_interval", &self.registry.heartbeat_interval),
            ("registry.check_ttl", &self.registry.check_ttl),
            ("gateway.timeout", &self.gateway.timeout),
        ];
        for (key, value) in durations {
            match parse_duration(value) {
                None => anyhow::bail!("invalid duration for {key}: {value:?}"),
                Some(d) if d.is_zero() => anyhow::bail!("{key} must be greater than zero"),
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Parse a duration string like "5s", "500ms", "15m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else if let Some(hours) = s.strip_suffix('h') {
        hours
            .parse::<u64>()
            .ok()
            .and_then(|h| h.checked_mul(3600))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
