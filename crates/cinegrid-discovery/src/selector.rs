//! Address selection: resolves a service name to one live address.
//!
//! Every call re-resolves through the registry and picks uniformly at
//! random among the returned addresses. There is no weighting, stickiness,
//! or memory of earlier failures.

use std::sync::Arc;

use rand::Rng;
use tracing::debug;

use crate::error::{DiscoveryError, DiscoveryResult};
use crate::registry::Registry;

/// Picks one address of a service per call.
#[derive(Clone)]
pub struct AddressSelector {
    registry: Arc<dyn Registry>,
}

impl AddressSelector {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }

    /// Resolve `service_name` and pick one of its live addresses.
    pub async fn select(&self, service_name: &str) -> DiscoveryResult<String> {
        let addresses = self.registry.service_addresses(service_name).await?;
        let address = pick(addresses)
            .ok_or_else(|| DiscoveryError::NotFound(service_name.to_string()))?;
        debug!(service = %service_name, %address, "selected address");
        Ok(address)
    }
}

fn pick(mut addresses: Vec<String>) -> Option<String> {
    if addresses.is_empty() {
        return None;
    }
    let idx = rand::thread_rng().gen_range(0..addresses.len());
    Some(addresses.swap_remove(idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;

    use crate::memory::MemoryRegistry;

    /// Registry that always answers with a fixed list.
    struct FixedRegistry(Vec<String>);

    #[async_trait]
    impl Registry for FixedRegistry {
        async fn register(&self, _: &str, _: &str, _: &str) -> DiscoveryResult<()> {
            Ok(())
        }
        async fn deregister(&self, _: &str, _: &str) -> DiscoveryResult<()> {
            Ok(())
        }
        async fn service_addresses(&self, _: &str) -> DiscoveryResult<Vec<String>> {
            Ok(self.0.clone())
        }
        async fn report_health_state(&self, _: &str, _: &str) -> DiscoveryResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn selects_single_address() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.register("m-1", "metadata", "localhost:8081").await.unwrap();

        let selector = AddressSelector::new(registry);
        for _ in 0..10 {
            assert_eq!(selector.select("metadata").await.unwrap(), "localhost:8081");
        }
    }

    #[tokio::test]
    async fn unknown_service_is_not_found() {
        let selector = AddressSelector::new(Arc::new(MemoryRegistry::new()));
        assert!(matches!(
            selector.select("rating").await,
            Err(DiscoveryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn empty_listing_is_not_found() {
        let selector = AddressSelector::new(Arc::new(FixedRegistry(vec![])));
        assert!(matches!(
            selector.select("rating").await,
            Err(DiscoveryError::NotFound(s)) if s == "rating"
        ));
    }

    #[tokio::test]
    async fn selection_spreads_across_instances() {
        let addrs: Vec<String> = (0..3).map(|i| format!("10.0.0.{i}:8082")).collect();
        let selector = AddressSelector::new(Arc::new(FixedRegistry(addrs.clone())));

        let mut counts: HashMap<String, u32> = HashMap::new();
        for _ in 0..3000 {
            *counts.entry(selector.select("rating").await.unwrap()).or_default() += 1;
        }

        assert_eq!(counts.len(), 3);
        // Uniform choice: each address lands well within [700, 1300] of 3000 draws.
        assert!(counts.values().all(|&c| (700..=1300).contains(&c)), "{counts:?}");
    }

    #[tokio::test]
    async fn deregistered_address_is_never_selected() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.register("r-1", "rating", "localhost:1").await.unwrap();
        registry.register("r-2", "rating", "localhost:2").await.unwrap();
        registry.deregister("r-1", "rating").await.unwrap();

        let selector = AddressSelector::new(registry);
        for _ in 0..50 {
            assert_eq!(selector.select("rating").await.unwrap(), "localhost:2");
        }
    }
}
