//! Metadata storage.

use std::collections::HashMap;

use async_trait::async_trait;
use cinegrid_core::Metadata;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{MetadataError, MetadataResult};

/// Storage backend for movie metadata.
#[async_trait]
pub trait MetadataRepository: Send + Sync {
    /// Fetch metadata by id, failing with `NotFound` when absent.
    async fn get(&self, id: &str) -> MetadataResult<Metadata>;

    /// Store metadata under `id`, replacing any previous value.
    async fn put(&self, id: &str, metadata: Metadata) -> MetadataResult<()>;
}

/// In-memory metadata repository.
#[derive(Default)]
pub struct MemoryMetadataRepository {
    data: RwLock<HashMap<String, Metadata>>,
}

impl MemoryMetadataRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataRepository for MemoryMetadataRepository {
    async fn get(&self, id: &str) -> MetadataResult<Metadata> {
        let data = self.data.read().await;
        data.get(id)
            .cloned()
            .ok_or_else(|| MetadataError::NotFound(id.to_string()))
    }

    async fn put(&self, id: &str, metadata: Metadata) -> MetadataResult<()> {
        self.data.write().await.insert(id.to_string(), metadata);
        debug!(%id, "metadata stored");
        Ok(())
    }
}
