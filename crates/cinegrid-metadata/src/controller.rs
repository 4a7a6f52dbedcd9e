//! Metadata controller: validation in front of the repository.

use std::sync::Arc;

use cinegrid_core::Metadata;
use tracing::debug;

use crate::error::{MetadataError, MetadataResult};
use crate::repository::MetadataRepository;

pub struct MetadataController {
    repo: Arc<dyn MetadataRepository>,
}

impl MetadataController {
    pub fn new(repo: Arc<dyn MetadataRepository>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, id: &str) -> MetadataResult<Metadata> {
        if id.is_empty() {
            return Err(MetadataError::InvalidInput("empty id".to_string()));
        }
        let metadata = self.repo.get(id).await?;
        debug!(%id, "metadata fetched");
        Ok(metadata)
    }

    pub async fn put(&self, metadata: Metadata) -> MetadataResult<()> {
        if metadata.id.is_empty() {
            return Err(MetadataError::InvalidInput("empty id".to_string()));
        }
        let id = metadata.id.clone();
        self.repo.put(&id, metadata).await
    }
}
