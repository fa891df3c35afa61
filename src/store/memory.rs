//! In-memory [`MetadataStore`] for tests and for library users that need no database.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::MetadataStore;
use crate::error::SyncResult;
use crate::models::ArtifactMetadata;
use crate::signature::Signature;

/// Keyed by `(client_id, filename)` so iteration order matches [`MetadataStore::list`].
#[derive(Default)]
pub struct InMemoryMetadataStore {
    entries: RwLock<BTreeMap<(String, String), ArtifactMetadata>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry directly, bypassing the engine.
    pub async fn insert(&self, metadata: ArtifactMetadata) {
        let key = (metadata.client_id.clone(), metadata.filename.clone());
        self.entries.write().await.insert(key, metadata);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn get(&self, filename: &str, client_id: &str) -> SyncResult<Option<ArtifactMetadata>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&(client_id.to_string(), filename.to_string()))
            .cloned())
    }

    async fn put(
        &self,
        filename: &str,
        remote_document_id: &str,
        signature: &Signature,
        timestamp: DateTime<Utc>,
        client_id: &str,
    ) -> SyncResult<()> {
        self.insert(ArtifactMetadata {
            filename: filename.to_string(),
            client_id: client_id.to_string(),
            remote_document_id: remote_document_id.to_string(),
            signature: signature.clone(),
            last_updated: timestamp,
        })
        .await;
        Ok(())
    }

    async fn list(&self, client_id: Option<&str>) -> SyncResult<Vec<ArtifactMetadata>> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .filter(|m| client_id.map_or(true, |c| m.client_id == c))
            .cloned()
            .collect())
    }
}
