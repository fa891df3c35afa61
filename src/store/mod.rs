//! Persistence of per-artifact sync metadata.
//!
//! The [`MetadataStore`] trait records, for every `(client_id, filename)`
//! pair, the remote document id, the content signature, and the time of the
//! last successful sync. Two backends are provided:
//!
//! - [`SqliteMetadataStore`] for the CLI and scheduler.
//! - [`InMemoryMetadataStore`] for tests and dry runs.
//!
//! Neither backend locks across a read-compare-write cycle. Callers that
//! need consistency must serialize syncs per `(client_id, filename)`.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SyncResult;
use crate::models::ArtifactMetadata;
use crate::signature::Signature;

pub use memory::InMemoryMetadataStore;
pub use sqlite::SqliteMetadataStore;

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Fetch what is known about `filename` within `client_id`.
    async fn get(&self, filename: &str, client_id: &str) -> SyncResult<Option<ArtifactMetadata>>;

    /// Insert or overwrite the entry for `(client_id, filename)`.
    ///
    /// Repeating a call with the same arguments leaves the store unchanged.
    async fn put(
        &self,
        filename: &str,
        remote_document_id: &str,
        signature: &Signature,
        timestamp: DateTime<Utc>,
        client_id: &str,
    ) -> SyncResult<()>;

    /// All entries, optionally restricted to one client, ordered by client then filename.
    async fn list(&self, client_id: Option<&str>) -> SyncResult<Vec<ArtifactMetadata>>;
}
