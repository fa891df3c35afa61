//! Content-addressed sync engine.
//!
//! For each artifact the engine decides between three states and acts on
//! the remote store accordingly:
//!
//! | Prior metadata | Signature | Action | Outcome |
//! |----------------|-----------|--------|---------|
//! | none | n/a | `create` | [`SyncOutcome::Uploaded`] |
//! | present | equal | nothing | [`SyncOutcome::Unchanged`] |
//! | present | different | `replace` (404 → `create`) | [`SyncOutcome::Replaced`] |
//!
//! Metadata is written only after the remote call succeeded, so a failed
//! attempt leaves the previous known-good entry in place and the next run
//! retries from it. Blank artifacts are skipped before any lookup.

use std::sync::Arc;

use chrono::Utc;

use crate::error::SyncResult;
use crate::models::{Artifact, ArtifactMetadata};
use crate::rate::RateGate;
use crate::remote::RemoteDocumentClient;
use crate::signature::{signature, Signature};
use crate::store::MetadataStore;

/// What the engine did with one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Blank content, nothing sent.
    Skipped,
    /// Same signature as last time.
    Unchanged { document_id: String },
    /// First upload of this filename for the client.
    Uploaded { document_id: String },
    /// Content changed. `recreated` is set when the remote had lost the
    /// document and it was uploaded again under a new id.
    Replaced {
        document_id: String,
        recreated: bool,
    },
    /// The store accepted the write but returned no id; metadata untouched.
    Aborted,
}

impl SyncOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SyncOutcome::Skipped => "skipped",
            SyncOutcome::Unchanged { .. } => "unchanged",
            SyncOutcome::Uploaded { .. } => "uploaded",
            SyncOutcome::Replaced { .. } => "replaced",
            SyncOutcome::Aborted => "aborted",
        }
    }

    /// True if a remote write happened.
    pub fn wrote(&self) -> bool {
        matches!(
            self,
            SyncOutcome::Uploaded { .. } | SyncOutcome::Replaced { .. }
        )
    }
}

/// State of an artifact relative to the metadata store, without side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Blank,
    Absent,
    Unchanged(ArtifactMetadata),
    Changed(ArtifactMetadata),
}

impl SyncState {
    /// What `sync` would do from this state.
    pub fn label(&self) -> &'static str {
        match self {
            SyncState::Blank => "would skip",
            SyncState::Absent => "would upload",
            SyncState::Unchanged(_) => "unchanged",
            SyncState::Changed(_) => "would replace",
        }
    }
}

pub struct SyncEngine {
    store: Arc<dyn MetadataStore>,
    remote: Arc<dyn RemoteDocumentClient>,
    gate: Arc<dyn RateGate>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        remote: Arc<dyn RemoteDocumentClient>,
        gate: Arc<dyn RateGate>,
    ) -> Self {
        Self {
            store,
            remote,
            gate,
        }
    }

    /// Classify an artifact without touching the remote store.
    pub async fn plan(&self, artifact: &Artifact, client_id: &str) -> SyncResult<SyncState> {
        if artifact.is_blank() {
            return Ok(SyncState::Blank);
        }
        let new_signature = signature(&artifact.content);
        Ok(match self.store.get(&artifact.filename, client_id).await? {
            None => SyncState::Absent,
            Some(prior) if prior.signature == new_signature => SyncState::Unchanged(prior),
            Some(prior) => SyncState::Changed(prior),
        })
    }

    /// Bring the remote copy of `artifact` up to date for `client_id`.
    ///
    /// Transport failures are returned to the caller after the rate gate
    /// has been passed; metadata is only written on success.
    pub async fn sync(&self, artifact: &Artifact, client_id: &str) -> SyncResult<SyncOutcome> {
        if artifact.is_blank() {
            tracing::warn!(
                client_id,
                filename = %artifact.filename,
                "empty file content, skipping"
            );
            return Ok(SyncOutcome::Skipped);
        }

        let result = self.sync_present(artifact, client_id).await;
        self.gate.throttle().await;

        if let Err(e) = &result {
            tracing::error!(
                client_id,
                filename = %artifact.filename,
                error = %e,
                "error processing file"
            );
        }
        result
    }

    async fn sync_present(&self, artifact: &Artifact, client_id: &str) -> SyncResult<SyncOutcome> {
        let filename = artifact.filename.as_str();
        let metadata = artifact.metadata.as_ref();
        let new_signature = signature(&artifact.content);

        let prior = self.store.get(filename, client_id).await?;

        match prior {
            None => {
                let Some(document_id) = self
                    .remote
                    .create(&artifact.content, filename, client_id, metadata)
                    .await?
                else {
                    tracing::warn!(client_id, filename, "upload returned no id, not recording");
                    return Ok(SyncOutcome::Aborted);
                };

                self.record(filename, &document_id, &new_signature, client_id)
                    .await?;
                tracing::info!(client_id, filename, document_id = %document_id, "file uploaded");
                Ok(SyncOutcome::Uploaded { document_id })
            }
            Some(prior) if prior.signature == new_signature => {
                tracing::info!(
                    client_id,
                    filename,
                    last_updated = %prior.last_updated.to_rfc3339(),
                    "file unchanged (same signature)"
                );
                Ok(SyncOutcome::Unchanged {
                    document_id: prior.remote_document_id,
                })
            }
            Some(prior) => {
                tracing::debug!(
                    client_id,
                    filename,
                    last_updated = %prior.last_updated.to_rfc3339(),
                    "signature changed"
                );
                let Some(document_id) = self
                    .remote
                    .replace(
                        &prior.remote_document_id,
                        &artifact.content,
                        filename,
                        client_id,
                        metadata,
                    )
                    .await?
                else {
                    tracing::warn!(client_id, filename, "re-upload returned no id, not recording");
                    return Ok(SyncOutcome::Aborted);
                };

                let recreated = document_id != prior.remote_document_id;
                self.record(filename, &document_id, &new_signature, client_id)
                    .await?;
                tracing::info!(
                    client_id,
                    filename,
                    document_id = %document_id,
                    recreated,
                    "file replaced (signature changed)"
                );
                Ok(SyncOutcome::Replaced {
                    document_id,
                    recreated,
                })
            }
        }
    }

    async fn record(
        &self,
        filename: &str,
        document_id: &str,
        signature: &Signature,
        client_id: &str,
    ) -> SyncResult<()> {
        self.store
            .put(filename, document_id, signature, Utc::now(), client_id)
            .await
    }
}
