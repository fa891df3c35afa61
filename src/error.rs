//! Error taxonomy for the sync core.
//!
//! The engine, metadata store, remote client, and harvester all return
//! [`SyncResult`]. Orchestration code (jobs, scheduler, CLI) wraps these in
//! `anyhow` with additional context.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while syncing artifacts or harvesting feeds.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The artifact has no meaningful content. Never escalated by the engine.
    #[error("empty content for {filename}")]
    EmptyContent { filename: String },

    /// The remote store has no document with this id.
    #[error("remote document not found: {document_id}")]
    RemoteNotFound { document_id: String },

    /// Any other transport or server failure talking to the remote store.
    #[error("remote store unavailable [{client_id}][{target}]: {message}")]
    RemoteUnavailable {
        client_id: String,
        target: String,
        status: Option<u16>,
        message: String,
    },

    /// An operation that needs a remote document id was called without one.
    #[error("document id is required for {operation}")]
    MissingRequiredIdentifier { operation: &'static str },

    /// No credentials are configured for this client.
    #[error("unknown client: '{0}'")]
    UnknownClient(String),

    /// An upstream feed (schedule, activities) failed or returned garbage.
    #[error("upstream error from {endpoint}: {message}")]
    Upstream { endpoint: String, message: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("metadata store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    pub fn unavailable(
        client_id: &str,
        target: &str,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::RemoteUnavailable {
            client_id: client_id.to_string(),
            target: target.to_string(),
            status,
            message: message.into(),
        }
    }

    pub fn upstream(endpoint: &str, message: impl Into<String>) -> Self {
        Self::Upstream {
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }

    /// Returns true if a replace that failed this way should fall back to create.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::RemoteNotFound { .. })
    }
}
