//! Core data models used throughout docsync.
//!
//! These types represent the artifacts handed to the sync engine and the
//! per-client metadata it persists between runs.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::signature::Signature;

/// Free-form annotations attached to a remote document.
pub type DocumentMetadata = Map<String, Value>;

/// A named piece of content to be synchronized. Never persisted.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub filename: String,
    pub content: Vec<u8>,
    pub metadata: Option<DocumentMetadata>,
}

impl Artifact {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            metadata: None,
        }
    }

    /// Attach metadata. Non-object JSON values are ignored.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        if let Value::Object(map) = metadata {
            self.metadata = Some(map);
        }
        self
    }

    /// Attach `{"description": ...}` metadata, the shape used for plain uploads.
    pub fn with_description(self, description: impl Into<String>) -> Self {
        let description: String = description.into();
        self.with_metadata(serde_json::json!({ "description": description }))
    }

    /// True when the content is empty or consists only of whitespace.
    pub fn is_blank(&self) -> bool {
        match std::str::from_utf8(&self.content) {
            Ok(text) => text.trim().is_empty(),
            Err(_) => self.content.iter().all(u8::is_ascii_whitespace),
        }
    }
}

/// What the store remembers about the last successful sync of an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMetadata {
    pub filename: String,
    pub client_id: String,
    pub remote_document_id: String,
    pub signature: Signature,
    pub last_updated: DateTime<Utc>,
}
