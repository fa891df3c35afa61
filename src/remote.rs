//! Remote document store client.
//!
//! The remote store is a chat-bot knowledge base addressed per tenant by a
//! chatbot id, a project id, and an API key. Documents are uploaded as
//! `multipart/form-data` with three fields:
//!
//! | Field | Content |
//! |-------|---------|
//! | `file` | artifact bytes, named after the artifact |
//! | `project_id` | tenant project id |
//! | `metadata` | JSON string: `{"type": "file", "filename": ...}` merged with caller metadata |
//!
//! # Endpoints
//!
//! ```text
//! POST /chatbot/{chatbot}/document                      create
//! PUT  /chatbot/{chatbot}/document/{id}                 replace (404 → create)
//! GET  /chatbot/{chatbot}/document/{id}?project_id=     fetch
//! GET  /chatbot/{chatbot}/document/list?project_id=&page=&number=
//! GET  /chatbot/{chatbot}?project_id=                   chatbot (warm-up messages)
//! PUT  /chatbot/{chatbot}                               update chatbot
//! ```
//!
//! All responses wrap their payload as `{ "body": ... }`.
//!
//! # Failure model
//!
//! Nothing is retried here. A 404 on `PUT` is the only recoverable
//! condition: [`RemoteDocumentClient::replace`] falls back to
//! [`create`](RemoteDocumentClient::create) and returns the freshly minted
//! id. Every other failure surfaces as [`SyncError::RemoteUnavailable`].

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::{SyncError, SyncResult};
use crate::models::DocumentMetadata;

/// Document operations against the remote store.
///
/// Implementors provide the four raw requests; [`replace`](Self::replace)
/// layers the not-found recovery on top of [`update`](Self::update).
#[async_trait]
pub trait RemoteDocumentClient: Send + Sync {
    /// Upload a new document.
    ///
    /// Returns `Ok(None)` when the store accepted the request but did not
    /// report an id. Callers treat that as a soft failure.
    async fn create(
        &self,
        content: &[u8],
        filename: &str,
        client_id: &str,
        metadata: Option<&DocumentMetadata>,
    ) -> SyncResult<Option<String>>;

    /// Overwrite an existing document in place.
    ///
    /// Must return [`SyncError::RemoteNotFound`] when the store no longer
    /// knows `document_id`.
    async fn update(
        &self,
        document_id: &str,
        content: &[u8],
        filename: &str,
        client_id: &str,
        metadata: Option<&DocumentMetadata>,
    ) -> SyncResult<Option<String>>;

    async fn fetch(&self, document_id: &str, client_id: &str) -> SyncResult<Value>;

    async fn list(&self, client_id: &str, page: u32, page_size: u32) -> SyncResult<Vec<Value>>;

    /// Replace a document, re-creating it if the store lost track of it.
    ///
    /// Returns the id the document lives under afterwards: the store's
    /// answer when it gives one, `document_id` when it does not, or the new
    /// id after a fallback create.
    async fn replace(
        &self,
        document_id: &str,
        content: &[u8],
        filename: &str,
        client_id: &str,
        metadata: Option<&DocumentMetadata>,
    ) -> SyncResult<Option<String>> {
        if document_id.trim().is_empty() {
            return Err(SyncError::MissingRequiredIdentifier {
                operation: "replace",
            });
        }

        match self
            .update(document_id, content, filename, client_id, metadata)
            .await
        {
            Ok(id) => Ok(Some(id.unwrap_or_else(|| document_id.to_string()))),
            Err(e) if e.is_not_found() => {
                tracing::info!(
                    client_id,
                    filename,
                    document_id,
                    "document missing on remote, uploading again"
                );
                self.create(content, filename, client_id, metadata).await
            }
            Err(e) => Err(e),
        }
    }
}

/// Access to the chat-bot resource itself (warm-up messages).
#[async_trait]
pub trait ChatbotClient: Send + Sync {
    /// Returns the chatbot's `body` object.
    async fn get_chatbot(&self, client_id: &str) -> SyncResult<Value>;

    async fn update_chatbot(&self, client_id: &str, body: &Value) -> SyncResult<()>;
}

/// Per-tenant identifiers and API key.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub chatbot_id: String,
    pub project_id: String,
    pub api_key: String,
}

/// HTTP implementation of [`RemoteDocumentClient`] and [`ChatbotClient`].
pub struct HttpDocumentClient {
    http: reqwest::Client,
    base_url: String,
    clients: BTreeMap<String, ClientCredentials>,
}

impl HttpDocumentClient {
    pub fn new(base_url: &str, timeout: Duration) -> SyncResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::InvalidInput(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            clients: BTreeMap::new(),
        })
    }

    /// Build a client for every configured tenant.
    ///
    /// API keys are read from the environment variable each client names.
    /// Clients whose variable is unset are skipped with a warning; calls
    /// for them fail with [`SyncError::UnknownClient`].
    pub fn from_config(config: &Config) -> SyncResult<Self> {
        let mut client = Self::new(
            &config.remote.base_url,
            Duration::from_secs(config.remote.timeout_secs),
        )?;

        for (id, c) in &config.clients {
            match std::env::var(&c.api_key_env) {
                Ok(api_key) => {
                    client = client.with_client(
                        id,
                        ClientCredentials {
                            chatbot_id: c.chatbot_id.clone(),
                            project_id: c.project_id.clone(),
                            api_key,
                        },
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        client_id = %id,
                        env = %c.api_key_env,
                        "API key environment variable not set, client disabled"
                    );
                }
            }
        }

        Ok(client)
    }

    pub fn with_client(mut self, client_id: &str, credentials: ClientCredentials) -> Self {
        self.clients.insert(client_id.to_string(), credentials);
        self
    }

    fn credentials(&self, client_id: &str) -> SyncResult<&ClientCredentials> {
        self.clients
            .get(client_id)
            .ok_or_else(|| SyncError::UnknownClient(client_id.to_string()))
    }

    fn documents_url(&self, creds: &ClientCredentials) -> String {
        format!("{}/chatbot/{}/document", self.base_url, creds.chatbot_id)
    }

    fn chatbot_url(&self, creds: &ClientCredentials) -> String {
        format!("{}/chatbot/{}", self.base_url, creds.chatbot_id)
    }
}

/// Merge the fixed `{type, filename}` fields with caller metadata.
///
/// Caller-supplied keys override the fixed ones.
pub fn merge_metadata(filename: &str, metadata: Option<&DocumentMetadata>) -> Value {
    let mut merged = Map::new();
    merged.insert("type".to_string(), Value::from("file"));
    merged.insert("filename".to_string(), Value::from(filename));
    if let Some(extra) = metadata {
        for (k, v) in extra {
            merged.insert(k.clone(), v.clone());
        }
    }
    Value::Object(merged)
}

/// Detect the MIME type sent with the `file` part from the filename extension.
pub fn detect_content_type(filename: &str) -> &'static str {
    match filename.rsplit('.').next().map(|e| e.to_ascii_lowercase()) {
        Some(ext) => match ext.as_str() {
            "csv" => "text/csv",
            "json" => "application/json",
            "md" => "text/markdown",
            "txt" => "text/plain",
            "html" | "htm" => "text/html",
            "pdf" => "application/pdf",
            _ => "application/octet-stream",
        },
        None => "application/octet-stream",
    }
}

fn build_form(
    creds: &ClientCredentials,
    content: &[u8],
    filename: &str,
    metadata: Option<&DocumentMetadata>,
) -> SyncResult<Form> {
    if content.is_empty() {
        return Err(SyncError::EmptyContent {
            filename: filename.to_string(),
        });
    }
    let file = Part::bytes(content.to_vec())
        .file_name(filename.to_string())
        .mime_str(detect_content_type(filename))
        .map_err(|e| SyncError::InvalidInput(format!("bad content type for {}: {}", filename, e)))?;

    Ok(Form::new()
        .part("file", file)
        .text("project_id", creds.project_id.clone())
        .text("metadata", merge_metadata(filename, metadata).to_string()))
}

/// Pull `body.id` out of a store response; ids may come back as strings or numbers.
fn extract_id(json: &Value) -> Option<String> {
    match json.get("body")?.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

async fn error_body(resp: Response) -> String {
    resp.text()
        .await
        .unwrap_or_default()
        .chars()
        .take(500)
        .collect()
}

async fn json_body(resp: Response, client_id: &str, target: &str) -> SyncResult<Value> {
    let status = resp.status();
    resp.json::<Value>().await.map_err(|e| {
        SyncError::unavailable(
            client_id,
            target,
            Some(status.as_u16()),
            format!("invalid response body: {}", e),
        )
    })
}

#[async_trait]
impl RemoteDocumentClient for HttpDocumentClient {
    async fn create(
        &self,
        content: &[u8],
        filename: &str,
        client_id: &str,
        metadata: Option<&DocumentMetadata>,
    ) -> SyncResult<Option<String>> {
        let creds = self.credentials(client_id)?;
        let form = build_form(creds, content, filename, metadata)?;

        let resp = self
            .http
            .post(self.documents_url(creds))
            .header("x-api-key", &creds.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(client_id, filename, error = %e, "upload failed");
                SyncError::unavailable(client_id, filename, None, e.to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = error_body(resp).await;
            tracing::error!(client_id, filename, %status, %body, "upload rejected");
            return Err(SyncError::unavailable(
                client_id,
                filename,
                Some(status.as_u16()),
                body,
            ));
        }

        let id = match resp.json::<Value>().await {
            Ok(json) => extract_id(&json),
            Err(e) => {
                tracing::warn!(client_id, filename, error = %e, "upload response was not JSON");
                None
            }
        };

        match &id {
            Some(id) => tracing::info!(client_id, filename, document_id = %id, "document created"),
            None => tracing::warn!(client_id, filename, "document created but no id returned"),
        }
        Ok(id)
    }

    async fn update(
        &self,
        document_id: &str,
        content: &[u8],
        filename: &str,
        client_id: &str,
        metadata: Option<&DocumentMetadata>,
    ) -> SyncResult<Option<String>> {
        if document_id.trim().is_empty() {
            return Err(SyncError::MissingRequiredIdentifier {
                operation: "update",
            });
        }
        let creds = self.credentials(client_id)?;
        let form = build_form(creds, content, filename, metadata)?;

        let resp = self
            .http
            .put(format!("{}/{}", self.documents_url(creds), document_id))
            .header("x-api-key", &creds.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(client_id, filename, error = %e, "replace failed");
                SyncError::unavailable(client_id, filename, None, e.to_string())
            })?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SyncError::RemoteNotFound {
                document_id: document_id.to_string(),
            });
        }
        if !status.is_success() {
            let body = error_body(resp).await;
            tracing::error!(client_id, filename, document_id, %status, %body, "replace rejected");
            return Err(SyncError::unavailable(
                client_id,
                filename,
                Some(status.as_u16()),
                body,
            ));
        }

        let id = resp.json::<Value>().await.ok().as_ref().and_then(extract_id);
        tracing::info!(client_id, filename, document_id, "document replaced");
        Ok(id)
    }

    async fn fetch(&self, document_id: &str, client_id: &str) -> SyncResult<Value> {
        if document_id.trim().is_empty() {
            return Err(SyncError::MissingRequiredIdentifier { operation: "fetch" });
        }
        let creds = self.credentials(client_id)?;

        let resp = self
            .http
            .get(format!("{}/{}", self.documents_url(creds), document_id))
            .query(&[("project_id", creds.project_id.as_str())])
            .header("x-api-key", &creds.api_key)
            .send()
            .await
            .map_err(|e| SyncError::unavailable(client_id, document_id, None, e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SyncError::RemoteNotFound {
                document_id: document_id.to_string(),
            });
        }
        if !status.is_success() {
            let body = error_body(resp).await;
            return Err(SyncError::unavailable(
                client_id,
                document_id,
                Some(status.as_u16()),
                body,
            ));
        }

        let mut json = json_body(resp, client_id, document_id).await?;
        Ok(json.get_mut("body").map(Value::take).unwrap_or(Value::Null))
    }

    async fn list(&self, client_id: &str, page: u32, page_size: u32) -> SyncResult<Vec<Value>> {
        let creds = self.credentials(client_id)?;

        let resp = self
            .http
            .get(format!("{}/list", self.documents_url(creds)))
            .query(&[
                ("project_id", creds.project_id.clone()),
                ("page", page.to_string()),
                ("number", page_size.to_string()),
            ])
            .header("x-api-key", &creds.api_key)
            .send()
            .await
            .map_err(|e| SyncError::unavailable(client_id, "document/list", None, e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = error_body(resp).await;
            return Err(SyncError::unavailable(
                client_id,
                "document/list",
                Some(status.as_u16()),
                body,
            ));
        }

        let mut json = json_body(resp, client_id, "document/list").await?;
        let docs = match json.get_mut("body").map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        tracing::debug!(client_id, page, count = docs.len(), "documents listed");
        Ok(docs)
    }
}

#[async_trait]
impl ChatbotClient for HttpDocumentClient {
    async fn get_chatbot(&self, client_id: &str) -> SyncResult<Value> {
        let creds = self.credentials(client_id)?;

        let resp = self
            .http
            .get(self.chatbot_url(creds))
            .query(&[("project_id", creds.project_id.as_str())])
            .header("x-api-key", &creds.api_key)
            .send()
            .await
            .map_err(|e| SyncError::unavailable(client_id, "chatbot", None, e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = error_body(resp).await;
            return Err(SyncError::unavailable(
                client_id,
                "chatbot",
                Some(status.as_u16()),
                body,
            ));
        }

        let mut json = json_body(resp, client_id, "chatbot").await?;
        Ok(json.get_mut("body").map(Value::take).unwrap_or(Value::Null))
    }

    async fn update_chatbot(&self, client_id: &str, body: &Value) -> SyncResult<()> {
        let creds = self.credentials(client_id)?;

        let resp = self
            .http
            .put(self.chatbot_url(creds))
            .header("x-api-key", &creds.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| SyncError::unavailable(client_id, "chatbot", None, e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = error_body(resp).await;
            return Err(SyncError::unavailable(
                client_id,
                "chatbot",
                Some(status.as_u16()),
                body,
            ));
        }
        Ok(())
    }
}
