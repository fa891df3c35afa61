//! Warm-up conversations seeded on the chat-bot.
//!
//! A chat-bot carries a flat list of `{role, content}` messages that
//! alternate user / assistant. Pushing a new pair either rewrites the
//! assistant answer of an existing user prompt or appends the pair.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{SyncError, SyncResult};
use crate::remote::ChatbotClient;

/// One stored message. `content` is kept as raw JSON and any other fields
/// the chat-bot stores ride along in `extra`, so a read-merge-write cycle
/// sends untouched messages back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmupMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WarmupMessage {
    fn new(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content: Value::String(content),
            extra: Map::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content.into())
    }
}

/// A user prompt and the assistant answer that should follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmupPair {
    pub user: WarmupMessage,
    pub assistant: WarmupMessage,
}

/// Split a flat `[user, assistant, user, assistant, ...]` list into pairs.
pub fn pairs_from_messages(messages: Vec<WarmupMessage>) -> SyncResult<Vec<WarmupPair>> {
    if messages.len() % 2 != 0 {
        return Err(SyncError::InvalidInput(format!(
            "warm-up messages must come in user/assistant pairs, got {}",
            messages.len()
        )));
    }

    let mut pairs = Vec::with_capacity(messages.len() / 2);
    let mut iter = messages.into_iter();
    while let (Some(user), Some(assistant)) = (iter.next(), iter.next()) {
        pairs.push(WarmupPair { user, assistant });
    }
    Ok(pairs)
}

/// Fold `pairs` into `existing`.
///
/// For each pair, the first user message with identical content that is
/// not the last element has its successor replaced. Pairs with no match
/// are appended.
pub fn merge_warmup(mut existing: Vec<WarmupMessage>, pairs: Vec<WarmupPair>) -> Vec<WarmupMessage> {
    for pair in pairs {
        let len = existing.len();
        let hit = existing
            .iter()
            .enumerate()
            .position(|(i, m)| m.role == "user" && m.content == pair.user.content && i + 1 < len);

        match hit {
            Some(i) => existing[i + 1] = pair.assistant,
            None => {
                existing.push(pair.user);
                existing.push(pair.assistant);
            }
        }
    }
    existing
}

/// Read the chat-bot, merge `pairs` into its warm-up list, and write it back.
pub async fn update_warmup(
    client: &dyn ChatbotClient,
    client_id: &str,
    pairs: Vec<WarmupPair>,
) -> SyncResult<Vec<WarmupMessage>> {
    let chatbot = client.get_chatbot(client_id).await?;

    let existing: Vec<WarmupMessage> = match chatbot.get("warm_up_messages") {
        Some(Value::Null) | None => Vec::new(),
        Some(v) => serde_json::from_value(v.clone())?,
    };
    let before = existing.len();
    let merged = merge_warmup(existing, pairs);

    let mut body = serde_json::Map::new();
    if let Some(project_id) = chatbot.get("project_id") {
        body.insert("project_id".to_string(), project_id.clone());
    }
    body.insert("warm_up_messages".to_string(), serde_json::to_value(&merged)?);

    client.update_chatbot(client_id, &Value::Object(body)).await?;
    tracing::info!(client_id, before, after = merged.len(), "warm-up messages updated");
    Ok(merged)
}
