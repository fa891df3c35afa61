//! Cursor-paginated harvesting.
//!
//! A [`PageSource`] returns one page of items plus an optional cursor to
//! the next (older) page. [`harvest`] starts from the newest page and keeps
//! following the cursor until a page arrives without one, then returns the
//! items of every page concatenated in fetch order.
//!
//! Items are not de-duplicated here; see [`crate::schedule::dedupe_by_match`]
//! for the optional post-processing stage. A failed page aborts the whole
//! harvest.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::ScheduleFeedConfig;
use crate::error::{SyncError, SyncResult};
use crate::schedule::ScheduleEvent;

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor to the next older page, if any.
    pub older: Option<String>,
}

#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;

    /// Fetch one page. `token` is `None` for the newest page.
    async fn fetch_page(&self, resource_id: &str, token: Option<&str>)
        -> SyncResult<Page<Self::Item>>;
}

/// Walk `source` from the newest page to the last one and merge the results.
///
/// Stops when a page has no older cursor or an empty one. A cursor that
/// comes back a second time is reported as an upstream error instead of
/// looping forever.
pub async fn harvest<S>(source: &S, resource_id: &str) -> SyncResult<Vec<S::Item>>
where
    S: PageSource + ?Sized,
{
    let mut items = Vec::new();
    let mut token: Option<String> = None;
    let mut seen = HashSet::new();
    let mut pages = 0usize;

    loop {
        let page = source.fetch_page(resource_id, token.as_deref()).await?;
        pages += 1;
        tracing::debug!(
            resource_id,
            page = pages,
            items = page.items.len(),
            "harvested page"
        );
        items.extend(page.items);

        match page.older.filter(|t| !t.is_empty()) {
            Some(next) => {
                if !seen.insert(next.clone()) {
                    return Err(SyncError::upstream(
                        resource_id,
                        format!("page token '{}' repeated after {} pages", next, pages),
                    ));
                }
                token = Some(next);
            }
            None => break,
        }
    }

    tracing::info!(resource_id, pages, items = items.len(), "harvest complete");
    Ok(items)
}

// ============ Schedule feed ============

#[derive(Deserialize)]
struct ScheduleResponse {
    data: ScheduleData,
}

#[derive(Deserialize)]
struct ScheduleData {
    schedule: ScheduleBody,
}

#[derive(Deserialize)]
struct ScheduleBody {
    #[serde(default)]
    events: Vec<ScheduleEvent>,
    #[serde(default)]
    pages: Option<PageTokens>,
}

#[derive(Deserialize)]
struct PageTokens {
    #[serde(default)]
    older: Option<String>,
}

/// HTTP source for `GET {base}/getSchedule?hl=&leagueId=[&pageToken=]`.
pub struct ScheduleFeed {
    http: reqwest::Client,
    base_url: String,
    locale: String,
    api_key: Option<String>,
}

impl ScheduleFeed {
    pub fn new(base_url: &str, locale: &str, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            locale: locale.to_string(),
            api_key,
        }
    }

    /// Build from `[upstream.schedule]`, reading the key from its env var if set.
    pub fn from_config(config: &ScheduleFeedConfig) -> Self {
        Self::new(
            &config.base_url,
            &config.locale,
            std::env::var(&config.api_key_env).ok(),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/getSchedule", self.base_url)
    }
}

#[async_trait]
impl PageSource for ScheduleFeed {
    type Item = ScheduleEvent;

    async fn fetch_page(
        &self,
        league_id: &str,
        token: Option<&str>,
    ) -> SyncResult<Page<ScheduleEvent>> {
        let endpoint = self.endpoint();
        let mut query = vec![("hl", self.locale.as_str()), ("leagueId", league_id)];
        if let Some(token) = token {
            query.push(("pageToken", token));
        }

        let mut req = self.http.get(&endpoint).query(&query);
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| SyncError::upstream(&endpoint, e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::upstream(
                &endpoint,
                format!(
                    "HTTP {}: {}",
                    status,
                    body.chars().take(500).collect::<String>()
                ),
            ));
        }

        let parsed: ScheduleResponse = resp
            .json()
            .await
            .map_err(|e| SyncError::upstream(&endpoint, format!("invalid schedule body: {}", e)))?;

        let schedule = parsed.data.schedule;
        Ok(Page {
            items: schedule.events,
            older: schedule.pages.and_then(|p| p.older),
        })
    }
}
