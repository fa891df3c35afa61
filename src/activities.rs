//! National park "things to do" feed and its CSV projection.
//!
//! `GET {base}/thingstodo?parkCode={code}` with an `x-api-key` header
//! returns `{ "data": [ ... ] }`. The listing is not paginated.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::config::ActivitiesFeedConfig;
use crate::error::{SyncError, SyncResult};
use crate::tabular::{sql_metadata, to_csv, SqlColumn, SqlSchema};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub activities: Vec<NamedTag>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub season: Vec<String>,
    #[serde(default)]
    pub time_of_day: Vec<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default, deserialize_with = "loose_bool")]
    pub is_reservation_required: bool,
    #[serde(default, deserialize_with = "loose_bool")]
    pub are_pets_permitted: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NamedTag {
    pub name: String,
}

/// Upstream sends flags as JSON booleans or as `"true"` / `"false"` strings.
fn loose_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Bool(bool),
        Text(String),
        Other(Value),
    }

    Ok(match Loose::deserialize(deserializer)? {
        Loose::Bool(b) => b,
        Loose::Text(s) => s.trim().eq_ignore_ascii_case("true"),
        Loose::Other(_) => false,
    })
}

fn yes_no(flag: bool) -> String {
    if flag { "Yes" } else { "No" }.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRow {
    pub id: String,
    pub title: String,
    pub short_description: String,
    pub activity_type: String,
    pub location: String,
    pub season: String,
    pub time_of_day: String,
    pub url: String,
    pub is_reservation_required: String,
    pub are_pets_permitted: String,
}

impl ActivityRow {
    fn into_fields(self) -> Vec<String> {
        vec![
            self.id,
            self.title,
            self.short_description,
            self.activity_type,
            self.location,
            self.season,
            self.time_of_day,
            self.url,
            self.is_reservation_required,
            self.are_pets_permitted,
        ]
    }
}

pub fn project(activity: &Activity) -> ActivityRow {
    ActivityRow {
        id: activity.id.clone(),
        title: activity.title.clone(),
        short_description: activity.short_description.clone(),
        activity_type: activity
            .activities
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        location: activity.location.clone(),
        season: activity.season.join(", "),
        time_of_day: activity.time_of_day.join(", "),
        url: activity.url.clone(),
        is_reservation_required: yes_no(activity.is_reservation_required),
        are_pets_permitted: yes_no(activity.are_pets_permitted),
    }
}

/// `yose` keeps its historical table name; other parks get `{code}_activities`.
pub fn default_table_name(park_code: &str) -> String {
    if park_code == "yose" {
        "yosemite_activities".to_string()
    } else {
        format!("{}_activities", park_code.to_ascii_lowercase())
    }
}

pub fn schema(table_name: &str) -> SqlSchema {
    SqlSchema {
        table_name: Some(table_name.to_string()),
        columns: vec![
            SqlColumn::new("id", "TEXT"),
            SqlColumn::new("title", "TEXT"),
            SqlColumn::new("shortDescription", "TEXT"),
            SqlColumn::new("activityType", "TEXT"),
            SqlColumn::new("location", "TEXT"),
            SqlColumn::new("season", "TEXT"),
            SqlColumn::new("timeOfDay", "TEXT"),
            SqlColumn::new("url", "TEXT"),
            SqlColumn::new("isReservationRequired", "TEXT"),
            SqlColumn::new("arePetsPermitted", "TEXT"),
        ],
    }
}

pub fn default_description(park_code: &str) -> String {
    format!(
        "Activities available in national park '{}'. Sample data: title='Backpacking', \
         activityType='Hiking, Camping', location='Yosemite Valley', \
         season='Spring, Summer, Fall', isReservationRequired='Yes', arePetsPermitted='No'",
        park_code
    )
}

#[derive(Debug, Clone)]
pub struct ActivityReport {
    pub csv: String,
    pub metadata: Value,
    pub rows: usize,
}

pub fn build_report(activities: &[Activity], table_name: &str, description: &str) -> ActivityReport {
    let schema = schema(table_name);
    let csv = to_csv(
        &schema.column_names(),
        activities.iter().map(|a| project(a).into_fields()),
    );
    ActivityReport {
        csv,
        metadata: sql_metadata(&schema, description),
        rows: activities.len(),
    }
}

#[derive(Deserialize)]
struct ActivitiesResponse {
    #[serde(default)]
    data: Vec<Activity>,
}

#[async_trait]
pub trait ActivitySource: Send + Sync {
    async fn fetch(&self, park_code: &str) -> SyncResult<Vec<Activity>>;
}

/// HTTP client for the activities listing.
pub struct ActivitiesFeed {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ActivitiesFeed {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn from_config(config: &ActivitiesFeedConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            tracing::warn!(env = %config.api_key_env, "activities API key not set");
        }
        Self::new(&config.base_url, api_key)
    }
}

#[async_trait]
impl ActivitySource for ActivitiesFeed {
    async fn fetch(&self, park_code: &str) -> SyncResult<Vec<Activity>> {
        let endpoint = format!("{}/thingstodo", self.base_url);
        let mut req = self.http.get(&endpoint).query(&[("parkCode", park_code)]);
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

        let parsed: ActivitiesResponse = resp
            .json()
            .await
            .map_err(|e| SyncError::upstream(&endpoint, format!("invalid activities body: {}", e)))?;

        tracing::info!(park_code, count = parsed.data.len(), "activities fetched");
        Ok(parsed.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Activity {
        serde_json::from_value(json!({
            "id": "A1",
            "title": "Backpacking",
            "shortDescription": "Overnight trips, with permits",
            "activities": [{ "id": "x", "name": "Hiking" }, { "id": "y", "name": "Camping" }],
            "location": "Yosemite Valley",
            "season": ["Spring", "Summer", "Fall"],
            "timeOfDay": ["Day"],
            "url": "https://www.nps.gov/thingstodo/backpacking.htm",
            "isReservationRequired": "true",
            "arePetsPermitted": false
        }))
        .unwrap()
    }

    #[test]
    fn test_project_joins_lists_and_flags() {
        let row = project(&sample());
        assert_eq!(row.activity_type, "Hiking, Camping");
        assert_eq!(row.season, "Spring, Summer, Fall");
        assert_eq!(row.is_reservation_required, "Yes");
        assert_eq!(row.are_pets_permitted, "No");
    }

    #[test]
    fn test_loose_bool_variants() {
        for (raw, want) in [
            (json!(true), true),
            (json!("TRUE"), true),
            (json!("false"), false),
            (json!(""), false),
            (json!(null), false),
        ] {
            let a: Activity = serde_json::from_value(json!({ "arePetsPermitted": raw })).unwrap();
            assert_eq!(a.are_pets_permitted, want);
        }
    }

    #[test]
    fn test_missing_fields_default() {
        let a: Activity = serde_json::from_value(json!({ "id": "B" })).unwrap();
        let row = project(&a);
        assert_eq!(row.activity_type, "");
        assert_eq!(row.is_reservation_required, "No");
    }

    #[test]
    fn test_report_escapes_commas() {
        let report = build_report(&[sample()], "yosemite_activities", "desc");
        let mut lines = report.csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,title,shortDescription,activityType,location,season,timeOfDay,url,isReservationRequired,arePetsPermitted"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("A1,Backpacking,\"Overnight trips, with permits\",\"Hiking, Camping\""));
        assert_eq!(report.metadata["sql_schema"]["table_name"], "yosemite_activities");
        assert_eq!(report.rows, 1);
    }

    #[test]
    fn test_default_table_name() {
        assert_eq!(default_table_name("yose"), "yosemite_activities");
        assert_eq!(default_table_name("ZION"), "zion_activities");
    }
}
