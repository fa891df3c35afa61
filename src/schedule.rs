//! League schedule events and their tabular projection.
//!
//! Post-processing of a harvested schedule is a chain of small stages:
//!
//! ```text
//! harvest() → dedupe_by_match() (optional) → sort_by_start() → project() → to_csv
//! ```
//!
//! Winner and loser are only resolved for `completed` events, from the
//! first team's outcome flag. Everything else reports `TBD`.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::tabular::{sql_metadata, to_csv, SqlColumn, SqlSchema};

/// Placeholder for unknown names, scores, and results.
pub const TBD: &str = "TBD";

/// Reports render times in Pacific Standard Time.
const PST_OFFSET_SECS: i32 = 8 * 3600;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEvent {
    /// `None` when the feed omits `startTime` or sends something that is not
    /// an RFC 3339 timestamp.
    #[serde(default, deserialize_with = "lenient_time")]
    pub start_time: Option<DateTime<Utc>>,
    pub state: String,
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    #[serde(default)]
    pub block_name: Option<String>,
    #[serde(default, rename = "match")]
    pub game: Option<Match>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Match {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub teams: Vec<Team>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Team {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub result: Option<TeamResult>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeamResult {
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub game_wins: Option<u32>,
}

impl ScheduleEvent {
    pub fn is_completed(&self) -> bool {
        self.state == "completed"
    }

    fn team(&self, idx: usize) -> Option<&Team> {
        self.game.as_ref().and_then(|m| m.teams.get(idx))
    }

    pub fn match_id(&self) -> Option<&str> {
        self.game.as_ref().and_then(|m| m.id.as_deref())
    }
}

/// One line of the schedule report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRow {
    pub date: String,
    pub start_time: String,
    pub state: String,
    pub stage: String,
    pub team1: String,
    pub team1_score: String,
    pub team2: String,
    pub team2_score: String,
    pub winner: String,
    pub loser: String,
}

impl ScheduleRow {
    fn into_fields(self) -> Vec<String> {
        vec![
            self.date,
            self.start_time,
            self.state,
            self.stage,
            self.team1,
            self.team1_score,
            self.team2,
            self.team2_score,
            self.winner,
            self.loser,
        ]
    }
}

/// Drop events whose match id was already seen. First occurrence wins;
/// events without a match id are always kept.
pub fn dedupe_by_match(events: Vec<ScheduleEvent>) -> Vec<ScheduleEvent> {
    let before = events.len();
    let mut seen = HashSet::new();
    let kept: Vec<ScheduleEvent> = events
        .into_iter()
        .filter(|e| match e.match_id() {
            Some(id) => seen.insert(id.to_string()),
            None => true,
        })
        .collect();

    let dropped = before - kept.len();
    if dropped > 0 {
        tracing::warn!(dropped, "duplicate schedule events across pages");
    }
    kept
}

/// Stable ascending sort by start time.
/// Stable sort by start time; events without one go last.
pub fn sort_by_start(events: &mut [ScheduleEvent]) {
    events.sort_by_key(|e| (e.start_time.is_none(), e.start_time));
}

fn lenient_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let parsed = raw
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc));
    if parsed.is_none() {
        if let Some(raw) = raw.filter(|v| !v.is_null()) {
            tracing::warn!(start_time = %raw, "unreadable event start time");
        }
    }
    Ok(parsed)
}

fn team_name(team: Option<&Team>) -> String {
    team.and_then(|t| t.name.clone())
        .unwrap_or_else(|| TBD.to_string())
}

fn team_score(team: Option<&Team>) -> String {
    team.and_then(|t| t.result.as_ref())
        .and_then(|r| r.game_wins)
        .map(|w| w.to_string())
        .unwrap_or_else(|| TBD.to_string())
}

/// Project one event into its report row.
pub fn project(event: &ScheduleEvent) -> ScheduleRow {
    let pst = FixedOffset::west_opt(PST_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    let local = event.start_time.map(|t| t.with_timezone(&pst));

    let t1 = event.team(0);
    let t2 = event.team(1);
    let team1 = team_name(t1);
    let team2 = team_name(t2);

    let (winner, loser) = if event.is_completed() {
        let team1_won = t1
            .and_then(|t| t.result.as_ref())
            .and_then(|r| r.outcome.as_deref())
            == Some("win");
        if team1_won {
            (team1.clone(), team2.clone())
        } else {
            (team2.clone(), team1.clone())
        }
    } else {
        (TBD.to_string(), TBD.to_string())
    };

    ScheduleRow {
        date: local
            .map(|t| t.format("%B %-d %Y").to_string())
            .unwrap_or_else(|| TBD.to_string()),
        start_time: local
            .map(|t| format!("{} PST", t.format("%-I:%M %p")))
            .unwrap_or_else(|| TBD.to_string()),
        state: event.state.clone(),
        stage: event.block_name.clone().unwrap_or_default(),
        team1_score: team_score(t1),
        team2_score: team_score(t2),
        team1,
        team2,
        winner,
        loser,
    }
}

pub fn schema() -> SqlSchema {
    SqlSchema {
        table_name: None,
        columns: vec![
            SqlColumn::new("date", "DATE"),
            SqlColumn::new("start_time", "TEXT"),
            SqlColumn::new("state", "TEXT"),
            SqlColumn::new("stage", "TEXT"),
            SqlColumn::new("team1", "TEXT"),
            SqlColumn::new("team1_score", "INTEGER"),
            SqlColumn::new("team2", "TEXT"),
            SqlColumn::new("team2_score", "INTEGER"),
            SqlColumn::new("winner", "TEXT"),
            SqlColumn::new("loser", "TEXT"),
        ],
    }
}

pub fn default_description(league_id: &str) -> String {
    format!(
        "Schedule and results for league {}. The 'stage' column indicates which part of the \
         event the game belongs to (e.g. 'Play-Ins', 'Swiss'). Sample data: \
         date='September 25 2024', start_time='12:00 PM PST', state='completed', \
         stage='Play-Ins', team1='Movistar KOI', team1_score=2, team2='MGN Vikings Esports', \
         team2_score=0, winner='Movistar KOI', loser='MGN Vikings Esports'",
        league_id
    )
}

/// A rendered schedule report: CSV body plus its query metadata.
#[derive(Debug, Clone)]
pub struct ScheduleReport {
    pub csv: String,
    pub metadata: Value,
    pub rows: usize,
}

/// Sort, project, and render `events`. Callers de-duplicate beforehand if wanted.
pub fn build_report(mut events: Vec<ScheduleEvent>, description: &str) -> ScheduleReport {
    sort_by_start(&mut events);
    let schema = schema();
    let rows = events.len();
    let csv = to_csv(
        &schema.column_names(),
        events.iter().map(|e| project(e).into_fields()),
    );
    ScheduleReport {
        csv,
        metadata: sql_metadata(&schema, description),
        rows,
    }
}
