use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub clients: BTreeMap<String, ClientConfig>,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub jobs: BTreeMap<String, JobConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default = "default_remote_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_remote_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_remote_base_url() -> String {
    "https://controller.thetaedgecloud.com".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

/// Credentials and identifiers for one tenant of the remote store.
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub chatbot_id: String,
    pub project_id: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_api_key_env() -> String {
    "TEC_API_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Pause after each artifact sync, in milliseconds. Zero disables it.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_delay_ms() -> u64 {
    500
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub allow_overlap: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            allow_overlap: false,
        }
    }
}

fn default_interval_secs() -> u64 {
    600
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub schedule: ScheduleFeedConfig,
    #[serde(default)]
    pub activities: ActivitiesFeedConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleFeedConfig {
    #[serde(default = "default_schedule_base_url")]
    pub base_url: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_schedule_key_env")]
    pub api_key_env: String,
}

impl Default for ScheduleFeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_schedule_base_url(),
            locale: default_locale(),
            api_key_env: default_schedule_key_env(),
        }
    }
}

fn default_schedule_base_url() -> String {
    "https://esports-api.lolesports.com/persisted/gw".to_string()
}
fn default_locale() -> String {
    "en-US".to_string()
}
fn default_schedule_key_env() -> String {
    "RIOT_API_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ActivitiesFeedConfig {
    #[serde(default = "default_activities_base_url")]
    pub base_url: String,
    #[serde(default = "default_activities_key_env")]
    pub api_key_env: String,
}

impl Default for ActivitiesFeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_activities_base_url(),
            api_key_env: default_activities_key_env(),
        }
    }
}

fn default_activities_base_url() -> String {
    "https://developer.nps.gov/api/v1".to_string()
}
fn default_activities_key_env() -> String {
    "NPS_API_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    #[serde(default = "default_export_dir")]
    pub dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: default_export_dir(),
        }
    }
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("data")
}

/// A named pipeline that produces artifacts for one client.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobConfig {
    Schedule(ScheduleJobConfig),
    Activities(ActivitiesJobConfig),
    Directory(DirectoryJobConfig),
}

impl JobConfig {
    pub fn client(&self) -> &str {
        match self {
            JobConfig::Schedule(j) => &j.client,
            JobConfig::Activities(j) => &j.client,
            JobConfig::Directory(j) => &j.client,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            JobConfig::Schedule(_) => "schedule",
            JobConfig::Activities(_) => "activities",
            JobConfig::Directory(_) => "directory",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleJobConfig {
    pub client: String,
    pub league_id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub dedupe_events: bool,
    #[serde(default)]
    pub save_copy: bool,
}

impl ScheduleJobConfig {
    pub fn filename(&self) -> String {
        self.filename
            .clone()
            .unwrap_or_else(|| format!("{}_schedule_and_results.csv", self.league_id))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ActivitiesJobConfig {
    pub client: String,
    #[serde(default = "default_park_code")]
    pub park_code: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ActivitiesJobConfig {
    pub fn filename(&self) -> String {
        self.filename
            .clone()
            .unwrap_or_else(|| format!("{}-activities.csv", self.park_code))
    }
}

fn default_park_code() -> String {
    "yose".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DirectoryJobConfig {
    pub client: String,
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.csv".to_string(),
        "**/*.json".to_string(),
        "**/*.md".to_string(),
        "**/*.txt".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Look up a client's configuration by id.
    pub fn client(&self, client_id: &str) -> Option<&ClientConfig> {
        self.clients.get(client_id)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.remote.base_url.trim().is_empty() {
        anyhow::bail!("remote.base_url must not be empty");
    }

    if config.remote.timeout_secs == 0 {
        anyhow::bail!("remote.timeout_secs must be > 0");
    }

    if config.scheduler.interval_secs == 0 {
        anyhow::bail!("scheduler.interval_secs must be > 0");
    }

    for (id, client) in &config.clients {
        if client.chatbot_id.trim().is_empty() || client.project_id.trim().is_empty() {
            anyhow::bail!("clients.{}: chatbot_id and project_id must be set", id);
        }
    }

    for (name, job) in &config.jobs {
        if !config.clients.contains_key(job.client()) {
            anyhow::bail!(
                "jobs.{}: unknown client '{}'. Configured clients: {}",
                name,
                job.client(),
                config.clients.keys().cloned().collect::<Vec<_>>().join(", ")
            );
        }
        if let JobConfig::Schedule(s) = job {
            if s.league_id.trim().is_empty() {
                anyhow::bail!("jobs.{}: league_id must not be empty", name);
            }
        }
    }

    Ok(())
}
