//! Configured pipelines that feed artifacts into the sync engine.
//!
//! Each `[jobs.<name>]` entry is one of three kinds:
//!
//! | Kind | Source | Artifacts |
//! |------|--------|-----------|
//! | `schedule` | paginated league schedule | one CSV report with SQL metadata |
//! | `activities` | park activities listing | one CSV report with SQL metadata |
//! | `directory` | local files under `root` | one per matching file |
//!
//! # Directory jobs
//!
//! Files are walked with `walkdir` and filtered with `globset` include and
//! exclude patterns relative to `root`. A file `<stem>_metadata.json` next
//! to `<stem>.<ext>` is attached as that file's metadata and is never
//! uploaded itself. A failing file is counted and the walk continues.
//!
//! # Failure model
//!
//! [`JobRunner::run_all`] runs jobs in name order. A failed job is logged
//! and recorded in the [`CycleReport`]; the remaining jobs still run.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_json::Value;
use walkdir::WalkDir;

use crate::activities::{self, ActivitySource};
use crate::config::{
    ActivitiesJobConfig, Config, DirectoryJobConfig, JobConfig, ScheduleJobConfig,
};
use crate::engine::{SyncEngine, SyncOutcome};
use crate::export;
use crate::harvest::{harvest, PageSource};
use crate::models::Artifact;
use crate::schedule::{self, ScheduleEvent};

const SIDECAR_SUFFIX: &str = "_metadata.json";

/// Outcome counts for one job run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    pub name: String,
    pub kind: &'static str,
    pub client: String,
    pub outcomes: BTreeMap<&'static str, usize>,
    /// Artifacts whose sync returned an error.
    pub failed: usize,
}

impl JobReport {
    fn new(name: &str, job: &JobConfig) -> Self {
        Self {
            name: name.to_string(),
            kind: job.kind(),
            client: job.client().to_string(),
            ..Default::default()
        }
    }

    fn record(&mut self, outcome: &SyncOutcome) {
        *self.outcomes.entry(outcome.label()).or_default() += 1;
    }

    pub fn count(&self, label: &str) -> usize {
        self.outcomes.get(label).copied().unwrap_or(0)
    }

    pub fn summary(&self) -> String {
        let mut parts: Vec<String> = self
            .outcomes
            .iter()
            .map(|(label, n)| format!("{} {}", n, label))
            .collect();
        if self.failed > 0 {
            parts.push(format!("{} failed", self.failed));
        }
        if parts.is_empty() {
            "nothing to sync".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Result of one pass over every configured job.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub reports: Vec<JobReport>,
    pub failures: Vec<(String, anyhow::Error)>,
}

impl CycleReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct JobRunner {
    config: Arc<Config>,
    engine: Arc<SyncEngine>,
    schedule_feed: Arc<dyn PageSource<Item = ScheduleEvent>>,
    activities_feed: Arc<dyn ActivitySource>,
}

impl JobRunner {
    pub fn new(
        config: Arc<Config>,
        engine: Arc<SyncEngine>,
        schedule_feed: Arc<dyn PageSource<Item = ScheduleEvent>>,
        activities_feed: Arc<dyn ActivitySource>,
    ) -> Self {
        Self {
            config,
            engine,
            schedule_feed,
            activities_feed,
        }
    }

    pub fn job_names(&self) -> Vec<String> {
        self.config.jobs.keys().cloned().collect()
    }

    /// Run a single named job.
    pub async fn run_job(&self, name: &str) -> Result<JobReport> {
        let Some(job) = self.config.jobs.get(name) else {
            bail!(
                "Unknown job '{}'. Configured jobs: {}",
                name,
                self.job_names().join(", ")
            );
        };

        tracing::info!(job = name, kind = job.kind(), client = job.client(), "job starting");
        let mut report = JobReport::new(name, job);

        match job {
            JobConfig::Schedule(j) => self.run_schedule(j, &mut report).await?,
            JobConfig::Activities(j) => self.run_activities(j, &mut report).await?,
            JobConfig::Directory(j) => self.run_directory(j, &mut report).await?,
        }

        tracing::info!(job = name, summary = %report.summary(), "job finished");
        Ok(report)
    }

    /// Run every configured job in name order.
    pub async fn run_all(&self) -> CycleReport {
        let mut cycle = CycleReport::default();
        for name in self.config.jobs.keys() {
            match self.run_job(name).await {
                Ok(report) => cycle.reports.push(report),
                Err(e) => {
                    tracing::error!(job = %name, error = %format!("{:#}", e), "job failed");
                    cycle.failures.push((name.clone(), e));
                }
            }
        }
        cycle
    }

    async fn sync_one(&self, artifact: &Artifact, client: &str, report: &mut JobReport) -> Result<()> {
        let outcome = self
            .engine
            .sync(artifact, client)
            .await
            .with_context(|| format!("sync of '{}' failed", artifact.filename))?;
        report.record(&outcome);
        Ok(())
    }

    async fn run_schedule(&self, job: &ScheduleJobConfig, report: &mut JobReport) -> Result<()> {
        let mut events = harvest(self.schedule_feed.as_ref(), &job.league_id)
            .await
            .with_context(|| format!("harvest of league {} failed", job.league_id))?;
        if job.dedupe_events {
            events = schedule::dedupe_by_match(events);
        }

        let description = job
            .description
            .clone()
            .unwrap_or_else(|| schedule::default_description(&job.league_id));
        let built = schedule::build_report(events, &description);
        let filename = job.filename();

        if job.save_copy {
            self.save_copy(&job.client, &filename, &built.csv, &built.metadata)?;
        }

        tracing::info!(league_id = %job.league_id, rows = built.rows, "schedule report built");
        let artifact = Artifact::new(filename, built.csv).with_metadata(built.metadata);
        self.sync_one(&artifact, &job.client, report).await
    }

    async fn run_activities(&self, job: &ActivitiesJobConfig, report: &mut JobReport) -> Result<()> {
        let items = self
            .activities_feed
            .fetch(&job.park_code)
            .await
            .with_context(|| format!("activities fetch for park {} failed", job.park_code))?;

        let table_name = job
            .table_name
            .clone()
            .unwrap_or_else(|| activities::default_table_name(&job.park_code));
        let description = job
            .description
            .clone()
            .unwrap_or_else(|| activities::default_description(&job.park_code));
        let built = activities::build_report(&items, &table_name, &description);

        let artifact = Artifact::new(job.filename(), built.csv).with_metadata(built.metadata);
        self.sync_one(&artifact, &job.client, report).await
    }

    async fn run_directory(&self, job: &DirectoryJobConfig, report: &mut JobReport) -> Result<()> {
        let artifacts = scan_directory(job)?;
        tracing::info!(root = %job.root.display(), files = artifacts.len(), "directory scanned");

        for artifact in &artifacts {
            if let Err(e) = self.sync_one(artifact, &job.client, report).await {
                tracing::warn!(
                    client_id = %job.client,
                    filename = %artifact.filename,
                    error = %format!("{:#}", e),
                    "file failed, continuing"
                );
                report.failed += 1;
            }
        }
        Ok(())
    }

    fn save_copy(&self, client: &str, filename: &str, csv: &str, metadata: &Value) -> Result<()> {
        let dir = &self.config.export.dir;
        export::save_to_client_directory(dir, client, filename, csv.as_bytes())?;
        export::save_json_to_client_directory(
            dir,
            client,
            &export::metadata_filename(filename),
            metadata,
        )?;
        Ok(())
    }
}

/// Collect the artifacts a directory job would upload, sorted by name.
pub fn scan_directory(job: &DirectoryJobConfig) -> Result<Vec<Artifact>> {
    let root = &job.root;
    if !root.exists() {
        bail!("Directory job root does not exist: {}", root.display());
    }

    let include_set = build_globset(&job.include_globs)?;
    let mut excludes = vec!["**/.git/**".to_string()];
    excludes.extend(job.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut artifacts = Vec::new();
    for entry in WalkDir::new(root).follow_links(job.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if rel_str.ends_with(SIDECAR_SUFFIX)
            || exclude_set.is_match(&rel_str)
            || !include_set.is_match(&rel_str)
        {
            continue;
        }

        let content = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut artifact = Artifact::new(rel_str, content);
        if let Some(metadata) = read_sidecar(path) {
            artifact = artifact.with_metadata(metadata);
        }
        artifacts.push(artifact);
    }

    artifacts.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(artifacts)
}

fn read_sidecar(path: &Path) -> Option<Value> {
    let stem = path.file_stem()?.to_string_lossy();
    let sidecar = path.with_file_name(format!("{}{}", stem, SIDECAR_SUFFIX));
    let raw = std::fs::read_to_string(&sidecar).ok()?;
    match serde_json::from_str::<Value>(&raw) {
        Ok(v @ Value::Object(_)) => Some(v),
        Ok(_) => {
            tracing::warn!(path = %sidecar.display(), "metadata sidecar is not a JSON object");
            None
        }
        Err(e) => {
            tracing::warn!(path = %sidecar.display(), error = %e, "invalid metadata sidecar");
            None
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("bad glob '{}'", pattern))?);
    }
    Ok(builder.build()?)
}
