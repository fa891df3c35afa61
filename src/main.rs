//! # docsync CLI
//!
//! The `docsync` binary drives one-off syncs, configured jobs, and the
//! long-running scheduler.
//!
//! ## Usage
//!
//! ```bash
//! docsync --config ./config/docsync.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docsync init` | Create the SQLite database and schema |
//! | `docsync clients` | List configured clients and API key status |
//! | `docsync status` | Show what has been synced per client |
//! | `docsync sync <path> --client <id>` | Sync one local file |
//! | `docsync run <job\|all>` | Run configured jobs once |
//! | `docsync watch` | Run all jobs on the configured interval |
//! | `docsync harvest schedule --league <id>` | Harvest a league schedule to CSV |
//! | `docsync harvest activities --park <code>` | Fetch park activities to CSV |
//! | `docsync docs fetch\|list` | Inspect documents on the remote store |
//! | `docsync warmup <file> --client <id>` | Push warm-up message pairs |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docsync::activities::{self, ActivitiesFeed, ActivitySource};
use docsync::config::{self, Config};
use docsync::context::AppContext;
use docsync::harvest::{harvest, ScheduleFeed};
use docsync::models::Artifact;
use docsync::remote::RemoteDocumentClient;
use docsync::{clients, migrate, schedule, scheduler, status, warmup};

/// docsync: content-addressed sync of local artifacts into a remote
/// chat-bot document store.
#[derive(Parser)]
#[command(
    name = "docsync",
    version,
    about = "Sync local files and harvested feeds into a remote chat-bot document store"
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docsync.toml")]
    config: PathBuf,

    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// List configured clients and whether their API key is available.
    Clients,

    /// Show the metadata store contents.
    Status {
        /// Only show one client.
        #[arg(long)]
        client: Option<String>,
    },

    /// Sync a single local file to the remote store.
    ///
    /// Uploads on first sight, replaces when the content changed, and does
    /// nothing when the content is identical to the last sync.
    Sync {
        /// File to upload.
        path: PathBuf,

        /// Client (tenant) id from `[clients.<id>]`.
        #[arg(long)]
        client: String,

        /// Remote filename. Defaults to the local file name.
        #[arg(long)]
        filename: Option<String>,

        /// Attach `{"description": ...}` metadata.
        #[arg(long, conflicts_with = "metadata")]
        description: Option<String>,

        /// JSON file whose object is attached as metadata.
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// Report what would happen without contacting the remote store.
        #[arg(long)]
        dry_run: bool,
    },

    /// Run a configured job once, or `all` of them in name order.
    Run {
        job: String,
    },

    /// Run all jobs every `scheduler.interval_secs` until Ctrl-C.
    Watch,

    /// Harvest upstream data to CSV without syncing.
    Harvest {
        #[command(subcommand)]
        source: HarvestSource,
    },

    /// Inspect documents on the remote store.
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Merge user/assistant message pairs into a chat-bot's warm-up list.
    ///
    /// The file holds a JSON array of `{"role", "content"}` objects in
    /// user, assistant order.
    Warmup {
        file: PathBuf,

        #[arg(long)]
        client: String,
    },
}

#[derive(Subcommand)]
enum HarvestSource {
    /// All pages of a league schedule.
    Schedule {
        #[arg(long)]
        league: String,

        /// Keep events repeated across pages.
        #[arg(long)]
        keep_duplicates: bool,

        /// Write CSV here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// A park's activities listing.
    Activities {
        #[arg(long, default_value = "yose")]
        park: String,

        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum DocsAction {
    /// Print one document as JSON.
    Fetch {
        id: String,

        #[arg(long)]
        client: String,
    },

    /// List documents page by page.
    List {
        #[arg(long)]
        client: String,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 20)]
        number: u32,
    },
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("docsync=debug,info")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Clients => {
            clients::list_clients(&cfg)?;
        }
        Commands::Status { client } => {
            status::run_status(&cfg, client.as_deref()).await?;
        }
        Commands::Sync {
            path,
            client,
            filename,
            description,
            metadata,
            dry_run,
        } => {
            run_sync_file(cfg, path, &client, filename, description, metadata, dry_run).await?;
        }
        Commands::Run { job } => {
            run_jobs(cfg, &job).await?;
        }
        Commands::Watch => {
            run_watch(cfg).await?;
        }
        Commands::Harvest { source } => match source {
            HarvestSource::Schedule {
                league,
                keep_duplicates,
                out,
            } => {
                let feed = ScheduleFeed::from_config(&cfg.upstream.schedule);
                let mut events = harvest(&feed, &league).await?;
                if !keep_duplicates {
                    events = schedule::dedupe_by_match(events);
                }
                let report =
                    schedule::build_report(events, &schedule::default_description(&league));
                emit(&report.csv, out.as_deref(), report.rows)?;
            }
            HarvestSource::Activities { park, out } => {
                let feed = ActivitiesFeed::from_config(&cfg.upstream.activities);
                let items = feed.fetch(&park).await?;
                let report = activities::build_report(
                    &items,
                    &activities::default_table_name(&park),
                    &activities::default_description(&park),
                );
                emit(&report.csv, out.as_deref(), report.rows)?;
            }
        },
        Commands::Docs { action } => {
            let ctx = AppContext::open(cfg).await?;
            match action {
                DocsAction::Fetch { id, client } => {
                    let doc = ctx.remote.fetch(&id, &client).await?;
                    println!("{}", serde_json::to_string_pretty(&doc)?);
                }
                DocsAction::List {
                    client,
                    page,
                    number,
                } => {
                    let docs = ctx.remote.list(&client, page, number).await?;
                    println!("{}", serde_json::to_string_pretty(&docs)?);
                }
            }
            ctx.close().await;
        }
        Commands::Warmup { file, client } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let messages: Vec<warmup::WarmupMessage> = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a JSON message array", file.display()))?;
            let pairs = warmup::pairs_from_messages(messages)?;

            let ctx = AppContext::open(cfg).await?;
            let merged = warmup::update_warmup(ctx.remote.as_ref(), &client, pairs).await?;
            println!("Warm-up messages for {}: {}", client, merged.len());
            ctx.close().await;
        }
    }

    Ok(())
}

async fn run_sync_file(
    cfg: Config,
    path: PathBuf,
    client: &str,
    filename: Option<String>,
    description: Option<String>,
    metadata: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    if cfg.client(client).is_none() {
        bail!("Unknown client '{}'", client);
    }

    let content =
        std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = match filename {
        Some(f) => f,
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .with_context(|| format!("{} has no file name", path.display()))?,
    };

    let mut artifact = Artifact::new(filename, content);
    if let Some(description) = description {
        artifact = artifact.with_description(description);
    }
    if let Some(meta_path) = metadata {
        let raw = std::fs::read_to_string(&meta_path)
            .with_context(|| format!("Failed to read {}", meta_path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        if !value.is_object() {
            bail!("{} must contain a JSON object", meta_path.display());
        }
        artifact = artifact.with_metadata(value);
    }

    let ctx = AppContext::open(cfg).await?;
    if dry_run {
        let state = ctx.engine.plan(&artifact, client).await?;
        println!("{}: {}", artifact.filename, state.label());
    } else {
        let outcome = ctx.engine.sync(&artifact, client).await?;
        println!("{}: {}", artifact.filename, outcome.label());
    }
    ctx.close().await;
    Ok(())
}

async fn run_jobs(cfg: Config, job: &str) -> Result<()> {
    let ctx = AppContext::open(cfg).await?;
    let runner = ctx.runner();

    let result = if job == "all" {
        let cycle = runner.run_all().await;
        for report in &cycle.reports {
            println!("{:<24} {:<12} {}", report.name, report.kind, report.summary());
        }
        for (name, err) in &cycle.failures {
            println!("{:<24} {:<12} FAILED: {:#}", name, "", err);
        }
        if cycle.is_ok() {
            Ok(())
        } else {
            Err(anyhow::anyhow!("{} job(s) failed", cycle.failures.len()))
        }
    } else {
        runner.run_job(job).await.map(|report| {
            println!("{:<24} {:<12} {}", report.name, report.kind, report.summary());
        })
    };

    ctx.close().await;
    result
}

async fn run_watch(cfg: Config) -> Result<()> {
    if cfg.jobs.is_empty() {
        bail!("No jobs configured; nothing to watch");
    }

    let ctx = AppContext::open(cfg).await?;
    let scheduler_config = ctx.config.scheduler.clone();
    let runner = Arc::new(ctx.runner());

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(scheduler::shutdown_on(tokio::signal::ctrl_c(), shutdown_tx));

    let stats = scheduler::run_scheduler(runner, &scheduler_config, shutdown_rx).await;
    println!(
        "Stopped after {} cycle(s), {} skipped, {} failed.",
        stats.started(),
        stats.skipped(),
        stats.failed()
    );

    ctx.close().await;
    Ok(())
}

fn emit(csv: &str, out: Option<&std::path::Path>, rows: usize) -> Result<()> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, csv)?;
            eprintln!("Wrote {} rows to {}", rows, path.display());
        }
        None => print!("{}", csv),
    }
    Ok(())
}
