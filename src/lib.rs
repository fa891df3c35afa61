//! # docsync
//!
//! Keeps a remote chat-bot document store in step with locally produced
//! content: uploaded files, generated CSV reports, and harvested feeds.
//!
//! Every artifact is fingerprinted; the remote store is only written when
//! the fingerprint changed since the last successful sync, and documents
//! the remote lost track of are uploaded again.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ Feeds / dirs │──▶│ Projection │──▶│ SyncEngine  │──▶│ Remote store │
//! │ harvest()    │   │ CSV + SQL  │   │ sign+upsert │   │ (HTTP)       │
//! └──────────────┘   └────────────┘   └──────┬──────┘   └──────────────┘
//!                                            │
//!                                            ▼
//!                                     ┌─────────────┐
//!                                     │ SQLite      │
//!                                     │ metadata    │
//!                                     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docsync init                         # create database
//! docsync sync ./roster.csv --client vgk
//! docsync run all                      # every configured job once
//! docsync watch                        # re-run jobs on an interval
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Sync error taxonomy |
//! | [`models`] | Artifacts and persisted metadata |
//! | [`signature`] | Content fingerprints |
//! | [`store`] | Metadata persistence (SQLite, in-memory) |
//! | [`remote`] | Remote document store client |
//! | [`rate`] | Outbound throttling |
//! | [`engine`] | Per-artifact sync state machine |
//! | [`harvest`] | Cursor-paginated harvesting |
//! | [`schedule`] | League schedule projection |
//! | [`activities`] | Park activities feed and projection |
//! | [`tabular`] | CSV and SQL-schema helpers |
//! | [`warmup`] | Chat-bot warm-up messages |
//! | [`jobs`] | Configured pipelines |
//! | [`scheduler`] | Interval re-invocation with run lock |
//! | [`export`] | Local copies of generated artifacts |
//! | [`context`] | Runtime wiring for CLI commands |
//! | [`status`] / [`clients`] | CLI reports |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod activities;
pub mod clients;
pub mod config;
pub mod context;
pub mod db;
pub mod engine;
pub mod error;
pub mod export;
pub mod harvest;
pub mod jobs;
pub mod migrate;
pub mod models;
pub mod rate;
pub mod remote;
pub mod schedule;
pub mod scheduler;
pub mod signature;
pub mod status;
pub mod store;
pub mod tabular;
pub mod warmup;
