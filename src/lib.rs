//! # SQL Translator
//!
//! Request-triggered batch translation of Databricks SQL into BigQuery SQL.
//!
//! Each input `gs://` reference is fetched, translated by a Gemini model
//! grounded on a Vertex AI RAG corpus of migration guides, reduced to the
//! first fenced ```` ```sql ```` block, optionally dry-run against BigQuery,
//! and written back to Cloud Storage.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌───────────┐   ┌────────┐
//! │  Fetch   │──▶│ Translate │──▶│ Extract  │──▶│ Dry run   │──▶│ Store  │
//! │  (GCS)   │   │ (Vertex)  │   │ (```sql) │   │ (BigQuery)│   │ (GCS)  │
//! └──────────┘   └─────┬─────┘   └──────────┘   └───────────┘   └────────┘
//!                      │
//!                ┌─────┴─────┐
//!                │ RAG corpus│  provisioned once per process
//!                └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! sqlt corpus ensure                         # find or create the corpus
//! sqlt translate gs://bucket/query.sql       # one-off batch, JSON to stdout
//! sqlt serve                                 # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Per-item error kinds |
//! | [`models`] | Request, reference, and result types |
//! | [`auth`] | OAuth2 access tokens |
//! | [`storage`] | Object store trait, source fetching, GCS client |
//! | [`corpus`] | RAG corpus provisioning |
//! | [`vertex`] | Vertex AI client |
//! | [`translate`] | Prompt construction and model dispatch |
//! | [`extract`] | Fenced SQL extraction |
//! | [`bigquery`] | BigQuery dry-run client |
//! | [`validate`] | Dry-run validation outcomes |
//! | [`sink`] | Output naming and upload |
//! | [`batch`] | Batch orchestration |
//! | [`server`] | HTTP server |

pub mod auth;
pub mod batch;
pub mod bigquery;
pub mod config;
pub mod corpus;
pub mod error;
pub mod extract;
pub mod models;
pub mod server;
pub mod sink;
pub mod storage;
pub mod translate;
pub mod validate;
pub mod vertex;
