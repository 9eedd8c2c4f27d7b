//! Batch orchestration.
//!
//! Runs each input reference through
//! `fetch → translate → extract → validate → store` and produces exactly one
//! [`TranslationResult`] per input, in input order.
//!
//! ```text
//! Fetching ─▶ Translating ─▶ Extracting ─▶ Validating ─▶ Storing ─▶ Done
//!    │             │                                        │
//!    └─────────────┴──────────────▶ Failed(kind) ◀──────────┘
//! ```
//!
//! Items are independent: a failure ends that item only. The corpus is
//! provisioned once before any item runs; if that fails, every item in the
//! request fails with `ERROR_CORPUS_PROVISIONING`.
//!
//! With `[batch].max_concurrency > 1` items run concurrently via
//! `futures::StreamExt::buffered`, which yields results in input order.

use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::Instrument;

use crate::auth::Credentials;
use crate::bigquery::{BigQueryClient, QueryPlanner};
use crate::config::Config;
use crate::corpus::{CorpusCache, CorpusHandle, CorpusPlatform};
use crate::error::TranslateError;
use crate::extract::{extract_sql, preview};
use crate::models::{GcsPath, TranslationRequest, TranslationResult};
use crate::sink;
use crate::storage::{fetch_text, GcsStore, ObjectStore};
use crate::translate::{translate, GenerativeModel};
use crate::validate::dry_run;
use crate::vertex::VertexClient;

/// The per-process translation service.
///
/// Holds the external collaborators behind their traits plus the shared,
/// lazily provisioned corpus handle. Cheap to share via `Arc`.
pub struct Translator {
    config: Arc<Config>,
    store: Arc<dyn ObjectStore>,
    model: Arc<dyn GenerativeModel>,
    corpora: Arc<dyn CorpusPlatform>,
    planner: Arc<dyn QueryPlanner>,
    corpus: CorpusCache,
}

impl Translator {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn ObjectStore>,
        model: Arc<dyn GenerativeModel>,
        corpora: Arc<dyn CorpusPlatform>,
        planner: Arc<dyn QueryPlanner>,
    ) -> Self {
        Self {
            config,
            store,
            model,
            corpora,
            planner,
            corpus: CorpusCache::new(),
        }
    }

    /// Build a translator wired to the real Google Cloud services.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http.timeout())
            .build()?;
        let credentials = Arc::new(Credentials::from_config(&config.auth));

        let store = Arc::new(GcsStore::new(
            client.clone(),
            config.endpoints.storage_url(),
            credentials.clone(),
        ));
        let vertex = Arc::new(VertexClient::new(config, client.clone(), credentials.clone()));
        let planner = Arc::new(BigQueryClient::new(config, client, credentials));

        Ok(Self::new(
            Arc::new(config.clone()),
            store,
            vertex.clone(),
            vertex,
            planner,
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Provision (or reuse) the retrieval corpus.
    pub async fn ensure_corpus(&self) -> Result<CorpusHandle, TranslateError> {
        self.corpus
            .get_or_provision(
                self.corpora.as_ref(),
                &self.config.corpus.display_name,
                &self.config.corpus.context_files,
            )
            .await
    }

    /// Translate every reference in `request`.
    ///
    /// Request-level validation failures are returned as `Err` before any
    /// item is touched. Everything after that is reported per item.
    pub async fn translate_batch(
        &self,
        request: &TranslationRequest,
    ) -> Result<Vec<TranslationResult>, TranslateError> {
        request.validate()?;

        let paths = &request.databricks_sql_gcs_paths;
        tracing::info!(
            "Batch processing requested for {} file(s). Perform dry run: {}",
            paths.len(),
            request.perform_dry_run
        );
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let corpus = match self.ensure_corpus().await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("RAG corpus initialization failed, failing whole batch: {}", e);
                return Ok(paths
                    .iter()
                    .map(|p| TranslationResult::failure(p, &e))
                    .collect());
            }
        };

        let corpus = &corpus;
        let perform_dry_run = request.perform_dry_run;
        let results: Vec<TranslationResult> = stream::iter(paths.iter().cloned())
            .map(|path: String| async move {
                let span = tracing::info_span!("item", input = %path);
                self.process_item(&path, corpus, perform_dry_run)
                    .instrument(span)
                    .await
            })
            .buffered(self.config.batch.max_concurrency)
            .collect()
            .await;

        let failed = results.iter().filter(|r| !r.is_success()).count();
        tracing::info!(
            "Batch processing complete. Processed {} file(s), {} failed.",
            results.len(),
            failed
        );
        Ok(results)
    }

    async fn process_item(
        &self,
        input: &str,
        corpus: &CorpusHandle,
        perform_dry_run: bool,
    ) -> TranslationResult {
        tracing::info!("Processing SQL from {}", input);
        match self.run_pipeline(input, corpus, perform_dry_run).await {
            Ok(result) => result,
            Err(e) => {
                match &e {
                    TranslateError::NotFound(_) => tracing::error!("File not found for {}: {}", input, e),
                    TranslateError::InvalidInput(_) => tracing::error!("Input error for {}: {}", input, e),
                    _ => tracing::error!("Failed processing {}: {}", input, e),
                }
                TranslationResult::failure(input, &e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        input: &str,
        corpus: &CorpusHandle,
        perform_dry_run: bool,
    ) -> Result<TranslationResult, TranslateError> {
        let path = GcsPath::parse(input)?;
        let source = fetch_text(self.store.as_ref(), &path).await?;

        let raw = translate(self.model.as_ref(), &self.config.model, &source, corpus).await?;

        let extracted = extract_sql(&raw);
        if extracted.is_empty() {
            tracing::warn!("SQL delimiter ```sql ... ``` not found or empty in model response for {}", input);
        } else {
            tracing::info!("Extracted SQL (first 150 chars): '{}...'", preview(&extracted, 150));
        }

        let outcome = dry_run(self.planner.as_ref(), &extracted, perform_dry_run).await;

        let translated_gcs_path =
            sink::store(self.store.as_ref(), &self.config.output, &path, &extracted).await?;
        tracing::info!("Extracted SQL for {} uploaded to: {}", input, translated_gcs_path);

        let debug = self.config.output.include_debug_output;
        Ok(TranslationResult::Success {
            input_gcs_path: input.to_string(),
            translated_gcs_path,
            dry_run_results: outcome,
            translated_sql_raw_output: debug.then_some(raw),
            translated_sql_extracted: debug.then_some(extracted),
        })
    }
}
