//! Retrieval corpus provisioning.
//!
//! Ensures the corpus named by `[corpus].display_name` exists, creating and
//! populating it from `[corpus].context_files` when absent.
//!
//! # Known limitations
//!
//! - An existing corpus is reused as-is. Its document set is never reconciled
//!   against the configured `context_files`.
//! - Import failures after creation are logged and skipped; the corpus may be
//!   partially populated.
//! - [`CorpusCache`] serializes provisioning within one process only. Two
//!   processes starting cold at the same time can both create a corpus.

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::error::TranslateError;

/// Identifies a provisioned corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusHandle {
    /// Fully qualified resource name,
    /// e.g. `projects/p/locations/us-central1/ragCorpora/123`.
    pub name: String,
    pub display_name: String,
}

/// Corpus management operations offered by the retrieval platform.
#[async_trait]
pub trait CorpusPlatform: Send + Sync {
    async fn list_corpora(&self) -> Result<Vec<CorpusHandle>, TranslateError>;

    async fn create_corpus(&self, display_name: &str) -> Result<CorpusHandle, TranslateError>;

    /// Import one document reference into `corpus`.
    async fn import_file(&self, corpus: &CorpusHandle, reference: &str) -> Result<(), TranslateError>;
}

/// Look up a corpus by exact display name, creating it if absent.
pub async fn ensure_corpus(
    platform: &dyn CorpusPlatform,
    display_name: &str,
    context_files: &[String],
) -> Result<CorpusHandle, TranslateError> {
    tracing::info!("Listing RAG corpora to find '{}'...", display_name);
    let corpora = platform.list_corpora().await?;

    if let Some(found) = corpora.into_iter().find(|c| c.display_name == display_name) {
        tracing::info!(
            "Found existing RAG corpus: {} (display name: {})",
            found.name,
            found.display_name
        );
        return Ok(found);
    }

    tracing::warn!("RAG corpus '{}' not found. Creating new corpus...", display_name);
    let corpus = platform.create_corpus(display_name).await?;
    tracing::info!("Created new RAG corpus: {}. Importing {} file(s)...", corpus.name, context_files.len());

    for reference in context_files {
        match platform.import_file(&corpus, reference).await {
            Ok(()) => tracing::info!("Imported {} into {}", reference, corpus.name),
            Err(e) => tracing::warn!("Failed to import {} into {}: {}", reference, corpus.name, e),
        }
    }

    Ok(corpus)
}

/// Process-wide, lazily provisioned corpus handle.
///
/// Concurrent first callers wait on a single provisioning attempt. A failed
/// attempt leaves the cache empty so a later request can try again.
#[derive(Default)]
pub struct CorpusCache {
    cell: OnceCell<CorpusHandle>,
}

impl CorpusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_provision(
        &self,
        platform: &dyn CorpusPlatform,
        display_name: &str,
        context_files: &[String],
    ) -> Result<CorpusHandle, TranslateError> {
        if let Some(handle) = self.cell.get() {
            tracing::debug!("RAG corpus already initialized: {}", handle.name);
        }
        self.cell
            .get_or_try_init(|| ensure_corpus(platform, display_name, context_files))
            .await
            .cloned()
            .map_err(|e| match e {
                TranslateError::CorpusProvisioning(_) => e,
                other => TranslateError::CorpusProvisioning(other.to_string()),
            })
    }

    pub fn get(&self) -> Option<&CorpusHandle> {
        self.cell.get()
    }
}
