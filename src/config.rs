//! TOML configuration parsing.
//!
//! All settings are process-wide and fixed at deployment; nothing here is
//! overridable per request. See `config/sqlt.example.toml` for a full example.
//!
//! ```toml
//! [gcp]
//! project_id = "my-project"
//! location = "us-central1"
//!
//! [corpus]
//! display_name = "test_rag_corpus"
//! context_files = ["gs://docs/Databricks SQL to BigQuery SQL Migration.pdf"]
//!
//! [output]
//! bucket = "my-translated-sql"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub gcp: GcpConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub model: ModelConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GcpConfig {
    pub project_id: String,
    #[serde(default = "default_location")]
    pub location: String,
}

fn default_location() -> String {
    "us-central1".to_string()
}

/// Retrieval corpus used to ground every translation.
#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    #[serde(default = "default_display_name")]
    pub display_name: String,
    /// `gs://` references imported when the corpus is first created.
    #[serde(default)]
    pub context_files: Vec<String>,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_import_poll_secs")]
    pub import_poll_secs: u64,
    #[serde(default = "default_import_timeout_secs")]
    pub import_timeout_secs: u64,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            display_name: default_display_name(),
            context_files: Vec::new(),
            embedding_model: default_embedding_model(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            import_poll_secs: default_import_poll_secs(),
            import_timeout_secs: default_import_timeout_secs(),
        }
    }
}

fn default_display_name() -> String {
    "test_rag_corpus".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-005".to_string()
}
fn default_chunk_size() -> u32 {
    512
}
fn default_chunk_overlap() -> u32 {
    100
}
fn default_top_k() -> u32 {
    3
}
fn default_import_poll_secs() -> u64 {
    5
}
fn default_import_timeout_secs() -> u64 {
    600
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default = "default_source_dialect")]
    pub source_dialect: String,
    #[serde(default = "default_target_dialect")]
    pub target_dialect: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            temperature: None,
            source_dialect: default_source_dialect(),
            target_dialect: default_target_dialect(),
        }
    }
}

fn default_model_name() -> String {
    "gemini-2.0-flash-001".to_string()
}
fn default_source_dialect() -> String {
    "Databricks SQL".to_string()
}
fn default_target_dialect() -> String {
    "BigQuery SQL".to_string()
}

/// Where translated SQL is written.
///
/// Objects land at `gs://{bucket}/{prefix}/{stem}_{YYYYmmddHHMMSS}{suffix}`.
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub bucket: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_suffix")]
    pub suffix: String,
    #[serde(default = "default_true")]
    pub include_debug_output: bool,
}

fn default_prefix() -> String {
    "translated_sql".to_string()
}
fn default_suffix() -> String {
    "_bq.sql".to_string()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct BatchConfig {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_max_concurrency() -> usize {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,
    #[serde(default = "default_metadata_url")]
    pub metadata_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_env: default_access_token_env(),
            metadata_url: default_metadata_url(),
        }
    }
}

fn default_access_token_env() -> String {
    "GOOGLE_OAUTH_ACCESS_TOKEN".to_string()
}
fn default_metadata_url() -> String {
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token"
        .to_string()
}

/// Base URL overrides for emulators and tests.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct EndpointsConfig {
    pub storage: Option<String>,
    pub aiplatform: Option<String>,
    pub bigquery: Option<String>,
}

impl EndpointsConfig {
    pub fn storage_url(&self) -> String {
        self.storage
            .as_deref()
            .unwrap_or("https://storage.googleapis.com")
            .trim_end_matches('/')
            .to_string()
    }

    pub fn aiplatform_url(&self, location: &str) -> String {
        match self.aiplatform.as_deref() {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}-aiplatform.googleapis.com", location),
        }
    }

    pub fn bigquery_url(&self) -> String {
        self.bigquery
            .as_deref()
            .unwrap_or("https://bigquery.googleapis.com")
            .trim_end_matches('/')
            .to_string()
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;

    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.gcp.project_id.trim().is_empty() {
        bail!("gcp.project_id must not be empty");
    }
    if config.gcp.location.trim().is_empty() {
        bail!("gcp.location must not be empty");
    }

    // Validate corpus
    if config.corpus.display_name.is_empty() {
        bail!("corpus.display_name must not be empty");
    }
    for file in &config.corpus.context_files {
        if !file.starts_with("gs://") {
            bail!("corpus.context_files entries must be gs:// references, got '{}'", file);
        }
    }
    if config.corpus.chunk_size == 0 {
        bail!("corpus.chunk_size must be > 0");
    }
    if config.corpus.chunk_overlap >= config.corpus.chunk_size {
        bail!("corpus.chunk_overlap must be < corpus.chunk_size");
    }
    if config.corpus.top_k == 0 {
        bail!("corpus.top_k must be >= 1");
    }
    if config.corpus.import_poll_secs == 0 {
        bail!("corpus.import_poll_secs must be > 0");
    }

    // Validate model
    if config.model.name.is_empty() {
        bail!("model.name must not be empty");
    }
    if let Some(t) = config.model.temperature {
        if !(0.0..=2.0).contains(&t) {
            bail!("model.temperature must be in [0.0, 2.0]");
        }
    }

    // Validate output
    if config.output.bucket.trim().is_empty() {
        bail!("output.bucket must not be empty");
    }
    if config.output.bucket.starts_with("gs://") || config.output.bucket.contains('/') {
        bail!(
            "output.bucket must be a bare bucket name, got '{}'",
            config.output.bucket
        );
    }

    if config.batch.max_concurrency == 0 {
        bail!("batch.max_concurrency must be >= 1");
    }
    if config.http.timeout_secs == 0 {
        bail!("http.timeout_secs must be > 0");
    }

    Ok(())
}
