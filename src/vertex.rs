//! Vertex AI client: RAG corpus management and grounded generation.
//!
//! Implements [`CorpusPlatform`] and [`GenerativeModel`] over the Vertex AI
//! REST API (`v1`) with `reqwest`. No retries are attempted here; every call
//! is single-shot and bounded by `[http].timeout_secs`.
//!
//! # Endpoints
//!
//! | Operation | Method | Path |
//! |-----------|--------|------|
//! | list corpora | `GET` | `/v1/projects/{p}/locations/{l}/ragCorpora` |
//! | create corpus | `POST` | `/v1/projects/{p}/locations/{l}/ragCorpora` |
//! | import files | `POST` | `/v1/{corpus}/ragFiles:import` |
//! | poll operation | `GET` | `/v1/{operation}` |
//! | generate | `POST` | `/v1/projects/{p}/locations/{l}/publishers/google/models/{m}:generateContent` |
//!
//! Corpus creation and file import are long-running operations; they are
//! polled every `[corpus].import_poll_secs` until done or until
//! `[corpus].import_timeout_secs` elapses.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::auth::Credentials;
use crate::config::Config;
use crate::corpus::{CorpusHandle, CorpusPlatform};
use crate::error::TranslateError;
use crate::translate::GenerativeModel;

pub struct VertexClient {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    location: String,
    model: String,
    temperature: Option<f32>,
    embedding_model: String,
    chunk_size: u32,
    chunk_overlap: u32,
    top_k: u32,
    poll_interval: Duration,
    operation_timeout: Duration,
    credentials: Arc<Credentials>,
}

impl VertexClient {
    pub fn new(config: &Config, client: reqwest::Client, credentials: Arc<Credentials>) -> Self {
        Self {
            client,
            base_url: config.endpoints.aiplatform_url(&config.gcp.location),
            project_id: config.gcp.project_id.clone(),
            location: config.gcp.location.clone(),
            model: config.model.name.clone(),
            temperature: config.model.temperature,
            embedding_model: config.corpus.embedding_model.clone(),
            chunk_size: config.corpus.chunk_size,
            chunk_overlap: config.corpus.chunk_overlap,
            top_k: config.corpus.top_k,
            poll_interval: Duration::from_secs(config.corpus.import_poll_secs),
            operation_timeout: Duration::from_secs(config.corpus.import_timeout_secs),
            credentials,
        }
    }

    fn parent(&self) -> String {
        format!("projects/{}/locations/{}", self.project_id, self.location)
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let token = self.credentials.access_token(&self.client).await?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;
        read_json(resp).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        let token = self.credentials.access_token(&self.client).await?;
        let resp = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;
        read_json(resp).await
    }

    async fn list(&self) -> Result<Vec<CorpusHandle>> {
        let mut corpora = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!("{}/v1/{}/ragCorpora?pageSize=100", self.base_url, self.parent());
            if let Some(ref token) = page_token {
                url.push_str("&pageToken=");
                url.push_str(&crate::storage::uri_encode(token));
            }

            let json = self.get_json(&url).await?;
            let (batch, next) = parse_corpus_list(&json);
            corpora.extend(batch);

            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(corpora)
    }

    async fn create(&self, display_name: &str) -> Result<CorpusHandle> {
        let url = format!("{}/v1/{}/ragCorpora", self.base_url, self.parent());
        let endpoint = format!(
            "{}/publishers/google/models/{}",
            self.parent(),
            self.embedding_model
        );
        let body = json!({
            "displayName": display_name,
            "vectorDbConfig": {
                "ragEmbeddingModelConfig": {
                    "vertexPredictionEndpoint": { "endpoint": endpoint }
                }
            }
        });

        let operation = self.post_json(&url, &body).await?;
        let done = self.wait_for_operation(operation).await?;
        let response = done
            .get("response")
            .ok_or_else(|| anyhow!("corpus creation finished without a response"))?;
        parse_corpus(response).ok_or_else(|| anyhow!("corpus creation response missing name"))
    }

    async fn import(&self, corpus: &CorpusHandle, reference: &str) -> Result<()> {
        let url = format!("{}/v1/{}/ragFiles:import", self.base_url, corpus.name);
        let body = json!({
            "importRagFilesConfig": {
                "gcsSource": { "uris": [reference] },
                "ragFileTransformationConfig": {
                    "ragFileChunkingConfig": {
                        "fixedLengthChunking": {
                            "chunkSize": self.chunk_size,
                            "chunkOverlap": self.chunk_overlap,
                        }
                    }
                }
            }
        });

        let operation = self.post_json(&url, &body).await?;
        let done = self.wait_for_operation(operation).await?;
        if let Some(failed) = done
            .pointer("/response/failedRagFilesCount")
            .and_then(as_count)
            .filter(|n| *n > 0)
        {
            bail!("{} file(s) failed to import from {}", failed, reference);
        }
        Ok(())
    }

    /// Poll a long-running operation until `done`, returning its final state.
    async fn wait_for_operation(&self, mut operation: Value) -> Result<Value> {
        let deadline = Instant::now() + self.operation_timeout;

        loop {
            if let Some(err) = operation.get("error") {
                bail!("operation failed: {}", operation_error_message(err));
            }
            if operation.get("done").and_then(Value::as_bool).unwrap_or(false) {
                return Ok(operation);
            }

            let name = operation
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow!("operation response missing name"))?
                .to_string();

            if Instant::now() >= deadline {
                bail!(
                    "operation {} timed out after {}s",
                    name,
                    self.operation_timeout.as_secs()
                );
            }

            tracing::debug!("Waiting for operation {}...", name);
            tokio::time::sleep(self.poll_interval).await;
            operation = self
                .get_json(&format!("{}/v1/{}", self.base_url, name))
                .await?;
        }
    }

    async fn generate_content(&self, prompt: &str, corpus: &CorpusHandle) -> Result<String> {
        let url = format!(
            "{}/v1/{}/publishers/google/models/{}:generateContent",
            self.base_url,
            self.parent(),
            self.model
        );

        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "tools": [{
                "retrieval": {
                    "vertexRagStore": {
                        "ragResources": [{ "ragCorpus": corpus.name }],
                        "ragRetrievalConfig": { "topK": self.top_k }
                    }
                }
            }]
        });
        if let Some(t) = self.temperature {
            body["generationConfig"] = json!({ "temperature": t });
        }

        let json = self.post_json(&url, &body).await?;
        Ok(parse_generate_response(&json))
    }
}

#[async_trait]
impl CorpusPlatform for VertexClient {
    async fn list_corpora(&self) -> Result<Vec<CorpusHandle>, TranslateError> {
        self.list()
            .await
            .map_err(|e| TranslateError::CorpusProvisioning(format!("{:#}", e)))
    }

    async fn create_corpus(&self, display_name: &str) -> Result<CorpusHandle, TranslateError> {
        self.create(display_name)
            .await
            .map_err(|e| TranslateError::CorpusProvisioning(format!("{:#}", e)))
    }

    async fn import_file(&self, corpus: &CorpusHandle, reference: &str) -> Result<(), TranslateError> {
        self.import(corpus, reference)
            .await
            .map_err(|e| TranslateError::CorpusProvisioning(format!("{:#}", e)))
    }
}

#[async_trait]
impl GenerativeModel for VertexClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, corpus: &CorpusHandle) -> Result<String, TranslateError> {
        self.generate_content(prompt, corpus)
            .await
            .map_err(|e| TranslateError::ModelInvocation(format!("{:#}", e)))
    }
}

/// Decode a JSON body, turning non-2xx statuses into errors with the
/// service's message.
async fn read_json(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(String::from))
            .unwrap_or_else(|| body.chars().take(500).collect());
        bail!("Vertex AI API error {}: {}", status, message);
    }
    Ok(resp.json().await?)
}

fn parse_corpus(value: &Value) -> Option<CorpusHandle> {
    let name = value.get("name")?.as_str()?.to_string();
    let display_name = value
        .get("displayName")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some(CorpusHandle { name, display_name })
}

/// Parse one `ragCorpora.list` page into handles and the next page token.
fn parse_corpus_list(json: &Value) -> (Vec<CorpusHandle>, Option<String>) {
    let corpora = json
        .get("ragCorpora")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_corpus).collect())
        .unwrap_or_default();
    let next = json
        .get("nextPageToken")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(String::from);
    (corpora, next)
}

/// Concatenate the text parts of the first candidate.
fn parse_generate_response(json: &Value) -> String {
    json.pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

fn operation_error_message(err: &Value) -> String {
    err.get("message")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| err.to_string())
}

/// Proto int64 fields arrive as JSON strings; accept both forms.
fn as_count(v: &Value) -> Option<u64> {
    v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_corpus_list_with_token() {
        let json = json!({
            "ragCorpora": [
                { "name": "projects/p/locations/l/ragCorpora/1", "displayName": "a" },
                { "name": "projects/p/locations/l/ragCorpora/2", "displayName": "test_rag_corpus" },
                { "displayName": "nameless" }
            ],
            "nextPageToken": "abc"
        });
        let (corpora, next) = parse_corpus_list(&json);
        assert_eq!(corpora.len(), 2);
        assert_eq!(corpora[1].display_name, "test_rag_corpus");
        assert_eq!(next.as_deref(), Some("abc"));
    }

    #[test]
    fn test_parse_corpus_list_empty() {
        let (corpora, next) = parse_corpus_list(&json!({}));
        assert!(corpora.is_empty());
        assert!(next.is_none());

        let (_, next) = parse_corpus_list(&json!({ "nextPageToken": "" }));
        assert!(next.is_none());
    }

    #[test]
    fn test_parse_generate_response_joins_parts() {
        let json = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [
                    { "text": "```sql\nSELECT 1" },
                    { "text": "\n```" }
                ]}
            }]
        });
        assert_eq!(parse_generate_response(&json), "```sql\nSELECT 1\n```");
    }

    #[test]
    fn test_parse_generate_response_without_candidates() {
        assert_eq!(parse_generate_response(&json!({ "promptFeedback": {} })), "");
    }

    #[test]
    fn test_as_count_accepts_string_and_number() {
        assert_eq!(as_count(&json!("3")), Some(3));
        assert_eq!(as_count(&json!(4)), Some(4));
        assert_eq!(as_count(&json!("x")), None);
    }
}
