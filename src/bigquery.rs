//! BigQuery dry-run client.
//!
//! Submits `POST /bigquery/v2/projects/{p}/queries` with `dryRun: true` and
//! standard SQL. The engine plans the query and reports the bytes it would
//! scan without executing anything.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::Credentials;
use crate::config::Config;

/// A query-planning service able to validate SQL without running it.
#[async_trait]
pub trait QueryPlanner: Send + Sync {
    /// Plan `sql`. `Ok` carries the estimated bytes processed; `Err` carries
    /// the engine's error text verbatim.
    async fn dry_run(&self, sql: &str) -> Result<u64, String>;
}

pub struct BigQueryClient {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    credentials: Arc<Credentials>,
}

impl BigQueryClient {
    pub fn new(config: &Config, client: reqwest::Client, credentials: Arc<Credentials>) -> Self {
        Self {
            client,
            base_url: config.endpoints.bigquery_url(),
            project_id: config.gcp.project_id.clone(),
            credentials,
        }
    }
}

#[async_trait]
impl QueryPlanner for BigQueryClient {
    async fn dry_run(&self, sql: &str) -> Result<u64, String> {
        let token = self
            .credentials
            .access_token(&self.client)
            .await
            .map_err(|e| format!("failed to obtain access token: {:#}", e))?;

        let url = format!(
            "{}/bigquery/v2/projects/{}/queries",
            self.base_url, self.project_id
        );
        let body = json!({
            "query": sql,
            "dryRun": true,
            "useLegacySql": false,
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("BigQuery request failed: {}", e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| e.to_string())?;
        let json: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

        if !status.is_success() {
            return Err(engine_error_message(&json)
                .unwrap_or_else(|| format!("{}: {}", status, text.chars().take(500).collect::<String>())));
        }

        parse_total_bytes(&json).ok_or_else(|| "dry run response missing totalBytesProcessed".to_string())
    }
}

/// `totalBytesProcessed` is an int64 encoded as a JSON string.
fn parse_total_bytes(json: &Value) -> Option<u64> {
    let v = json.get("totalBytesProcessed")?;
    v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

fn engine_error_message(json: &Value) -> Option<String> {
    json.pointer("/error/message")
        .and_then(Value::as_str)
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_total_bytes() {
        assert_eq!(parse_total_bytes(&json!({ "totalBytesProcessed": "1024" })), Some(1024));
        assert_eq!(parse_total_bytes(&json!({ "totalBytesProcessed": 0 })), Some(0));
        assert_eq!(parse_total_bytes(&json!({ "jobComplete": true })), None);
    }

    #[test]
    fn test_engine_error_message() {
        let body = json!({
            "error": {
                "code": 400,
                "message": "Syntax error: Unexpected identifier \"SELEC\" at [1:1]",
                "status": "INVALID_ARGUMENT"
            }
        });
        assert_eq!(
            engine_error_message(&body).as_deref(),
            Some("Syntax error: Unexpected identifier \"SELEC\" at [1:1]")
        );
        assert_eq!(engine_error_message(&Value::Null), None);
    }
}
