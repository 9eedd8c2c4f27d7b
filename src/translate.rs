//! Translation invoker: prompt construction and model dispatch.

use async_trait::async_trait;

use crate::config::ModelConfig;
use crate::corpus::CorpusHandle;
use crate::error::TranslateError;
use crate::extract::preview;

/// A text-in/text-out generative model grounded on a retrieval corpus.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-2.0-flash-001"`).
    fn model_name(&self) -> &str;

    /// Generate a response to `prompt`, retrieving context from `corpus`.
    ///
    /// Transport and service failures are `ModelInvocation` errors. A response
    /// with no text is `Ok("")`.
    async fn generate(&self, prompt: &str, corpus: &CorpusHandle) -> Result<String, TranslateError>;
}

/// Build the fixed translation instruction around `source_sql`.
pub fn build_prompt(model: &ModelConfig, source_sql: &str) -> String {
    format!(
        "Translate the following {src} to {dst}.\n\
         Ensure all functions, data types, and syntax are compatible with {dst_short}.\n\
         Return ONLY the translated {dst} query, enclosed in triple backticks with the language identifier 'sql'.\n\
         For example:\n\
         ```sql\n\
         SELECT * FROM my_table;\n\
         ```\n\
         \n\
         {src} to translate:\n\
         {sql}\n",
        src = model.source_dialect,
        dst = model.target_dialect,
        dst_short = dialect_engine(&model.target_dialect),
        sql = source_sql,
    )
}

/// `"BigQuery SQL"` → `"BigQuery"`; names without a trailing `SQL` pass through.
fn dialect_engine(dialect: &str) -> &str {
    dialect
        .strip_suffix(" SQL")
        .map(str::trim_end)
        .filter(|s| !s.is_empty())
        .unwrap_or(dialect)
}

/// Translate `source_sql` and return the model's raw response.
pub async fn translate(
    model: &dyn GenerativeModel,
    config: &ModelConfig,
    source_sql: &str,
    corpus: &CorpusHandle,
) -> Result<String, TranslateError> {
    let prompt = build_prompt(config, source_sql);
    tracing::debug!("Sending prompt to {}: '{}...'", model.model_name(), preview(&prompt, 250));

    let raw = model.generate(&prompt, corpus).await?;
    tracing::info!("Raw model output (first 150 chars): '{}...'", preview(&raw, 150));
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_source_verbatim() {
        let cfg = ModelConfig::default();
        let sql = "SELECT date_format(ts, 'yyyy') FROM delta.`/mnt/t`\n  WHERE x <=> y";
        let prompt = build_prompt(&cfg, sql);
        assert!(prompt.contains(sql));
    }

    #[test]
    fn test_prompt_names_dialects_and_fence() {
        let prompt = build_prompt(&ModelConfig::default(), "SELECT 1");
        assert!(prompt.starts_with("Translate the following Databricks SQL to BigQuery SQL."));
        assert!(prompt.contains("compatible with BigQuery."));
        assert!(prompt.contains("language identifier 'sql'"));
        assert!(prompt.contains("```sql\nSELECT * FROM my_table;\n```"));
        assert!(prompt.contains("Databricks SQL to translate:\nSELECT 1\n"));
    }

    #[test]
    fn test_dialect_engine() {
        assert_eq!(dialect_engine("BigQuery SQL"), "BigQuery");
        assert_eq!(dialect_engine("Snowflake"), "Snowflake");
        assert_eq!(dialect_engine(" SQL"), " SQL");
    }
}
