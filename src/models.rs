//! Core data models used throughout the translator.
//!
//! These types describe the request that enters the service, the storage
//! references it carries, and the write-once result records it returns.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ErrorKind, TranslateError};

/// Body of `POST /translate`.
#[derive(Debug, Clone, Deserialize)]
pub struct TranslationRequest {
    pub databricks_sql_gcs_paths: Vec<String>,
    #[serde(default = "default_perform_dry_run")]
    pub perform_dry_run: bool,
}

fn default_perform_dry_run() -> bool {
    true
}

impl TranslationRequest {
    pub fn new(paths: Vec<String>, perform_dry_run: bool) -> Self {
        Self {
            databricks_sql_gcs_paths: paths,
            perform_dry_run,
        }
    }

    /// Request-level validation, run before any item is processed.
    pub fn validate(&self) -> Result<(), TranslateError> {
        if let Some(pos) = self
            .databricks_sql_gcs_paths
            .iter()
            .position(|p| p.trim().is_empty())
        {
            return Err(TranslateError::InvalidInput(format!(
                "'databricks_sql_gcs_paths' entry {} must not be empty",
                pos
            )));
        }
        Ok(())
    }
}

/// A parsed `gs://bucket/object` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcsPath {
    pub bucket: String,
    pub object: String,
}

impl GcsPath {
    pub fn new(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
        }
    }

    pub fn parse(reference: &str) -> Result<Self, TranslateError> {
        let invalid = || TranslateError::InvalidInput(format!("Invalid GCS path format: {}", reference));

        let rest = reference.strip_prefix("gs://").ok_or_else(invalid)?;
        let (bucket, object) = rest.split_once('/').ok_or_else(invalid)?;
        if bucket.is_empty() || object.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(bucket, object))
    }

    /// Final path segment of the object name.
    pub fn file_name(&self) -> &str {
        self.object.rsplit('/').next().unwrap_or(&self.object)
    }

    /// File name with its last extension removed.
    pub fn file_stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => name,
            Some(idx) => &name[..idx],
        }
    }
}

impl fmt::Display for GcsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gs://{}/{}", self.bucket, self.object)
    }
}

/// Outcome of the optional dry-run validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status")]
pub enum ValidationOutcome {
    #[serde(rename = "SUCCESS")]
    Success { total_bytes_processed: u64 },
    #[serde(rename = "FAILURE")]
    Failure { error_message: String },
    #[serde(rename = "SKIPPED_EMPTY_SQL")]
    SkippedEmptySql { reason: String },
    #[serde(rename = "SKIPPED_BY_USER_REQUEST")]
    SkippedByRequest,
}

/// One record per input reference, in input order.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TranslationResult {
    Success {
        input_gcs_path: String,
        translated_gcs_path: String,
        dry_run_results: ValidationOutcome,
        #[serde(skip_serializing_if = "Option::is_none")]
        translated_sql_raw_output: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        translated_sql_extracted: Option<String>,
    },
    Failure {
        input_gcs_path: String,
        error: String,
        status: ErrorKind,
    },
}

impl TranslationResult {
    pub fn failure(input: &str, err: &TranslateError) -> Self {
        Self::Failure {
            input_gcs_path: input.to_string(),
            error: err.to_string(),
            status: err.kind(),
        }
    }

    pub fn input_gcs_path(&self) -> &str {
        match self {
            Self::Success { input_gcs_path, .. } | Self::Failure { input_gcs_path, .. } => {
                input_gcs_path
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn status(&self) -> Option<ErrorKind> {
        match self {
            Self::Failure { status, .. } => Some(*status),
            Self::Success { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_gcs_path() {
        let p = GcsPath::parse("gs://bucket/dir/query.sql").unwrap();
        assert_eq!(p.bucket, "bucket");
        assert_eq!(p.object, "dir/query.sql");
        assert_eq!(p.file_name(), "query.sql");
        assert_eq!(p.file_stem(), "query");
        assert_eq!(p.to_string(), "gs://bucket/dir/query.sql");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["bucket/query.sql", "gs://bucket", "gs://bucket/", "gs:///x.sql", "s3://b/x"] {
            let err = GcsPath::parse(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{}", bad);
        }
    }

    #[test]
    fn test_file_stem_edge_cases() {
        assert_eq!(GcsPath::new("b", "a/archive.tar.sql").file_stem(), "archive.tar");
        assert_eq!(GcsPath::new("b", "noext").file_stem(), "noext");
        assert_eq!(GcsPath::new("b", "dir/.hidden").file_stem(), ".hidden");
    }

    #[test]
    fn test_request_defaults_dry_run_true() {
        let req: TranslationRequest =
            serde_json::from_value(json!({ "databricks_sql_gcs_paths": ["gs://b/a.sql"] })).unwrap();
        assert!(req.perform_dry_run);
        req.validate().unwrap();
    }

    #[test]
    fn test_request_rejects_wrong_types() {
        assert!(serde_json::from_value::<TranslationRequest>(json!({
            "databricks_sql_gcs_paths": "gs://b/a.sql"
        }))
        .is_err());
        assert!(serde_json::from_value::<TranslationRequest>(json!({
            "databricks_sql_gcs_paths": [],
            "perform_dry_run": "yes"
        }))
        .is_err());
        assert!(serde_json::from_value::<TranslationRequest>(json!({})).is_err());
    }

    #[test]
    fn test_request_rejects_empty_path_entry() {
        let req = TranslationRequest::new(vec!["gs://b/a.sql".into(), "".into()], true);
        let err = req.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_empty_request_is_valid() {
        TranslationRequest::new(vec![], false).validate().unwrap();
    }

    #[test]
    fn test_validation_outcome_wire_shape() {
        assert_eq!(
            serde_json::to_value(ValidationOutcome::Success { total_bytes_processed: 42 }).unwrap(),
            json!({ "status": "SUCCESS", "total_bytes_processed": 42 })
        );
        assert_eq!(
            serde_json::to_value(ValidationOutcome::SkippedByRequest).unwrap(),
            json!({ "status": "SKIPPED_BY_USER_REQUEST" })
        );
    }

    #[test]
    fn test_failure_record_wire_shape() {
        let err = TranslateError::NotFound("gs://b/missing.sql".into());
        let rec = TranslationResult::failure("gs://b/missing.sql", &err);
        assert_eq!(
            serde_json::to_value(&rec).unwrap(),
            json!({
                "input_gcs_path": "gs://b/missing.sql",
                "error": "Input file not found: gs://b/missing.sql",
                "status": "ERROR_FILE_NOT_FOUND"
            })
        );
    }

    #[test]
    fn test_success_record_omits_debug_fields_when_absent() {
        let rec = TranslationResult::Success {
            input_gcs_path: "gs://b/a.sql".into(),
            translated_gcs_path: "gs://out/translated_sql/a_20240101000000_bq.sql".into(),
            dry_run_results: ValidationOutcome::SkippedByRequest,
            translated_sql_raw_output: None,
            translated_sql_extracted: None,
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert!(v.get("translated_sql_raw_output").is_none());
        assert_eq!(v["dry_run_results"]["status"], "SKIPPED_BY_USER_REQUEST");
    }
}
