//! Per-item error classification.
//!
//! Every failure that can end an item's pipeline is one of the
//! [`TranslateError`] variants. The batch orchestrator converts them into
//! `Failure` records carrying the matching [`ErrorKind`] status string.

use serde::Serialize;
use thiserror::Error;

/// Status identifiers surfaced in failure records and request-level errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "ERROR_FILE_NOT_FOUND")]
    FileNotFound,
    #[serde(rename = "ERROR_INVALID_INPUT")]
    InvalidInput,
    #[serde(rename = "ERROR_IO")]
    Io,
    #[serde(rename = "ERROR_MODEL_INVOCATION")]
    ModelInvocation,
    #[serde(rename = "ERROR_CORPUS_PROVISIONING")]
    CorpusProvisioning,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileNotFound => "ERROR_FILE_NOT_FOUND",
            Self::InvalidInput => "ERROR_INVALID_INPUT",
            Self::Io => "ERROR_IO",
            Self::ModelInvocation => "ERROR_MODEL_INVOCATION",
            Self::CorpusProvisioning => "ERROR_CORPUS_PROVISIONING",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum TranslateError {
    /// The input reference does not resolve to an existing object.
    #[error("Input file not found: {0}")]
    NotFound(String),

    /// Malformed request or reference.
    #[error("{0}")]
    InvalidInput(String),

    /// Read or write failure other than not-found.
    #[error("Storage I/O error: {0}")]
    Io(String),

    /// Transport or service failure from the generative model.
    #[error("Model invocation failed: {0}")]
    ModelInvocation(String),

    /// Corpus lookup, creation, or credential resolution failed.
    #[error("Corpus provisioning failed: {0}")]
    CorpusProvisioning(String),
}

impl TranslateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::FileNotFound,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Io(_) => ErrorKind::Io,
            Self::ModelInvocation(_) => ErrorKind::ModelInvocation,
            Self::CorpusProvisioning(_) => ErrorKind::CorpusProvisioning,
        }
    }

    /// HTTP status for request-level rendering of this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::NotFound(_) => 404,
            Self::Io(_) | Self::ModelInvocation(_) | Self::CorpusProvisioning(_) => 502,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_status_strings() {
        assert_eq!(
            TranslateError::NotFound("gs://b/x.sql".into()).kind().as_str(),
            "ERROR_FILE_NOT_FOUND"
        );
        assert_eq!(TranslateError::Io("denied".into()).kind().as_str(), "ERROR_IO");
        assert_eq!(
            TranslateError::ModelInvocation("503".into()).kind().as_str(),
            "ERROR_MODEL_INVOCATION"
        );
        assert_eq!(
            TranslateError::CorpusProvisioning("list failed".into()).kind().as_str(),
            "ERROR_CORPUS_PROVISIONING"
        );
    }

    #[test]
    fn test_kind_serializes_as_status() {
        let json = serde_json::to_string(&ErrorKind::InvalidInput).unwrap();
        assert_eq!(json, "\"ERROR_INVALID_INPUT\"");
    }

    #[test]
    fn test_not_found_message_names_reference() {
        let err = TranslateError::NotFound("gs://b/missing.sql".into());
        assert_eq!(err.to_string(), "Input file not found: gs://b/missing.sql");
    }
}
