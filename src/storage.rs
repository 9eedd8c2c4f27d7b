//! Object storage access: source fetching and the Cloud Storage client.
//!
//! [`ObjectStore`] is the seam between the pipeline and storage. The
//! production implementation, [`GcsStore`], talks to the Cloud Storage JSON
//! API directly with `reqwest`; a custom `[endpoints].storage` base URL points
//! it at an emulator (e.g. `fake-gcs-server`).
//!
//! # Error mapping
//!
//! | Condition | Error |
//! |-----------|-------|
//! | HTTP 404 on read | [`TranslateError::NotFound`] |
//! | any other non-2xx, transport error, token failure | [`TranslateError::Io`] |

use async_trait::async_trait;
use std::sync::Arc;

use crate::auth::Credentials;
use crate::error::TranslateError;
use crate::models::GcsPath;

/// Read/write access to text objects addressed by [`GcsPath`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download an object as UTF-8 text. Invalid UTF-8 is an `Io` error.
    async fn read_text(&self, path: &GcsPath) -> Result<String, TranslateError>;

    /// Upload `body`, replacing any existing object at `path`.
    async fn write_text(
        &self,
        path: &GcsPath,
        body: &str,
        content_type: &str,
    ) -> Result<(), TranslateError>;
}

/// Fetch the source text behind an input reference.
///
/// A missing object is `NotFound`; anything else the store reports is passed
/// through.
pub async fn fetch_text(store: &dyn ObjectStore, path: &GcsPath) -> Result<String, TranslateError> {
    let text = store.read_text(path).await?;
    tracing::info!(
        "Read SQL content (length: {} chars) for {}",
        text.chars().count(),
        path
    );
    Ok(text)
}

/// Cloud Storage JSON API client.
pub struct GcsStore {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<Credentials>,
}

impl GcsStore {
    pub fn new(client: reqwest::Client, base_url: String, credentials: Arc<Credentials>) -> Self {
        Self {
            client,
            base_url,
            credentials,
        }
    }

    async fn token(&self) -> Result<String, TranslateError> {
        self.credentials
            .access_token(&self.client)
            .await
            .map_err(|e| TranslateError::Io(format!("failed to obtain access token: {:#}", e)))
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn read_text(&self, path: &GcsPath) -> Result<String, TranslateError> {
        let url = format!(
            "{}/storage/v1/b/{}/o/{}?alt=media",
            self.base_url,
            uri_encode(&path.bucket),
            uri_encode(&path.object)
        );
        let token = self.token().await?;

        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| TranslateError::Io(format!("Failed to get {}: {}", path, e)))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(TranslateError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TranslateError::Io(format!(
                "GCS download failed (HTTP {}) for {}: {}",
                status,
                path,
                body.chars().take(500).collect::<String>()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| TranslateError::Io(format!("Failed to read body of {}: {}", path, e)))?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| TranslateError::Io(format!("{} is not valid UTF-8: {}", path, e)))
    }

    async fn write_text(
        &self,
        path: &GcsPath,
        body: &str,
        content_type: &str,
    ) -> Result<(), TranslateError> {
        let url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.base_url,
            uri_encode(&path.bucket),
            uri_encode(&path.object)
        );
        let token = self.token().await?;

        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("Content-Type", content_type)
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| TranslateError::Io(format!("Failed to upload {}: {}", path, e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(TranslateError::Io(format!(
                "GCS upload failed (HTTP {}) for {}: {}",
                status,
                path,
                body.chars().take(500).collect::<String>()
            )));
        }

        Ok(())
    }
}

/// Percent-encode a bucket or object name for a JSON API URL.
///
/// The JSON API takes the whole object name as one path segment (and as the
/// `name` query value on upload), so `/` must arrive as `%2F` or the request
/// addresses a different resource. Only `A-Z a-z 0-9 - _ . ~` pass through.
pub(crate) fn uri_encode(s: &str) -> String {
    use std::fmt::Write;

    s.bytes().fold(String::with_capacity(s.len()), |mut out, byte| {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(byte as char);
        } else {
            let _ = write!(out, "%{:02X}", byte);
        }
        out
    })
}
