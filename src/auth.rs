//! OAuth2 bearer tokens for Google Cloud REST APIs.
//!
//! # Resolution order
//!
//! 1. The environment variable named by `[auth].access_token_env`
//!    (default `GOOGLE_OAUTH_ACCESS_TOKEN`), e.g. the output of
//!    `gcloud auth print-access-token`.
//! 2. The metadata server of the hosting platform (Cloud Run, Cloud
//!    Functions, GCE), which issues tokens for the attached service account.
//!
//! A token is resolved for every outbound request.

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::config::AuthConfig;

/// Source of an access token.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// A fixed token (from the environment, emulators, or tests).
    Static(String),
    /// Fetch from the instance metadata server on every resolution.
    Metadata { url: String },
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
}

impl Credentials {
    pub fn from_config(auth: &AuthConfig) -> Self {
        match std::env::var(&auth.access_token_env) {
            Ok(token) if !token.trim().is_empty() => Self::Static(token.trim().to_string()),
            _ => Self::Metadata {
                url: auth.metadata_url.clone(),
            },
        }
    }

    pub async fn access_token(&self, client: &reqwest::Client) -> Result<String> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::Metadata { url } => {
                let resp = client
                    .get(url)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await
                    .with_context(|| format!("Failed to reach metadata server at {}", url))?;

                if !resp.status().is_success() {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    bail!(
                        "Metadata token request failed (HTTP {}): {}",
                        status,
                        body.chars().take(300).collect::<String>()
                    );
                }

                let token: MetadataToken = resp
                    .json()
                    .await
                    .context("Invalid metadata token response")?;
                Ok(token.access_token)
            }
        }
    }
}
