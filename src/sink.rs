//! Result sink: persists extracted SQL next to other translations.
//!
//! Output objects are named after the input file's stem plus a second-granular
//! UTC timestamp, e.g. `gs://out/translated_sql/orders_20250101120000_bq.sql`.
//! Two inputs with the same stem finishing in the same second overwrite one
//! another; no collision detection is attempted.

use chrono::{DateTime, Utc};

use crate::config::OutputConfig;
use crate::error::TranslateError;
use crate::models::GcsPath;
use crate::storage::ObjectStore;

/// Compute the destination for a translated input at time `now`.
pub fn output_path(output: &OutputConfig, input: &GcsPath, now: DateTime<Utc>) -> GcsPath {
    let timestamp = now.format("%Y%m%d%H%M%S");
    let file_name = format!("{}_{}{}", input.file_stem(), timestamp, output.suffix);
    let prefix = output.prefix.trim_matches('/');
    let object = if prefix.is_empty() {
        file_name
    } else {
        format!("{}/{}", prefix, file_name)
    };
    GcsPath::new(output.bucket.clone(), object)
}

/// Write `sql` to its output location and return the `gs://` reference.
pub async fn store(
    store: &dyn ObjectStore,
    output: &OutputConfig,
    input: &GcsPath,
    sql: &str,
) -> Result<String, TranslateError> {
    let dest = output_path(output, input, Utc::now());
    tracing::info!("Uploading extracted SQL for {} to {}", input, dest);
    store.write_text(&dest, sql, "text/plain").await?;
    Ok(dest.to_string())
}
