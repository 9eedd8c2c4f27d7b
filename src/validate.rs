//! Validation prober: optional dry-run of extracted SQL.

use crate::bigquery::QueryPlanner;
use crate::models::ValidationOutcome;

pub const EMPTY_SQL_REASON: &str = "extracted SQL was empty";

/// Validate `sql` against the planner unless it is empty or the caller
/// disabled validation.
///
/// Empty (or whitespace-only) SQL is reported as `SkippedEmptySql` whatever
/// `enabled` says. The planner is contacted only when `enabled` is true and
/// `sql` has content. Planner rejections become `Failure` outcomes; this
/// function never errors.
pub async fn dry_run(planner: &dyn QueryPlanner, sql: &str, enabled: bool) -> ValidationOutcome {
    if sql.trim().is_empty() {
        tracing::warn!("Extracted SQL is empty. Skipping dry run.");
        return ValidationOutcome::SkippedEmptySql {
            reason: EMPTY_SQL_REASON.to_string(),
        };
    }
    if !enabled {
        tracing::info!("Dry run skipped as per user request.");
        return ValidationOutcome::SkippedByRequest;
    }

    tracing::info!("Performing dry run on extracted SQL (length: {} chars)...", sql.chars().count());
    match planner.dry_run(sql).await {
        Ok(bytes) => {
            tracing::info!("Dry run successful. Bytes processed: {}", bytes);
            ValidationOutcome::Success {
                total_bytes_processed: bytes,
            }
        }
        Err(message) => {
            tracing::error!("Dry run failed: {}", message);
            ValidationOutcome::Failure {
                error_message: message,
            }
        }
    }
}
