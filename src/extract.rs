//! Fenced SQL block extraction from free-form model output.
//!
//! The model is instructed to answer inside a ```` ```sql ```` fence. This
//! module finds the first such fence and returns its trimmed contents.
//!
//! | Input | Result |
//! |-------|--------|
//! | one ```` ```sql ```` block | trimmed contents |
//! | several blocks | contents of the first only |
//! | no opening fence | `""` |
//! | opening fence, no closing fence | `""` |
//!
//! The opening marker is matched ASCII case-insensitively (```` ```SQL ````
//! is accepted). Extraction never fails; an empty string means the response
//! held no usable translation.

const FENCE: &str = "```";
const SQL_OPEN: &str = "```sql";

/// Return the trimmed body of the first ```` ```sql ```` fenced block.
pub fn extract_sql(raw: &str) -> String {
    // ASCII lowercasing keeps byte offsets aligned with `raw`.
    let lowered = raw.to_ascii_lowercase();

    let Some(open) = lowered.find(SQL_OPEN) else {
        return String::new();
    };
    let body_start = open + SQL_OPEN.len();

    let Some(close) = raw[body_start..].find(FENCE) else {
        return String::new();
    };

    raw[body_start..body_start + close].trim().to_string()
}

/// Single-line preview for log messages.
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars()
        .take(max_chars)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}
