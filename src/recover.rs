//! Recovery of structured payloads from free-form model output.
//!
//! Models wrap answers in fenced code blocks more often than not. The
//! functions here form an explicit recover-or-fail step: strip the
//! first fence (labeled preferred, unlabeled accepted, raw text as the
//! last resort), then parse. A payload that still fails to parse
//! surfaces as [`PipelineError::GenerationFormatError`] carrying the
//! original raw text — never an empty result.

use crate::error::PipelineError;

/// Payload of the first fence opened with ```` ```<label> ````, if any.
pub fn strip_labeled_fence(text: &str, label: &str) -> Option<String> {
    let open = format!("```{}", label);
    let start = text.find(&open)? + open.len();
    Some(fence_payload(&text[start..]))
}

/// Payload of the first fence of any kind. A language tag on the
/// opening line is dropped.
pub fn strip_any_fence(text: &str) -> Option<String> {
    let start = text.find("```")? + 3;
    let rest = &text[start..];
    let rest = match rest.find('\n') {
        Some(nl)
            if rest[..nl]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') =>
        {
            &rest[nl + 1..]
        }
        _ => rest,
    };
    Some(fence_payload(rest))
}

/// Everything up to the closing fence; an unterminated fence runs to
/// the end of the input.
fn fence_payload(rest: &str) -> String {
    match rest.find("```") {
        Some(end) => rest[..end].trim().to_string(),
        None => rest.trim().to_string(),
    }
}

/// Labeled fence → any fence → raw text trimmed.
pub fn recover_text(raw: &str, label: &str) -> String {
    strip_labeled_fence(raw, label)
        .or_else(|| strip_any_fence(raw))
        .unwrap_or_else(|| raw.trim().to_string())
}

/// Recover a JSON value from model output, preferring a `json`-labeled
/// fence.
pub fn recover_json(raw: &str) -> Result<serde_json::Value, PipelineError> {
    let payload = recover_text(raw, "json");
    serde_json::from_str(&payload).map_err(|e| PipelineError::GenerationFormatError {
        detail: e.to_string(),
        raw: raw.to_string(),
    })
}
