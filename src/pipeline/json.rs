//! Locate the JSON part of a model response.
//!
//! The model is asked for "a JSON object" but routinely wraps it in prose
//! ("Here is the evaluation: … Let me know if …"). The span is found with a
//! single greedy regex, `(?s)\{.*\}`: the first `{` through the **last** `}`
//! anywhere in the response.
//!
//! This is not a brace matcher. If the model emits two objects, or trailing
//! commentary containing a `}`, the span covers everything in between and it
//! is left to [`super::repair::repair_json`] to make sense of it (it keeps the
//! first complete value and ignores the rest).

use super::repair::repair_json;
use crate::error::RecoveryFailure;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static RE_JSON_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex is valid"));

/// Return the substring from the first `{` to the last `}` inclusive, or
/// `None` when the response has no such span.
pub fn extract_json_text(response: &str) -> Option<&str> {
    RE_JSON_SPAN.find(response).map(|m| m.as_str())
}

/// Extract the JSON span and repair it.
///
/// * `Ok(None)` — no `{…}` span in the response.
/// * `Ok(Some(value))` — span found and repaired.
/// * `Err(_)` — span found but nothing could be recovered from it.
pub fn recover_json(response: &str) -> Result<Option<Value>, RecoveryFailure> {
    match extract_json_text(response) {
        Some(span) => repair_json(span).map(Some),
        None => Ok(None),
    }
}
