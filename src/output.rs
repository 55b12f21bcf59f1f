//! Output types returned by the evaluation pipeline.

use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message shown when the page yielded no text.
pub const NO_READABLE_TEXT: &str = "The webpage contains no readable text to evaluate.";

/// Message shown when the model answered without any `{…}` span.
pub const NO_JSON_FOUND: &str = "The model response did not contain a JSON object.";

/// Outcome of evaluating a block of page text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Evaluation {
    /// The text was empty; the model was not called.
    NoReadableText,
    /// The repaired JSON assessment.
    Assessment(Value),
    /// The model answered, but its response contained no `{…}` span.
    NoJsonFound,
}

impl Evaluation {
    /// The assessment, if one was recovered.
    pub fn assessment(&self) -> Option<&Value> {
        match self {
            Evaluation::Assessment(v) => Some(v),
            _ => None,
        }
    }

    /// User-facing rendering: pretty JSON for an assessment, a fixed
    /// sentence otherwise.
    pub fn display(&self) -> String {
        match self {
            Evaluation::NoReadableText => NO_READABLE_TEXT.to_string(),
            Evaluation::NoJsonFound => NO_JSON_FOUND.to_string(),
            Evaluation::Assessment(v) => {
                serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
            }
        }
    }
}

/// Final state of one URL evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportOutcome {
    /// The pipeline ran to completion.
    Completed { evaluation: Evaluation },
    /// The page could not be fetched; the model was not called.
    FetchFailed { error: FetchError, message: String },
    /// Schema, model call or JSON recovery failed.
    EvaluationFailed { message: String },
}

impl ReportOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ReportOutcome::Completed { .. })
    }

    /// What a front-end should show for this outcome.
    pub fn display(&self) -> String {
        match self {
            ReportOutcome::Completed { evaluation } => evaluation.display(),
            ReportOutcome::FetchFailed { message, .. } => message.clone(),
            ReportOutcome::EvaluationFailed { message } => message.clone(),
        }
    }
}

/// Timing and token statistics for one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationStats {
    /// Wall-clock time of the download and extraction.
    pub fetch_duration_ms: u64,
    /// Wall-clock time of schema loading, the model call and recovery.
    pub evaluation_duration_ms: u64,
    pub total_duration_ms: u64,
    /// Prompt tokens, when the backend reports them.
    pub input_tokens: Option<u64>,
    /// Generated tokens, when the backend reports them.
    pub output_tokens: Option<u64>,
}

/// Everything known about one URL evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub url: String,
    /// Extracted page text (empty when the fetch failed).
    pub page_text: String,
    /// Raw model output, when the model was called and answered.
    pub raw_response: Option<String>,
    pub outcome: ReportOutcome,
    pub stats: EvaluationStats,
}
