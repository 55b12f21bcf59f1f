//! Error types for the edgequake-webeval library.
//!
//! Each pipeline stage owns its own error type so callers can tell *where*
//! a request went wrong without string matching:
//!
//! * [`FetchError`] — the page could not be downloaded (DNS, refused
//!   connection, timeout, non-2xx status).
//! * [`ConfigError`] — the evaluator is misconfigured: the schema file is
//!   missing or not JSON, builder validation failed, or no provider could be
//!   constructed.
//! * [`InferenceError`] — the single remote model call failed.
//! * [`RecoveryFailure`] — the model answered, but no structure could be
//!   recovered from the JSON-looking part of its answer.
//!
//! [`EvalError`] groups the three failures that can happen after the page
//! text is known. Every variant renders as a one-line, user-facing message so
//! a front-end can always show *something* instead of aborting.

use std::path::PathBuf;
use thiserror::Error;

/// The page could not be fetched.
///
/// Displayed with the `Error fetching the website content:` prefix so the
/// message stands on its own in a UI.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum FetchError {
    /// The URL was rejected before any request was sent.
    #[error("Error fetching the website content: invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The request did not complete within the configured timeout.
    #[error("Error fetching the website content: request to '{url}' timed out")]
    Timeout { url: String },

    /// DNS failure, refused connection, TLS error, redirect loop, …
    #[error("Error fetching the website content: {reason}")]
    Transport { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("Error fetching the website content: {status} for url: {url}")]
    HttpStatus { url: String, status: u16 },

    /// Headers arrived but the body could not be read.
    #[error("Error fetching the website content: failed to read body of '{url}': {reason}")]
    Body { url: String, reason: String },
}

impl FetchError {
    /// Map a `reqwest` error to the matching variant.
    pub(crate) fn from_reqwest(url: &str, e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if e.is_builder() {
            FetchError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            }
        } else if let Some(status) = e.status() {
            FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

/// Evaluator configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The schema file does not exist.
    #[error("schema file not found: '{path}'\nPass --schema <PATH> or run from the directory holding schema.json.")]
    SchemaNotFound { path: PathBuf },

    /// The schema file exists but could not be read.
    #[error("failed to read schema file '{path}': {source}")]
    SchemaUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The schema file is not valid JSON.
    #[error("schema file '{path}' is not valid JSON: {source}")]
    SchemaInvalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The named provider could not be constructed (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },
}

/// The remote text-generation call failed.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum InferenceError {
    /// The request never reached the service or the connection dropped.
    #[error("request to model '{model}' failed: {reason}")]
    Transport { model: String, reason: String },

    /// The call exceeded the configured API timeout.
    #[error("model '{model}' did not answer within the timeout")]
    Timeout { model: String },

    /// 401/403 from the service; retrying will not help.
    #[error("authentication rejected for model '{model}': {detail}")]
    Auth { model: String, detail: String },

    /// 429 from the service.
    #[error("model '{model}' is throttling requests: {detail}")]
    Throttled { model: String, detail: String },

    /// Any other non-success status.
    #[error("model '{model}' returned HTTP {status}: {detail}")]
    Api {
        model: String,
        status: u16,
        detail: String,
    },

    /// The envelope was not JSON or had no `generation` field.
    #[error("malformed response from model '{model}': {detail}")]
    MalformedResponse { model: String, detail: String },

    /// Error surfaced by an `edgequake_llm` provider.
    #[error("provider '{provider}' failed: {detail}")]
    Provider { provider: String, detail: String },
}

/// JSON repair produced no structure.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum RecoveryFailure {
    /// Nothing but whitespace, comments or invisible characters.
    #[error("failed to recover JSON: input is empty")]
    Empty,

    /// The lenient parser found no value at all.
    #[error("failed to recover JSON: {reason} at position {offset}")]
    Unrecoverable { reason: String, offset: usize },

    /// Nesting exceeded the parser's depth limit.
    #[error("failed to recover JSON: nesting deeper than {limit} levels")]
    TooDeep { limit: usize },
}

/// Failures that can happen while evaluating already-extracted page text.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Error evaluating text: {0}")]
    Config(#[from] ConfigError),

    #[error("Error evaluating text: {0}")]
    Inference(#[from] InferenceError),

    #[error("Error evaluating text: {0}")]
    Recovery(#[from] RecoveryFailure),
}
