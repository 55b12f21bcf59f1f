//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn EvaluationProgressCallback>`] via
//! [`crate::config::EvaluatorConfigBuilder::progress_callback`] to learn when
//! the page download and the model call start and finish. The CLI uses it to
//! swap spinner messages; a web front-end could forward the same events over
//! a socket.
//!
//! # Example
//!
//! ```rust
//! use edgequake_webeval::{EvaluationProgressCallback, EvaluatorConfig};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl EvaluationProgressCallback for Printer {
//!     fn on_fetch_start(&self, url: &str) {
//!         eprintln!("fetching {url}");
//!     }
//! }
//!
//! let config = EvaluatorConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn EvaluationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline at each stage boundary.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait EvaluationProgressCallback: Send + Sync {
    /// Called just before the GET request is sent.
    fn on_fetch_start(&self, url: &str) {
        let _ = url;
    }

    /// Called after the page was downloaded and reduced to text.
    ///
    /// # Arguments
    /// * `url`      — the requested URL
    /// * `text_len` — byte length of the extracted text (0 = nothing readable)
    fn on_fetch_complete(&self, url: &str, text_len: usize) {
        let _ = (url, text_len);
    }

    /// Called when the download failed.
    fn on_fetch_error(&self, url: &str, error: &str) {
        let _ = (url, error);
    }

    /// Called just before the model request is sent.
    fn on_evaluation_start(&self, model_id: &str) {
        let _ = model_id;
    }

    /// Called once the evaluation produced an outcome (including the
    /// "no readable text" and "no JSON found" outcomes).
    fn on_evaluation_complete(&self, elapsed_ms: u64) {
        let _ = elapsed_ms;
    }

    /// Called when the evaluation failed.
    fn on_evaluation_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl EvaluationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::EvaluatorConfig`].
pub type ProgressCallback = Arc<dyn EvaluationProgressCallback>;
