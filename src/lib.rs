//! # edgequake-webeval
//!
//! Score the text quality of a webpage with a hosted LLM and recover its
//! structured JSON verdict.
//!
//! ## Pipeline Overview
//!
//! ```text
//! URL
//!  │
//!  ├─ 1. Fetch    one GET, no retries
//!  ├─ 2. Extract  text of <p>, <span>, <li> in document order
//!  ├─ 3. Prompt   system + page text + schema.json, Llama 3 template
//!  ├─ 4. Model    single call, temperature 0, max_gen_len 2048
//!  ├─ 5. Locate   greedy `{…}` span in the raw answer
//!  └─ 6. Repair   lenient JSON parse → serde_json::Value
//! ```
//!
//! Empty page text stops after step 2 with
//! [`Evaluation::NoReadableText`]; the model is never called.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_webeval::{evaluate_url, Evaluator, EvaluatorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Bedrock key read from AWS_BEARER_TOKEN_BEDROCK
//!     let evaluator = Evaluator::from_config(EvaluatorConfig::default())?;
//!     let report = evaluate_url("https://example.org", &evaluator).await;
//!     println!("{}", report.outcome.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `webeval` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod evaluate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{EvaluatorConfig, EvaluatorConfigBuilder};
pub use error::{ConfigError, EvalError, FetchError, InferenceError, RecoveryFailure};
pub use evaluate::{evaluate_url, evaluate_url_sync, load_schema, resolve_generator, Evaluator};
pub use output::{Evaluation, EvaluationReport, EvaluationStats, ReportOutcome};
pub use pipeline::fetch::{extract_text, fetch_text};
pub use pipeline::json::{extract_json_text, recover_json};
pub use pipeline::llm::{
    Generation, GenerationParams, InvokeModelGenerator, ProviderGenerator, TextGenerator,
    BEDROCK_TOKEN_ENV,
};
pub use pipeline::repair::repair_json;
pub use progress::{EvaluationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::{build_prompt, Prompt};
