//! Evaluation entry points.
//!
//! [`Evaluator::evaluate`] turns page text into an [`Evaluation`];
//! [`evaluate_url`] runs the whole pipeline for one URL and never fails:
//! every error is folded into the returned [`EvaluationReport`] so a
//! front-end always has something to show.

use crate::config::EvaluatorConfig;
use crate::error::{ConfigError, EvalError};
use crate::output::{Evaluation, EvaluationReport, EvaluationStats, ReportOutcome};
use crate::pipeline::llm::{
    Generation, GenerationParams, InvokeModelGenerator, ProviderGenerator, TextGenerator,
};
use crate::pipeline::{fetch, json};
use crate::prompts::build_prompt;
use edgequake_llm::ProviderFactory;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Prompts the model with page text and recovers its JSON verdict.
///
/// The generator is injected at construction and shared for the lifetime
/// of the evaluator; it holds no per-request state.
pub struct Evaluator {
    config: EvaluatorConfig,
    generator: Arc<dyn TextGenerator>,
}

impl Evaluator {
    /// Create an evaluator around an explicit generator.
    pub fn new(config: EvaluatorConfig, generator: Arc<dyn TextGenerator>) -> Self {
        Self { config, generator }
    }

    /// Create an evaluator, constructing the generator from `config`.
    ///
    /// See [`resolve_generator`] for the lookup order.
    pub fn from_config(config: EvaluatorConfig) -> Result<Self, ConfigError> {
        let generator = resolve_generator(&config)?;
        Ok(Self::new(config, generator))
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn model_id(&self) -> &str {
        self.generator.model_id()
    }

    /// Evaluate `text`.
    ///
    /// * empty text → [`Evaluation::NoReadableText`], without loading the
    ///   schema or calling the model;
    /// * no `{…}` span in the response → [`Evaluation::NoJsonFound`];
    /// * otherwise the repaired JSON as [`Evaluation::Assessment`].
    pub async fn evaluate(&self, text: &str) -> Result<Evaluation, EvalError> {
        self.evaluate_with_generation(text).await.0
    }

    /// Like [`Evaluator::evaluate`], also returning the raw generation when
    /// the model answered.
    async fn evaluate_with_generation(
        &self,
        text: &str,
    ) -> (Result<Evaluation, EvalError>, Option<Generation>) {
        if text.is_empty() {
            info!("No readable text; skipping model call");
            return (Ok(Evaluation::NoReadableText), None);
        }

        let schema = match load_schema(&self.config.schema_path).await {
            Ok(s) => s,
            Err(e) => return (Err(e.into()), None),
        };

        let prompt = build_prompt(self.config.system_prompt.as_deref(), text, &schema);
        info!(
            "Evaluating {} chars of text with {}",
            text.len(),
            self.generator.model_id()
        );

        let generation = match self
            .generator
            .generate(&prompt, GenerationParams::from_config(&self.config))
            .await
        {
            Ok(g) => g,
            Err(e) => return (Err(e.into()), None),
        };
        debug!("Raw model response: {} chars", generation.text.len());

        let result = match json::recover_json(&generation.text) {
            Ok(Some(value)) => Ok(Evaluation::Assessment(value)),
            Ok(None) => {
                warn!("Model response contained no JSON object");
                Ok(Evaluation::NoJsonFound)
            }
            Err(e) => Err(e.into()),
        };
        (result, Some(generation))
    }
}

/// Load the evaluation schema. The content is opaque and only checked for
/// being JSON.
pub async fn load_schema(path: &Path) -> Result<Value, ConfigError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::SchemaNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::SchemaUnreadable {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::SchemaInvalid {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Fetch `url`, extract its text and evaluate it.
///
/// Always returns a report; failures are recorded in
/// [`EvaluationReport::outcome`]. A failed fetch never reaches the model.
pub async fn evaluate_url(url: &str, evaluator: &Evaluator) -> EvaluationReport {
    let total_start = Instant::now();
    let config = evaluator.config();
    let progress = config.progress_callback.as_ref();
    info!("Starting evaluation: {}", url);

    // ── Step 1: Fetch and extract ────────────────────────────────────────
    if let Some(cb) = progress {
        cb.on_fetch_start(url);
    }
    let fetch_start = Instant::now();
    let fetched = fetch::fetch_text(url, config.fetch_timeout_secs).await;
    let fetch_duration_ms = fetch_start.elapsed().as_millis() as u64;

    let page_text = match fetched {
        Ok(text) => text,
        Err(e) => {
            warn!("Fetch failed for {}: {}", url, e);
            if let Some(cb) = progress {
                cb.on_fetch_error(url, &e.to_string());
            }
            return EvaluationReport {
                url: url.to_string(),
                page_text: String::new(),
                raw_response: None,
                outcome: ReportOutcome::FetchFailed {
                    message: e.to_string(),
                    error: e,
                },
                stats: EvaluationStats {
                    fetch_duration_ms,
                    total_duration_ms: total_start.elapsed().as_millis() as u64,
                    ..Default::default()
                },
            };
        }
    };
    if let Some(cb) = progress {
        cb.on_fetch_complete(url, page_text.len());
    }

    // ── Step 2: Evaluate ─────────────────────────────────────────────────
    if let Some(cb) = progress {
        cb.on_evaluation_start(evaluator.model_id());
    }
    let eval_start = Instant::now();
    let (result, generation) = evaluator.evaluate_with_generation(&page_text).await;
    let evaluation_duration_ms = eval_start.elapsed().as_millis() as u64;

    let outcome = match result {
        Ok(evaluation) => {
            if let Some(cb) = progress {
                cb.on_evaluation_complete(evaluation_duration_ms);
            }
            ReportOutcome::Completed { evaluation }
        }
        Err(e) => {
            warn!("Evaluation failed for {}: {}", url, e);
            if let Some(cb) = progress {
                cb.on_evaluation_error(&e.to_string());
            }
            ReportOutcome::EvaluationFailed {
                message: e.to_string(),
            }
        }
    };

    let stats = EvaluationStats {
        fetch_duration_ms,
        evaluation_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        input_tokens: generation.as_ref().and_then(|g| g.input_tokens),
        output_tokens: generation.as_ref().and_then(|g| g.output_tokens),
    };
    info!("Evaluation finished in {}ms", stats.total_duration_ms);

    EvaluationReport {
        url: url.to_string(),
        page_text,
        raw_response: generation.map(|g| g.text),
        outcome,
        stats,
    }
}

/// Blocking wrapper around [`evaluate_url`].
///
/// Creates a temporary tokio runtime internally, so it must not be called
/// from inside an async context.
pub fn evaluate_url_sync(url: &str, evaluator: &Evaluator) -> std::io::Result<EvaluationReport> {
    let runtime = tokio::runtime::Runtime::new()?;
    Ok(runtime.block_on(evaluate_url(url, evaluator)))
}

/// Resolve the text generator, from most-specific to least-specific.
///
/// 1. **Pre-built generator** (`config.generator`) — used as-is.
/// 2. **Named provider** (`config.provider_name`) — built with
///    [`ProviderFactory::create_llm_provider`] for `config.model_id`; the
///    factory reads the provider's API key from the environment.
/// 3. **Invoke-model endpoint** — `config.resolved_endpoint()` with
///    `config.api_token`, falling back to `AWS_BEARER_TOKEN_BEDROCK`.
pub fn resolve_generator(config: &EvaluatorConfig) -> Result<Arc<dyn TextGenerator>, ConfigError> {
    if let Some(ref generator) = config.generator {
        return Ok(Arc::clone(generator));
    }

    if let Some(ref name) = config.provider_name {
        let provider = ProviderFactory::create_llm_provider(name, &config.model_id).map_err(|e| {
            ConfigError::ProviderNotConfigured {
                provider: name.clone(),
                hint: format!("{e}"),
            }
        })?;
        return Ok(Arc::new(ProviderGenerator::new(
            provider,
            name.clone(),
            config.model_id.clone(),
            config.api_timeout_secs,
        )));
    }

    let generator =
        InvokeModelGenerator::from_config(config).map_err(|e| ConfigError::ProviderNotConfigured {
            provider: "bedrock".to_string(),
            hint: e.to_string(),
        })?;
    Ok(Arc::new(generator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InferenceError;
    use crate::prompts::Prompt;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubGenerator {
        reply: Result<String, InferenceError>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<Prompt>>,
    }

    impl StubGenerator {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            })
        }

        fn failing(err: InferenceError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(err),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for StubGenerator {
        fn model_id(&self) -> &str {
            "stub"
        }

        async fn generate(
            &self,
            prompt: &Prompt,
            _params: GenerationParams,
        ) -> Result<Generation, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.clone());
            self.reply.clone().map(|text| Generation {
                text,
                ..Default::default()
            })
        }
    }

    fn schema_file() -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"title": null, "overall_score": null}}"#).unwrap();
        f
    }

    fn evaluator(stub: Arc<StubGenerator>, schema: &Path) -> Evaluator {
        let config = EvaluatorConfig::builder().schema_path(schema).build().unwrap();
        Evaluator::new(config, stub)
    }

    #[tokio::test]
    async fn empty_text_short_circuits() {
        let stub = StubGenerator::replying("{}");
        // Schema path deliberately missing: it must not be read.
        let ev = evaluator(stub.clone(), Path::new("does/not/exist.json"));
        let result = ev.evaluate("").await.unwrap();
        assert_eq!(result, Evaluation::NoReadableText);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn assessment_is_recovered_from_prose() {
        let schema = schema_file();
        let stub = StubGenerator::replying(r#"Here you go: {"title": "Home", "overall_score": null} Hope it helps!"#);
        let ev = evaluator(stub.clone(), schema.path());

        let result = ev.evaluate("Welcome to our site").await.unwrap();
        assert_eq!(
            result,
            Evaluation::Assessment(serde_json::json!({"title": "Home", "overall_score": null}))
        );

        let prompt = stub.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.user.contains("website text: Welcome to our site"));
        assert!(prompt.user.contains("overall_score"));
    }

    #[tokio::test]
    async fn schema_reaches_prompt_in_file_order() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"website_name": null, "criteria": {{}}, "summary": null}}"#).unwrap();
        let stub = StubGenerator::replying("{}");
        let ev = evaluator(stub.clone(), f.path());

        ev.evaluate("text").await.unwrap();
        let prompt = stub.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt
            .user
            .contains(r#"the schema: {"website_name":null,"criteria":{},"summary":null}"#));
    }

    #[tokio::test]
    async fn no_json_is_absence_not_error() {
        let schema = schema_file();
        let stub = StubGenerator::replying("I am unable to evaluate this page.");
        let ev = evaluator(stub, schema.path());
        assert_eq!(ev.evaluate("some text").await.unwrap(), Evaluation::NoJsonFound);
    }

    #[tokio::test]
    async fn missing_schema_is_config_error() {
        let stub = StubGenerator::replying("{}");
        let ev = evaluator(stub.clone(), Path::new("does/not/exist.json"));
        let err = ev.evaluate("text").await.unwrap_err();
        assert!(matches!(err, EvalError::Config(ConfigError::SchemaNotFound { .. })));
        assert!(err.to_string().starts_with("Error evaluating text:"));
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_schema_is_config_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "not json").unwrap();
        let ev = evaluator(StubGenerator::replying("{}"), f.path());
        let err = ev.evaluate("text").await.unwrap_err();
        assert!(matches!(err, EvalError::Config(ConfigError::SchemaInvalid { .. })));
    }

    #[tokio::test]
    async fn inference_failure_is_reported() {
        let schema = schema_file();
        let stub = StubGenerator::failing(InferenceError::Auth {
            model: "stub".into(),
            detail: "bad key".into(),
        });
        let ev = evaluator(stub, schema.path());
        let err = ev.evaluate("text").await.unwrap_err();
        assert!(matches!(err, EvalError::Inference(InferenceError::Auth { .. })));
        assert!(err.to_string().contains("bad key"));
    }

    #[tokio::test]
    async fn pre_built_generator_wins() {
        let stub = StubGenerator::replying("{}");
        let config = EvaluatorConfig::builder()
            .provider_name("openai")
            .generator(stub)
            .build()
            .unwrap();
        let generator = resolve_generator(&config).unwrap();
        assert_eq!(generator.model_id(), "stub");
    }

    #[test]
    fn default_resolution_targets_invoke_endpoint() {
        let config = EvaluatorConfig::default();
        let generator = resolve_generator(&config).unwrap();
        assert_eq!(generator.model_id(), "meta.llama3-1-8b-instruct-v1:0");
    }
}
