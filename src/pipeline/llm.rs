//! Remote text generation.
//!
//! The evaluator talks to the model through the [`TextGenerator`] trait so
//! the client is an explicit, injected dependency: tests pass a stub, the CLI
//! passes whichever backend the flags select. Two backends ship:
//!
//! * [`InvokeModelGenerator`] — a Bedrock-runtime style `invoke` endpoint
//!   that takes a fully rendered prompt (Llama 3 role delimiters included)
//!   and answers with a `{"generation": …}` envelope.
//! * [`ProviderGenerator`] — any [`edgequake_llm::LLMProvider`]; the system
//!   and user sections are sent as chat messages and the provider applies
//!   its own template.
//!
//! Each call is a single round trip. Nothing is retried here.

use crate::config::EvaluatorConfig;
use crate::error::InferenceError;
use crate::prompts::Prompt;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Sampling parameters for one generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_gen_len: u32,
}

impl GenerationParams {
    pub fn from_config(config: &EvaluatorConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_gen_len: config.max_gen_len,
        }
    }
}

/// Raw model output plus token accounting when the backend reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// A remote text-generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Identifier of the model this generator addresses.
    fn model_id(&self) -> &str;

    /// Submit `prompt` once and return the generated text.
    async fn generate(
        &self,
        prompt: &Prompt,
        params: GenerationParams,
    ) -> Result<Generation, InferenceError>;
}

// ── Invoke-model endpoint ────────────────────────────────────────────────────

/// Environment variable holding a Bedrock API key.
pub const BEDROCK_TOKEN_ENV: &str = "AWS_BEARER_TOKEN_BEDROCK";

#[derive(Debug, Serialize)]
struct InvokeRequest<'a> {
    prompt: &'a str,
    temperature: f32,
    max_gen_len: u32,
}

#[derive(Debug, Deserialize)]
struct InvokeResponse {
    generation: String,
    #[serde(default)]
    prompt_token_count: Option<u64>,
    #[serde(default)]
    generation_token_count: Option<u64>,
}

/// Client for `POST {endpoint}/model/{model_id}/invoke`.
pub struct InvokeModelGenerator {
    client: reqwest::Client,
    endpoint: String,
    model_id: String,
    api_token: Option<String>,
}

impl InvokeModelGenerator {
    /// Build a client. `timeout_secs = None` keeps the HTTP client default.
    pub fn new(
        endpoint: impl Into<String>,
        model_id: impl Into<String>,
        api_token: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, InferenceError> {
        let model_id = model_id.into();
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| InferenceError::Transport {
            model: model_id.clone(),
            reason: format!("failed to create HTTP client: {e}"),
        })?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model_id,
            api_token: api_token.filter(|t| !t.is_empty()),
        })
    }

    /// Build a client from the evaluator configuration. Without an explicit
    /// `api_token` the key is read from `AWS_BEARER_TOKEN_BEDROCK`.
    pub fn from_config(config: &EvaluatorConfig) -> Result<Self, InferenceError> {
        Self::new(
            config.resolved_endpoint(),
            config.model_id.clone(),
            token_or_env(config.api_token.clone(), std::env::var(BEDROCK_TOKEN_ENV).ok()),
            config.api_timeout_secs,
        )
    }

    fn invoke_url(&self) -> String {
        format!("{}/model/{}/invoke", self.endpoint, self.model_id)
    }

    fn classify_status(&self, status: reqwest::StatusCode, body: String) -> InferenceError {
        let detail = if body.trim().is_empty() {
            status.to_string()
        } else {
            body.trim().to_string()
        };
        let model = self.model_id.clone();
        match status.as_u16() {
            401 | 403 => InferenceError::Auth { model, detail },
            429 => InferenceError::Throttled { model, detail },
            code => InferenceError::Api {
                model,
                status: code,
                detail,
            },
        }
    }
}

/// An explicit, non-empty token wins over the environment.
fn token_or_env(explicit: Option<String>, from_env: Option<String>) -> Option<String> {
    explicit.filter(|t| !t.is_empty()).or(from_env)
}

#[async_trait]
impl TextGenerator for InvokeModelGenerator {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        params: GenerationParams,
    ) -> Result<Generation, InferenceError> {
        let rendered = prompt.render_llama3();
        let body = InvokeRequest {
            prompt: &rendered,
            temperature: params.temperature,
            max_gen_len: params.max_gen_len,
        };
        debug!(
            "Invoking {} ({} prompt chars, temperature {}, max_gen_len {})",
            self.model_id,
            rendered.len(),
            params.temperature,
            params.max_gen_len
        );

        let mut request = self
            .client
            .post(self.invoke_url())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body);
        if let Some(ref token) = self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout {
                    model: self.model_id.clone(),
                }
            } else {
                InferenceError::Transport {
                    model: self.model_id.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.classify_status(status, body));
        }

        let bytes = response.bytes().await.map_err(|e| InferenceError::Transport {
            model: self.model_id.clone(),
            reason: e.to_string(),
        })?;
        let envelope: InvokeResponse =
            serde_json::from_slice(&bytes).map_err(|e| InferenceError::MalformedResponse {
                model: self.model_id.clone(),
                detail: e.to_string(),
            })?;

        debug!(
            "{}: {:?} input tokens, {:?} output tokens",
            self.model_id, envelope.prompt_token_count, envelope.generation_token_count
        );

        Ok(Generation {
            text: envelope.generation,
            input_tokens: envelope.prompt_token_count,
            output_tokens: envelope.generation_token_count,
        })
    }
}

// ── edgequake-llm chat providers ─────────────────────────────────────────────

/// Adapter from an [`LLMProvider`] to [`TextGenerator`].
pub struct ProviderGenerator {
    provider: Arc<dyn LLMProvider>,
    provider_name: String,
    model_id: String,
    timeout: Option<Duration>,
}

impl ProviderGenerator {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        provider_name: impl Into<String>,
        model_id: impl Into<String>,
        timeout_secs: Option<u64>,
    ) -> Self {
        Self {
            provider,
            provider_name: provider_name.into(),
            model_id: model_id.into(),
            timeout: timeout_secs.map(Duration::from_secs),
        }
    }
}

#[async_trait]
impl TextGenerator for ProviderGenerator {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        params: GenerationParams,
    ) -> Result<Generation, InferenceError> {
        let messages = vec![
            ChatMessage::system(prompt.system.as_str()),
            ChatMessage::user(prompt.user.as_str()),
        ];
        let options = build_options(params);

        let call = self.provider.chat(&messages, Some(&options));
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                InferenceError::Timeout {
                    model: self.model_id.clone(),
                }
            })?,
            None => call.await,
        };

        let response = result.map_err(|e| InferenceError::Provider {
            provider: self.provider_name.clone(),
            detail: e.to_string(),
        })?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.model_id, response.prompt_tokens, response.completion_tokens
        );

        Ok(Generation {
            text: response.content,
            input_tokens: Some(response.prompt_tokens as u64),
            output_tokens: Some(response.completion_tokens as u64),
        })
    }
}

/// Build `CompletionOptions` from the generation parameters.
fn build_options(params: GenerationParams) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(params.temperature),
        max_tokens: Some(params.max_gen_len as usize),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgequake_llm::{ChatRole, LLMResponse, LlmError};
    use std::sync::Mutex;

    /// Records the chat request and answers with a canned reply.
    struct RecordingProvider {
        reply: Result<String, String>,
        delay: Option<Duration>,
        seen: Mutex<Option<(Vec<ChatMessage>, Option<CompletionOptions>)>>,
    }

    impl RecordingProvider {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                delay: None,
                seen: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl LLMProvider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "recording-model"
        }

        fn max_context_length(&self) -> usize {
            8192
        }

        async fn complete(&self, prompt: &str) -> edgequake_llm::Result<LLMResponse> {
            self.chat(&[ChatMessage::user(prompt)], None).await
        }

        async fn complete_with_options(
            &self,
            prompt: &str,
            options: &CompletionOptions,
        ) -> edgequake_llm::Result<LLMResponse> {
            self.chat(&[ChatMessage::user(prompt)], Some(options)).await
        }

        async fn chat(
            &self,
            messages: &[ChatMessage],
            options: Option<&CompletionOptions>,
        ) -> edgequake_llm::Result<LLMResponse> {
            *self.seen.lock().unwrap() = Some((messages.to_vec(), options.cloned()));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.reply {
                Ok(text) => Ok(LLMResponse::new(text.clone(), "recording-model").with_usage(12, 5)),
                Err(msg) => Err(LlmError::ApiError(msg.clone())),
            }
        }
    }

    fn prompt() -> Prompt {
        Prompt {
            system: "SYS".into(),
            user: "USR".into(),
        }
    }

    fn params() -> GenerationParams {
        GenerationParams {
            temperature: 0.0,
            max_gen_len: 512,
        }
    }

    #[tokio::test]
    async fn provider_receives_system_and_user_messages() {
        let provider = RecordingProvider::replying(r#"{"score": 7}"#);
        let generator = ProviderGenerator::new(provider.clone(), "recording", "m", None);

        let generation = generator.generate(&prompt(), params()).await.unwrap();
        assert_eq!(generation.text, r#"{"score": 7}"#);
        assert_eq!(generation.input_tokens, Some(12));
        assert_eq!(generation.output_tokens, Some(5));

        let (messages, options) = provider.seen.lock().unwrap().clone().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[0].content, "SYS");
        assert_eq!(messages[1].role, ChatRole::User);
        assert_eq!(messages[1].content, "USR");

        let options = options.expect("options are passed to chat");
        assert_eq!(options.temperature, Some(0.0));
        assert_eq!(options.max_tokens, Some(512));
    }

    #[tokio::test]
    async fn provider_error_is_mapped() {
        let provider = Arc::new(RecordingProvider {
            reply: Err("quota exhausted".into()),
            delay: None,
            seen: Mutex::new(None),
        });
        let generator = ProviderGenerator::new(provider, "recording", "m", None);

        match generator.generate(&prompt(), params()).await.unwrap_err() {
            InferenceError::Provider { provider, detail } => {
                assert_eq!(provider, "recording");
                assert!(detail.contains("quota exhausted"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let provider = Arc::new(RecordingProvider {
            reply: Ok("{}".into()),
            delay: Some(Duration::from_secs(30)),
            seen: Mutex::new(None),
        });
        let generator = ProviderGenerator::new(provider, "recording", "m", Some(1));

        let err = generator.generate(&prompt(), params()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Timeout { ref model } if model == "m"));
    }

    #[test]
    fn explicit_token_wins_over_env() {
        assert_eq!(
            token_or_env(Some("cli".into()), Some("env".into())),
            Some("cli".to_string())
        );
        assert_eq!(token_or_env(None, Some("env".into())), Some("env".to_string()));
        assert_eq!(token_or_env(Some(String::new()), Some("env".into())), Some("env".to_string()));
        assert_eq!(token_or_env(None, None), None);
    }

    #[test]
    fn from_config_uses_configured_token_and_endpoint() {
        let config = EvaluatorConfig::builder()
            .endpoint("http://localhost:9/")
            .model_id("m")
            .api_token("secret")
            .build()
            .unwrap();
        let g = InvokeModelGenerator::from_config(&config).unwrap();
        assert_eq!(g.api_token.as_deref(), Some("secret"));
        assert_eq!(g.invoke_url(), "http://localhost:9/model/m/invoke");
    }

    #[test]
    fn build_options_defaults() {
        let params = GenerationParams::from_config(&EvaluatorConfig::default());
        let opts = build_options(params);
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(2048));
    }

    #[test]
    fn invoke_url_includes_model() {
        let g = InvokeModelGenerator::new(
            "https://bedrock-runtime.us-west-2.amazonaws.com/",
            "meta.llama3-1-8b-instruct-v1:0",
            None,
            None,
        )
        .unwrap();
        assert_eq!(
            g.invoke_url(),
            "https://bedrock-runtime.us-west-2.amazonaws.com/model/meta.llama3-1-8b-instruct-v1:0/invoke"
        );
    }

    #[test]
    fn empty_token_is_dropped() {
        let g = InvokeModelGenerator::new("http://localhost", "m", Some(String::new()), None).unwrap();
        assert!(g.api_token.is_none());
    }

    #[test]
    fn status_classification() {
        let g = InvokeModelGenerator::new("http://localhost", "m", None, None).unwrap();
        assert!(matches!(
            g.classify_status(reqwest::StatusCode::FORBIDDEN, "denied".into()),
            InferenceError::Auth { .. }
        ));
        assert!(matches!(
            g.classify_status(reqwest::StatusCode::TOO_MANY_REQUESTS, String::new()),
            InferenceError::Throttled { .. }
        ));
        match g.classify_status(reqwest::StatusCode::BAD_GATEWAY, "  ".into()) {
            InferenceError::Api { status, detail, .. } => {
                assert_eq!(status, 502);
                assert!(detail.contains("502"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn request_body_shape() {
        let body = InvokeRequest {
            prompt: "hi",
            temperature: 0.0,
            max_gen_len: 2048,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v, serde_json::json!({"prompt": "hi", "temperature": 0.0, "max_gen_len": 2048}));
    }
}
