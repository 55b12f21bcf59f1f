//! Configuration types for webpage evaluation.
//!
//! All evaluator behaviour is controlled through [`EvaluatorConfig`], built
//! via its [`EvaluatorConfigBuilder`]. The defaults reproduce the reference
//! setup: Llama 3.1 8B Instruct on Bedrock in `us-west-2`, greedy decoding,
//! 2 048 generated tokens, and `schema.json` read from the working directory.

use crate::error::ConfigError;
use crate::pipeline::llm::TextGenerator;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model addressed when no `model_id` is configured.
pub const DEFAULT_MODEL_ID: &str = "meta.llama3-1-8b-instruct-v1:0";

/// Region used to derive the Bedrock runtime endpoint.
pub const DEFAULT_REGION: &str = "us-west-2";

/// Relative path of the schema description loaded on every evaluation.
pub const DEFAULT_SCHEMA_PATH: &str = "schema.json";

/// Configuration for a webpage evaluation.
///
/// # Example
/// ```rust
/// use edgequake_webeval::EvaluatorConfig;
///
/// let config = EvaluatorConfig::builder()
///     .schema_path("config/schema.json")
///     .max_gen_len(1024)
///     .build()
///     .unwrap();
/// assert_eq!(config.temperature, 0.0);
/// ```
#[derive(Clone)]
pub struct EvaluatorConfig {
    /// Model identifier sent to the inference endpoint.
    /// Default: [`DEFAULT_MODEL_ID`].
    pub model_id: String,

    /// Sampling temperature. Default: 0.0 (deterministic decoding).
    pub temperature: f32,

    /// Maximum number of tokens the model may generate. Default: 2048.
    pub max_gen_len: u32,

    /// Location of the evaluation schema. Default: `schema.json`.
    ///
    /// The file is read on every call to
    /// [`crate::evaluate::Evaluator::evaluate`], so edits take effect without a
    /// restart.
    pub schema_path: PathBuf,

    /// Custom system instruction. If None, uses
    /// [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// AWS region of the Bedrock runtime endpoint. Default: `us-west-2`.
    pub region: String,

    /// Full base URL of the invoke-model endpoint. Overrides `region`.
    pub endpoint: Option<String>,

    /// Bearer token for the invoke-model endpoint.
    pub api_token: Option<String>,

    /// `edgequake_llm` provider name (e.g. "openai", "anthropic", "ollama").
    /// When set, the chat provider is used instead of the invoke-model endpoint.
    pub provider_name: Option<String>,

    /// Pre-constructed generator. Takes precedence over everything else.
    pub generator: Option<Arc<dyn TextGenerator>>,

    /// Timeout for the page download in seconds. Default: None (client default).
    pub fetch_timeout_secs: Option<u64>,

    /// Timeout for the model call in seconds. Default: None (client default).
    pub api_timeout_secs: Option<u64>,

    /// Progress events for front-ends. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            temperature: 0.0,
            max_gen_len: 2048,
            schema_path: PathBuf::from(DEFAULT_SCHEMA_PATH),
            system_prompt: None,
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            api_token: None,
            provider_name: None,
            generator: None,
            fetch_timeout_secs: None,
            api_timeout_secs: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for EvaluatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorConfig")
            .field("model_id", &self.model_id)
            .field("temperature", &self.temperature)
            .field("max_gen_len", &self.max_gen_len)
            .field("schema_path", &self.schema_path)
            .field("system_prompt", &self.system_prompt.as_ref().map(|s| s.len()))
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("provider_name", &self.provider_name)
            .field("generator", &self.generator.as_ref().map(|_| "<dyn TextGenerator>"))
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl EvaluatorConfig {
    /// Create a new builder for `EvaluatorConfig`.
    pub fn builder() -> EvaluatorConfigBuilder {
        EvaluatorConfigBuilder {
            config: Self::default(),
        }
    }

    /// Base URL of the invoke-model endpoint: `endpoint` if set, otherwise
    /// the regional Bedrock runtime host.
    pub fn resolved_endpoint(&self) -> String {
        match self.endpoint {
            Some(ref e) => e.trim_end_matches('/').to_string(),
            None => format!("https://bedrock-runtime.{}.amazonaws.com", self.region),
        }
    }
}

/// Builder for [`EvaluatorConfig`].
pub struct EvaluatorConfigBuilder {
    config: EvaluatorConfig,
}

impl fmt::Debug for EvaluatorConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl EvaluatorConfigBuilder {
    pub fn model_id(mut self, model: impl Into<String>) -> Self {
        self.config.model_id = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_gen_len(mut self, n: u32) -> Self {
        self.config.max_gen_len = n;
        self
    }

    pub fn schema_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.schema_path = path.into();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = region.into();
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = Some(url.into());
        self
    }

    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.config.api_token = Some(token.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.config.generator = Some(generator);
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = Some(secs);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EvaluatorConfig, ConfigError> {
        let c = &self.config;
        if c.model_id.trim().is_empty() {
            return Err(ConfigError::Invalid("model id must not be empty".into()));
        }
        if c.max_gen_len == 0 {
            return Err(ConfigError::Invalid("max_gen_len must be >= 1".into()));
        }
        if c.region.trim().is_empty() && c.endpoint.is_none() {
            return Err(ConfigError::Invalid(
                "either a region or an explicit endpoint is required".into(),
            ));
        }
        if c.fetch_timeout_secs == Some(0) || c.api_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid("timeouts must be >= 1 second".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_setup() {
        let config = EvaluatorConfig::default();
        assert_eq!(config.model_id, "meta.llama3-1-8b-instruct-v1:0");
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.max_gen_len, 2048);
        assert_eq!(config.schema_path, PathBuf::from("schema.json"));
        assert!(config.fetch_timeout_secs.is_none());
        assert!(config.api_timeout_secs.is_none());
    }

    #[test]
    fn endpoint_derived_from_region() {
        let config = EvaluatorConfig::builder().region("eu-central-1").build().unwrap();
        assert_eq!(
            config.resolved_endpoint(),
            "https://bedrock-runtime.eu-central-1.amazonaws.com"
        );
    }

    #[test]
    fn explicit_endpoint_wins_and_is_trimmed() {
        let config = EvaluatorConfig::builder()
            .endpoint("http://127.0.0.1:9000/")
            .build()
            .unwrap();
        assert_eq!(config.resolved_endpoint(), "http://127.0.0.1:9000");
    }

    #[test]
    fn temperature_is_clamped() {
        let config = EvaluatorConfig::builder().temperature(5.0).build().unwrap();
        assert_eq!(config.temperature, 2.0);
    }

    #[test]
    fn zero_max_gen_len_rejected() {
        let err = EvaluatorConfig::builder().max_gen_len(0).build().unwrap_err();
        assert_eq!(err.to_string(), "invalid configuration: max_gen_len must be >= 1");
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = EvaluatorConfig::builder().fetch_timeout_secs(0).build().unwrap_err();
        assert_eq!(err.to_string(), "invalid configuration: timeouts must be >= 1 second");
        assert!(EvaluatorConfig::builder().api_timeout_secs(0).build().is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let config = EvaluatorConfig::builder().api_token("secret-token").build().unwrap();
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("secret-token"));
        assert!(dbg.contains("<redacted>"));
    }
}
