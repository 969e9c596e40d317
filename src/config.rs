//! Configuration types for report analysis.
//!
//! All pipeline behaviour is controlled through [`AnalysisConfig`], built via
//! its [`AnalysisConfigBuilder`]. The configuration is process-wide read-only
//! state: build it once at startup, hand it to [`crate::Analyzer`], and share
//! the analyzer across requests.
//!
//! The API key lives here rather than being read ad hoc from the environment
//! inside the pipeline, so tests can inject a mock credential and a mock
//! backend side by side.

use crate::error::MedClareError;
use crate::pipeline::llm::{FallbackPolicy, Phase};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default chat-completions endpoint (OpenRouter).
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default model candidate list, tried in order.
pub const DEFAULT_MODELS: &[&str] = &[
    "google/gemini-2.0-flash-001",
    "google/gemini-2.5-flash",
    "google/gemini-flash-1.5",
    "meta-llama/llama-3.2-11b-vision-instruct",
];

/// Language used when the caller does not ask for one.
pub const DEFAULT_LANGUAGE: &str = "English";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "MEDCLARE_API_KEY";

/// Secondary API key variable, honoured when [`API_KEY_ENV`] is unset.
pub const OPENROUTER_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Configuration for the analysis pipeline.
///
/// # Example
/// ```rust
/// use medclare::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .api_key("sk-or-test")
///     .models(["google/gemini-2.0-flash-001", "google/gemini-2.5-flash"])
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.models.len(), 2);
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Bearer token for the chat-completions API.
    ///
    /// Optional at build time so a process can start without it; every
    /// pipeline entry point fails with [`MedClareError::ApiKeyMissing`] when
    /// it is absent.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API. `/chat/completions` is appended.
    pub base_url: String,

    /// Ordered model candidates. The first one is the primary model.
    pub models: Vec<String>,

    /// Fallback policy for the generate phase. Default: all candidates.
    pub generate_policy: FallbackPolicy,

    /// Fallback policy for the verify phase. Default: all candidates.
    pub verify_policy: FallbackPolicy,

    /// Fallback policy for the translate phase. Default: all candidates.
    pub translate_policy: FallbackPolicy,

    /// Sampling temperature. Default: 0.2.
    ///
    /// Transcription and verification want near-deterministic output; the
    /// explanation still needs a little freedom to sound natural.
    pub temperature: f32,

    /// Maximum completion tokens per call. Default: 2048.
    pub max_tokens: usize,

    /// Per-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Longest edge, in pixels, of the rasterised first page. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Application title sent as `X-Title` (OpenRouter attribution).
    pub app_title: Option<String>,

    /// Referer sent as `HTTP-Referer` (OpenRouter attribution).
    pub app_referer: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            generate_policy: FallbackPolicy::AllCandidates,
            verify_policy: FallbackPolicy::AllCandidates,
            translate_policy: FallbackPolicy::AllCandidates,
            temperature: 0.2,
            max_tokens: 2048,
            api_timeout_secs: 60,
            max_rendered_pixels: 2000,
            app_title: Some("MedClare".to_string()),
            app_referer: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("models", &self.models)
            .field("generate_policy", &self.generate_policy)
            .field("verify_policy", &self.verify_policy)
            .field("translate_policy", &self.translate_policy)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// Builder pre-populated from the process environment.
    ///
    /// Reads `MEDCLARE_API_KEY` (falling back to `OPENROUTER_API_KEY`),
    /// `MEDCLARE_BASE_URL` and `MEDCLARE_MODELS` (comma-separated). Unset or
    /// empty variables leave the defaults untouched.
    pub fn from_env() -> AnalysisConfigBuilder {
        let mut builder = Self::builder();

        let key = non_empty_env(API_KEY_ENV).or_else(|| non_empty_env(OPENROUTER_KEY_ENV));
        if let Some(key) = key {
            builder = builder.api_key(key);
        }
        if let Some(url) = non_empty_env("MEDCLARE_BASE_URL") {
            builder = builder.base_url(url);
        }
        if let Some(models) = non_empty_env("MEDCLARE_MODELS") {
            builder = builder.models(parse_model_list(&models));
        }
        builder
    }

    /// The API key, or [`MedClareError::ApiKeyMissing`].
    pub fn require_api_key(&self) -> Result<&str, MedClareError> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(MedClareError::ApiKeyMissing),
        }
    }

    /// The policy configured for `phase`.
    pub fn policy_for(&self, phase: Phase) -> FallbackPolicy {
        match phase {
            Phase::Generate => self.generate_policy,
            Phase::Verify => self.verify_policy,
            Phase::Translate => self.translate_policy,
        }
    }

    /// The model ids `phase` will try, in order.
    pub fn candidates_for(&self, phase: Phase) -> &[String] {
        match self.policy_for(phase) {
            FallbackPolicy::AllCandidates => &self.models,
            FallbackPolicy::PrimaryOnly => &self.models[..self.models.len().min(1)],
        }
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the model candidate list.
    pub fn models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.models = models.into_iter().map(Into::into).collect();
        self
    }

    /// Apply `policy` to every phase.
    pub fn fallback_policy(mut self, policy: FallbackPolicy) -> Self {
        self.config.generate_policy = policy;
        self.config.verify_policy = policy;
        self.config.translate_policy = policy;
        self
    }

    pub fn phase_policy(mut self, phase: Phase, policy: FallbackPolicy) -> Self {
        match phase {
            Phase::Generate => self.config.generate_policy = policy,
            Phase::Verify => self.config.verify_policy = policy,
            Phase::Translate => self.config.translate_policy = policy,
        }
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn app_title(mut self, title: impl Into<String>) -> Self {
        self.config.app_title = Some(title.into());
        self
    }

    pub fn app_referer(mut self, referer: impl Into<String>) -> Self {
        self.config.app_referer = Some(referer.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<AnalysisConfig, MedClareError> {
        self.config.models = self
            .config
            .models
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();

        let c = &self.config;
        if c.models.is_empty() {
            return Err(MedClareError::InvalidConfig(
                "At least one model candidate is required".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(MedClareError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(MedClareError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if !c.base_url.starts_with("http://") && !c.base_url.starts_with("https://") {
            return Err(MedClareError::InvalidConfig(format!(
                "Base URL must be http(s), got '{}'",
                c.base_url
            )));
        }
        Ok(self.config)
    }
}

/// Split a comma-separated model list, dropping blanks.
pub fn parse_model_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
