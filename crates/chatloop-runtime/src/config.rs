//! Provider Configuration
//!
//! Explicit, caller-owned settings for an OpenAI-compatible endpoint.
//! Values come from `OPENROUTER_*` environment variables by default.

use chatloop_core::{AgentError, GenerationOptions, Result, provider::DEFAULT_MODEL};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Settings for [`crate::OpenAiCompatProvider`]
#[derive(Clone)]
pub struct ProviderConfig {
    /// Bearer token
    pub api_key: String,

    /// API root, e.g. `https://openrouter.ai/api/v1`
    pub base_url: String,

    /// Model identifier
    pub model: String,

    pub temperature: f32,

    pub max_tokens: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    /// Config with defaults for everything but the key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Read from the process environment
    ///
    /// - `OPENROUTER_API_KEY` (required)
    /// - `OPENROUTER_BASE_URL`, `OPENROUTER_MODEL`, `OPENROUTER_TEMPERATURE`,
    ///   `OPENROUTER_MAX_TOKENS`, `OPENROUTER_TIMEOUT_SECS` (optional)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("OPENROUTER_API_KEY")
            .ok_or_else(|| AgentError::Config("OPENROUTER_API_KEY is not set".into()))?;

        let mut config = Self::new(api_key);

        if let Some(url) = get("OPENROUTER_BASE_URL") {
            config.base_url = url;
        }
        if let Some(model) = get("OPENROUTER_MODEL") {
            config.model = model;
        }
        if let Some(value) = get("OPENROUTER_TEMPERATURE") {
            config.temperature = parse_number("OPENROUTER_TEMPERATURE", &value)?;
        }
        if let Some(value) = get("OPENROUTER_MAX_TOKENS") {
            config.max_tokens = parse_number("OPENROUTER_MAX_TOKENS", &value)?;
        }
        if let Some(value) = get("OPENROUTER_TIMEOUT_SECS") {
            config.timeout_secs = parse_number("OPENROUTER_TIMEOUT_SECS", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AgentError::Config(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(AgentError::Config("max_tokens must be positive".into()));
        }
        if self.timeout_secs == 0 {
            return Err(AgentError::Config("timeout_secs must be positive".into()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(AgentError::Config(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }
        Ok(())
    }

    /// Generation options matching this config
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            ..GenerationOptions::default()
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| AgentError::Config(format!("{key} is not a valid number: {value}")))
}
