// SPDX-License-Identifier: MIT

//! Explicit model configuration, built once from the environment

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::{GenerationConfig, Model, OpenAICompatModel};
use crate::adk::error::ModelError;

/// Hosted chat-completions providers with known defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Groq,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::Groq => "https://api.groq.com/openai/v1",
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Groq => "GROQ_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAI => "gpt-4o-mini",
            Provider::Groq => "llama-3.3-70b-versatile",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAI => write!(f, "openai"),
            Provider::Groq => write!(f, "groq"),
        }
    }
}

impl FromStr for Provider {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "groq" => Ok(Provider::Groq),
            other => Err(ModelError::UnknownProvider(other.to_string())),
        }
    }
}

/// Everything needed to talk to one model endpoint
#[derive(Clone, PartialEq)]
pub struct ModelConfig {
    pub provider: Provider,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub temperature: Option<f32>,
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl ModelConfig {
    pub fn new(provider: Provider, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            api_key: api_key.into(),
            base_url: provider.default_base_url().to_string(),
            temperature: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Read `MODEL_PROVIDER` (default `groq`), `MODEL_NAME`, the provider's
    /// API key variable, `OPENAI_BASE_URL` and `MODEL_TEMPERATURE`.
    ///
    /// Call `dotenv().ok()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ModelError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ModelConfig::from_env`] over an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ModelError> {
        let provider = match lookup("MODEL_PROVIDER") {
            Some(name) if !name.trim().is_empty() => name.parse()?,
            _ => Provider::Groq,
        };

        let api_key = lookup(provider.api_key_env())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ModelError::ApiKeyMissing(provider.api_key_env().to_string()))?;

        let model = lookup("MODEL_NAME")
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| provider.default_model().to_string());

        let mut config = Self::new(provider, model, api_key);
        if provider == Provider::OpenAI {
            if let Some(base_url) = lookup("OPENAI_BASE_URL").filter(|url| !url.is_empty()) {
                config = config.with_base_url(base_url);
            }
        }
        if let Some(raw) = lookup("MODEL_TEMPERATURE") {
            match raw.parse::<f32>() {
                Ok(temperature) => config = config.with_temperature(temperature),
                Err(_) => log::warn!("Ignoring invalid MODEL_TEMPERATURE '{}'", raw),
            }
        }
        Ok(config)
    }

    /// Default generation settings for this endpoint
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.temperature,
            ..Default::default()
        }
    }

    /// Build the client
    pub fn build(&self) -> Arc<dyn Model> {
        Arc::new(OpenAICompatModel::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_groq_is_default_provider() {
        let config = ModelConfig::from_lookup(lookup(&[("GROQ_API_KEY", "gsk-test")])).unwrap();
        assert_eq!(config.provider, Provider::Groq);
        assert_eq!(config.model, "llama-3.3-70b-versatile");
        assert_eq!(config.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(config.temperature, None);
    }

    #[test]
    fn test_openai_with_overrides() {
        let config = ModelConfig::from_lookup(lookup(&[
            ("MODEL_PROVIDER", "OpenAI"),
            ("OPENAI_API_KEY", "sk-test"),
            ("MODEL_NAME", "gpt-4o"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1/"),
            ("MODEL_TEMPERATURE", "0.3"),
        ]))
        .unwrap();
        assert_eq!(config.provider, Provider::OpenAI);
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.temperature, Some(0.3));
    }

    #[test]
    fn test_missing_key_is_reported() {
        let err = ModelConfig::from_lookup(lookup(&[("MODEL_PROVIDER", "openai")])).unwrap_err();
        assert!(matches!(err, ModelError::ApiKeyMissing(ref var) if var == "OPENAI_API_KEY"));
    }

    #[test]
    fn test_unknown_provider() {
        let err = ModelConfig::from_lookup(lookup(&[("MODEL_PROVIDER", "mistral")])).unwrap_err();
        assert!(matches!(err, ModelError::UnknownProvider(_)));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ModelConfig::new(Provider::Groq, "m", "secret");
        assert!(!format!("{:?}", config).contains("secret"));
    }
}
