use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::provider_kind::ProviderKind;
use crate::error_handler::{ConfigError, Result, env_opt, env_opt_u64, validate_http_endpoint};

/// Connection settings for one embedding backend.
///
/// `model` and `base_url` are optional; when unset the provider defaults from
/// [`ProviderKind`] apply. Equality is used by callers to decide whether a
/// cached client can be reused.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    /// Maximum texts per outgoing request.
    pub batch_size: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            api_key: None,
            model: None,
            base_url: None,
            timeout_secs: 30,
            batch_size: 64,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("batch_size", &self.batch_size)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

impl EmbeddingConfig {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Configured model or the provider default.
    pub fn resolved_model(&self) -> &str {
        self.model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Configured base URL or the provider default, without a trailing slash.
    pub fn resolved_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// API key, required unless the provider is unauthenticated.
    pub fn api_key_for_request(&self) -> Result<Option<&str>> {
        let key = self.api_key.as_deref().filter(|k| !k.trim().is_empty());
        match key {
            None if self.provider.requires_api_key() => {
                Err(ConfigError::MissingApiKey(self.provider).into())
            }
            _ => Ok(key),
        }
    }

    /// Checks the parts that can be checked without a network call.
    pub fn validate(&self) -> Result<()> {
        validate_http_endpoint(self.resolved_base_url())?;
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidNumber {
                var: "batch_size",
                reason: "must be > 0",
            }
            .into());
        }
        self.api_key_for_request()?;
        Ok(())
    }

    /// Loads configuration from environment variables.
    ///
    /// - `EMBEDDING_PROVIDER` (default `openai`)
    /// - `EMBEDDING_API_KEY`, `EMBEDDING_MODEL`, `EMBEDDING_BASE_URL` (optional)
    /// - `EMBEDDING_TIMEOUT_SECS`, `EMBEDDING_BATCH_SIZE`, `EMBEDDING_MAX_RETRIES`
    ///
    /// The API key is not validated here; a missing key surfaces on first use.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let provider = match env_opt("EMBEDDING_PROVIDER") {
            Some(p) => p.parse::<ProviderKind>()?,
            None => defaults.provider,
        };

        let cfg = Self {
            provider,
            api_key: env_opt("EMBEDDING_API_KEY"),
            model: env_opt("EMBEDDING_MODEL"),
            base_url: env_opt("EMBEDDING_BASE_URL"),
            timeout_secs: env_opt_u64("EMBEDDING_TIMEOUT_SECS")?.unwrap_or(defaults.timeout_secs),
            batch_size: env_opt_u64("EMBEDDING_BATCH_SIZE")?
                .map(|v| v as usize)
                .unwrap_or(defaults.batch_size),
            max_retries: env_opt_u64("EMBEDDING_MAX_RETRIES")?
                .map(|v| v.min(u32::MAX as u64) as u32)
                .unwrap_or(defaults.max_retries),
            retry_backoff_ms: defaults.retry_backoff_ms,
        };

        if let Some(url) = &cfg.base_url {
            validate_http_endpoint(url)?;
        }
        Ok(cfg)
    }

    /// Returns a new config with the patch applied.
    ///
    /// Switching provider without naming a model (or base URL) drops the old
    /// value so the new provider's default applies.
    pub fn merged(&self, patch: &EmbeddingConfigPatch) -> Self {
        let mut next = self.clone();

        if let Some(provider) = patch.provider {
            if provider != self.provider {
                next.model = None;
                next.base_url = None;
            }
            next.provider = provider;
        }
        if let Some(key) = &patch.api_key {
            next.api_key = non_empty(key);
        }
        if let Some(model) = &patch.model {
            next.model = non_empty(model);
        }
        if let Some(url) = &patch.base_url {
            next.base_url = non_empty(url);
        }
        if let Some(v) = patch.timeout_secs {
            next.timeout_secs = v;
        }
        if let Some(v) = patch.batch_size {
            next.batch_size = v;
        }
        if let Some(v) = patch.max_retries {
            next.max_retries = v;
        }
        if let Some(v) = patch.retry_backoff_ms {
            next.retry_backoff_ms = v;
        }
        next
    }
}

/// Partial update for [`EmbeddingConfig`]; `None` fields keep the current value.
/// An empty string clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfigPatch {
    pub provider: Option<ProviderKind>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub batch_size: Option<usize>,
    pub max_retries: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_from_provider() {
        let cfg = EmbeddingConfig::new(ProviderKind::Voyage);
        assert_eq!(cfg.resolved_model(), "voyage-code-2");
        assert_eq!(cfg.resolved_base_url(), "https://api.voyageai.com/v1");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let cfg = EmbeddingConfig::new(ProviderKind::Ollama).with_base_url("http://gpu:11434/");
        assert_eq!(cfg.resolved_base_url(), "http://gpu:11434");
    }

    #[test]
    fn switching_provider_resets_model_and_url() {
        let cfg = EmbeddingConfig::new(ProviderKind::OpenAi)
            .with_api_key("k")
            .with_model("text-embedding-3-large")
            .with_base_url("https://proxy.local/v1");
        let next = cfg.merged(&EmbeddingConfigPatch {
            provider: Some(ProviderKind::Cohere),
            ..Default::default()
        });
        assert_eq!(next.provider, ProviderKind::Cohere);
        assert_eq!(next.resolved_model(), "embed-english-v3.0");
        assert_eq!(next.resolved_base_url(), "https://api.cohere.ai/v1");
        assert_eq!(next.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn explicit_model_wins_over_reset() {
        let cfg = EmbeddingConfig::new(ProviderKind::OpenAi).with_model("a");
        let next = cfg.merged(&EmbeddingConfigPatch {
            provider: Some(ProviderKind::Jina),
            model: Some("jina-embeddings-v3".into()),
            ..Default::default()
        });
        assert_eq!(next.resolved_model(), "jina-embeddings-v3");
    }

    #[test]
    fn same_provider_patch_keeps_model() {
        let cfg = EmbeddingConfig::new(ProviderKind::OpenAi).with_model("custom");
        let next = cfg.merged(&EmbeddingConfigPatch {
            provider: Some(ProviderKind::OpenAi),
            batch_size: Some(8),
            ..Default::default()
        });
        assert_eq!(next.resolved_model(), "custom");
        assert_eq!(next.batch_size, 8);
    }

    #[test]
    fn missing_key_is_a_config_error_except_for_ollama() {
        assert!(EmbeddingConfig::new(ProviderKind::OpenAi).validate().is_err());
        assert!(EmbeddingConfig::new(ProviderKind::Ollama).validate().is_ok());
    }

    #[test]
    fn debug_redacts_api_key() {
        let cfg = EmbeddingConfig::new(ProviderKind::OpenAi).with_api_key("sk-secret");
        assert!(!format!("{cfg:?}").contains("sk-secret"));
    }
}
