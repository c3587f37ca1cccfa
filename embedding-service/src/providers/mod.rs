//! Provider adapters and the registry that builds them.
//!
//! Every backend implements [`EmbeddingProvider`]. The client never names a
//! concrete adapter; it asks a [`ProviderRegistry`] for one, which keeps the
//! set of backends open for tests and host extensions.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::embedding_config::EmbeddingConfig;
use crate::config::provider_kind::ProviderKind;
use crate::error_handler::{ConfigError, Result};

pub mod cohere;
pub mod huggingface;
pub mod jina;
pub mod ollama;
pub mod openai;
pub mod voyage;

mod http;
mod shape;

pub type EmbedFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>>> + Send + 'a>>;

/// One embedding backend.
///
/// `embed_batch` returns exactly one vector per input, in input order.
/// Callers keep each call within [`EmbeddingProvider::max_batch`].
pub trait EmbeddingProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn model(&self) -> &str;

    /// Upper bound on inputs per call imposed by the backend itself.
    fn max_batch(&self) -> usize {
        usize::MAX
    }

    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> EmbedFuture<'a>;
}

/// Factory for a provider from a complete config.
pub type ProviderBuilder =
    Arc<dyn Fn(&EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> + Send + Sync>;

/// Maps provider kinds to adapter factories.
#[derive(Clone)]
pub struct ProviderRegistry {
    builders: HashMap<ProviderKind, ProviderBuilder>,
}

impl ProviderRegistry {
    /// Registry with no adapters at all.
    pub fn empty() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Adds or replaces the adapter for `kind`.
    pub fn register<F>(&mut self, kind: ProviderKind, builder: F) -> &mut Self
    where
        F: Fn(&EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> + Send + Sync + 'static,
    {
        self.builders.insert(kind, Arc::new(builder));
        self
    }

    pub fn with<F>(mut self, kind: ProviderKind, builder: F) -> Self
    where
        F: Fn(&EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> + Send + Sync + 'static,
    {
        self.register(kind, builder);
        self
    }

    pub fn supports(&self, kind: ProviderKind) -> bool {
        self.builders.contains_key(&kind)
    }

    /// Builds the adapter for `cfg.provider`.
    pub fn build(&self, cfg: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
        let builder = self
            .builders
            .get(&cfg.provider)
            .ok_or_else(|| ConfigError::UnsupportedProvider(cfg.provider.to_string()))?;
        builder(cfg)
    }
}

impl Default for ProviderRegistry {
    /// All built-in HTTP adapters.
    fn default() -> Self {
        let mut reg = Self::empty();
        reg.register(ProviderKind::OpenAi, |c| Ok(Arc::new(openai::OpenAiEmbedder::new(c)?)))
            .register(ProviderKind::Jina, |c| Ok(Arc::new(jina::JinaEmbedder::new(c)?)))
            .register(ProviderKind::Voyage, |c| Ok(Arc::new(voyage::VoyageEmbedder::new(c)?)))
            .register(ProviderKind::Cohere, |c| Ok(Arc::new(cohere::CohereEmbedder::new(c)?)))
            .register(ProviderKind::HuggingFace, |c| {
                Ok(Arc::new(huggingface::HuggingFaceEmbedder::new(c)?))
            })
            .register(ProviderKind::Ollama, |c| Ok(Arc::new(ollama::OllamaEmbedder::new(c)?)));
        reg
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.builders.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("ProviderRegistry").field("providers", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_covers_every_kind() {
        let reg = ProviderRegistry::default();
        for kind in ProviderKind::ALL {
            assert!(reg.supports(kind), "{kind}");
        }
    }

    #[test]
    fn empty_registry_rejects_everything() {
        let reg = ProviderRegistry::empty();
        let err = reg
            .build(&EmbeddingConfig::new(ProviderKind::Ollama))
            .err()
            .unwrap();
        assert!(err.to_string().contains("unsupported provider"));
    }

    #[test]
    fn missing_key_fails_at_build_time() {
        let reg = ProviderRegistry::default();
        assert!(reg.build(&EmbeddingConfig::new(ProviderKind::Jina)).is_err());
        assert!(
            reg.build(&EmbeddingConfig::new(ProviderKind::Jina).with_api_key("k"))
                .is_ok()
        );
    }
}
