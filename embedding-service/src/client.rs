//! High-level embedding client.
//!
//! Wraps one provider adapter and adds input batching, output length checks,
//! config patching and a connection probe. The adapter is built lazily so
//! that constructing a client never fails; configuration problems surface as
//! [`EmbeddingError::Config`] on the first call.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::embedding_config::{EmbeddingConfig, EmbeddingConfigPatch};
use crate::connection::ConnectionReport;
use crate::error_handler::{EmbeddingError, Result};
use crate::providers::{EmbeddingProvider, ProviderRegistry};

/// Text embedded by [`EmbeddingClient::test_connection`].
pub const PROBE_TEXT: &str = "connection test";

pub struct EmbeddingClient {
    config: EmbeddingConfig,
    registry: Arc<ProviderRegistry>,
    provider: OnceLock<Arc<dyn EmbeddingProvider>>,
}

impl EmbeddingClient {
    /// Client backed by the built-in adapters.
    pub fn new(config: EmbeddingConfig) -> Self {
        Self::with_registry(config, Arc::new(ProviderRegistry::default()))
    }

    pub fn with_registry(config: EmbeddingConfig, registry: Arc<ProviderRegistry>) -> Self {
        Self {
            config,
            registry,
            provider: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// New client with `patch` merged into the current config. `self` is
    /// left untouched; the new client shares the provider registry.
    pub fn with_config(&self, patch: &EmbeddingConfigPatch) -> Self {
        let next = self.config.merged(patch);
        debug!(
            target: "embedding_service",
            provider = %next.provider,
            model = %next.resolved_model(),
            "embedding config patched"
        );
        Self::with_registry(next, Arc::clone(&self.registry))
    }

    fn provider(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        if let Some(p) = self.provider.get() {
            return Ok(Arc::clone(p));
        }
        let built = self.registry.build(&self.config)?;
        info!(
            target: "embedding_service",
            provider = %built.kind(),
            model = %built.model(),
            batch_size = self.config.batch_size,
            "embedding provider initialized"
        );
        // A concurrent first call may have won the race; either value is fine.
        Ok(Arc::clone(self.provider.get_or_init(|| built)))
    }

    /// Embeds a single text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let provider = self.provider()?;
        let mut out = self.embed_batch(&[text.to_string()]).await?;
        out.pop().ok_or(EmbeddingError::CountMismatch {
            provider: provider.kind(),
            got: 0,
            want: 1,
        })
    }

    /// Embeds `texts` in order, split into requests of at most
    /// `min(config.batch_size, provider.max_batch())` inputs.
    ///
    /// Empty input returns an empty output without any network call.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let provider = self.provider()?;
        let step = self.config.batch_size.max(1).min(provider.max_batch().max(1));

        let started = Instant::now();
        let mut out = Vec::with_capacity(texts.len());
        for part in texts.chunks(step) {
            let vectors = provider.embed_batch(part).await?;
            if vectors.len() != part.len() {
                return Err(EmbeddingError::CountMismatch {
                    provider: provider.kind(),
                    got: vectors.len(),
                    want: part.len(),
                });
            }
            out.extend(vectors);
        }

        debug!(
            target: "embedding_service",
            provider = %provider.kind(),
            inputs = texts.len(),
            requests = texts.len().div_ceil(step),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "embed_batch done"
        );
        Ok(out)
    }

    /// Embeds [`PROBE_TEXT`] and reports latency and dimension. Never fails.
    pub async fn test_connection(&self) -> ConnectionReport {
        let provider = self.config.provider.as_str();
        let model = self.config.resolved_model();
        let started = Instant::now();

        match self.embed(PROBE_TEXT).await {
            Ok(v) => {
                let latency = started.elapsed().as_millis() as u64;
                info!(
                    target: "embedding_service",
                    provider,
                    model,
                    latency_ms = latency,
                    dimension = v.len(),
                    "connection test ok"
                );
                ConnectionReport::ok(provider, model, latency, v.len())
            }
            Err(e) => {
                warn!(target: "embedding_service", provider, model, error = %e, "connection test failed");
                ConnectionReport::fail(provider, model, e.to_string())
            }
        }
    }
}

impl std::fmt::Debug for EmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingClient")
            .field("config", &self.config)
            .field("initialized", &self.provider.get().is_some())
            .finish()
    }
}
