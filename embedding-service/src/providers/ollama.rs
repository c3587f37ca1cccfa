//! Ollama embeddings: `POST {base}/api/embeddings`, one prompt per request.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::embedding_config::EmbeddingConfig;
use crate::config::provider_kind::ProviderKind;
use crate::error_handler::{EmbeddingError, Result};
use crate::providers::http::HttpTransport;
use crate::providers::{EmbedFuture, EmbeddingProvider};

#[derive(Debug)]
pub struct OllamaEmbedder {
    http: HttpTransport,
    url: String,
    model: String,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub fn new(cfg: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            http: HttpTransport::new(cfg)?,
            url: format!("{}/api/embeddings", cfg.resolved_base_url()),
            model: cfg.resolved_model().to_string(),
        })
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let body = OllamaRequest {
            model: &self.model,
            prompt: text,
        };
        let out: OllamaResponse = self.http.post_json(&self.url, &body).await?;
        if out.embedding.is_empty() {
            return Err(EmbeddingError::decode(
                ProviderKind::Ollama,
                "empty `embedding` in response",
            ));
        }
        Ok(out.embedding)
    }
}

impl EmbeddingProvider for OllamaEmbedder {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> EmbedFuture<'a> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(texts.len());
            for (i, text) in texts.iter().enumerate() {
                trace!(target: "embedding_service", provider = "ollama", i, "embed one");
                out.push(self.embed_one(text).await?);
            }
            Ok(out)
        })
    }
}
