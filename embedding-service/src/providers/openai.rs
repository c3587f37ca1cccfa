//! OpenAI embeddings: `POST {base}/embeddings`.

use serde::Serialize;
use tracing::debug;

use crate::config::embedding_config::EmbeddingConfig;
use crate::config::provider_kind::ProviderKind;
use crate::error_handler::Result;
use crate::providers::http::HttpTransport;
use crate::providers::shape::IndexedDataResponse;
use crate::providers::{EmbedFuture, EmbeddingProvider};

/// Documented per-request input cap.
const MAX_INPUTS: usize = 2048;

#[derive(Debug)]
pub struct OpenAiEmbedder {
    http: HttpTransport,
    url: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'static str,
}

impl OpenAiEmbedder {
    pub fn new(cfg: &EmbeddingConfig) -> Result<Self> {
        let http = HttpTransport::new(cfg)?;
        let url = format!("{}/embeddings", cfg.resolved_base_url());
        debug!(target: "embedding_service", provider = "openai", model = %cfg.resolved_model(), %url, "adapter ready");
        Ok(Self {
            http,
            url,
            model: cfg.resolved_model().to_string(),
        })
    }
}

impl EmbeddingProvider for OpenAiEmbedder {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn max_batch(&self) -> usize {
        MAX_INPUTS
    }

    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> EmbedFuture<'a> {
        Box::pin(async move {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let body = EmbeddingsRequest {
                model: &self.model,
                input: texts,
                encoding_format: "float",
            };
            let out: IndexedDataResponse = self.http.post_json(&self.url, &body).await?;
            out.into_ordered(ProviderKind::OpenAi, texts.len())
        })
    }
}
