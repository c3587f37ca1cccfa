//! Jina embeddings: OpenAI-compatible `POST {base}/embeddings`.

use serde::Serialize;

use crate::config::embedding_config::EmbeddingConfig;
use crate::config::provider_kind::ProviderKind;
use crate::error_handler::Result;
use crate::providers::http::HttpTransport;
use crate::providers::shape::IndexedDataResponse;
use crate::providers::{EmbedFuture, EmbeddingProvider};

const MAX_INPUTS: usize = 512;

#[derive(Debug)]
pub struct JinaEmbedder {
    http: HttpTransport,
    url: String,
    model: String,
}

#[derive(Serialize)]
struct JinaRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_type: &'static str,
}

impl JinaEmbedder {
    pub fn new(cfg: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            http: HttpTransport::new(cfg)?,
            url: format!("{}/embeddings", cfg.resolved_base_url()),
            model: cfg.resolved_model().to_string(),
        })
    }
}

impl EmbeddingProvider for JinaEmbedder {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Jina
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
            let body = JinaRequest {
                model: &self.model,
                input: texts,
                encoding_type: "float",
            };
            let out: IndexedDataResponse = self.http.post_json(&self.url, &body).await?;
            out.into_ordered(ProviderKind::Jina, texts.len())
        })
    }
}
