//! Voyage embeddings: `POST {base}/embeddings` with `input_type = document`.

use serde::Serialize;

use crate::config::embedding_config::EmbeddingConfig;
use crate::config::provider_kind::ProviderKind;
use crate::error_handler::Result;
use crate::providers::http::HttpTransport;
use crate::providers::shape::IndexedDataResponse;
use crate::providers::{EmbedFuture, EmbeddingProvider};

const MAX_INPUTS: usize = 128;

#[derive(Debug)]
pub struct VoyageEmbedder {
    http: HttpTransport,
    url: String,
    model: String,
}

#[derive(Serialize)]
struct VoyageRequest<'a> {
    model: &'a str,
    input: &'a [String],
    input_type: &'static str,
}

impl VoyageEmbedder {
    pub fn new(cfg: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            http: HttpTransport::new(cfg)?,
            url: format!("{}/embeddings", cfg.resolved_base_url()),
            model: cfg.resolved_model().to_string(),
        })
    }
}

impl EmbeddingProvider for VoyageEmbedder {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Voyage
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
            let body = VoyageRequest {
                model: &self.model,
                input: texts,
                input_type: "document",
            };
            let out: IndexedDataResponse = self.http.post_json(&self.url, &body).await?;
            out.into_ordered(ProviderKind::Voyage, texts.len())
        })
    }
}
