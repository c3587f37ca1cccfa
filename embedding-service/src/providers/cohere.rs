//! Cohere embeddings: `POST {base}/embed`.

use serde::{Deserialize, Serialize};

use crate::config::embedding_config::EmbeddingConfig;
use crate::config::provider_kind::ProviderKind;
use crate::error_handler::Result;
use crate::providers::http::HttpTransport;
use crate::providers::shape::check_count;
use crate::providers::{EmbedFuture, EmbeddingProvider};

const MAX_INPUTS: usize = 96;

#[derive(Debug)]
pub struct CohereEmbedder {
    http: HttpTransport,
    url: String,
    model: String,
}

#[derive(Serialize)]
struct CohereRequest<'a> {
    model: &'a str,
    texts: &'a [String],
    input_type: &'static str,
    truncate: &'static str,
}

#[derive(Deserialize)]
struct CohereResponse {
    embeddings: Vec<Vec<f32>>,
}

impl CohereEmbedder {
    pub fn new(cfg: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            http: HttpTransport::new(cfg)?,
            url: format!("{}/embed", cfg.resolved_base_url()),
            model: cfg.resolved_model().to_string(),
        })
    }
}

impl EmbeddingProvider for CohereEmbedder {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Cohere
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
            let body = CohereRequest {
                model: &self.model,
                texts,
                input_type: "search_document",
                truncate: "END",
            };
            let out: CohereResponse = self.http.post_json(&self.url, &body).await?;
            check_count(ProviderKind::Cohere, out.embeddings.len(), texts.len())?;
            Ok(out.embeddings)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_marks_inputs_as_documents() {
        let texts = vec!["fn a() {}".to_string()];
        let body = CohereRequest {
            model: "embed-english-v3.0",
            texts: &texts,
            input_type: "search_document",
            truncate: "END",
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["input_type"], "search_document");
        assert_eq!(v["texts"][0], "fn a() {}");
    }
}
