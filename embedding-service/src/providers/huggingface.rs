//! Hugging Face Inference API: `POST {base}/pipeline/feature-extraction/{model}`.
//!
//! Sentence-transformer models return one vector per input; plain encoders
//! return token-level vectors, which are mean-pooled here.

use serde::{Deserialize, Serialize};

use crate::config::embedding_config::EmbeddingConfig;
use crate::config::provider_kind::ProviderKind;
use crate::error_handler::{EmbeddingError, Result};
use crate::providers::http::HttpTransport;
use crate::providers::{EmbedFuture, EmbeddingProvider};

#[derive(Debug)]
pub struct HuggingFaceEmbedder {
    http: HttpTransport,
    url: String,
    model: String,
}

#[derive(Serialize)]
struct FeatureRequest<'a> {
    inputs: &'a str,
    options: FeatureOptions,
}

#[derive(Serialize)]
struct FeatureOptions {
    wait_for_model: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeatureOutput {
    Pooled(Vec<f32>),
    Tokens(Vec<Vec<f32>>),
    Batched(Vec<Vec<Vec<f32>>>),
}

impl HuggingFaceEmbedder {
    pub fn new(cfg: &EmbeddingConfig) -> Result<Self> {
        let model = cfg.resolved_model().to_string();
        Ok(Self {
            http: HttpTransport::new(cfg)?,
            url: format!(
                "{}/pipeline/feature-extraction/{}",
                cfg.resolved_base_url(),
                model
            ),
            model,
        })
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let body = FeatureRequest {
            inputs: text,
            options: FeatureOptions {
                wait_for_model: true,
            },
        };
        let out: FeatureOutput = self.http.post_json(&self.url, &body).await?;
        into_sentence_vector(out)
    }
}

fn into_sentence_vector(out: FeatureOutput) -> Result<Vec<f32>> {
    match out {
        FeatureOutput::Pooled(v) if !v.is_empty() => Ok(v),
        FeatureOutput::Pooled(_) => Err(EmbeddingError::decode(
            ProviderKind::HuggingFace,
            "empty feature vector",
        )),
        FeatureOutput::Tokens(tokens) => mean_pool(&tokens),
        FeatureOutput::Batched(mut batch) => match batch.len() {
            1 => mean_pool(&batch.swap_remove(0)),
            n => Err(EmbeddingError::decode(
                ProviderKind::HuggingFace,
                format!("expected one sequence, got {n}"),
            )),
        },
    }
}

/// Element-wise mean of token vectors.
fn mean_pool(tokens: &[Vec<f32>]) -> Result<Vec<f32>> {
    let Some(first) = tokens.first() else {
        return Err(EmbeddingError::decode(
            ProviderKind::HuggingFace,
            "no token vectors",
        ));
    };
    let dim = first.len();
    let mut acc = vec![0.0f32; dim];
    for t in tokens {
        if t.len() != dim {
            return Err(EmbeddingError::decode(
                ProviderKind::HuggingFace,
                format!("ragged token vectors: {} vs {dim}", t.len()),
            ));
        }
        for (a, x) in acc.iter_mut().zip(t) {
            *a += *x;
        }
    }
    let n = tokens.len() as f32;
    acc.iter_mut().for_each(|a| *a /= n);
    Ok(acc)
}

impl EmbeddingProvider for HuggingFaceEmbedder {
    fn kind(&self) -> ProviderKind {
        ProviderKind::HuggingFace
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> EmbedFuture<'a> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed_one(text).await?);
            }
            Ok(out)
        })
    }
}
