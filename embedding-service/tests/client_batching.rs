use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use embedding_service::{
    EmbedFuture, EmbeddingClient, EmbeddingConfig, EmbeddingConfigPatch, EmbeddingError,
    EmbeddingProvider, ProviderKind, ProviderRegistry,
};

/// Returns `[len(text), index_in_request]` per input and counts requests.
struct CountingProvider {
    calls: Arc<AtomicUsize>,
    max_batch: usize,
    drop_last: bool,
}

impl EmbeddingProvider for CountingProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn model(&self) -> &str {
        "fake"
    }

    fn max_batch(&self) -> usize {
        self.max_batch
    }

    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> EmbedFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut out: Vec<Vec<f32>> = texts
                .iter()
                .enumerate()
                .map(|(i, t)| vec![t.len() as f32, i as f32])
                .collect();
            if self.drop_last {
                out.pop();
            }
            Ok(out)
        })
    }
}

fn client(batch_size: usize, max_batch: usize, drop_last: bool) -> (EmbeddingClient, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let registry = ProviderRegistry::empty().with(ProviderKind::Ollama, move |_| {
        Ok(Arc::new(CountingProvider {
            calls: Arc::clone(&c),
            max_batch,
            drop_last,
        }))
    });
    let mut cfg = EmbeddingConfig::new(ProviderKind::Ollama);
    cfg.batch_size = batch_size;
    (EmbeddingClient::with_registry(cfg, Arc::new(registry)), calls)
}

fn texts(n: usize) -> Vec<String> {
    (0..n).map(|i| "x".repeat(i + 1)).collect()
}

#[tokio::test]
async fn inputs_are_split_by_batch_size_and_order_is_kept() {
    let (c, calls) = client(4, usize::MAX, false);
    let out = c.embed_batch(&texts(10)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(out.len(), 10);
    for (i, v) in out.iter().enumerate() {
        assert_eq!(v[0], (i + 1) as f32);
    }
}

#[tokio::test]
async fn provider_cap_wins_over_larger_batch_size() {
    let (c, calls) = client(64, 3, false);
    c.embed_batch(&texts(7)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn empty_input_never_builds_or_calls_provider() {
    let (c, calls) = client(4, usize::MAX, false);
    assert!(c.embed_batch(&[]).await.unwrap().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn short_provider_output_is_rejected() {
    let (c, _) = client(4, usize::MAX, true);
    let err = c.embed_batch(&texts(2)).await.unwrap_err();
    assert!(matches!(err, EmbeddingError::CountMismatch { got: 1, want: 2, .. }));
}

#[tokio::test]
async fn single_embed_returns_one_vector() {
    let (c, _) = client(4, usize::MAX, false);
    assert_eq!(c.embed("abc").await.unwrap(), vec![3.0, 0.0]);
}

#[tokio::test]
async fn missing_api_key_surfaces_on_first_use() {
    let c = EmbeddingClient::new(EmbeddingConfig::new(ProviderKind::OpenAi));
    let err = c.embed("hello").await.unwrap_err();
    assert!(matches!(err, EmbeddingError::Config(_)));
}

#[tokio::test]
async fn connection_report_includes_dimension() {
    let (c, _) = client(4, usize::MAX, false);
    let report = c.test_connection().await;
    assert!(report.success);
    assert_eq!(report.dimension, Some(2));
    assert_eq!(report.provider, "ollama");
    assert!(report.error.is_none());
}

#[tokio::test]
async fn failed_connection_is_reported_not_raised() {
    let c = EmbeddingClient::new(EmbeddingConfig::new(ProviderKind::Voyage));
    let report = c.test_connection().await;
    assert!(!report.success);
    assert!(report.error.unwrap().contains("missing API key"));
    assert_eq!(report.model, "voyage-code-2");
}

#[tokio::test]
async fn with_config_leaves_original_untouched() {
    let (c, _) = client(4, usize::MAX, false);
    let next = c.with_config(&EmbeddingConfigPatch {
        provider: Some(ProviderKind::OpenAi),
        ..Default::default()
    });
    assert_eq!(c.config().provider, ProviderKind::Ollama);
    assert_eq!(next.config().provider, ProviderKind::OpenAi);
    // The shared registry only knows the fake adapter.
    assert!(next.embed("x").await.is_err());
}
