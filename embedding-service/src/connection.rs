//! Connection probe result for an embedding configuration.
//!
//! [`ConnectionReport`] is JSON-serializable so hosts can show it directly.
//! Producing one never fails; errors are folded into `success = false`.

use serde::{Deserialize, Serialize};

/// Outcome of embedding a short probe text with the current config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionReport {
    pub success: bool,
    /// Provider identifier, e.g. `"openai"`.
    pub provider: String,
    /// Resolved model name.
    pub model: String,
    /// Round-trip time of the probe in milliseconds.
    pub latency_ms: Option<u64>,
    /// Length of the returned vector.
    pub dimension: Option<usize>,
    pub error: Option<String>,
}

impl ConnectionReport {
    #[inline]
    pub(crate) fn ok(provider: &str, model: &str, latency_ms: u64, dimension: usize) -> Self {
        Self {
            success: true,
            provider: provider.to_string(),
            model: model.to_string(),
            latency_ms: Some(latency_ms),
            dimension: Some(dimension),
            error: None,
        }
    }

    #[inline]
    pub(crate) fn fail(provider: &str, model: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            provider: provider.to_string(),
            model: model.to_string(),
            latency_ms: None,
            dimension: None,
            error: Some(error.into()),
        }
    }
}
