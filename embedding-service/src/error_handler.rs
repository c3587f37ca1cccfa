//! Unified error handling for `embedding-service`.
//!
//! A single top-level error [`EmbeddingError`] covers the whole crate; config
//! problems are grouped in [`ConfigError`]. Small helpers for reading
//! environment variables return the unified [`Result<T>`] alias.
//!
//! All messages carry the `[Embedding]` prefix to simplify attribution in logs.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::config::provider_kind::ProviderKind;

/* ------------------------------------------------------------------------- */
/* Public result alias                                                       */
/* ------------------------------------------------------------------------- */

pub type Result<T> = std::result::Result<T, EmbeddingError>;

/* ------------------------------------------------------------------------- */
/* Top-level error                                                           */
/* ------------------------------------------------------------------------- */

/// Top-level error for the embedding client and its provider adapters.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Configuration/validation errors. Never retried.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Upstream returned a non-successful HTTP status.
    #[error("[Embedding] {provider} returned HTTP {status} from {url}: {body}")]
    HttpStatus {
        provider: ProviderKind,
        status: StatusCode,
        url: String,
        /// Response body, trimmed to a bounded length.
        body: String,
    },

    /// Connection/transport failure below HTTP.
    #[error("[Embedding] {provider} transport error: {source}")]
    HttpTransport {
        provider: ProviderKind,
        #[source]
        source: reqwest::Error,
    },

    /// The request exceeded the configured per-request timeout.
    #[error("[Embedding] {provider} request timed out after {timeout:?}")]
    Timeout {
        provider: ProviderKind,
        timeout: Duration,
    },

    /// Response payload could not be decoded as expected.
    #[error("[Embedding] {provider} decode error: {reason}")]
    Decode {
        provider: ProviderKind,
        reason: String,
    },

    /// Provider returned a different number of vectors than inputs sent.
    #[error("[Embedding] {provider} returned {got} vectors for {want} inputs")]
    CountMismatch {
        provider: ProviderKind,
        got: usize,
        want: usize,
    },
}

impl EmbeddingError {
    /// Transport failures, timeouts, HTTP 429 and HTTP 5xx are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            EmbeddingError::HttpStatus { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            EmbeddingError::HttpTransport { .. } | EmbeddingError::Timeout { .. } => true,
            _ => false,
        }
    }

    pub(crate) fn decode(provider: ProviderKind, reason: impl Into<String>) -> Self {
        EmbeddingError::Decode {
            provider,
            reason: reason.into(),
        }
    }
}

/* ------------------------------------------------------------------------- */
/* Config errors                                                             */
/* ------------------------------------------------------------------------- */

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Provider identifier is unknown or has no registered adapter.
    #[error("[Embedding] unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Provider requires an API key and none was configured.
    #[error("[Embedding] missing API key for provider {0}")]
    MissingApiKey(ProviderKind),

    /// A number failed to parse (timeouts, batch sizes, retries).
    #[error("[Embedding] invalid number in {var}: {reason}")]
    InvalidNumber {
        var: &'static str,
        reason: &'static str,
    },

    /// Value had the wrong format (e.g. a header value or URL).
    #[error("[Embedding] invalid format in {var}: {reason}")]
    InvalidFormat {
        var: &'static str,
        reason: &'static str,
    },

    /// Base URL is empty or not http/https.
    #[error("[Embedding] invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The HTTP client could not be constructed.
    #[error("[Embedding] http client build failed: {0}")]
    ClientBuild(String),
}

/* ------------------------------------------------------------------------- */
/* Env helpers                                                               */
/* ------------------------------------------------------------------------- */

/// Reads an optional, non-empty environment variable.
pub fn env_opt(name: &'static str) -> Option<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

/// Parses an optional `u64` from env (`Ok(None)` if unset/empty).
pub fn env_opt_u64(name: &'static str) -> Result<Option<u64>> {
    match env_opt(name) {
        Some(v) => v.parse::<u64>().map(Some).map_err(|_| {
            ConfigError::InvalidNumber {
                var: name,
                reason: "expected u64",
            }
            .into()
        }),
        None => Ok(None),
    }
}

/// Validates that an endpoint starts with `http://` or `https://`.
pub fn validate_http_endpoint(value: &str) -> Result<()> {
    let v = value.trim();
    if !v.is_empty() && (v.starts_with("http://") || v.starts_with("https://")) {
        Ok(())
    } else {
        Err(ConfigError::InvalidEndpoint(value.to_string()).into())
    }
}

/// Keeps error bodies bounded so they stay readable in logs and status.
pub(crate) fn make_snippet(body: &str) -> String {
    const MAX: usize = 2_000;
    let trimmed = body.trim();
    if trimmed.len() <= MAX {
        return trimmed.to_string();
    }
    let mut end = MAX;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &trimmed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        let status = |s: u16| EmbeddingError::HttpStatus {
            provider: ProviderKind::OpenAi,
            status: StatusCode::from_u16(s).unwrap(),
            url: "u".into(),
            body: String::new(),
        };
        assert!(status(429).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(401).is_transient());
        assert!(!EmbeddingError::from(ConfigError::MissingApiKey(ProviderKind::Cohere)).is_transient());
    }

    #[test]
    fn http_status_error_carries_provider_status_and_body() {
        let err = EmbeddingError::HttpStatus {
            provider: ProviderKind::Voyage,
            status: StatusCode::UNAUTHORIZED,
            url: "https://api.voyageai.com/v1/embeddings".into(),
            body: "{\"detail\":\"bad key\"}".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("voyage"));
        assert!(msg.contains("401"));
        assert!(msg.contains("bad key"));
    }

    #[test]
    fn snippet_is_bounded() {
        let long = "é".repeat(3_000);
        let s = make_snippet(&long);
        assert!(s.len() <= 2_000 + '…'.len_utf8());
    }

    #[test]
    fn endpoint_validation() {
        assert!(validate_http_endpoint("http://localhost:11434").is_ok());
        assert!(validate_http_endpoint("ftp://x").is_err());
        assert!(validate_http_endpoint("  ").is_err());
    }
}
