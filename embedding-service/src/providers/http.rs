//! Shared HTTP plumbing for the adapters: client construction with timeout
//! and auth headers, JSON POST with retry and exponential backoff.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::config::embedding_config::EmbeddingConfig;
use crate::config::provider_kind::ProviderKind;
use crate::error_handler::{
    ConfigError, EmbeddingError, Result, make_snippet, validate_http_endpoint,
};

#[derive(Debug, Clone)]
pub(crate) struct HttpTransport {
    client: reqwest::Client,
    provider: ProviderKind,
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
}

impl HttpTransport {
    /// Builds a client for `cfg.provider`. A bearer token is attached when the
    /// provider needs one; a missing key fails here.
    pub(crate) fn new(cfg: &EmbeddingConfig) -> Result<Self> {
        validate_http_endpoint(cfg.resolved_base_url())?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(key) = cfg.api_key_for_request()? {
            let value = header::HeaderValue::from_str(&format!("Bearer {key}")).map_err(|_| {
                ConfigError::InvalidFormat {
                    var: "api_key",
                    reason: "not a valid header value",
                }
            })?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            provider: cfg.provider,
            timeout: cfg.timeout(),
            max_retries: cfg.max_retries,
            backoff: cfg.retry_backoff(),
        })
    }

    /// POSTs `body` as JSON and decodes the response, retrying transient
    /// failures up to `max_retries` times.
    pub(crate) async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut attempt: u32 = 0;
        loop {
            match self.post_once(url, body).await {
                Ok(out) => return Ok(out),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff.saturating_mul(2u32.saturating_pow(attempt));
                    warn!(
                        target: "embedding_service",
                        provider = %self.provider,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post_once<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let started = Instant::now();
        debug!(target: "embedding_service", provider = %self.provider, "POST {url}");

        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let snippet = make_snippet(&text);
            error!(
                target: "embedding_service",
                provider = %self.provider,
                %status,
                %url,
                %snippet,
                latency_ms = started.elapsed().as_millis() as u64,
                "embedding request returned non-success status"
            );
            return Err(EmbeddingError::HttpStatus {
                provider: self.provider,
                status,
                url: url.to_string(),
                body: snippet,
            });
        }

        serde_json::from_str::<R>(&text).map_err(|e| {
            EmbeddingError::decode(
                self.provider,
                format!("serde error: {e}; body: {}", make_snippet(&text)),
            )
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> EmbeddingError {
        if e.is_timeout() {
            EmbeddingError::Timeout {
                provider: self.provider,
                timeout: self.timeout,
            }
        } else {
            EmbeddingError::HttpTransport {
                provider: self.provider,
                source: e,
            }
        }
    }
}
