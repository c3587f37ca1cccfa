//! Embedding client with pluggable HTTP providers.
//!
//! - [`config`]: provider kinds, defaults, env loading and config patches
//! - [`providers`]: the adapter trait, registry and built-in adapters
//! - [`EmbeddingClient`]: batching, retries, connection probe

pub mod client;
pub mod config;
pub mod connection;
pub mod error_handler;
pub mod providers;

pub use client::{EmbeddingClient, PROBE_TEXT};
pub use config::embedding_config::{EmbeddingConfig, EmbeddingConfigPatch};
pub use config::provider_kind::ProviderKind;
pub use connection::ConnectionReport;
pub use error_handler::{ConfigError, EmbeddingError, Result};
pub use providers::{EmbedFuture, EmbeddingProvider, ProviderBuilder, ProviderRegistry};
