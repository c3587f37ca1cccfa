//! Semantic index orchestration for source workspaces.
//!
//! - [`IndexRegistry`]: one [`IndexService`] per workspace path
//! - [`IndexService`]: runs, incremental updates, search and status
//! - `worker`: background thread that chunks and embeds files
//! - [`protocol`]: the typed messages between the two
//! - [`telemetry`]: a tracing layer scoped to the pipeline crates

pub mod config;
pub mod errors;
pub mod protocol;
pub mod registry;
mod scan;
pub mod service;
pub mod status;
pub mod telemetry;
mod worker;

pub use config::{IndexConfig, IndexSettings, StatusCallback};
pub use errors::{IndexError, Result};
pub use protocol::{WorkerCommand, WorkerEvent};
pub use registry::IndexRegistry;
pub use service::IndexService;
pub use status::IndexStatus;

pub use embedding_service::{ConnectionReport, EmbeddingConfig, EmbeddingConfigPatch, ProviderKind};
pub use vector_store::{SearchHit, StoreStats};
