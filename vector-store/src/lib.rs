//! Persistent vector table for code chunks.
//!
//! One LanceDB table (`code_chunks`) per workspace index directory. The store
//! owns the table lifecycle; callers decide when to mutate and must serialize
//! writes themselves.

pub mod errors;
mod schema;
pub mod store;
pub mod types;

pub use errors::{Result, StoreError};
pub use schema::TABLE_NAME;
pub use store::VectorStore;
pub use types::{ASSUMED_CHUNKS_PER_FILE, SearchHit, StoreStats};
