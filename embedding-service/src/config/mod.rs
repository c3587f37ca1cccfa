pub mod embedding_config;
pub mod provider_kind;
