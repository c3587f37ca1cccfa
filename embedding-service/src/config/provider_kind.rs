use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error_handler::ConfigError;

/// Embedding backend identifier.
///
/// Each kind has a fixed default endpoint and model; adapters live in
/// [`crate::providers`] and are looked up through the provider registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Jina,
    Voyage,
    #[serde(rename = "openai")]
    OpenAi,
    Cohere,
    #[serde(rename = "huggingface")]
    HuggingFace,
    Ollama,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::Jina,
        ProviderKind::Voyage,
        ProviderKind::OpenAi,
        ProviderKind::Cohere,
        ProviderKind::HuggingFace,
        ProviderKind::Ollama,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Jina => "jina",
            ProviderKind::Voyage => "voyage",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Cohere => "cohere",
            ProviderKind::HuggingFace => "huggingface",
            ProviderKind::Ollama => "ollama",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Jina => "https://api.jina.ai/v1",
            ProviderKind::Voyage => "https://api.voyageai.com/v1",
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Cohere => "https://api.cohere.ai/v1",
            ProviderKind::HuggingFace => "https://api-inference.huggingface.co",
            ProviderKind::Ollama => "http://localhost:11434",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Jina => "jina-embeddings-v2-base-code",
            ProviderKind::Voyage => "voyage-code-2",
            ProviderKind::OpenAi => "text-embedding-3-small",
            ProviderKind::Cohere => "embed-english-v3.0",
            ProviderKind::HuggingFace => "sentence-transformers/all-MiniLM-L6-v2",
            ProviderKind::Ollama => "nomic-embed-text",
        }
    }

    /// The local runtime is the only backend without authentication.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderKind::Ollama)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|k| k.as_str() == lower)
            .ok_or(ConfigError::UnsupportedProvider(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(" ollama ".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
        assert!("bedrock".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn serde_names_match_display() {
        for kind in ProviderKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }
}
