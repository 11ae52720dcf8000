//! Query embedding through the OpenAI embeddings API

use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequestArgs, EmbeddingInput},
    Client as OpenAIClient,
};
use tracing::debug;

use crate::config::Config;
use crate::{Error, Result};

/// Longest query (in bytes) sent to the embeddings endpoint.
const MAX_QUERY_BYTES: usize = 8000;

/// Service for embedding search queries
pub struct EmbeddingService {
    client: OpenAIClient<OpenAIConfig>,
    model: String,
}

impl EmbeddingService {
    /// Create a new embedding service from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.require_openai_key()?;
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(config.openai_base_url.trim_end_matches('/'));

        Ok(Self {
            client: OpenAIClient::with_config(openai_config),
            model: config.embedding_model.clone(),
        })
    }

    /// Generate the embedding for a single query
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let query = truncate_query(text);
        if query.is_empty() {
            return Err(Error::InvalidArgument("cannot embed an empty query".to_string()));
        }

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::String(query.to_string()))
            .build()?;

        let response = self.client.embeddings().create(request).await?;

        debug!(
            model = %self.model,
            tokens = response.usage.total_tokens,
            "Query embedded"
        );

        response
            .data
            .into_iter()
            .next()
            .map(|e| e.embedding)
            .ok_or_else(|| Error::VectorSearch("No embedding returned".to_string()))
    }
}

/// Trim whitespace and cap the query length on a char boundary.
fn truncate_query(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.len() <= MAX_QUERY_BYTES {
        return trimmed;
    }
    let mut end = MAX_QUERY_BYTES;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    &trimmed[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_query_trims_whitespace() {
        assert_eq!(truncate_query("  population  "), "population");
    }

    #[test]
    fn truncate_query_respects_char_boundaries() {
        let long = "é".repeat(MAX_QUERY_BYTES);
        let cut = truncate_query(&long);
        assert!(cut.len() <= MAX_QUERY_BYTES);
        assert!(cut.chars().all(|c| c == 'é'));
    }

    #[test]
    fn short_query_is_untouched() {
        let q = "What are the population statistics for Singapore?";
        assert_eq!(truncate_query(q), q);
    }
}
