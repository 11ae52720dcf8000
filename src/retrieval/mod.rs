//! Vector retrieval gateway
//!
//! Embeds the query with OpenAI and runs a similarity search over the dataset
//! summary collection in Qdrant.

pub mod embeddings;
pub mod vector_db;

pub use embeddings::EmbeddingService;
pub use vector_db::VectorStore;

/// Number of candidates requested per retrieval.
pub const RETRIEVAL_TOP_K: usize = 3;
