//! Error types for the dataset chat pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Language model error: {0}")]
    LanguageModel(String),

    #[error("Vector search error: {0}")]
    VectorSearch(String),

    #[error("Dataset fetch error: {0}")]
    DatasetFetch(String),

    #[error("Code execution error: {0}")]
    CodeExecution(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<qdrant_client::QdrantError> for Error {
    fn from(err: qdrant_client::QdrantError) -> Self {
        Error::VectorSearch(err.to_string())
    }
}

impl From<async_openai::error::OpenAIError> for Error {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        Error::VectorSearch(format!("query embedding failed: {}", err))
    }
}
