//! Seams to the external services the pipeline depends on.
//!
//! Every external collaborator is reached through one of these traits so the
//! pipeline can run against the real clients or against in-memory doubles.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CandidateDocument, Message};

/// Hosted chat-completion endpoint: ordered messages in, generated text out.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String>;

    /// Model identifier, used in logs.
    fn model_name(&self) -> &str;
}

/// Similarity search over the dataset summary index.
#[async_trait]
pub trait DocumentSearch: Send + Sync {
    /// Top-`k` candidates ranked by similarity, best first.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<CandidateDocument>>;
}

/// Open-data API returning the raw content of a dataset.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn fetch(&self, dataset_id: &str) -> Result<String>;
}

/// Result of running code on the execution service.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Execution {
    pub output: String,
    #[serde(default)]
    pub logs: Vec<String>,
}

impl Execution {
    /// Assistant-facing rendering of the execution result.
    pub fn render(&self) -> String {
        format!(
            "Code execution output:\n{}\n\nExecution logs:\n{}",
            self.output,
            self.logs.join("\n")
        )
    }
}

/// Opaque code execution service.
#[async_trait]
pub trait CodeRunner: Send + Sync {
    async fn run(&self, code: &str) -> Result<Execution>;
}
