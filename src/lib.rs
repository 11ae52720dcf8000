//! Dataset Chat Library
//!
//! This library provides tools to:
//! - Classify whether a chat turn needs external datasets
//! - Search dataset summaries in a vector database and screen them for relevance
//! - Fetch full datasets from the data.gov.sg open-data API and cache them per session
//! - Generate answers grounded in the fetched datasets, with citations
//! - Serve the pipeline stages over HTTP and drive them from a terminal chat

pub mod api;
pub mod config;
pub mod error;
pub mod gateways;
pub mod integrations;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod retrieval;

// Re-export common types
pub use config::Config;
pub use error::{Error, Result};
pub use gateways::{ChatModel, CodeRunner, DatasetSource, DocumentSearch, Execution};
pub use integrations::{DataGovClient, InterpreterClient, OpenAIClient};
pub use models::{CandidateDocument, FileSet, Intent, Message, RetrievedFile, Role, SessionState};
pub use orchestrator::{IgnoreReason, Orchestrator, TurnOutcome, TurnState, FALLBACK_REPLY};
pub use pipeline::{LocalPipeline, TurnPipeline};
pub use prompts::{load_prompt, Prompt};

pub mod commands;
