//! HTTP API exposing the turn stages as JSON endpoints.
//!
//! [`server`] serves a [`TurnPipeline`](crate::pipeline::TurnPipeline) over
//! hyper; [`client::RemotePipeline`] implements the same trait against it.

pub mod client;
pub mod server;
pub mod types;

pub use client::RemotePipeline;
pub use server::{serve, serve_listener};

pub const CLASSIFY_INTENT_PATH: &str = "/api/classify-intent";
pub const RETRIEVE_DOCUMENTS_PATH: &str = "/api/retrieve-documents";
pub const FETCH_FILE_PATH: &str = "/api/fetch-file";
pub const GENERATE_RESPONSE_PATH: &str = "/api/generate-response";
pub const INTERPRET_CODE_PATH: &str = "/api/interpret-code";
pub const HEALTH_PATH: &str = "/health";
pub const METRICS_PATH: &str = "/metrics";
