//! External integrations module.
//!
//! Provides clients for:
//! - OpenAI-compatible chat completion (language model gateway)
//! - data.gov.sg datastore (dataset fetch gateway)
//! - Code execution service (optional)

pub mod datasets;
pub mod interpreter;
pub mod openai;

pub use datasets::DataGovClient;
pub use interpreter::InterpreterClient;
pub use openai::OpenAIClient;
