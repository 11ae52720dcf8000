//! Turn pipeline: classify → retrieve → filter → merge → generate.
//!
//! Each stage is a small component over one of the gateway traits. None of
//! them touch session state; they return values and the orchestrator applies
//! them.

pub mod answer;
pub mod intent;
pub mod merger;
pub mod policy;
pub mod relevance;
pub mod stages;

pub use answer::AnswerGenerator;
pub use intent::IntentClassifier;
pub use merger::{FileCacheMerger, Reconciled};
pub use policy::parse_lenient_boolean;
pub use relevance::{RelevanceFailurePolicy, RelevanceFilter};
pub use stages::{LocalPipeline, TurnPipeline};
