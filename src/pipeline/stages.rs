//! Stage boundaries of a turn and their in-process implementation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::answer::AnswerGenerator;
use super::intent::IntentClassifier;
use super::merger::FileCacheMerger;
use super::relevance::{RelevanceFailurePolicy, RelevanceFilter};
use crate::config::Config;
use crate::gateways::{ChatModel, CodeRunner, DatasetSource, DocumentSearch, Execution};
use crate::integrations::{DataGovClient, InterpreterClient, OpenAIClient};
use crate::models::{CandidateDocument, FileSet, Intent, Message};
use crate::retrieval::{VectorStore, RETRIEVAL_TOP_K};
use crate::{Error, Result};

/// The request/response boundaries the orchestrator drives, in turn order.
///
/// Implementations are stateless between calls; every input they need is
/// passed in.
#[async_trait]
pub trait TurnPipeline: Send + Sync {
    async fn classify_intent(&self, messages: &[Message]) -> Result<Intent>;

    /// Similarity search for the latest message, screened for relevance.
    async fn retrieve_documents(&self, latest_message: &str) -> Result<Vec<CandidateDocument>>;

    /// Fetch what `files_to_fetch` adds and return the union with `existing`.
    async fn fetch_files(
        &self,
        files_to_fetch: &[CandidateDocument],
        existing: &FileSet,
    ) -> Result<FileSet>;

    async fn generate_response(&self, messages: &[Message], files: &FileSet) -> Result<String>;

    async fn interpret_code(&self, code: &str) -> Result<Execution>;

    /// Whether `interpret_code` should run after each answer.
    fn interpreter_enabled(&self) -> bool;
}

/// Runs every stage in this process against the configured gateways.
pub struct LocalPipeline {
    classifier: IntentClassifier,
    search: Arc<dyn DocumentSearch>,
    relevance: RelevanceFilter,
    merger: FileCacheMerger,
    generator: AnswerGenerator,
    interpreter: Option<Arc<dyn CodeRunner>>,
}

impl LocalPipeline {
    pub fn new(
        model: Arc<dyn ChatModel>,
        search: Arc<dyn DocumentSearch>,
        source: Arc<dyn DatasetSource>,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(model.clone()),
            search,
            relevance: RelevanceFilter::new(model.clone()),
            merger: FileCacheMerger::new(source),
            generator: AnswerGenerator::new(model),
            interpreter: None,
        }
    }

    pub fn with_relevance_policy(mut self, policy: RelevanceFailurePolicy) -> Self {
        self.relevance = self.relevance.with_policy(policy);
        self
    }

    pub fn with_interpreter(mut self, runner: Arc<dyn CodeRunner>) -> Self {
        self.interpreter = Some(runner);
        self
    }

    /// Wire the production gateways from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let model = Arc::new(OpenAIClient::from_config(config)?);
        let search = Arc::new(VectorStore::from_config(config)?);
        let source = Arc::new(DataGovClient::from_config(config)?);

        let mut pipeline = Self::new(model, search, source)
            .with_relevance_policy(config.relevance_failure_policy);
        if config.interpreter_enabled {
            pipeline = pipeline.with_interpreter(Arc::new(InterpreterClient::from_config(config)?));
        }

        info!(
            model = %config.openai_model,
            collection = %config.qdrant_collection,
            relevance_policy = config.relevance_failure_policy.as_str(),
            interpreter = config.interpreter_enabled,
            "Local pipeline ready"
        );
        Ok(pipeline)
    }
}

#[async_trait]
impl TurnPipeline for LocalPipeline {
    async fn classify_intent(&self, messages: &[Message]) -> Result<Intent> {
        self.classifier.classify(messages).await
    }

    async fn retrieve_documents(&self, latest_message: &str) -> Result<Vec<CandidateDocument>> {
        let candidates = self.search.search(latest_message, RETRIEVAL_TOP_K).await?;
        self.relevance.filter(candidates, latest_message).await
    }

    async fn fetch_files(
        &self,
        files_to_fetch: &[CandidateDocument],
        existing: &FileSet,
    ) -> Result<FileSet> {
        let reconciled = self.merger.reconcile(files_to_fetch, existing).await?;
        Ok(reconciled.all_files)
    }

    async fn generate_response(&self, messages: &[Message], files: &FileSet) -> Result<String> {
        self.generator.generate(messages, files).await
    }

    async fn interpret_code(&self, code: &str) -> Result<Execution> {
        match &self.interpreter {
            Some(runner) => runner.run(code).await,
            None => Err(Error::CodeExecution(
                "no execution service configured".to_string(),
            )),
        }
    }

    fn interpreter_enabled(&self) -> bool {
        self.interpreter.is_some()
    }
}
