//! Per-candidate relevance filtering

use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::policy::parse_lenient_boolean;
use crate::gateways::ChatModel;
use crate::metrics;
use crate::models::{CandidateDocument, Message};
use crate::prompts::Prompt;
use crate::Result;

/// What a failed relevance check does to the whole batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceFailurePolicy {
    /// The first failure fails the batch.
    #[default]
    Abort,
    /// A failed check drops that candidate and the rest continue.
    TreatAsIrrelevant,
}

impl RelevanceFailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelevanceFailurePolicy::Abort => "abort",
            RelevanceFailurePolicy::TreatAsIrrelevant => "treat_as_irrelevant",
        }
    }
}

/// Format the user turn of a relevance check.
pub fn evaluation_request(summary: &str, query: &str) -> String {
    format!(
        "DOCUMENT TO EVALUATE:\n{}\n\nUSER QUERY:\n{}\n\nRESPOND WITH EXACTLY 'true' or 'false':",
        summary, query
    )
}

pub struct RelevanceFilter {
    model: Arc<dyn ChatModel>,
    instructions: String,
    policy: RelevanceFailurePolicy,
}

impl RelevanceFilter {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            instructions: Prompt::RelevanceEvaluator.text(),
            policy: RelevanceFailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RelevanceFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RelevanceFailurePolicy {
        self.policy
    }

    /// Single yes/no judgement with an empty history.
    pub async fn is_relevant(&self, summary: &str, query: &str) -> Result<bool> {
        let messages = [
            Message::system(self.instructions.clone()),
            Message::user(evaluation_request(summary, query)),
        ];
        let answer = self.model.complete(&messages).await?;
        let relevant = parse_lenient_boolean(&answer);
        debug!(relevant, answer = %answer.trim(), "Relevance verdict");
        Ok(relevant)
    }

    /// Keep the candidates judged relevant, in their original order.
    ///
    /// All checks run concurrently. An empty input makes no model calls.
    pub async fn filter(
        &self,
        candidates: Vec<CandidateDocument>,
        query: &str,
    ) -> Result<Vec<CandidateDocument>> {
        if candidates.is_empty() {
            return Ok(candidates);
        }
        metrics::observe_batch("relevance", candidates.len());

        let checks = candidates
            .iter()
            .map(|doc| self.is_relevant(&doc.page_content, query));

        let verdicts: Vec<bool> = match self.policy {
            RelevanceFailurePolicy::Abort => try_join_all(checks).await?,
            RelevanceFailurePolicy::TreatAsIrrelevant => join_all(checks)
                .await
                .into_iter()
                .zip(candidates.iter())
                .map(|(verdict, doc)| {
                    verdict.unwrap_or_else(|e| {
                        warn!(dataset_id = %doc.dataset_id(), error = %e, "Relevance check failed");
                        false
                    })
                })
                .collect(),
        };

        let total = candidates.len();
        let kept: Vec<CandidateDocument> = candidates
            .into_iter()
            .zip(verdicts)
            .filter_map(|(doc, keep)| keep.then_some(doc))
            .collect();

        info!(total, kept = kept.len(), "Relevance filter applied");
        Ok(kept)
    }
}
