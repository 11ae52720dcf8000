//! Intent classification for a user turn

use std::sync::Arc;

use tracing::{debug, info};

use super::policy::parse_lenient_boolean;
use crate::gateways::ChatModel;
use crate::models::{Intent, Message};
use crate::prompts::Prompt;
use crate::Result;

/// Decides whether a turn needs dataset retrieval.
///
/// One completion per call: the classifier instructions go first as a system
/// message, followed by the full conversation history in order. The answer is
/// read with [`parse_lenient_boolean`].
pub struct IntentClassifier {
    model: Arc<dyn ChatModel>,
    instructions: String,
}

impl IntentClassifier {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self::with_instructions(model, Prompt::IntentClassifier.text())
    }

    pub fn with_instructions(model: Arc<dyn ChatModel>, instructions: impl Into<String>) -> Self {
        Self {
            model,
            instructions: instructions.into(),
        }
    }

    pub async fn classify(&self, history: &[Message]) -> Result<Intent> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(self.instructions.clone()));
        messages.extend_from_slice(history);

        let answer = self.model.complete(&messages).await?;
        debug!(answer = %answer.to_lowercase(), "Classifier answer");

        let intent = if parse_lenient_boolean(&answer) {
            Intent::RetrieveFiles
        } else {
            Intent::GeneralQuery
        };

        info!(
            intent = intent.as_str(),
            history = history.len(),
            "Intent classified"
        );
        Ok(intent)
    }
}
