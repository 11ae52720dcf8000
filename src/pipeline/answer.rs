//! Grounded answer generation

use std::sync::Arc;

use tracing::info;

use crate::gateways::ChatModel;
use crate::models::{FileSet, Message, RetrievedFile};
use crate::prompts::{Prompt, CONTEXT_PLACEHOLDER};
use crate::Result;

/// Render one held file as a context block.
fn render_file(file: &RetrievedFile) -> String {
    let metadata = serde_json::to_string(&file.metadata).unwrap_or_else(|_| "{}".to_string());
    format!(
        "id: {}\nname: {}\nmetadata: {}\nfullContent: {}",
        file.id, file.name, metadata, file.full_content
    )
}

/// Serialize every held file, blocks separated by a blank line.
pub fn render_context(files: &FileSet) -> String {
    files
        .iter()
        .map(render_file)
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub struct AnswerGenerator {
    model: Arc<dyn ChatModel>,
    policy: String,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            policy: Prompt::AnswerPolicy.text(),
        }
    }

    /// System message carrying the citation policy and the file context.
    pub fn system_message(&self, files: &FileSet) -> Message {
        Message::system(self.policy.replace(CONTEXT_PLACEHOLDER, &render_context(files)))
    }

    pub async fn generate(&self, history: &[Message], files: &FileSet) -> Result<String> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(self.system_message(files));
        messages.extend_from_slice(history);

        let reply = self.model.complete(&messages).await?;
        info!(
            files = files.len(),
            model = self.model.model_name(),
            chars = reply.len(),
            "Answer generated"
        );
        Ok(reply)
    }
}
