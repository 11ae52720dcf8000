//! System prompts used by the pipeline stages.
//!
//! Each prompt has a built-in text. A Markdown file with the same name in the
//! `prompts/` directory replaces it, which lets the wording be tuned without a
//! rebuild. The answer prompt must keep the `{context}` placeholder.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{Error, Result};

/// Placeholder replaced by the serialized file context.
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

const INTENT_CLASSIFIER: &str = "Evaluate the given conversation and determine if retrieving external \
sources of information is necessary to answer the user's query. \
Respond with 'true' if additional information is required to provide \
a complete and accurate answer. Respond with 'false' if the query can \
be sufficiently addressed using the existing context alone. Avoid any \
explanation or elaboration beyond the 'true' or 'false' response.";

const RELEVANCE_EVALUATOR: &str = "You are a document relevance evaluator. Your task is to analyze \
the title and description of a document to determine if the full document \
could help answer the user's query. You will not see the full document contents. \
Consider both direct relevance (explicit mentions) and indirect relevance \
(related concepts or context suggested by the title/description). \
Respond with 'true' or 'false' followed by a brief explanation of your reasoning. \
Mark as 'true' if the document's title and description suggest it contains \
information that could contribute to answering the query. \
Be inclusive rather than exclusive - if the title/description hints at potential value, \
mark it as relevant. Format your response as: true/false: <explanation>";

const ANSWER_POLICY: &str = "Here are some retrieved files that are relevant to the user's query:
{context}

When answering:
- Answer the user's question directly and comprehensively.
- Do not suggest steps for the user to take or tell them how to find the answer.
- Cite the relevant file name and line number in parentheses.
- Provide specific details from the context when applicable.
- If multiple files are relevant, reference them separately.
- Ensure your response is complete and doesn't require further action from the user.";

/// Available prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Decides whether a conversation needs retrieval.
    IntentClassifier,
    /// Judges a dataset summary against the latest query.
    RelevanceEvaluator,
    /// Citation policy wrapped around the file context.
    AnswerPolicy,
}

impl Prompt {
    /// Override file name (Markdown).
    pub fn filename(&self) -> &'static str {
        match self {
            Prompt::IntentClassifier => "intent_classifier.md",
            Prompt::RelevanceEvaluator => "relevance_evaluator.md",
            Prompt::AnswerPolicy => "answer_policy.md",
        }
    }

    /// Built-in prompt text.
    pub fn builtin(&self) -> &'static str {
        match self {
            Prompt::IntentClassifier => INTENT_CLASSIFIER,
            Prompt::RelevanceEvaluator => RELEVANCE_EVALUATOR,
            Prompt::AnswerPolicy => ANSWER_POLICY,
        }
    }

    /// Load the override file, falling back to the built-in text.
    pub fn text(&self) -> String {
        self.text_in(&prompts_dir())
    }

    /// Same as [`Prompt::text`], reading overrides from `dir`.
    pub fn text_in(&self, dir: &Path) -> String {
        let text = match load_prompt_from(dir, self.filename()) {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => return self.builtin().to_string(),
        };
        if !self.accepts(&text) {
            warn!(
                prompt = self.filename(),
                placeholder = CONTEXT_PLACEHOLDER,
                "Prompt override lacks a required placeholder, using built-in text"
            );
            return self.builtin().to_string();
        }
        text
    }

    /// Whether an override keeps everything the stage substitutes into it.
    fn accepts(&self, text: &str) -> bool {
        match self {
            Prompt::AnswerPolicy => text.contains(CONTEXT_PLACEHOLDER),
            Prompt::IntentClassifier | Prompt::RelevanceEvaluator => true,
        }
    }
}

/// Load a prompt file by name from the prompts directory.
pub fn load_prompt(filename: &str) -> Result<String> {
    load_prompt_from(&prompts_dir(), filename)
}

fn load_prompt_from(dir: &Path, filename: &str) -> Result<String> {
    let path = dir.join(filename);
    let text = std::fs::read_to_string(&path).map_err(|e| {
        Error::InvalidArgument(format!("Failed to load prompt {}: {}", filename, e))
    })?;
    debug!(prompt = filename, "Loaded prompt override");
    Ok(text)
}

/// Path to the prompts directory.
pub fn prompts_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("DATASET_CHAT_PROMPTS_DIR") {
        return PathBuf::from(dir);
    }

    let candidates = [PathBuf::from("prompts"), PathBuf::from("../prompts")];

    for path in candidates {
        if path.exists() {
            return path;
        }
    }

    PathBuf::from("prompts")
}

/// All prompts the pipeline uses.
pub fn list_prompts() -> Vec<Prompt> {
    vec![
        Prompt::IntentClassifier,
        Prompt::RelevanceEvaluator,
        Prompt::AnswerPolicy,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_prompts_demand_boolean_answers() {
        assert!(Prompt::IntentClassifier.builtin().contains("'true'"));
        assert!(Prompt::RelevanceEvaluator
            .builtin()
            .contains("Be inclusive rather than exclusive"));
    }

    #[test]
    fn answer_policy_has_context_placeholder_and_citation_rule() {
        let text = Prompt::AnswerPolicy.builtin();
        assert!(text.contains(CONTEXT_PLACEHOLDER));
        assert!(text.contains("Cite the relevant file name and line number in parentheses"));
    }

    #[test]
    fn filenames_are_unique() {
        let names: std::collections::HashSet<_> =
            list_prompts().iter().map(|p| p.filename()).collect();
        assert_eq!(names.len(), list_prompts().len());
    }

    #[test]
    fn answer_override_without_placeholder_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("answer_policy.md"),
            "Answer directly and cite files.",
        )
        .unwrap();

        assert_eq!(
            Prompt::AnswerPolicy.text_in(dir.path()),
            Prompt::AnswerPolicy.builtin()
        );
    }

    #[test]
    fn answer_override_with_placeholder_is_used() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("answer_policy.md"),
            "Files:\n{context}\nCite them.\n",
        )
        .unwrap();

        assert_eq!(
            Prompt::AnswerPolicy.text_in(dir.path()),
            "Files:\n{context}\nCite them."
        );
    }

    #[test]
    fn classifier_override_needs_no_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("intent_classifier.md"), "Reply true or false.").unwrap();

        assert_eq!(
            Prompt::IntentClassifier.text_in(dir.path()),
            "Reply true or false."
        );
        assert_eq!(
            Prompt::RelevanceEvaluator.text_in(dir.path()),
            Prompt::RelevanceEvaluator.builtin()
        );
    }

    #[test]
    fn load_prompt_reports_missing_file() {
        let err = load_prompt("does_not_exist_prompt.md").unwrap_err();
        assert!(err.to_string().contains("Failed to load prompt"));
    }
}
