//! Scripted in-memory gateways for end-to-end tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use dataset_chat::gateways::{ChatModel, DatasetSource, DocumentSearch};
use dataset_chat::models::{CandidateDocument, DocumentMetadata, Message};
use dataset_chat::{Error, Result};

/// Which stage a model request came from, judged by its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Classify,
    Relevance,
    Generate,
}

fn call_kind(messages: &[Message]) -> Call {
    let first = messages.first().map(|m| m.content.as_str()).unwrap_or("");
    let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
    if last.starts_with("DOCUMENT TO EVALUATE:") {
        Call::Relevance
    } else if first.starts_with("Here are some retrieved files") {
        Call::Generate
    } else {
        Call::Classify
    }
}

/// Language model that answers each stage from a script.
pub struct ScriptedModel {
    classify_answer: String,
    relevant_marker: String,
    answer: String,
    fail_generate: bool,
    gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<(Call, Vec<Message>)>>,
}

impl ScriptedModel {
    pub fn new(classify_answer: &str) -> Self {
        Self {
            classify_answer: classify_answer.to_string(),
            relevant_marker: "population".to_string(),
            answer: "Here is what the datasets say.".to_string(),
            fail_generate: false,
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Summaries containing `marker` (case-insensitive) are judged relevant.
    pub fn relevant_when(mut self, marker: &str) -> Self {
        self.relevant_marker = marker.to_lowercase();
        self
    }

    pub fn answering(mut self, answer: &str) -> Self {
        self.answer = answer.to_string();
        self
    }

    pub fn failing_generation(mut self) -> Self {
        self.fail_generate = true;
        self
    }

    /// Hold every classification until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls_of(&self, kind: Call) -> Vec<Vec<Message>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let kind = call_kind(messages);
        self.calls.lock().unwrap().push((kind, messages.to_vec()));

        match kind {
            Call::Classify => {
                if let Some(gate) = &self.gate {
                    gate.notified().await;
                }
                Ok(self.classify_answer.clone())
            }
            Call::Relevance => {
                let request = messages.last().map(|m| m.content.to_lowercase());
                let summary = request
                    .as_deref()
                    .and_then(|r| r.split("\n\nuser query:").next())
                    .unwrap_or("");
                Ok(summary.contains(&self.relevant_marker).to_string())
            }
            Call::Generate if self.fail_generate => {
                Err(Error::LanguageModel("model overloaded".to_string()))
            }
            Call::Generate => Ok(self.answer.clone()),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Search returning a fixed candidate list.
pub struct FixedSearch {
    results: Vec<CandidateDocument>,
    calls: AtomicUsize,
}

impl FixedSearch {
    pub fn new(results: Vec<CandidateDocument>) -> Self {
        Self {
            results,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentSearch for FixedSearch {
    async fn search(&self, _query: &str, k: usize) -> Result<Vec<CandidateDocument>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.results.iter().take(k).cloned().collect())
    }
}

/// Dataset source that records fetched ids and fails on selected ones.
#[derive(Default)]
pub struct RecordingSource {
    failing: HashSet<String>,
    fetched: Mutex<Vec<String>>,
}

impl RecordingSource {
    pub fn failing_on(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|s| s.to_string()).collect(),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl DatasetSource for RecordingSource {
    async fn fetch(&self, dataset_id: &str) -> Result<String> {
        self.fetched.lock().unwrap().push(dataset_id.to_string());
        if self.failing.contains(dataset_id) {
            return Err(Error::DatasetFetch(format!("{}: status 503", dataset_id)));
        }
        Ok(format!("rows of {}", dataset_id))
    }
}

pub fn candidate(id: &str, summary: &str) -> CandidateDocument {
    CandidateDocument::new(summary, DocumentMetadata::new(id, summary))
}

/// The three hits a population query returns; two mention population.
pub fn population_hits() -> Vec<CandidateDocument> {
    vec![
        candidate("d_pop_age", "Resident population by age group"),
        candidate("d_bus", "Public bus ridership by month"),
        candidate("d_pop_eth", "Population by ethnic group"),
    ]
}
