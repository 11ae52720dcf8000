//! Conversation and retrieval data model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Author of a message in the conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// A single role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Metadata attached to an indexed dataset summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(rename = "datasetId")]
    pub dataset_id: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl DocumentMetadata {
    pub fn new(dataset_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            name: name.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Flatten into a string map that keeps `datasetId` and `name` alongside the extras.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = self.extra.clone();
        map.insert("datasetId".to_string(), self.dataset_id.clone());
        map.insert("name".to_string(), self.name.clone());
        map
    }
}

/// Summary-level search hit, screened for relevance before its content is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDocument {
    #[serde(rename = "pageContent")]
    pub page_content: String,
    pub metadata: DocumentMetadata,
}

impl CandidateDocument {
    pub fn new(page_content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            page_content: page_content.into(),
            metadata,
        }
    }

    pub fn dataset_id(&self) -> &str {
        &self.metadata.dataset_id
    }
}

/// Fully fetched dataset, cached for the rest of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedFile {
    pub id: String,
    pub name: String,
    pub metadata: BTreeMap<String, String>,
    #[serde(rename = "fullContent")]
    pub full_content: String,
}

impl RetrievedFile {
    /// Build the cached file for a candidate from the fetched body.
    pub fn from_candidate(candidate: &CandidateDocument, full_content: String) -> Self {
        Self {
            id: candidate.metadata.dataset_id.clone(),
            name: candidate.metadata.name.clone(),
            metadata: candidate.metadata.to_map(),
            full_content,
        }
    }
}

/// Files held by a session, unique by id, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<RetrievedFile>", into = "Vec<RetrievedFile>")]
pub struct FileSet {
    files: Vec<RetrievedFile>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file unless one with the same id is already held.
    ///
    /// Returns `true` when the set changed.
    pub fn insert(&mut self, file: RetrievedFile) -> bool {
        if self.contains(&file.id) {
            return false;
        }
        self.files.push(file);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.files.iter().any(|f| f.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&RetrievedFile> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RetrievedFile> {
        self.files.iter()
    }

    /// Union with `other`; files already held win over incoming duplicates.
    pub fn union(&self, other: impl IntoIterator<Item = RetrievedFile>) -> FileSet {
        let mut merged = self.clone();
        for file in other {
            merged.insert(file);
        }
        merged
    }
}

impl FromIterator<RetrievedFile> for FileSet {
    fn from_iter<I: IntoIterator<Item = RetrievedFile>>(iter: I) -> Self {
        let mut set = FileSet::new();
        for file in iter {
            set.insert(file);
        }
        set
    }
}

impl From<Vec<RetrievedFile>> for FileSet {
    fn from(files: Vec<RetrievedFile>) -> Self {
        files.into_iter().collect()
    }
}

impl From<FileSet> for Vec<RetrievedFile> {
    fn from(set: FileSet) -> Self {
        set.files
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a RetrievedFile;
    type IntoIter = std::slice::Iter<'a, RetrievedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

/// Whether a turn needs external retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    RetrieveFiles,
    GeneralQuery,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::RetrieveFiles => "retrieve_files",
            Intent::GeneralQuery => "general_query",
        }
    }
}

/// Everything a chat session holds; lost when the session ends.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub messages: Vec<Message>,
    pub files: FileSet,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            messages: Vec::new(),
            files: FileSet::new(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
