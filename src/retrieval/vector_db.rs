//! Dataset summary search against Qdrant

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use qdrant_client::qdrant::{value::Kind, SearchPointsBuilder, Value as QdrantValue};
use qdrant_client::Qdrant;
use tracing::{debug, info, warn};

use super::embeddings::EmbeddingService;
use crate::config::Config;
use crate::gateways::DocumentSearch;
use crate::models::{CandidateDocument, DocumentMetadata};
use crate::Result;

const CONTENT_KEYS: &[&str] = &["page_content", "pageContent", "content"];
const DATASET_ID_KEYS: &[&str] = &["datasetId", "dataset_id"];

/// Vector store backed by Qdrant
pub struct VectorStore {
    client: Qdrant,
    collection: String,
    embeddings: EmbeddingService,
}

impl VectorStore {
    /// Connect to Qdrant server
    pub fn new(
        url: &str,
        api_key: Option<String>,
        collection: &str,
        embeddings: EmbeddingService,
    ) -> Result<Self> {
        let client = Qdrant::from_url(url).api_key(api_key).build()?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            embeddings,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let embeddings = EmbeddingService::from_config(config)?;
        Self::new(
            &config.qdrant_url,
            config.qdrant_api_key.clone(),
            &config.qdrant_collection,
            embeddings,
        )
    }
}

#[async_trait]
impl DocumentSearch for VectorStore {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<CandidateDocument>> {
        let vector = self.embeddings.embed(query).await?;

        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector, k as u64).with_payload(true),
            )
            .await?;

        let mut candidates = Vec::with_capacity(results.result.len());
        for point in results.result {
            match candidate_from_payload(&point.payload) {
                Some(candidate) => {
                    debug!(score = point.score, dataset_id = %candidate.dataset_id(), "Search hit");
                    candidates.push(candidate);
                }
                None => warn!(score = point.score, "Skipping point without dataset id"),
            }
        }

        info!(
            collection = %self.collection,
            hits = candidates.len(),
            "Similarity search finished"
        );
        Ok(candidates)
    }
}

/// Map a point payload to a candidate.
///
/// Accepts both a nested `metadata` struct (LangChain layout) and flat payloads.
pub fn candidate_from_payload(
    payload: &HashMap<String, QdrantValue>,
) -> Option<CandidateDocument> {
    let page_content = CONTENT_KEYS
        .iter()
        .find_map(|key| payload.get(*key).and_then(|v| v.as_text()))
        .unwrap_or_default();

    let metadata_fields = match payload.get("metadata").and_then(|v| v.kind.as_ref()) {
        Some(Kind::StructValue(s)) => &s.fields,
        _ => payload,
    };

    let dataset_id = DATASET_ID_KEYS
        .iter()
        .find_map(|key| metadata_fields.get(*key).and_then(|v| v.as_text()))
        .filter(|id| !id.is_empty())?;

    let name = metadata_fields
        .get("name")
        .and_then(|v| v.as_text())
        .unwrap_or_else(|| dataset_id.clone());

    let mut extra = BTreeMap::new();
    for (key, value) in metadata_fields {
        if key == "name" || key == "metadata" || DATASET_ID_KEYS.contains(&key.as_str()) {
            continue;
        }
        if CONTENT_KEYS.contains(&key.as_str()) {
            continue;
        }
        if let Some(text) = value.as_text() {
            extra.insert(key.clone(), text);
        }
    }

    Some(CandidateDocument {
        page_content,
        metadata: DocumentMetadata {
            dataset_id,
            name,
            extra,
        },
    })
}

trait QdrantValueExt {
    /// Scalar value rendered as text; `None` for null, lists and structs.
    fn as_text(&self) -> Option<String>;
}

impl QdrantValueExt for QdrantValue {
    fn as_text(&self) -> Option<String> {
        match &self.kind {
            Some(Kind::StringValue(v)) => Some(v.clone()),
            Some(Kind::IntegerValue(v)) => Some(v.to_string()),
            Some(Kind::DoubleValue(v)) => Some(v.to_string()),
            Some(Kind::BoolValue(v)) => Some(v.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdrant_client::qdrant::Struct;

    fn text(v: &str) -> QdrantValue {
        QdrantValue::from(v.to_string())
    }

    fn nested(fields: Vec<(&str, QdrantValue)>) -> QdrantValue {
        QdrantValue {
            kind: Some(Kind::StructValue(Struct {
                fields: fields
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            })),
        }
    }

    #[test]
    fn maps_langchain_layout() {
        let mut payload = HashMap::new();
        payload.insert("page_content".to_string(), text("Resident population by age"));
        payload.insert(
            "metadata".to_string(),
            nested(vec![
                ("datasetId", text("d_pop")),
                ("name", text("Resident Population")),
                ("rows", QdrantValue::from(42_i64)),
            ]),
        );

        let candidate = candidate_from_payload(&payload).unwrap();

        assert_eq!(candidate.page_content, "Resident population by age");
        assert_eq!(candidate.dataset_id(), "d_pop");
        assert_eq!(candidate.metadata.name, "Resident Population");
        assert_eq!(candidate.metadata.extra.get("rows").unwrap(), "42");
    }

    #[test]
    fn maps_flat_layout_with_snake_case_id() {
        let mut payload = HashMap::new();
        payload.insert("content".to_string(), text("Rainfall monthly"));
        payload.insert("dataset_id".to_string(), text("d_rain"));
        payload.insert("agency".to_string(), text("NEA"));

        let candidate = candidate_from_payload(&payload).unwrap();

        assert_eq!(candidate.dataset_id(), "d_rain");
        assert_eq!(candidate.metadata.name, "d_rain");
        assert_eq!(candidate.metadata.extra.get("agency").unwrap(), "NEA");
        assert!(!candidate.metadata.extra.contains_key("content"));
    }

    #[test]
    fn skips_payload_without_dataset_id() {
        let mut payload = HashMap::new();
        payload.insert("page_content".to_string(), text("orphan"));
        assert!(candidate_from_payload(&payload).is_none());
    }
}
