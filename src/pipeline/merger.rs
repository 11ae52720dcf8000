//! Session file cache reconciliation

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::info;

use crate::gateways::DatasetSource;
use crate::metrics;
use crate::models::{CandidateDocument, FileSet, RetrievedFile};
use crate::Result;

/// Outcome of reconciling candidates against the held files.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    /// Candidates that were not held yet and got fetched.
    pub to_fetch: Vec<CandidateDocument>,
    /// Held files plus the newly fetched ones.
    pub all_files: FileSet,
}

/// Candidates whose dataset id is not held yet, first occurrence per id.
pub fn pending(candidates: &[CandidateDocument], existing: &FileSet) -> Vec<CandidateDocument> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|doc| !existing.contains(doc.dataset_id()))
        .filter(|doc| seen.insert(doc.dataset_id().to_string()))
        .cloned()
        .collect()
}

pub struct FileCacheMerger {
    source: Arc<dyn DatasetSource>,
}

impl FileCacheMerger {
    pub fn new(source: Arc<dyn DatasetSource>) -> Self {
        Self { source }
    }

    /// Fetch what is missing and union it into the held files.
    ///
    /// Fetches run concurrently and any failure fails the whole call, so a
    /// partial batch never reaches the caller. Already-held ids are never
    /// fetched again.
    pub async fn reconcile(
        &self,
        candidates: &[CandidateDocument],
        existing: &FileSet,
    ) -> Result<Reconciled> {
        let to_fetch = pending(candidates, existing);
        if to_fetch.is_empty() {
            return Ok(Reconciled {
                to_fetch,
                all_files: existing.clone(),
            });
        }

        metrics::observe_batch("fetch", to_fetch.len());
        let fetched = try_join_all(to_fetch.iter().map(|doc| async move {
            let body = self.source.fetch(doc.dataset_id()).await?;
            Ok::<_, crate::Error>(RetrievedFile::from_candidate(doc, body))
        }))
        .await?;

        let all_files = existing.union(fetched);
        info!(
            fetched = to_fetch.len(),
            held = all_files.len(),
            "File cache updated"
        );

        Ok(Reconciled {
            to_fetch,
            all_files,
        })
    }
}
