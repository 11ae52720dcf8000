//! Request and response bodies shared by the server and the remote client.

use serde::{Deserialize, Serialize};

use crate::models::{CandidateDocument, FileSet, Intent, Message};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyIntentRequest {
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyIntentResponse {
    pub intent: Intent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveDocumentsRequest {
    pub latest_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveDocumentsResponse {
    pub relevant_docs: Vec<CandidateDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchFileRequest {
    pub files_to_fetch: Vec<CandidateDocument>,
    #[serde(default)]
    pub existing_files: FileSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchFileResponse {
    pub all_files: FileSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponseRequest {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub all_files: FileSet,
}

/// Generated reply plus the file set it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponseResponse {
    pub message: String,
    pub files: FileSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpretCodeRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fetch_request_uses_camel_case_keys() {
        let body = json!({
            "filesToFetch": [{
                "pageContent": "Rainfall",
                "metadata": {"datasetId": "d_rain", "name": "Rainfall", "agency": "NEA"}
            }],
            "existingFiles": []
        });

        let request: FetchFileRequest = serde_json::from_value(body).unwrap();

        assert_eq!(request.files_to_fetch.len(), 1);
        assert_eq!(request.files_to_fetch[0].dataset_id(), "d_rain");
        assert_eq!(
            request.files_to_fetch[0].metadata.extra.get("agency").unwrap(),
            "NEA"
        );
        assert!(request.existing_files.is_empty());
    }

    #[test]
    fn intent_response_serializes_snake_case() {
        let body = serde_json::to_value(ClassifyIntentResponse {
            intent: Intent::RetrieveFiles,
        })
        .unwrap();
        assert_eq!(body, json!({"intent": "retrieve_files"}));
    }

    #[test]
    fn retrieve_request_reads_latest_message() {
        let request: RetrieveDocumentsRequest =
            serde_json::from_value(json!({"latestMessage": "bus ridership"})).unwrap();
        assert_eq!(request.latest_message, "bus ridership");
    }
}
