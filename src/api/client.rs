//! Turn pipeline backed by a remote dataset chat API.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::types::{
    ClassifyIntentRequest, ClassifyIntentResponse, ErrorResponse, FetchFileRequest,
    FetchFileResponse, GenerateResponseRequest, GenerateResponseResponse, InterpretCodeRequest,
    RetrieveDocumentsRequest, RetrieveDocumentsResponse,
};
use super::{
    CLASSIFY_INTENT_PATH, FETCH_FILE_PATH, GENERATE_RESPONSE_PATH, INTERPRET_CODE_PATH,
    RETRIEVE_DOCUMENTS_PATH,
};
use crate::gateways::Execution;
use crate::models::{CandidateDocument, FileSet, Intent, Message};
use crate::pipeline::TurnPipeline;
use crate::{Error, Result};

/// Calls the stage endpoints of a running `serve` instance.
#[derive(Debug, Clone)]
pub struct RemotePipeline {
    http: Client,
    base_url: String,
    interpreter_enabled: bool,
}

impl RemotePipeline {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("dataset_chat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::InvalidArgument(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            interpreter_enabled: false,
        })
    }

    /// Also call `/api/interpret-code` after every answer.
    pub fn with_interpreter(mut self, enabled: bool) -> Self {
        self.interpreter_enabled = enabled;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "Calling stage endpoint");

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("{}: {}", path, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("{}: failed to read response: {}", path, e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            Error::SerializationError(format!("{}: unexpected response body: {}", path, e))
        })
    }
}

#[async_trait]
impl TurnPipeline for RemotePipeline {
    async fn classify_intent(&self, messages: &[Message]) -> Result<Intent> {
        let request = ClassifyIntentRequest {
            messages: messages.to_vec(),
        };
        let response: ClassifyIntentResponse = self.post(CLASSIFY_INTENT_PATH, &request).await?;
        Ok(response.intent)
    }

    async fn retrieve_documents(&self, latest_message: &str) -> Result<Vec<CandidateDocument>> {
        let request = RetrieveDocumentsRequest {
            latest_message: latest_message.to_string(),
        };
        let response: RetrieveDocumentsResponse =
            self.post(RETRIEVE_DOCUMENTS_PATH, &request).await?;
        Ok(response.relevant_docs)
    }

    async fn fetch_files(
        &self,
        files_to_fetch: &[CandidateDocument],
        existing: &FileSet,
    ) -> Result<FileSet> {
        let request = FetchFileRequest {
            files_to_fetch: files_to_fetch.to_vec(),
            existing_files: existing.clone(),
        };
        let response: FetchFileResponse = self.post(FETCH_FILE_PATH, &request).await?;
        Ok(response.all_files)
    }

    async fn generate_response(&self, messages: &[Message], files: &FileSet) -> Result<String> {
        let request = GenerateResponseRequest {
            messages: messages.to_vec(),
            all_files: files.clone(),
        };
        let response: GenerateResponseResponse =
            self.post(GENERATE_RESPONSE_PATH, &request).await?;
        Ok(response.message)
    }

    async fn interpret_code(&self, code: &str) -> Result<Execution> {
        let request = InterpretCodeRequest {
            code: code.to_string(),
        };
        self.post(INTERPRET_CODE_PATH, &request).await
    }

    fn interpreter_enabled(&self) -> bool {
        self.interpreter_enabled
    }
}
