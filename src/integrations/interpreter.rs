//! Client for an opaque code execution service.
//!
//! The service accepts `POST {url}/execute` with `{"code": "..."}` and answers
//! with `{"output": "...", "logs": ["..."]}`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::gateways::{CodeRunner, Execution};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct InterpreterClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    code: &'a str,
}

impl InterpreterClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("dataset_chat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::InvalidArgument(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.interpreter_url, config.interpreter_api_key.clone())
    }
}

#[async_trait]
impl CodeRunner for InterpreterClient {
    async fn run(&self, code: &str) -> Result<Execution> {
        let mut request = self
            .http
            .post(format!("{}/execute", self.base_url))
            .json(&ExecuteRequest { code });

        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::CodeExecution(format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::CodeExecution(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::CodeExecution(format!("status {}: {}", status, text)));
        }

        let execution: Execution = serde_json::from_str(&text)
            .map_err(|e| Error::CodeExecution(format!("Invalid response: {}", e)))?;

        info!(
            output_chars = execution.output.len(),
            log_lines = execution.logs.len(),
            "Code executed"
        );
        Ok(execution)
    }
}
