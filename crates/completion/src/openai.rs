//! OpenAI-compatible HTTP backend
//!
//! Works against any service exposing `/chat/completions`, `/files` and
//! `/batches` in the OpenAI shape.

use crate::backend::{BatchBackend, BatchItem, BatchJob, BatchResponse, BatchStatus, CompletionBackend};
use crate::client::CompletionClient;
use crate::config::ModelConfig;
use crate::error::CompletionError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct BatchObject {
    id: String,
    input_file_id: String,
    #[serde(default)]
    output_file_id: Option<String>,
    status: BatchStatus,
}

#[derive(Debug, Deserialize)]
struct OutputLine {
    custom_id: String,
    response: OutputResponse,
}

#[derive(Debug, Deserialize)]
struct OutputResponse {
    status_code: u16,
    body: ChatResponse,
}

/// HTTP client for one configured model
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    /// Reqwest HTTP client
    client: Client,
    config: ModelConfig,
    api_key: String,
}

impl OpenAiBackend {
    pub fn new(config: ModelConfig, api_key: String) -> Self {
        Self {
            client: Client::new(),
            config,
            api_key,
        }
    }

    /// Build from a profile, reading the key from its environment variable
    pub fn from_config(config: ModelConfig) -> Result<Self, CompletionError> {
        let api_key = config.api_key()?;
        Ok(Self::new(config, api_key))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Request body for one prompt, including the profile's extra arguments
    pub fn request_body(&self, prompt: &str) -> Value {
        let mut body = Map::new();
        for (key, value) in &self.config.model_kwargs {
            body.insert(key.clone(), value.clone());
        }
        body.insert("model".to_string(), json!(self.config.model));
        body.insert(
            "messages".to_string(),
            json!([{"role": "user", "content": prompt}]),
        );
        Value::Object(body)
    }
}

/// Client for a model profile with both single and batch completion enabled
pub fn client_for_model(config: ModelConfig) -> Result<CompletionClient, CompletionError> {
    let backend = Arc::new(OpenAiBackend::from_config(config.clone())?);
    let mut template = Map::new();
    for (key, value) in &config.model_kwargs {
        template.insert(key.clone(), value.clone());
    }
    template.insert("model".to_string(), json!(config.model));
    Ok(CompletionClient::new(backend.clone()).with_batch(
        backend,
        config.endpoint,
        Value::Object(template),
    ))
}

async fn check(response: Response) -> Result<Response, CompletionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CompletionError::Api {
        status: status.as_u16(),
        body,
    })
}

fn first_content(response: ChatResponse) -> Result<String, CompletionError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or(CompletionError::EmptyResponse)
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        debug!("Completing by {}", self.config.model);
        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;
        let chat: ChatResponse = check(response).await?.json().await?;
        first_content(chat)
    }
}

#[async_trait]
impl BatchBackend for OpenAiBackend {
    async fn submit(&self, items: &[BatchItem]) -> Result<BatchJob, CompletionError> {
        let mut lines = String::new();
        for item in items {
            lines.push_str(&serde_json::to_string(item)?);
            lines.push('\n');
        }

        let form = Form::new().text("purpose", "batch").part(
            "file",
            Part::bytes(lines.into_bytes()).file_name("batch.input.jsonl"),
        );
        let response = self
            .client
            .post(self.url("files"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;
        let file: FileObject = check(response).await?.json().await?;
        info!("Create task with id {}", file.id);

        let response = self
            .client
            .post(self.url("batches"))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "input_file_id": file.id,
                "endpoint": self.config.endpoint,
                "completion_window": "24h",
                "metadata": {"description": format!("complete batches by {}", self.config.model)},
            }))
            .send()
            .await?;
        let batch: BatchObject = check(response).await?.json().await?;
        Ok(BatchJob {
            id: batch.id,
            input_file_id: batch.input_file_id,
            output_file_id: batch.output_file_id,
            status: batch.status,
        })
    }

    async fn poll(&self, job: &BatchJob) -> Result<BatchJob, CompletionError> {
        let response = self
            .client
            .get(self.url(&format!("batches/{}", job.id)))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let batch: BatchObject = check(response).await?.json().await?;
        Ok(BatchJob {
            id: batch.id,
            input_file_id: batch.input_file_id,
            output_file_id: batch.output_file_id,
            status: batch.status,
        })
    }

    async fn fetch(&self, job: &BatchJob) -> Result<Vec<BatchResponse>, CompletionError> {
        let Some(output) = &job.output_file_id else {
            return Ok(Vec::new());
        };
        let response = self
            .client
            .get(self.url(&format!("files/{output}/content")))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let text = check(response).await?.text().await?;

        let mut responses = Vec::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let parsed: OutputLine = match serde_json::from_str(line) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Skipping unreadable batch output line: {}", e);
                    continue;
                }
            };
            let status_code = parsed.response.status_code;
            let content = first_content(parsed.response.body).unwrap_or_default();
            responses.push(BatchResponse {
                custom_id: parsed.custom_id,
                status_code,
                content,
            });
        }
        Ok(responses)
    }

    async fn cleanup(&self, job: &BatchJob) -> Result<(), CompletionError> {
        let files = std::iter::once(&job.input_file_id).chain(job.output_file_id.iter());
        for file in files {
            info!("Deleting file {}", file);
            let response = self
                .client
                .delete(self.url(&format!("files/{file}")))
                .bearer_auth(&self.api_key)
                .send()
                .await;
            match response {
                Ok(r) => {
                    if let Err(e) = check(r).await {
                        warn!("Failed to delete file {}, {}", file, e);
                    }
                }
                Err(e) => warn!("Failed to delete file {}, {}", file, e),
            }
        }
        Ok(())
    }
}
