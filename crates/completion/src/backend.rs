//! Completion service seams

use crate::error::CompletionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single-prompt completion
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Model id, for logging
    fn model(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Asynchronous batch jobs: submit, poll, fetch, clean up
#[async_trait]
pub trait BatchBackend: Send + Sync {
    async fn submit(&self, items: &[BatchItem]) -> Result<BatchJob, CompletionError>;

    /// Fetch the job's current state
    async fn poll(&self, job: &BatchJob) -> Result<BatchJob, CompletionError>;

    /// Download the responses of a completed job
    async fn fetch(&self, job: &BatchJob) -> Result<Vec<BatchResponse>, CompletionError>;

    /// Delete the job's input and output files
    async fn cleanup(&self, job: &BatchJob) -> Result<(), CompletionError>;
}

/// One request line of a batch input file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub custom_id: String,
    pub method: String,
    pub url: String,
    pub body: Value,
}

/// Server-side state of a batch job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Validating,
    InProgress,
    Finalizing,
    Completed,
    Failed,
    Expired,
    Cancelling,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl BatchStatus {
    /// Still running; keep polling
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Validating | Self::InProgress | Self::Finalizing)
    }
}

/// Handle of a submitted job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJob {
    pub id: String,
    pub input_file_id: String,
    pub output_file_id: Option<String>,
    pub status: BatchStatus,
}

/// One response line of a batch output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResponse {
    pub custom_id: String,
    pub status_code: u16,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        let status: BatchStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert!(status.is_pending());

        let status: BatchStatus = serde_json::from_str("\"completed\"").unwrap();
        assert!(!status.is_pending());

        let status: BatchStatus = serde_json::from_str("\"something_new\"").unwrap();
        assert_eq!(status, BatchStatus::Unknown);
    }
}
