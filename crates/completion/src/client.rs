//! Completion strategies over a backend
//!
//! Every strategy takes a flat list of prompts and returns one response per
//! prompt, in prompt order. A prompt that could not be completed yields an
//! empty string.

use crate::backend::{BatchBackend, BatchItem, BatchResponse, CompletionBackend};
use crate::error::CompletionError;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Length of the requests-per-minute window
pub const THROTTLE_WINDOW: Duration = Duration::from_secs(60);

/// Per-prompt retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per prompt, at least 1
    pub max_attempts: u32,

    /// Delay after the first failure; doubled after each further failure
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff before attempt `attempt + 1`, for `attempt` starting at 1
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Completion collaborator used by the model-based plugins
#[derive(Clone)]
pub struct CompletionClient {
    backend: Arc<dyn CompletionBackend>,
    batch: Option<Arc<dyn BatchBackend>>,
    retry: RetryPolicy,
    poll_interval: Duration,
    /// Endpoint named in batch request lines
    endpoint: String,
    /// Extra body fields for batch request lines
    request_template: Value,
}

impl CompletionClient {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            batch: None,
            retry: RetryPolicy::default(),
            poll_interval: Duration::from_secs(30),
            endpoint: "/v1/chat/completions".to_string(),
            request_template: Value::Null,
        }
    }

    /// Enable batch jobs; `request_template` builds the body for each prompt
    pub fn with_batch(
        mut self,
        batch: Arc<dyn BatchBackend>,
        endpoint: impl Into<String>,
        request_template: Value,
    ) -> Self {
        self.batch = Some(batch);
        self.endpoint = endpoint.into();
        self.request_template = request_template;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Complete one prompt, retrying with backoff; empty string once attempts run out
    pub async fn complete_single(&self, prompt: &str) -> String {
        let attempts = self.retry.max_attempts.max(1);
        for attempt in 1..=attempts {
            match self.backend.complete(prompt).await {
                Ok(content) => return content,
                Err(e) if attempt < attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        "Completion by {} failed (attempt {}/{}): {}. Retrying in {:.1}s",
                        self.backend.model(),
                        attempt,
                        attempts,
                        e,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(
                        "Completion by {} failed after {} attempts: {}",
                        self.backend.model(),
                        attempts,
                        e
                    );
                }
            }
        }
        String::new()
    }

    /// Complete prompts one after another
    pub async fn complete_sequential(&self, prompts: &[String]) -> Vec<String> {
        let mut responses = Vec::with_capacity(prompts.len());
        for (i, prompt) in prompts.iter().enumerate() {
            info!("Completing prompt {}/{}", i + 1, prompts.len());
            responses.push(self.complete_single(prompt).await);
        }
        responses
    }

    /// Complete prompts with up to `max_workers` in flight, at most
    /// `requests_per_minute` per minute
    pub async fn complete_concurrent(
        &self,
        prompts: &[String],
        max_workers: usize,
        requests_per_minute: usize,
    ) -> Vec<String> {
        let workers = max_workers.max(1);
        let mut throttle = Throttle::new(prompts.len(), requests_per_minute);
        let mut out = Vec::with_capacity(prompts.len());

        for chunk in prompts.chunks(throttle.chunk_size()) {
            let started = Instant::now();
            let responses: Vec<String> = stream::iter(chunk.to_vec())
                .map(move |prompt| async move { self.complete_single(&prompt).await })
                .buffered(workers)
                .collect()
                .await;
            out.extend(responses);
            throttle.pace(started).await;
        }
        out
    }

    /// Complete prompts through batch jobs of at most `requests_per_minute` items.
    ///
    /// A job that fails or cannot be submitted contributes empty strings.
    pub async fn complete_batch(
        &self,
        prompts: &[String],
        requests_per_minute: usize,
    ) -> Result<Vec<String>, CompletionError> {
        let batch = self.batch.as_ref().ok_or(CompletionError::BatchUnsupported)?;
        let mut throttle = Throttle::new(prompts.len(), requests_per_minute);
        let mut out = Vec::with_capacity(prompts.len());

        for chunk in prompts.chunks(throttle.chunk_size()) {
            let started = Instant::now();
            match self.run_job(batch.as_ref(), chunk).await {
                Ok(responses) => out.extend(responses),
                Err(e) => {
                    error!("Batch job failed: {}", e);
                    out.extend(std::iter::repeat(String::new()).take(chunk.len()));
                }
            }
            throttle.pace(started).await;
        }
        Ok(out)
    }

    /// Request lines with zero-padded ids in prompt order
    pub fn batch_items(&self, prompts: &[String]) -> Vec<BatchItem> {
        let width = prompts.len().saturating_sub(1).to_string().len().max(10);
        info!("Creating batch with {} items", prompts.len());
        prompts
            .iter()
            .enumerate()
            .map(|(idx, prompt)| {
                let mut body = match &self.request_template {
                    Value::Object(map) => map.clone(),
                    _ => serde_json::Map::new(),
                };
                body.insert(
                    "messages".to_string(),
                    serde_json::json!([{"role": "user", "content": prompt}]),
                );
                BatchItem {
                    custom_id: format!("{idx:0width$}"),
                    method: "POST".to_string(),
                    url: self.endpoint.clone(),
                    body: Value::Object(body),
                }
            })
            .collect()
    }

    async fn run_job(
        &self,
        batch: &dyn BatchBackend,
        prompts: &[String],
    ) -> Result<Vec<String>, CompletionError> {
        let items = self.batch_items(prompts);
        let mut job = batch.submit(&items).await?;

        while job.status.is_pending() {
            tokio::time::sleep(self.poll_interval).await;
            match batch.poll(&job).await {
                Ok(latest) => {
                    info!("Completion status: {:?}", latest.status);
                    job = latest;
                }
                Err(e) => warn!("Polling batch {} failed, retrying: {}", job.id, e),
            }
        }
        info!("Batch {} finished with status {:?}", job.id, job.status);

        let fetched = if job.output_file_id.is_some()
            && job.status == crate::backend::BatchStatus::Completed
        {
            batch.fetch(&job).await
        } else {
            Ok(Vec::new())
        };

        if let Err(e) = batch.cleanup(&job).await {
            warn!("Failed to clean up batch {}: {}", job.id, e);
        }

        Ok(reorder(&items, fetched?))
    }
}

/// Responses in submission order; missing or failed ids become empty strings
fn reorder(items: &[BatchItem], responses: Vec<BatchResponse>) -> Vec<String> {
    let mut by_id: HashMap<String, String> = responses
        .into_iter()
        .filter(|r| r.status_code == 200)
        .map(|r| (r.custom_id, r.content))
        .collect();
    let mut ids: Vec<&str> = items.iter().map(|i| i.custom_id.as_str()).collect();
    ids.sort_unstable();
    ids.into_iter()
        .map(|id| by_id.remove(id).unwrap_or_default())
        .collect()
}

/// Splits work into chunks of at most `per_minute` items and waits out the
/// rest of the minute after every chunk but the last
struct Throttle {
    chunk_size: usize,
    chunk_count: usize,
    done: usize,
}

impl Throttle {
    fn new(items: usize, per_minute: usize) -> Self {
        let chunk_size = per_minute.max(1);
        Self {
            chunk_size,
            chunk_count: items.div_ceil(chunk_size),
            done: 0,
        }
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Call once per finished chunk with the instant the chunk started
    async fn pace(&mut self, started: Instant) {
        self.done += 1;
        let elapsed = started.elapsed();
        if self.done < self.chunk_count && elapsed < THROTTLE_WINDOW {
            let remaining = THROTTLE_WINDOW - elapsed;
            info!(
                "Chunk {}/{} done, waiting {:.1}s for the rate limit",
                self.done,
                self.chunk_count,
                remaining.as_secs_f64()
            );
            tokio::time::sleep(remaining).await;
        }
    }
}
