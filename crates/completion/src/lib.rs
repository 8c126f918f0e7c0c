//! Language-model completion for paper digest plugins
//!
//! Single prompts retry with exponential backoff and degrade to an empty
//! string. Prompt lists can be completed sequentially, concurrently under a
//! requests-per-minute budget, or as asynchronous batch jobs. All strategies
//! keep one response per prompt in prompt order.

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod openai;

pub use backend::{BatchBackend, BatchItem, BatchJob, BatchResponse, BatchStatus, CompletionBackend};
pub use client::{CompletionClient, RetryPolicy, THROTTLE_WINDOW};
pub use config::{ModelCatalog, ModelConfig};
pub use error::CompletionError;
pub use openai::{client_for_model, OpenAiBackend};
