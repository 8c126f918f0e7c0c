//! Error types for completion calls

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Completion API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Completion response has no content")]
    EmptyResponse,

    #[error("No model profile named '{0}'")]
    UnknownModel(String),

    #[error("Environment variable {0} holding the API key is not set")]
    MissingApiKey(String),

    #[error("Backend does not support batch jobs")]
    BatchUnsupported,

    #[error("Failed to read model config {path}: {source}")]
    ConfigFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
