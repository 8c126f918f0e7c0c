//! Error types for the plugin system

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Plugin execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Record {entry_id} has no data from upstream plugin '{plugin}'")]
    MissingUpstream { entry_id: String, plugin: String },

    #[error("Slot error: {0}")]
    Slot(#[from] SlotError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum SlotError {
    #[error("Slot '{plugin}' does not match its declared shape: {source}")]
    Malformed {
        plugin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Slot data for '{0}' must serialize to a JSON object")]
    NotAnObject(String),
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("No plugin registered under name: {0}")]
    PluginNotFound(String),

    #[error("Plugin name registered twice: {0}")]
    DuplicatePlugin(String),

    #[error("Invalid configuration for plugin '{plugin}': {reason}")]
    InvalidConfig { plugin: String, reason: String },

    #[error("Failed to read config file {path}: {source}")]
    ConfigFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Plugin error: {0}")]
    PluginError(#[from] PluginError),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("{count} dependency violation(s), first: {first}")]
    DependencyViolations { count: usize, first: String },

    #[error("Plugin '{plugin}' failed: {source}")]
    Plugin {
        plugin: String,
        #[source]
        source: PluginError,
    },
}
