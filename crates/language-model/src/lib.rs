//! Language-model plugins
//!
//! Both plugins send prompts for the records an upstream keyword filter kept
//! and record the answers in their own slot.

pub mod filter;
pub mod prompt;
pub mod translator;

pub use filter::{LanguageModelBasedKeywordsFilter, LanguageModelFilterConfig, LanguageModelFilterData};
pub use translator::{TranslationData, TranslatorConfig, TranslatorWithDefaultKeywordsFilter};

use paper_digest_completion::{client_for_model, CompletionClient, ModelCatalog};
use paper_digest_core::PluginError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// How a plugin sends its prompts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionMode {
    /// One request at a time, in order
    #[default]
    Single,

    /// Worker pool under a requests-per-minute budget
    Concurrent,

    /// Asynchronous batch jobs
    Batch,
}

pub(crate) fn default_models_config() -> PathBuf {
    PathBuf::from("config/models.yaml")
}

pub(crate) fn default_max_workers() -> usize {
    16
}

pub(crate) fn default_requests_per_minute() -> usize {
    16
}

/// Build a completion client for `model` from the catalog at `models_config`
pub fn load_client(model: &str, models_config: &Path) -> Result<CompletionClient, PluginError> {
    let catalog = ModelCatalog::from_yaml_file(models_config)
        .map_err(|e| PluginError::InvalidInput(e.to_string()))?;
    let profile = catalog
        .get(model)
        .map_err(|e| PluginError::InvalidInput(e.to_string()))?;
    info!("Using model {} ({})", model, profile.base_url);
    client_for_model(profile.clone()).map_err(|e| PluginError::InvalidInput(e.to_string()))
}

/// Complete a prompt list with the chosen strategy, one response per prompt
pub async fn complete_all(
    client: &CompletionClient,
    mode: CompletionMode,
    prompts: &[String],
    max_workers: usize,
    requests_per_minute: usize,
) -> Result<Vec<String>, PluginError> {
    match mode {
        CompletionMode::Single => Ok(client.complete_sequential(prompts).await),
        CompletionMode::Concurrent => Ok(client
            .complete_concurrent(prompts, max_workers, requests_per_minute)
            .await),
        CompletionMode::Batch => client
            .complete_batch(prompts, requests_per_minute)
            .await
            .map_err(|e| PluginError::ExecutionFailed(e.to_string())),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use paper_digest_completion::{CompletionBackend, CompletionClient, CompletionError};
    use std::sync::{Arc, Mutex};

    /// Answers with a fixed reply for prompts containing a needle, and records prompts
    pub(crate) struct Scripted {
        pub(crate) rules: Vec<(String, String)>,
        pub(crate) seen: Mutex<Vec<String>>,
    }

    impl Scripted {
        pub(crate) fn client(rules: &[(&str, &str)]) -> (CompletionClient, Arc<Scripted>) {
            let backend = Arc::new(Scripted {
                rules: rules
                    .iter()
                    .map(|(n, r)| (n.to_string(), r.to_string()))
                    .collect(),
                seen: Mutex::new(Vec::new()),
            });
            (CompletionClient::new(backend.clone()), backend)
        }

        pub(crate) fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionBackend for Scripted {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            self.seen.lock().unwrap().push(prompt.to_string());
            Ok(self
                .rules
                .iter()
                .find(|(needle, _)| prompt.contains(needle.as_str()))
                .map(|(_, reply)| reply.clone())
                .unwrap_or_else(|| "**RESULT: FALSE**".to_string()))
        }
    }
}
