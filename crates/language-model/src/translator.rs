//! Abstract translation for records an upstream keyword filter kept

use crate::prompt::translation_prompt;
use crate::{
    complete_all, default_max_workers, default_models_config, default_requests_per_minute,
    load_client, CompletionMode,
};
use async_trait::async_trait;
use paper_digest_completion::CompletionClient;
use paper_digest_core::{
    requires_processing, ConfigurablePlugin, GlobalContext, Plugin, PluginConfig, PluginError,
    Record, SlotData,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{info, warn};

/// Slot written by [`TranslatorWithDefaultKeywordsFilter`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationData {
    pub language: String,
    pub translation: String,
}

impl SlotData for TranslationData {
    const PLUGIN_NAME: &'static str = "TranslatorWithDefaultKeywordsFilter";
    const SAVE_AS_TEXT: bool = true;

    fn render(&self) -> String {
        if self.translation.is_empty() {
            return String::new();
        }
        format!("**ABSTRACT ({})**\n{}", self.language, self.translation)
    }
}

fn default_language() -> String {
    "Chinese".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslatorConfig {
    pub model: String,

    #[serde(default = "default_models_config")]
    pub models_config: PathBuf,

    #[serde(default = "default_language")]
    pub language: String,

    /// Keywords a record must carry upstream; empty means any kept keyword
    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub mode: CompletionMode,

    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: usize,
}

pub struct TranslatorWithDefaultKeywordsFilter {
    config: PluginConfig,
    settings: TranslatorConfig,
    client: CompletionClient,
}

impl TranslatorWithDefaultKeywordsFilter {
    pub fn with_client(config: PluginConfig, settings: TranslatorConfig, client: CompletionClient) -> Self {
        Self {
            config,
            settings,
            client,
        }
    }
}

impl ConfigurablePlugin for TranslatorWithDefaultKeywordsFilter {
    const NAME: &'static str = "TranslatorWithDefaultKeywordsFilter";
    const DEPENDENCIES: &'static [&'static str] = &["DefaultKeywordsFilter"];
    type Config = TranslatorConfig;

    fn from_config(config: PluginConfig, settings: Self::Config) -> Result<Self, PluginError> {
        let client = load_client(&settings.model, &settings.models_config)?;
        Ok(Self::with_client(config, settings, client))
    }
}

#[async_trait]
impl Plugin for TranslatorWithDefaultKeywordsFilter {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn config(&self) -> &PluginConfig {
        &self.config
    }

    async fn process(
        &self,
        mut records: Vec<Record>,
        _ctx: &mut GlobalContext,
    ) -> Result<Vec<Record>, PluginError> {
        let interested: BTreeSet<String> = self.settings.keywords.iter().cloned().collect();
        let targets: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| requires_processing(r, TranslationData::PLUGIN_NAME, &interested))
            .filter(|(_, r)| {
                r.slot_data::<TranslationData>()
                    .ok()
                    .flatten()
                    .map_or(true, |t| t.translation.is_empty() || t.language != self.settings.language)
            })
            .map(|(idx, _)| idx)
            .collect();
        if targets.is_empty() {
            info!("Nothing to translate");
            return Ok(records);
        }

        info!("Translating {} abstracts into {}", targets.len(), self.settings.language);
        let prompts: Vec<String> = targets
            .iter()
            .map(|&idx| translation_prompt(&records[idx], &self.settings.language))
            .collect();
        let responses = complete_all(
            &self.client,
            self.settings.mode,
            &prompts,
            self.settings.max_workers,
            self.settings.requests_per_minute,
        )
        .await?;

        for (&idx, translation) in targets.iter().zip(responses) {
            let record = &mut records[idx];
            if translation.is_empty() {
                warn!("No translation for {}", record.entry_id());
            }
            record.reset_slot(&TranslationData {
                language: self.settings.language.clone(),
                translation: translation.trim().to_string(),
            })?;
        }
        Ok(records)
    }
}
