//! Topic classification by a language model

use crate::prompt::{classification_prompt, is_accepted};
use crate::{
    complete_all, default_max_workers, default_models_config, default_requests_per_minute,
    load_client, CompletionMode,
};
use async_trait::async_trait;
use paper_digest_completion::CompletionClient;
use paper_digest_core::{
    requires_processing, ConfigurablePlugin, GlobalContext, OrderedMap, Plugin, PluginConfig,
    PluginError, Record, SlotData,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info};

/// Slot written by [`LanguageModelBasedKeywordsFilter`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageModelFilterData {
    pub keywords: Vec<String>,
    pub ignorance: Vec<String>,
}

impl SlotData for LanguageModelFilterData {
    const PLUGIN_NAME: &'static str = "LanguageModelBasedKeywordsFilter";
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageModelFilterConfig {
    /// Profile name in the model catalog
    pub model: String,

    #[serde(default = "default_models_config")]
    pub models_config: PathBuf,

    #[serde(default)]
    pub mode: CompletionMode,

    /// Keyword to the topic description the model is asked about, asked in
    /// the order listed
    #[serde(default)]
    pub interested_topics: OrderedMap<String>,

    /// Keyword to a topic that vetoes the match
    #[serde(default)]
    pub discarded_topics: OrderedMap<String>,

    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: usize,
}

pub struct LanguageModelBasedKeywordsFilter {
    config: PluginConfig,
    settings: LanguageModelFilterConfig,
    client: CompletionClient,
}

impl LanguageModelBasedKeywordsFilter {
    /// Create a filter over an already-built completion client
    pub fn with_client(
        config: PluginConfig,
        settings: LanguageModelFilterConfig,
        client: CompletionClient,
    ) -> Self {
        Self {
            config,
            settings,
            client,
        }
    }

    fn discarded(&self, keyword: &str) -> &str {
        self.settings
            .discarded_topics
            .get(keyword)
            .map(String::as_str)
            .unwrap_or("")
    }

    async fn classify_one_by_one(
        &self,
        records: &mut [Record],
        targets: &[usize],
    ) -> Result<(), PluginError> {
        let total = targets.len();
        for (keyword, interested) in self.settings.interested_topics.iter() {
            info!("Processing {}...", interested);
            for (i, &idx) in targets.iter().enumerate() {
                debug!("Processing {}-th of {} paper of keyword {}...", i + 1, total, keyword);
                let prompt = classification_prompt(&records[idx], interested, self.discarded(keyword));
                let response = self.client.complete_single(&prompt).await;
                let accepted = is_accepted(&response);
                info!(
                    "{}: Keyword {} in {}",
                    if accepted { "TRUE" } else { "FALSE" },
                    keyword,
                    records[idx].title
                );
                if accepted {
                    add_keyword(&mut records[idx], keyword)?;
                }
            }
        }
        Ok(())
    }

    async fn classify_together(
        &self,
        records: &mut [Record],
        targets: &[usize],
    ) -> Result<(), PluginError> {
        let total = targets.len();
        info!("Processing {} results in {:?} mode...", total, self.settings.mode);

        let mut prompts = Vec::with_capacity(total * self.settings.interested_topics.len());
        for (keyword, interested) in self.settings.interested_topics.iter() {
            info!("Creating prompts related to {}...", interested);
            let discarded = self.discarded(keyword);
            prompts.extend(
                targets
                    .iter()
                    .map(|&idx| classification_prompt(&records[idx], interested, discarded)),
            );
        }

        let responses = complete_all(
            &self.client,
            self.settings.mode,
            &prompts,
            self.settings.max_workers,
            self.settings.requests_per_minute,
        )
        .await?;

        let keywords: Vec<&String> = self.settings.interested_topics.keys().collect();
        for (i, response) in responses.iter().enumerate() {
            if is_accepted(response) {
                add_keyword(&mut records[targets[i % total]], keywords[i / total])?;
            }
        }
        Ok(())
    }
}

fn add_keyword(record: &mut Record, keyword: &str) -> Result<(), PluginError> {
    record.update_slot(|data: &mut LanguageModelFilterData| {
        if !data.keywords.iter().any(|k| k == keyword) {
            data.keywords.push(keyword.to_string());
        }
    })?;
    Ok(())
}

impl ConfigurablePlugin for LanguageModelBasedKeywordsFilter {
    const NAME: &'static str = "LanguageModelBasedKeywordsFilter";
    type Config = LanguageModelFilterConfig;

    fn from_config(config: PluginConfig, settings: Self::Config) -> Result<Self, PluginError> {
        let client = load_client(&settings.model, &settings.models_config)?;
        Ok(Self::with_client(config, settings, client))
    }
}

#[async_trait]
impl Plugin for LanguageModelBasedKeywordsFilter {
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
        for record in &mut records {
            record.ensure_slot::<LanguageModelFilterData>()?;
        }

        let interested: BTreeSet<String> = self.settings.interested_topics.keys().cloned().collect();
        let targets: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| requires_processing(r, LanguageModelFilterData::PLUGIN_NAME, &interested))
            .map(|(idx, _)| idx)
            .collect();
        if targets.is_empty() || interested.is_empty() {
            info!("No papers require classification");
            return Ok(records);
        }

        match self.settings.mode {
            CompletionMode::Single => self.classify_one_by_one(&mut records, &targets).await?,
            CompletionMode::Concurrent | CompletionMode::Batch => {
                self.classify_together(&mut records, &targets).await?
            }
        }
        Ok(records)
    }
}
