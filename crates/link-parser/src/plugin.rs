//! Plugin wrapper for code-link extraction

use crate::{find_code_link, GitHubLinkData};
use async_trait::async_trait;
use paper_digest_core::{
    ConfigurablePlugin, GlobalContext, Plugin, PluginConfig, PluginError, Record,
};
use serde::Deserialize;
use tracing::{debug, info};

/// GitHubLinkParser takes no arguments beyond the common ones
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubLinkParserConfig {}

pub struct GitHubLinkParser {
    config: PluginConfig,
}

impl GitHubLinkParser {
    pub fn new() -> Self {
        Self {
            config: PluginConfig::new(<Self as ConfigurablePlugin>::NAME),
        }
    }
}

impl Default for GitHubLinkParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurablePlugin for GitHubLinkParser {
    const NAME: &'static str = "GitHubLinkParser";
    type Config = GitHubLinkParserConfig;

    fn from_config(config: PluginConfig, _settings: Self::Config) -> Result<Self, PluginError> {
        Ok(Self { config })
    }
}

#[async_trait]
impl Plugin for GitHubLinkParser {
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
        let mut found = 0;
        for record in &mut records {
            let link = find_code_link(record).unwrap_or_default();
            if !link.is_empty() {
                debug!("{} -> {}", record.entry_id(), link);
                found += 1;
            }
            record.update_slot(|data: &mut GitHubLinkData| data.code_link = link)?;
        }
        info!("Found code links for {}/{} papers", found, records.len());
        Ok(records)
    }
}
