//! Download checklist attached to every paper in the digests
//!
//! The reader ticks the checkbox and fills in the tag, category and journal
//! lines; [`crate::MarkdownMetainfoParser`] reads them back.

use async_trait::async_trait;
use paper_digest_core::{
    ConfigurablePlugin, GlobalContext, Plugin, PluginConfig, PluginError, Record, SlotData,
};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const CHECKBOX_LINE: &str = "- [ ] [Downloader] Download";
pub const TAGS_PREFIX: &str = "- [Downloader] Tags: ";
pub const CATEGORY_PREFIX: &str = "- [Downloader] Category: ";
pub const JOURNAL_PREFIX: &str = "- [Downloader] Journal: ";

/// Slot rendered as checklist items under each paper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadChecklistData {
    pub checkbox: String,
    pub tags: String,
    pub category: String,
    pub journal: String,
}

impl Default for DownloadChecklistData {
    fn default() -> Self {
        Self {
            checkbox: CHECKBOX_LINE.to_string(),
            tags: TAGS_PREFIX.to_string(),
            category: CATEGORY_PREFIX.to_string(),
            journal: JOURNAL_PREFIX.to_string(),
        }
    }
}

impl SlotData for DownloadChecklistData {
    const PLUGIN_NAME: &'static str = "DownloadInformationCollector";
    const SAVE_AS_ITEM: bool = true;

    fn render(&self) -> String {
        [
            self.checkbox.as_str(),
            self.tags.as_str(),
            self.category.as_str(),
            self.journal.as_str(),
        ]
        .join("\n")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadInformationCollectorConfig {}

pub struct DownloadInformationCollector {
    config: PluginConfig,
}

impl DownloadInformationCollector {
    pub fn new() -> Self {
        Self {
            config: PluginConfig::new(<Self as ConfigurablePlugin>::NAME),
        }
    }
}

impl Default for DownloadInformationCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurablePlugin for DownloadInformationCollector {
    const NAME: &'static str = "DownloadInformationCollector";
    type Config = DownloadInformationCollectorConfig;

    fn from_config(config: PluginConfig, _settings: Self::Config) -> Result<Self, PluginError> {
        Ok(Self { config })
    }
}

#[async_trait]
impl Plugin for DownloadInformationCollector {
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
            record.ensure_slot::<DownloadChecklistData>()?;
        }
        info!("Attached download checklists to {} papers", records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_checklist_renders_as_item() {
        let mut ctx = GlobalContext::new();
        let plugin = DownloadInformationCollector::new();
        let once = plugin.process(vec![Record::new("a")], &mut ctx).await.unwrap();
        let twice = plugin.process(once, &mut ctx).await.unwrap();

        assert_eq!(twice[0].local_plugin_data.len(), 1);
        let slot = twice[0].slot("DownloadInformationCollector").unwrap();
        assert!(slot.save_as_item);
        assert_eq!(
            slot.render(),
            "- [ ] [Downloader] Download\n- [Downloader] Tags: \n- [Downloader] Category: \n- [Downloader] Journal: "
        );
    }
}
