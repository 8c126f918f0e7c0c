//! Markdown overview table

use async_trait::async_trait;
use paper_digest_core::{
    ConfigurablePlugin, GlobalContext, Plugin, PluginConfig, PluginError, Record, SlotData,
    SlotScope,
};
use paper_digest_links::GitHubLinkData;
use serde::{Deserialize, Serialize};
use tracing::info;

const HEADERS: [&str; 4] = ["title", "primary category", "paper abstract link", "code link"];

/// Context slot holding the rendered table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownTableData {
    pub table: String,
}

impl SlotData for MarkdownTableData {
    const PLUGIN_NAME: &'static str = "MarkdownTableMaker";
    const SCOPE: SlotScope = SlotScope::Global;
}

/// Render the overview table, one row per record in input order
pub fn make_table<'a>(records: impl IntoIterator<Item = &'a Record>) -> String {
    let mut table = format!("| Index | {} |\n", HEADERS.join(" | "));
    table.push_str(&format!("| --- | {} |\n", vec!["---"; HEADERS.len()].join(" | ")));
    for (idx, record) in records.into_iter().enumerate() {
        table.push_str(&format!(
            "| {} | [[#{}]] | {} | {} | {} |\n",
            idx + 1,
            record.title,
            record.primary_category,
            record.entry_id(),
            code_link(record)
        ));
    }
    table
}

pub(crate) fn code_link(record: &Record) -> String {
    record
        .slot_data::<GitHubLinkData>()
        .ok()
        .flatten()
        .map(|data| data.code_link)
        .unwrap_or_default()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkdownTableMakerConfig {}

pub struct MarkdownTableMaker {
    config: PluginConfig,
}

impl MarkdownTableMaker {
    pub fn new() -> Self {
        Self {
            config: PluginConfig::new(<Self as ConfigurablePlugin>::NAME),
        }
    }
}

impl Default for MarkdownTableMaker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurablePlugin for MarkdownTableMaker {
    const NAME: &'static str = "MarkdownTableMaker";
    type Config = MarkdownTableMakerConfig;

    fn from_config(config: PluginConfig, _settings: Self::Config) -> Result<Self, PluginError> {
        Ok(Self { config })
    }
}

#[async_trait]
impl Plugin for MarkdownTableMaker {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn config(&self) -> &PluginConfig {
        &self.config
    }

    async fn process(
        &self,
        records: Vec<Record>,
        ctx: &mut GlobalContext,
    ) -> Result<Vec<Record>, PluginError> {
        info!("Making table for {} papers", records.len());
        ctx.set_slot(&MarkdownTableData {
            table: make_table(&records),
        })?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_table_lands_in_context() {
        let mut linked = Record::new("http://arxiv.org/abs/1").with_title("Linked");
        linked.primary_category = "cs.CV".to_string();
        linked
            .add_slot(&GitHubLinkData {
                code_link: "https://github.com/a/b".to_string(),
            })
            .unwrap();
        let records = vec![linked, Record::new("http://arxiv.org/abs/2").with_title("Plain")];

        let mut ctx = GlobalContext::new();
        let out = MarkdownTableMaker::new().process(records, &mut ctx).await.unwrap();
        assert_eq!(out.len(), 2);

        let table = ctx.slot_data::<MarkdownTableData>().unwrap().table;
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(
            lines[0],
            "| Index | title | primary category | paper abstract link | code link |"
        );
        assert_eq!(lines[1], "| --- | --- | --- | --- | --- |");
        assert_eq!(
            lines[2],
            "| 1 | [[#Linked]] | cs.CV | http://arxiv.org/abs/1 | https://github.com/a/b |"
        );
        assert_eq!(lines[3], "| 2 | [[#Plain]] |  | http://arxiv.org/abs/2 |  |");
    }
}
