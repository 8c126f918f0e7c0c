//! Reads the reader's checklist edits back from the per-keyword pages

use crate::checklist::{CATEGORY_PREFIX, JOURNAL_PREFIX, TAGS_PREFIX};
use crate::table::code_link;
use crate::PAPER_SPLIT_LINE;
use async_trait::async_trait;
use paper_digest_core::{
    ConfigurablePlugin, GlobalContext, Plugin, PluginConfig, PluginError, Record,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Download request parsed from one ticked paper block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadRequest {
    pub tags: Vec<String>,
    pub category: String,
    pub journal: String,
    pub pdf_link: String,
    pub code_link: String,
}

/// Paper blocks of a digest page, front matter and table dropped
pub fn paper_blocks(markdown: &str) -> impl Iterator<Item = &str> {
    markdown.split(PAPER_SPLIT_LINE).skip(1)
}

/// Parse a block whose download box is ticked; `None` for unticked blocks
pub fn parse_request(block: &str) -> Option<DownloadRequest> {
    if !block.to_lowercase().contains("- [x] [downloader] download") {
        return None;
    }
    let tags = last_value(block, TAGS_PREFIX)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Some(DownloadRequest {
        tags,
        category: last_value(block, CATEGORY_PREFIX).unwrap_or_default(),
        journal: last_value(block, JOURNAL_PREFIX).unwrap_or_default(),
        pdf_link: labelled(block, "paper pdf link"),
        code_link: labelled(block, "code link"),
    })
}

/// Trimmed remainder of the last line containing `prefix`
fn last_value(block: &str, prefix: &str) -> Option<String> {
    block
        .lines()
        .filter(|line| line.contains(prefix))
        .last()
        .map(|line| line.replacen(prefix, "", 1).trim().to_string())
}

/// Value after `label:` on the last line mentioning the label
fn labelled(block: &str, label: &str) -> String {
    block
        .lines()
        .filter(|line| line.to_lowercase().contains(label))
        .last()
        .and_then(|line| line.split(label).last())
        .map(|rest| rest.trim_start_matches(':').trim().to_string())
        .unwrap_or_default()
}

/// arXiv id without version, e.g. `2401.00001` for `.../pdf/2401.00001v2`
pub fn paper_id(link: &str) -> &str {
    let last = link.trim_end_matches('/').rsplit('/').next().unwrap_or(link);
    last.split('v').next().unwrap_or(last)
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkdownMetainfoParserConfig {
    /// Directory holding the `papers @ <keyword>.md` pages
    pub markdown_directory: PathBuf,
}

pub struct MarkdownMetainfoParser {
    config: PluginConfig,
    settings: MarkdownMetainfoParserConfig,
}

impl MarkdownMetainfoParser {
    pub fn new(settings: MarkdownMetainfoParserConfig) -> Self {
        Self {
            config: PluginConfig::new(<Self as ConfigurablePlugin>::NAME),
            settings,
        }
    }

    fn keyword_pages(&self) -> Result<Vec<PathBuf>, PluginError> {
        let mut pages: Vec<PathBuf> = fs::read_dir(&self.settings.markdown_directory)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_keyword_page(path))
            .collect();
        pages.sort();
        Ok(pages)
    }
}

fn is_keyword_page(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    name.contains('@') && name.ends_with(".md")
}

fn apply(records: &mut [Record], request: &DownloadRequest) -> Result<(), PluginError> {
    let id = paper_id(&request.pdf_link);
    let record = records
        .iter_mut()
        .find(|r| !id.is_empty() && r.entry_id().contains(id))
        .ok_or_else(|| {
            PluginError::InvalidInput(format!("Paper not found for link: {}", request.pdf_link))
        })?;

    let link = if request.code_link.is_empty() {
        code_link(record)
    } else {
        request.code_link.clone()
    };
    let mut patch = Map::new();
    patch.insert("tags".to_string(), json!(request.tags));
    patch.insert("category".to_string(), json!(request.category));
    patch.insert("journal".to_string(), json!(request.journal));
    patch.insert("code_link".to_string(), Value::String(link));
    patch.insert("id".to_string(), json!(id));
    patch.insert("download".to_string(), Value::Bool(true));
    record.metainfo.update_from(&patch)?;
    debug!("Marked {} for download", record.entry_id());
    Ok(())
}

impl ConfigurablePlugin for MarkdownMetainfoParser {
    const NAME: &'static str = "MarkdownMetainfoParser";
    type Config = MarkdownMetainfoParserConfig;

    fn from_config(config: PluginConfig, settings: Self::Config) -> Result<Self, PluginError> {
        Ok(Self { config, settings })
    }
}

#[async_trait]
impl Plugin for MarkdownMetainfoParser {
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
        let mut requested = 0;
        for page in self.keyword_pages()? {
            info!("Parsing {}", page.display());
            let markdown = fs::read_to_string(&page)?;
            for request in paper_blocks(&markdown).filter_map(parse_request) {
                apply(&mut records, &request)?;
                requested += 1;
            }
        }
        info!("Found {} download requests", requested);
        Ok(records)
    }
}
