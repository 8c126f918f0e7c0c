//! Result persistence and Markdown digests

use crate::downloader::sanitize_title;
use crate::table::{make_table, MarkdownTableData};
use crate::{digest_front_matter, PAPER_SPLIT_LINE};
use async_trait::async_trait;
use paper_digest_core::io::save_jsonl;
use paper_digest_core::{
    ConfigurablePlugin, GlobalContext, Plugin, PluginConfig, PluginError, Record,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const NAVIGATION: &str = r##"
```dataviewjs
const folder = dv.current().file.folder;

let files = (
    dv.pages(`"${folder}"`)
    .where(p => !p.file.name.includes("_Navigation"))
    .sort(p => p.file.name)
    .map(p => [
        p.file.link + " (" + p.counts.toString() + ")"
    ]))

let num_cols = 3
let num_items = files.length
let reshaped = []

for (let i=0; i < num_items; i += num_cols){
    reshaped.push(files.slice(i, i+num_cols));
}

dv.table(["#_hide_header ", "#_hide_header ", "#_hide_header "],
    reshaped
);
```

"##;

#[derive(Debug, Clone, Deserialize)]
pub struct ResultSaverConfig {
    /// Receives `results.jsonl` and `papers.txt`
    pub output_directory: PathBuf,

    /// Receives `papers.md`, the per-keyword pages and `_Navigation.md`
    pub markdown_directory: PathBuf,

    /// Keyword-filter slot whose keywords decide the per-keyword pages
    #[serde(default = "default_keywords_filter")]
    pub keywords_filter: String,
}

fn default_keywords_filter() -> String {
    "DefaultKeywordsFilter".to_string()
}

pub struct ResultSaver {
    config: PluginConfig,
    settings: ResultSaverConfig,
}

impl ResultSaver {
    pub fn new(settings: ResultSaverConfig) -> Self {
        Self {
            config: PluginConfig::new(<Self as ConfigurablePlugin>::NAME),
            settings,
        }
    }

    fn save_text(&self, records: &[Record]) -> Result<(), PluginError> {
        let path = self.settings.output_directory.join("papers.txt");
        info!("Saving text to {}", path.display());
        let text: String = records
            .iter()
            .enumerate()
            .map(|(idx, record)| format_record(record, Some(idx)))
            .collect();
        fs::write(path, text)?;
        Ok(())
    }

    fn save_table(&self, records: &[Record], table: &str) -> Result<(), PluginError> {
        let path = self.settings.markdown_directory.join("papers.md");
        info!("Saving markdown table to {}", path.display());
        fs::write(path, format!("{}{}", digest_front_matter(records.len()), table))?;
        Ok(())
    }

    fn save_by_keywords(&self, records: &[Record]) -> Result<(), PluginError> {
        for (keyword, papers) in group_by_keyword(records, &self.settings.keywords_filter) {
            info!("Saving {} results for keyword: {}", papers.len(), keyword);
            let blocks: String = papers.iter().map(|r| format_record(r, None)).collect();
            let content = format!(
                "{}{}\n\n# Abstract\n{}",
                digest_front_matter(papers.len()),
                make_table(papers.iter().copied()),
                blocks
            );
            let path = self
                .settings
                .markdown_directory
                .join(format!("papers @ {}.md", sanitize_title(&keyword)));
            fs::write(path, content)?;
        }
        Ok(())
    }

    fn save_navigation(&self) -> Result<(), PluginError> {
        let path = self.settings.markdown_directory.join("_Navigation.md");
        info!("Making navigation list at {}", path.display());
        let date = navigation_date(&self.settings.markdown_directory);
        fs::write(path, format!("---\ndate: {date}\n---\n\n{NAVIGATION}"))?;
        Ok(())
    }
}

/// Records per keyword of the `filter` slot, leaving out keywords that slot
/// ignores. Records without the slot are on no page.
pub fn group_by_keyword<'a>(records: &'a [Record], filter: &str) -> BTreeMap<String, Vec<&'a Record>> {
    let mut groups: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
    for record in records {
        let Some(view) = record.slot(filter).and_then(|s| s.keywords_filter()) else {
            continue;
        };
        let mut kept: Vec<&String> = view
            .keywords
            .iter()
            .filter(|k| !view.ignorance.contains(*k))
            .collect();
        kept.sort();
        kept.dedup();
        for keyword in kept {
            groups.entry(keyword.clone()).or_default().push(record);
        }
    }
    groups
}

/// One paper block of the text and Markdown digests
pub fn format_record(record: &Record, index: Option<usize>) -> String {
    let items: Vec<&str> = record
        .slots()
        .filter(|s| s.save_as_item)
        .map(|s| s.render())
        .collect();
    let texts: Vec<&str> = record
        .slots()
        .filter(|s| s.save_as_text)
        .map(|s| s.render())
        .collect();

    let block = format!(
        "\n{split}\n## {title}\n\
         - authors: {authors}\n\
         - categories: {categories}\n\
         - comment: {comment}\n\
         - doi: {doi}\n\
         - updated date: {updated}\n\
         - publish date: {published}\n\
         - primary category: {primary}\n\
         - journal reference: {journal}\n\
         - paper pdf link: {pdf}\n\
         - paper abstract link: {abs}\n\
         {items}\n\n\
         ### ABSTRACT\n{summary}\n\n{texts}\n\n",
        split = PAPER_SPLIT_LINE,
        title = record.title,
        authors = record.authors.join(", "),
        categories = record.categories.join(", "),
        comment = record.comment.as_deref().unwrap_or(""),
        doi = record.doi.as_deref().unwrap_or(""),
        updated = record.updated.format("%Y-%m-%d %H:%M:%S"),
        published = record.published.format("%Y-%m-%d %H:%M:%S"),
        primary = record.primary_category,
        journal = record.journal_ref.as_deref().unwrap_or(""),
        pdf = record.pdf_link(),
        abs = record.entry_id(),
        items = items.join("\n"),
        summary = record.summary,
        texts = texts.join("\n\n"),
    );
    match index {
        Some(idx) => format!("Index: {idx}\n{block}"),
        None => block,
    }
}

/// `YYYY-MM-DD` from a date-stamped directory name, or the name unchanged
fn navigation_date(dir: &Path) -> String {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if name.len() == 8 && name.chars().all(|c| c.is_ascii_digit()) {
        format!("{}-{}-{}", &name[..4], &name[4..6], &name[6..])
    } else {
        name
    }
}

impl ConfigurablePlugin for ResultSaver {
    const NAME: &'static str = "ResultSaver";
    type Config = ResultSaverConfig;

    fn from_config(config: PluginConfig, settings: Self::Config) -> Result<Self, PluginError> {
        Ok(Self { config, settings })
    }
}

#[async_trait]
impl Plugin for ResultSaver {
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
        info!("Saving {} results...", records.len());
        fs::create_dir_all(&self.settings.output_directory)?;
        fs::create_dir_all(&self.settings.markdown_directory)?;

        save_jsonl(&self.settings.output_directory.join("results.jsonl"), &records)?;
        if let Some(data) = ctx.slot_data::<MarkdownTableData>() {
            self.save_table(&records, &data.table)?;
        }
        self.save_text(&records)?;
        self.save_by_keywords(&records)?;
        self.save_navigation()?;
        Ok(records)
    }
}
