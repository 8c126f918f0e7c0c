//! Daily index page over downloaded paper notes

use async_trait::async_trait;
use paper_digest_core::{
    ConfigurablePlugin, GlobalContext, Plugin, PluginConfig, PluginError, Record,
};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

const INDEX_TEMPLATE: &str = r#"---
date: {year}-{month}-{day}
---

# <center>UnRead</center>

```dataview
TABLE WITHOUT ID
    file.link AS Title,
    file.tags AS tags
FROM "{folder}"
SORT file.link
WHERE Date.year = {year} AND Date.month = {month} AND Date.day = {day} AND DONE = false
```


# <center>Read</center>

```dataview
TABLE WITHOUT ID
    file.link AS Title,
    file.tags AS tags
FROM "{folder}"
SORT file.link
WHERE Date.year = {year} AND Date.month = {month} AND Date.day = {day} AND DONE = true
```

"#;

fn default_indexing_directory() -> PathBuf {
    PathBuf::from("indexing")
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexGeneratorConfig {
    /// `YYYYMMDD`
    pub date: String,

    #[serde(default = "default_indexing_directory")]
    pub indexing_directory: PathBuf,

    /// Note folders the queries read from
    #[serde(default)]
    pub papers_note_folders: Vec<String>,

    /// Used when `papers_note_folders` is empty
    #[serde(default)]
    pub paper_note_folder: Option<PathBuf>,
}

pub struct DownloadedPaperIndexGenerator {
    config: PluginConfig,
    settings: IndexGeneratorConfig,
}

impl DownloadedPaperIndexGenerator {
    pub fn new(settings: IndexGeneratorConfig) -> Self {
        Self {
            config: PluginConfig::new(<Self as ConfigurablePlugin>::NAME),
            settings,
        }
    }

    fn folders(&self) -> Vec<String> {
        if !self.settings.papers_note_folders.is_empty() {
            return self.settings.papers_note_folders.clone();
        }
        self.settings
            .paper_note_folder
            .iter()
            .map(|p| p.display().to_string())
            .collect()
    }

    /// Index page for the configured date
    pub fn render(&self) -> Result<(String, String), PluginError> {
        let date = &self.settings.date;
        if date.len() < 8 || !date.is_char_boundary(8) || !date[..8].chars().all(|c| c.is_ascii_digit()) {
            return Err(PluginError::InvalidInput(format!("date must be YYYYMMDD, got '{date}'")));
        }
        let (year, month, day) = (&date[..4], &date[4..6], &date[6..8]);
        let content = INDEX_TEMPLATE
            .replace("{folder}", &self.folders().join("\" OR \""))
            .replace("{year}", year)
            .replace("{month}", month)
            .replace("{day}", day);
        Ok((format!("{year}-{month}-{day}.md"), content))
    }
}

impl ConfigurablePlugin for DownloadedPaperIndexGenerator {
    const NAME: &'static str = "DownloadedPaperIndexGenerator";
    type Config = IndexGeneratorConfig;

    fn from_config(config: PluginConfig, settings: Self::Config) -> Result<Self, PluginError> {
        Ok(Self { config, settings })
    }
}

#[async_trait]
impl Plugin for DownloadedPaperIndexGenerator {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn config(&self) -> &PluginConfig {
        &self.config
    }

    async fn process(
        &self,
        records: Vec<Record>,
        _ctx: &mut GlobalContext,
    ) -> Result<Vec<Record>, PluginError> {
        info!("Generating indexing files for date: {}", self.settings.date);
        let (file_name, content) = self.render()?;
        fs::create_dir_all(&self.settings.indexing_directory)?;
        let path = self.settings.indexing_directory.join(file_name);
        info!("Writing indexing file to {}", path.display());
        fs::write(path, content)?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(date: &str, dir: PathBuf, folders: &[&str]) -> DownloadedPaperIndexGenerator {
        DownloadedPaperIndexGenerator::new(IndexGeneratorConfig {
            date: date.to_string(),
            indexing_directory: dir,
            papers_note_folders: folders.iter().map(|f| f.to_string()).collect(),
            paper_note_folder: Some(PathBuf::from("notes")),
        })
    }

    #[tokio::test]
    async fn test_writes_dated_page() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = generator("20240102", dir.path().to_path_buf(), &["Papers/CV", "Papers/NLP"]);

        let out = plugin
            .process(vec![Record::new("a")], &mut GlobalContext::new())
            .await
            .unwrap();
        assert_eq!(out.len(), 1);

        let page = fs::read_to_string(dir.path().join("2024-01-02.md")).unwrap();
        assert!(page.starts_with("---\ndate: 2024-01-02\n---\n"));
        assert!(page.contains("FROM \"Papers/CV\" OR \"Papers/NLP\"\n"));
        assert!(page.contains("Date.year = 2024 AND Date.month = 01 AND Date.day = 02 AND DONE = true"));
    }

    #[test]
    fn test_falls_back_to_note_folder() {
        let (_, page) = generator("20240102", PathBuf::from("idx"), &[]).render().unwrap();
        assert!(page.contains("FROM \"notes\"\n"));
    }

    #[test]
    fn test_rejects_malformed_date() {
        assert!(generator("2024", PathBuf::from("idx"), &[]).render().is_err());
        assert!(generator("2024-01-02", PathBuf::from("idx"), &[]).render().is_err());
    }
}
