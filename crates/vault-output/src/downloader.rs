//! Paper notes and PDF downloads for records marked by the reader

use async_trait::async_trait;
use paper_digest_core::{
    ConfigurablePlugin, GlobalContext, Plugin, PluginConfig, PluginError, Record,
};
use reqwest::Client;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

const NOTE_OUTLINE: &str = r##"
```dataviewjs
let p = dv.pages(dv.current.file)
          .where(p => p.file.name == dv.current().file.name)
          .sort(p => p.file.ctime)
          .forEach(p => {
            dv.header(2, "Table of Contents");
            const cache = this.app.metadataCache.getCache(p.file.path);
            if (cache && cache.headings) {
              const items = cache.headings
                .filter(h => h.level <= 4)
                .map(h => " ".repeat(2*(h.level - 1)) + "- [[" + p.file.name + "#" + h.heading + "|" + h.heading + "]]")
                .join("\n");
              dv.el("div", items);
            }
          });
```
"##;

const NOTE_BODY: &str = "

# 1. Notes
## 1.0. Local file
[{file}](<{link}>)

## 1.1. Abstract

## 1.2. Motivation

## 1.3. Method

## 1.4. Experiments

## 1.5. Assessment

# 2. Summary

## 2.1. Problem

## 2.2. Key idea

## 2.3. Related work

## 2.4. Datasets and code

## 2.5. Contributions

## 2.6. Next steps

";

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered {status}")]
    Status { url: String, status: u16 },
}

/// Fetches PDF bytes
#[async_trait]
pub trait PdfFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpPdfFetcher {
    client: Client,
}

#[async_trait]
impl PdfFetcher for HttpPdfFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

fn default_max_attempts() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloaderConfig {
    /// Notes go to `<paper_note_folder>/<category>/<title>.md`
    pub paper_note_folder: PathBuf,

    pub download_directory: PathBuf,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

pub struct Downloader {
    config: PluginConfig,
    settings: DownloaderConfig,
    fetcher: Arc<dyn PdfFetcher>,
}

impl Downloader {
    pub fn with_fetcher(config: PluginConfig, settings: DownloaderConfig, fetcher: Arc<dyn PdfFetcher>) -> Self {
        Self {
            config,
            settings,
            fetcher,
        }
    }

    fn write_note(&self, record: &Record, title: &str) -> Result<(), PluginError> {
        let folder = self.settings.paper_note_folder.join(&record.metainfo.category);
        fs::create_dir_all(&folder)?;
        let path = folder.join(format!("{title}.md"));
        if path.exists() {
            warn!("Note {} exists, I won't overwrite it.", path.display());
            return Ok(());
        }
        let pdf = self.settings.download_directory.join(format!("{title}.pdf"));
        fs::write(&path, note_content(record, title, &file_link(&pdf)?))?;
        info!("Wrote note {}", path.display());
        Ok(())
    }

    async fn download(&self, record: &Record, title: &str) -> Result<(), PluginError> {
        fs::create_dir_all(&self.settings.download_directory)?;
        let mut path = self.settings.download_directory.join(format!("{title}.pdf"));
        if path.exists() {
            path = self
                .settings
                .download_directory
                .join(format!("{title} @ {}.pdf", version(record.entry_id())));
            warn!("Paper exists, download the newest version to {}", path.display());
        }

        let url = record.pdf_link();
        info!("Downloading {} to {}", url, path.display());
        let attempts = self.settings.max_attempts.max(1);
        for attempt in 1..=attempts {
            match self.fetcher.fetch(&url).await {
                Ok(bytes) => {
                    fs::write(&path, bytes)?;
                    info!("Download success.");
                    return Ok(());
                }
                Err(e) => warn!("Failed to download paper (attempt {}/{}): {}", attempt, attempts, e),
            }
        }
        error!("Failed to download {} after {} attempts.", url, attempts);
        Ok(())
    }
}

/// Title usable as a file name on every platform
pub fn sanitize_title(title: &str) -> String {
    title
        .replace(": ", "：")
        .replace('?', "？")
        .replace(['<', '>', '/', '\\'], "")
        .replace('"', "'")
        .replace('|', "or")
        .replace('*', "Star")
        .replace(':', "：")
}

/// `v<N>` suffix of an arXiv id, `v1` when absent
fn version(entry_id: &str) -> String {
    let last = entry_id.rsplit('/').next().unwrap_or(entry_id);
    match last.rsplit_once('v') {
        Some((_, n)) if !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) => format!("v{n}"),
        _ => "v1".to_string(),
    }
}

fn file_link(path: &Path) -> Result<String, PluginError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(format!("file://{}", absolute.display().to_string().replace(' ', "%20")))
}

fn note_content(record: &Record, title: &str, link: &str) -> String {
    let tags: String = record
        .metainfo
        .tags
        .iter()
        .map(|t| format!("\n - {t}"))
        .collect();
    let front = format!(
        "---\nDONE: false\nJournal: {}\nPaper: {}\nCode: {}\nDate: {}\ntags: {}\n---\n\n",
        record.metainfo.journal,
        record.entry_id(),
        record.metainfo.code_link,
        record.published.format("%Y-%m-%d"),
        tags
    );
    let body = NOTE_BODY
        .replace("{file}", &format!("{title}.pdf"))
        .replace("{link}", link);
    format!("{front}{NOTE_OUTLINE}{body}")
}

impl ConfigurablePlugin for Downloader {
    const NAME: &'static str = "Downloader";
    const DEPENDENCIES: &'static [&'static str] = &["MarkdownMetainfoParser"];
    type Config = DownloaderConfig;

    fn from_config(config: PluginConfig, settings: Self::Config) -> Result<Self, PluginError> {
        Ok(Self::with_fetcher(config, settings, Arc::new(HttpPdfFetcher::default())))
    }
}

#[async_trait]
impl Plugin for Downloader {
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
        for record in records.iter().filter(|r| r.metainfo.download) {
            let title = sanitize_title(&record.title);
            if title != record.title {
                warn!("Original title: {}. New title: {}.", record.title, title);
            }
            self.write_note(record, &title)?;
            self.download(record, &title).await?;
        }
        Ok(records)
    }
}
