//! Shared plugin registry helper
//!
//! Every built-in plugin is registered here, once, by name.

use anyhow::{Context, Result};
use paper_digest_arxiv::ArxivParser;
use paper_digest_core::Registry;
use paper_digest_keywords::DefaultKeywordsFilter;
use paper_digest_language_model::{LanguageModelBasedKeywordsFilter, TranslatorWithDefaultKeywordsFilter};
use paper_digest_links::GitHubLinkParser;
use paper_digest_vault::{
    DownloadInformationCollector, DownloadedPaperIndexGenerator, Downloader, MarkdownMetainfoParser,
    MarkdownTableMaker, ResultSaver, ResultsLoader,
};

/// Register all built-in plugins into the provided registry
///
/// Sources: ArxivParser, ResultsLoader.
/// Enrichment: GitHubLinkParser, DefaultKeywordsFilter,
/// LanguageModelBasedKeywordsFilter, TranslatorWithDefaultKeywordsFilter.
/// Output: MarkdownTableMaker, DownloadInformationCollector, ResultSaver,
/// MarkdownMetainfoParser, Downloader, DownloadedPaperIndexGenerator.
pub fn register_all_plugins(registry: &mut Registry) -> Result<()> {
    registry
        .register::<ArxivParser>()
        .context("Failed to register arXiv parser plugin")?;
    registry
        .register::<ResultsLoader>()
        .context("Failed to register results loader plugin")?;

    registry
        .register::<GitHubLinkParser>()
        .context("Failed to register GitHub link parser plugin")?;
    registry
        .register::<DefaultKeywordsFilter>()
        .context("Failed to register keyword filter plugin")?;
    registry
        .register::<LanguageModelBasedKeywordsFilter>()
        .context("Failed to register language model keyword filter plugin")?;
    registry
        .register::<TranslatorWithDefaultKeywordsFilter>()
        .context("Failed to register translator plugin")?;

    registry
        .register::<MarkdownTableMaker>()
        .context("Failed to register markdown table plugin")?;
    registry
        .register::<DownloadInformationCollector>()
        .context("Failed to register download information plugin")?;
    registry
        .register::<ResultSaver>()
        .context("Failed to register result saver plugin")?;
    registry
        .register::<MarkdownMetainfoParser>()
        .context("Failed to register markdown metainfo parser plugin")?;
    registry
        .register::<Downloader>()
        .context("Failed to register downloader plugin")?;
    registry
        .register::<DownloadedPaperIndexGenerator>()
        .context("Failed to register index generator plugin")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registers_every_builtin_once() {
        let mut registry = Registry::new();
        register_all_plugins(&mut registry).unwrap();
        assert_eq!(registry.plugin_names().len(), 12);
        assert!(registry.contains("ArxivParser"));
        assert!(registry.contains("DownloadedPaperIndexGenerator"));

        assert!(register_all_plugins(&mut registry).is_err());
    }
}
