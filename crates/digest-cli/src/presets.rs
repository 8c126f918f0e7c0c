//! Built-in pipeline presets

use paper_digest_core::Pipeline;

/// Every built-in preset with its default plugin list
pub fn builtin_pipelines() -> Vec<Pipeline> {
    vec![
        Pipeline::new(
            "Request",
            [
                "ArxivParser",
                "GitHubLinkParser",
                "DefaultKeywordsFilter",
                "MarkdownTableMaker",
                "DownloadInformationCollector",
                "ResultSaver",
                "DownloadedPaperIndexGenerator",
            ],
        ),
        Pipeline::new(
            "RequestThenTranslate",
            [
                "ArxivParser",
                "GitHubLinkParser",
                "DefaultKeywordsFilter",
                "MarkdownTableMaker",
                "DownloadInformationCollector",
                "ResultSaver",
                "TranslatorWithDefaultKeywordsFilter",
                "ResultSaver",
                "DownloadedPaperIndexGenerator",
            ],
        ),
        Pipeline::new(
            "RequestThenClassify",
            [
                "ArxivParser",
                "GitHubLinkParser",
                "DefaultKeywordsFilter",
                "LanguageModelBasedKeywordsFilter",
                "MarkdownTableMaker",
                "DownloadInformationCollector",
                "ResultSaver",
            ],
        )
        .with_config("ResultSaver", "keywords_filter", "LanguageModelBasedKeywordsFilter"),
        Pipeline::new(
            "DownloadByParsing",
            ["ResultsLoader", "MarkdownMetainfoParser", "Downloader"],
        ),
    ]
}

/// Look up a preset by name
pub fn find_pipeline(name: &str) -> Option<Pipeline> {
    builtin_pipelines().into_iter().find(|p| p.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::registry_helper::register_all_plugins;
    use paper_digest_core::Registry;

    #[test]
    fn test_presets_only_name_registered_plugins() {
        let mut registry = Registry::new();
        register_all_plugins(&mut registry).unwrap();
        for pipeline in builtin_pipelines() {
            for plugin in pipeline.plugins() {
                assert!(registry.contains(plugin), "{} uses unknown {}", pipeline.name(), plugin);
            }
        }
    }

    #[test]
    fn test_classify_pages_follow_model_verdicts() {
        let classify = find_pipeline("RequestThenClassify").unwrap();
        assert_eq!(
            classify.configs()["ResultSaver"]["keywords_filter"],
            "LanguageModelBasedKeywordsFilter"
        );
        assert!(find_pipeline("Request").unwrap().configs().is_empty());
    }

    #[test]
    fn test_find_pipeline() {
        assert_eq!(find_pipeline("DownloadByParsing").unwrap().plugins().len(), 3);
        assert!(find_pipeline("Nope").is_none());
    }
}
