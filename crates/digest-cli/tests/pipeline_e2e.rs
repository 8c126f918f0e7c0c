//! End-to-end runs over the registered plugins with a local record source

use async_trait::async_trait;
use paper_digest_cli::commands::registry_helper::register_all_plugins;
use paper_digest_cli::commands::run::parse_override;
use paper_digest_cli::presets::find_pipeline;
use paper_digest_core::io::load_jsonl;
use paper_digest_core::{
    ArgumentLayers, GlobalContext, Pipeline, PipelineRunner, Plugin, PluginConfig, PluginError,
    Record, Registry,
};
use paper_digest_completion::{CompletionBackend, CompletionClient, CompletionError};
use paper_digest_keywords::{DefaultKeywordsFilter, KeywordsFilterData};
use paper_digest_language_model::{
    LanguageModelBasedKeywordsFilter, LanguageModelFilterConfig, LanguageModelFilterData,
};
use paper_digest_links::{GitHubLinkData, GitHubLinkParser};
use paper_digest_vault::{DownloadInformationCollector, MarkdownTableMaker, ResultSaver};
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;

/// Source plugin returning three fixed records
struct FixedSource {
    config: PluginConfig,
}

#[async_trait]
impl Plugin for FixedSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn config(&self) -> &PluginConfig {
        &self.config
    }

    async fn process(
        &self,
        _records: Vec<Record>,
        _ctx: &mut GlobalContext,
    ) -> Result<Vec<Record>, PluginError> {
        Ok(vec![
            Record::new("http://arxiv.org/abs/2401.00001v1")
                .with_title("Seeing Things")
                .with_summary("A vision model. Code: https://github.com/acme/seeing"),
            Record::new("http://arxiv.org/abs/2401.00002v1")
                .with_title("Counting Things")
                .with_summary("Arithmetic only."),
            Record::new("http://arxiv.org/abs/2401.00003v1")
                .with_title("Sorting Things")
                .with_summary("Lists and more lists."),
        ])
    }
}

fn register_source(registry: &mut Registry) {
    registry
        .register_with("FixedSource", |_| {
            Ok(Arc::new(FixedSource {
                config: PluginConfig::new("FixedSource"),
            }) as Arc<dyn Plugin>)
        })
        .unwrap();
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    register_all_plugins(&mut registry).unwrap();
    register_source(&mut registry);
    registry
}

/// Completion backend accepting every topic for one paper title only
struct AcceptsTitle(&'static str);

#[async_trait]
impl CompletionBackend for AcceptsTitle {
    fn model(&self) -> &str {
        "accepts-title"
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let reply = if prompt.contains(&format!("## Title\n{}\n", self.0)) {
            "The paper matches. **RESULT: TRUE**"
        } else {
            "The paper does not match. **RESULT: FALSE**"
        };
        Ok(reply.to_string())
    }
}

/// Registry for the classify preset, with the model filter answering from
/// [`AcceptsTitle`]
fn classify_registry(accepted_title: &'static str) -> Registry {
    let mut registry = Registry::new();
    register_source(&mut registry);
    registry.register::<GitHubLinkParser>().unwrap();
    registry.register::<DefaultKeywordsFilter>().unwrap();
    registry.register::<MarkdownTableMaker>().unwrap();
    registry.register::<DownloadInformationCollector>().unwrap();
    registry.register::<ResultSaver>().unwrap();
    registry
        .register_with("LanguageModelBasedKeywordsFilter", move |args| {
            let settings: LanguageModelFilterConfig =
                serde_json::from_value(Value::Object(args.clone())).unwrap();
            Ok(Arc::new(LanguageModelBasedKeywordsFilter::with_client(
                PluginConfig::new("LanguageModelBasedKeywordsFilter"),
                settings,
                CompletionClient::new(Arc::new(AcceptsTitle(accepted_title))),
            )) as Arc<dyn Plugin>)
        })
        .unwrap();
    registry
}

fn run_args(out: &Path, md: &Path) -> Map<String, Value> {
    let mut run = Map::new();
    run.insert("output_directory".to_string(), json!(out));
    run.insert("markdown_directory".to_string(), json!(md));
    run
}

#[tokio::test]
async fn test_source_links_keywords_and_saver() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("outputs/20240102");
    let md = dir.path().join("markdown/20240102");

    let mut layers = ArgumentLayers::new().with_run(run_args(&out, &md));
    let o = parse_override("DefaultKeywordsFilter.keywords={cv: [vision]}").unwrap();
    layers.set_override(&o.plugin, &o.key, o.value);

    let names: Vec<String> = ["FixedSource", "GitHubLinkParser", "DefaultKeywordsFilter", "ResultSaver"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let report = PipelineRunner::new(Arc::new(registry()))
        .with_layers(layers)
        .execute(&names)
        .await
        .unwrap();

    assert_eq!(report.records.len(), 3);
    assert_eq!(report.stages.len(), 4);

    let first = &report.records[0];
    let link: GitHubLinkData = first.slot_data().unwrap().unwrap();
    assert_eq!(link.code_link, "https://github.com/acme/seeing");
    let keywords: KeywordsFilterData = first.slot_data().unwrap().unwrap();
    assert_eq!(keywords.keywords, vec!["cv"]);

    for record in &report.records[1..] {
        let keywords: KeywordsFilterData = record.slot_data().unwrap().unwrap();
        assert!(keywords.keywords.is_empty());
    }

    let saved = std::fs::read_to_string(out.join("results.jsonl")).unwrap();
    assert_eq!(saved.lines().count(), 3);
    assert!(md.join("papers @ cv.md").exists());
    assert!(md.join("_Navigation.md").exists());
}

#[tokio::test]
async fn test_saved_results_feed_a_second_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("outputs");
    let md = dir.path().join("markdown");
    let registry = Arc::new(registry());

    let first = Pipeline::new("Collect", ["FixedSource", "GitHubLinkParser", "ResultSaver"]);
    first
        .run(PipelineRunner::new(registry.clone()).with_layers(ArgumentLayers::new().with_run(run_args(&out, &md))))
        .await
        .unwrap();

    let second = Pipeline::new("Reload", ["ResultsLoader", "MarkdownTableMaker"]);
    let report = second
        .run(PipelineRunner::new(registry).with_layers(ArgumentLayers::new().with_run(run_args(&out, &md))))
        .await
        .unwrap();

    assert_eq!(report.records.len(), 3);
    let reloaded = load_jsonl(&out.join("results.jsonl")).unwrap();
    assert_eq!(reloaded[0].entry_id(), report.records[0].entry_id());
    let link: GitHubLinkData = report.records[0].slot_data().unwrap().unwrap();
    assert_eq!(link.code_link, "https://github.com/acme/seeing");
}

#[tokio::test]
async fn test_classify_preset_pages_follow_model_verdicts() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("outputs/20240102");
    let md = dir.path().join("markdown/20240102");
    let presets = dir.path().join("pipelines");
    std::fs::create_dir_all(&presets).unwrap();
    std::fs::write(
        presets.join("RequestThenClassify.yaml"),
        "plugins:\n  - FixedSource\n  - GitHubLinkParser\n  - DefaultKeywordsFilter\n  \
         - LanguageModelBasedKeywordsFilter\n  - MarkdownTableMaker\n  \
         - DownloadInformationCollector\n  - ResultSaver\n",
    )
    .unwrap();
    let pipeline = find_pipeline("RequestThenClassify")
        .unwrap()
        .load_overrides(&presets)
        .unwrap();

    let mut layers = ArgumentLayers::new().with_run(run_args(&out, &md));
    for raw in [
        "DefaultKeywordsFilter.keywords={things: [things]}",
        "LanguageModelBasedKeywordsFilter.model=stub",
        "LanguageModelBasedKeywordsFilter.interested_topics={things: papers about things}",
    ] {
        let o = parse_override(raw).unwrap();
        layers.set_override(&o.plugin, &o.key, o.value);
    }

    let report = pipeline
        .run(PipelineRunner::new(Arc::new(classify_registry("Seeing Things"))).with_layers(layers))
        .await
        .unwrap();
    assert_eq!(report.records.len(), 3);

    for record in &report.records {
        let lexical: KeywordsFilterData = record.slot_data().unwrap().unwrap();
        assert_eq!(lexical.keywords, vec!["things"]);
    }
    let verdicts: Vec<Vec<String>> = report
        .records
        .iter()
        .map(|r| r.require_slot_data::<LanguageModelFilterData>().unwrap().keywords)
        .collect();
    assert_eq!(verdicts, vec![vec!["things".to_string()], vec![], vec![]]);

    let page = std::fs::read_to_string(md.join("papers @ things.md")).unwrap();
    assert!(page.starts_with("---\nDONE: false\ncounts: 1\n---\n"));
    assert!(page.contains("## Seeing Things\n"));
    assert!(!page.contains("## Counting Things\n"));
    assert!(!page.contains("## Sorting Things\n"));
}

#[tokio::test]
async fn test_unknown_plugin_fails_before_running() {
    let names = vec!["FixedSource".to_string(), "NoSuchPlugin".to_string()];
    let result = PipelineRunner::new(Arc::new(registry())).execute(&names).await;
    assert!(result.is_err());
}

#[test]
fn test_preset_file_replaces_plugin_list() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("Request.yaml"),
        "plugins:\n  - ArxivParser\n  - ResultSaver\nconfigs:\n  ArxivParser:\n    num_retries: 5\n",
    )
    .unwrap();

    let pipeline = find_pipeline("Request")
        .unwrap()
        .load_overrides(dir.path())
        .unwrap();
    assert_eq!(pipeline.plugins(), ["ArxivParser", "ResultSaver"]);
    assert_eq!(pipeline.configs()["ArxivParser"]["num_retries"], json!(5));
}
