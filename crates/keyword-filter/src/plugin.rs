//! Plugin wrapper for the lexical keyword filter

use crate::{contains_any, KeywordsFilterData};
use async_trait::async_trait;
use paper_digest_core::{
    ConfigurablePlugin, GlobalContext, OrderedMap, Plugin, PluginConfig, PluginError, Record,
};
use serde::Deserialize;
use tracing::info;

/// Keyword tables, each mapping a keyword to the sub-terms that detect it.
///
/// Matched keywords are recorded in the order the table lists them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DefaultKeywordsFilterConfig {
    pub keywords: OrderedMap<Vec<String>>,

    /// Sub-terms that exclude a record from a keyword it already matched
    pub ignorance: OrderedMap<Vec<String>>,
}

pub struct DefaultKeywordsFilter {
    config: PluginConfig,
    settings: DefaultKeywordsFilterConfig,
}

impl DefaultKeywordsFilter {
    pub fn new(settings: DefaultKeywordsFilterConfig) -> Self {
        Self {
            config: PluginConfig::new(<Self as ConfigurablePlugin>::NAME),
            settings,
        }
    }

    fn classify(&self, record: &Record, data: &mut KeywordsFilterData) {
        for (keyword, terms) in self.settings.keywords.iter() {
            if contains_any(record, terms) && !data.keywords.contains(keyword) {
                data.keywords.push(keyword.clone());
            }
        }
        for (keyword, terms) in self.settings.ignorance.iter() {
            if contains_any(record, terms)
                && data.keywords.contains(keyword)
                && !data.ignorance.contains(keyword)
            {
                data.ignorance.push(keyword.clone());
            }
        }
    }
}

impl ConfigurablePlugin for DefaultKeywordsFilter {
    const NAME: &'static str = "DefaultKeywordsFilter";
    type Config = DefaultKeywordsFilterConfig;

    fn from_config(config: PluginConfig, settings: Self::Config) -> Result<Self, PluginError> {
        Ok(Self { config, settings })
    }
}

#[async_trait]
impl Plugin for DefaultKeywordsFilter {
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
        let mut counts = vec![0usize; self.settings.keywords.len()];
        for record in &mut records {
            let mut data: KeywordsFilterData = record.slot_data()?.unwrap_or_default();
            self.classify(record, &mut data);
            for (count, keyword) in counts.iter_mut().zip(self.settings.keywords.keys()) {
                if data.keywords.contains(keyword) {
                    *count += 1;
                }
            }
            record.reset_slot(&data)?;
        }
        for (keyword, count) in self.settings.keywords.keys().zip(counts) {
            info!("Keyword {}: {} papers", keyword, count);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(keywords: &[(&str, &[&str])], ignorance: &[(&str, &[&str])]) -> DefaultKeywordsFilterConfig {
        let table = |entries: &[(&str, &[&str])]| -> OrderedMap<Vec<String>> {
            entries
                .iter()
                .map(|(k, terms)| (k.to_string(), terms.iter().map(|t| t.to_string()).collect::<Vec<_>>()))
                .collect()
        };
        DefaultKeywordsFilterConfig {
            keywords: table(keywords),
            ignorance: table(ignorance),
        }
    }

    async fn run(plugin: &DefaultKeywordsFilter, records: Vec<Record>) -> Vec<KeywordsFilterData> {
        plugin
            .process(records, &mut GlobalContext::new())
            .await
            .unwrap()
            .iter()
            .map(|r| r.require_slot_data().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_keywords_and_ignorance() {
        let plugin = DefaultKeywordsFilter::new(settings(
            &[("cv", &["vision"]), ("seg", &["segment & mask"])],
            &[("cv", &["survey"]), ("seg", &["survey"])],
        ));
        let records = vec![
            Record::new("a").with_title("A Vision survey"),
            Record::new("b").with_summary("We segment objects with a mask."),
            Record::new("c").with_summary("We segment objects."),
        ];

        let data = run(&plugin, records).await;

        assert_eq!(data[0].keywords, vec!["cv"]);
        assert_eq!(data[0].ignorance, vec!["cv"]);
        assert_eq!(data[1].keywords, vec!["seg"]);
        assert!(data[1].ignorance.is_empty());
        assert!(data[2].keywords.is_empty());
    }

    #[tokio::test]
    async fn test_keywords_follow_configured_order() {
        let plugin = DefaultKeywordsFilter::new(settings(
            &[("seg", &["mask"]), ("cv", &["vision"]), ("ai", &["model"])],
            &[],
        ));
        let records = vec![Record::new("a").with_summary("A vision model that predicts a mask.")];

        let data = run(&plugin, records).await;
        assert_eq!(data[0].keywords, vec!["seg", "cv", "ai"]);
    }

    #[tokio::test]
    async fn test_ignorance_requires_a_matched_keyword() {
        let plugin = DefaultKeywordsFilter::new(settings(&[("cv", &["vision"])], &[("nlp", &["survey"])]));

        let data = run(&plugin, vec![Record::new("a").with_title("A survey")]).await;

        assert!(data[0].keywords.is_empty());
        assert!(data[0].ignorance.is_empty());
    }

    #[tokio::test]
    async fn test_rerun_keeps_one_slot_without_duplicates() {
        let plugin = DefaultKeywordsFilter::new(settings(&[("cv", &["vision"])], &[]));
        let mut ctx = GlobalContext::new();
        let records = vec![Record::new("a").with_summary("vision")];

        let once = plugin.process(records, &mut ctx).await.unwrap();
        let twice = plugin.process(once, &mut ctx).await.unwrap();

        assert_eq!(twice[0].local_plugin_data.len(), 1);
        let data: KeywordsFilterData = twice[0].require_slot_data().unwrap();
        assert_eq!(data.keywords, vec!["cv"]);
    }

    #[tokio::test]
    async fn test_config_from_yaml_shaped_args() {
        let args = serde_json::json!({
            "keywords": {"cv": ["vision", "image & pixel"]},
            "output_directory": "ignored"
        });
        let settings: DefaultKeywordsFilterConfig = serde_json::from_value(args).unwrap();
        assert_eq!(settings.keywords.get("cv").unwrap().len(), 2);
        assert!(settings.ignorance.is_empty());
    }
}
