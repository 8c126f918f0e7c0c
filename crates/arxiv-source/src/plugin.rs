//! Plugin wrapper for arXiv search

use crate::{ArxivClient, SearchSource};
use async_trait::async_trait;
use paper_digest_core::{
    ConfigurablePlugin, GlobalContext, Plugin, PluginConfig, PluginError, Record,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Constructor arguments for [`ArxivParser`]
#[derive(Debug, Clone, Deserialize)]
pub struct ArxivParserConfig {
    /// Full arXiv search query
    pub query: String,

    /// Searches attempted until one returns entries
    #[serde(default = "default_num_retries")]
    pub num_retries: u32,
}

fn default_num_retries() -> u32 {
    3
}

/// Source plugin: ignores its input and returns fresh search results
pub struct ArxivParser {
    config: PluginConfig,
    settings: ArxivParserConfig,
    source: Arc<dyn SearchSource>,
}

impl ArxivParser {
    /// Create a parser over any search source
    pub fn with_source(
        config: PluginConfig,
        settings: ArxivParserConfig,
        source: Arc<dyn SearchSource>,
    ) -> Self {
        Self {
            config,
            settings,
            source,
        }
    }
}

impl ConfigurablePlugin for ArxivParser {
    const NAME: &'static str = "ArxivParser";
    type Config = ArxivParserConfig;

    fn from_config(config: PluginConfig, settings: Self::Config) -> Result<Self, PluginError> {
        Ok(Self::with_source(
            config,
            settings,
            Arc::new(ArxivClient::new()),
        ))
    }
}

#[async_trait]
impl Plugin for ArxivParser {
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
        let start = Instant::now();
        let attempts = self.settings.num_retries.max(1);
        let mut last_error = None;
        let mut found = Vec::new();

        for attempt in 1..=attempts {
            match self
                .source
                .search(&self.settings.query, self.settings.num_retries)
                .await
            {
                Ok(results) => {
                    info!("Get {} items.", results.len());
                    last_error = None;
                    if let (Some(newest), Some(oldest)) = (results.first(), results.last()) {
                        info!("Range: {} {}", oldest.updated, newest.updated);
                        found = results;
                        break;
                    }
                }
                Err(e) => {
                    warn!("Search attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = Some(e);
                }
            }
        }

        if let Some(e) = last_error {
            return Err(PluginError::ExecutionFailed(format!(
                "arXiv search failed after {attempts} attempts: {e}"
            )));
        }

        info!(
            "Search complete in {:.2}s: {} records",
            start.elapsed().as_secs_f64(),
            found.len()
        );
        Ok(found.into_iter().map(Record::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::{parse_feed, tests::FEED};
    use crate::{RawRecord, SearchError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a scripted list of outcomes, one per search call
    struct Scripted {
        outcomes: std::sync::Mutex<Vec<Result<Vec<RawRecord>, SearchError>>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SearchSource for Scripted {
        async fn search(&self, _query: &str, _max_retries: u32) -> Result<Vec<RawRecord>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                Ok(Vec::new())
            } else {
                outcomes.remove(0)
            }
        }
    }

    fn parser(outcomes: Vec<Result<Vec<RawRecord>, SearchError>>, retries: u32) -> (ArxivParser, Arc<Scripted>) {
        let source = Arc::new(Scripted {
            outcomes: std::sync::Mutex::new(outcomes),
            calls: AtomicUsize::new(0),
        });
        let plugin = ArxivParser::with_source(
            PluginConfig::new("ArxivParser"),
            ArxivParserConfig {
                query: "cat:cs.CV".to_string(),
                num_retries: retries,
            },
            source.clone(),
        );
        (plugin, source)
    }

    #[tokio::test]
    async fn test_converts_search_hits_to_records() {
        let hits = parse_feed(FEED).unwrap().records;
        let (plugin, _) = parser(vec![Ok(hits)], 3);

        let records = plugin
            .process(vec![Record::new("ignored")], &mut GlobalContext::new())
            .await
            .unwrap();

        let ids: Vec<_> = records.iter().map(Record::entry_id).collect();
        assert_eq!(
            ids,
            vec!["http://arxiv.org/abs/2401.00001v2", "http://arxiv.org/abs/2401.00002v1"]
        );
        assert_eq!(records[0].authors.len(), 2);
        assert_eq!(records[0].pdf_link(), "http://arxiv.org/pdf/2401.00001v2");
        assert!(records[0].local_plugin_data.is_empty());
    }

    #[tokio::test]
    async fn test_retries_empty_searches() {
        let hits = parse_feed(FEED).unwrap().records;
        let (plugin, source) = parser(vec![Ok(vec![]), Ok(hits)], 3);

        let records = plugin.process(vec![], &mut GlobalContext::new()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_all_empty_is_not_an_error() {
        let (plugin, source) = parser(vec![], 2);

        let records = plugin.process(vec![], &mut GlobalContext::new()).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_persistent_failure_propagates() {
        let failure = || {
            Err(SearchError::Api {
                status: 503,
                body: "down".to_string(),
            })
        };
        let (plugin, _) = parser(vec![failure(), failure()], 2);

        let err = plugin.process(vec![], &mut GlobalContext::new()).await.unwrap_err();
        assert!(matches!(err, PluginError::ExecutionFailed(_)));
    }
}
