//! Source plugin that reloads a previous run's results

use async_trait::async_trait;
use paper_digest_core::io::load_jsonl;
use paper_digest_core::{
    ConfigurablePlugin, GlobalContext, Plugin, PluginConfig, PluginError, Record,
};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct ResultsLoaderConfig {
    /// Directory holding `results.jsonl`
    pub output_directory: PathBuf,
}

pub struct ResultsLoader {
    config: PluginConfig,
    settings: ResultsLoaderConfig,
}

impl ResultsLoader {
    pub fn new(settings: ResultsLoaderConfig) -> Self {
        Self {
            config: PluginConfig::new(<Self as ConfigurablePlugin>::NAME),
            settings,
        }
    }
}

impl ConfigurablePlugin for ResultsLoader {
    const NAME: &'static str = "ResultsLoader";
    type Config = ResultsLoaderConfig;

    fn from_config(config: PluginConfig, settings: Self::Config) -> Result<Self, PluginError> {
        Ok(Self { config, settings })
    }
}

#[async_trait]
impl Plugin for ResultsLoader {
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
        if !records.is_empty() {
            return Ok(records);
        }
        let path = self.settings.output_directory.join("results.jsonl");
        let loaded = load_jsonl(&path)?;
        info!("Loaded {} results from {}", loaded.len(), path.display());
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paper_digest_core::io::save_jsonl;

    #[tokio::test]
    async fn test_loads_only_when_input_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        save_jsonl(
            &dir.path().join("results.jsonl"),
            &[Record::new("saved-1"), Record::new("saved-2")],
        )
        .unwrap();
        let loader = ResultsLoader::new(ResultsLoaderConfig {
            output_directory: dir.path().to_path_buf(),
        });
        let mut ctx = GlobalContext::new();

        let loaded = loader.process(vec![], &mut ctx).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].entry_id(), "saved-2");

        let passed = loader.process(vec![Record::new("live")], &mut ctx).await.unwrap();
        assert_eq!(passed.len(), 1);
        assert_eq!(passed[0].entry_id(), "live");
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ResultsLoader::new(ResultsLoaderConfig {
            output_directory: dir.path().join("absent"),
        });
        let err = loader.process(vec![], &mut GlobalContext::new()).await.unwrap_err();
        assert!(matches!(err, PluginError::Io(_)));
    }
}
