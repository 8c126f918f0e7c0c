//! Named pipeline presets

use crate::error::{PipelineError, RegistryError};
use crate::registry::PluginArgsMap;
use crate::runner::{PipelineRunner, RunReport};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Optional on-disk overrides for a preset
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PresetFile {
    plugins: Option<Vec<String>>,
    configs: HashMap<String, PluginArgsMap>,
}

/// A named, reusable plugin list with per-plugin default arguments
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    plugins: Vec<String>,
    configs: HashMap<String, PluginArgsMap>,
}

impl Pipeline {
    pub fn new<I, S>(name: impl Into<String>, plugins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            plugins: plugins.into_iter().map(Into::into).collect(),
            configs: HashMap::new(),
        }
    }

    /// Preset argument for one plugin, below the run configuration in priority
    pub fn with_config(mut self, plugin: &str, key: &str, value: impl Into<Value>) -> Self {
        self.configs
            .entry(plugin.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }

    pub fn configs(&self) -> &HashMap<String, PluginArgsMap> {
        &self.configs
    }

    /// Apply `<dir>/<name>.yaml` if it exists
    pub fn load_overrides(self, dir: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = dir.as_ref().join(format!("{}.yaml", self.name));
        self.load_overrides_from(&path)
    }

    /// Apply a specific preset file; a missing file only logs a warning
    pub fn load_overrides_from(mut self, path: &Path) -> Result<Self, RegistryError> {
        if !path.exists() {
            warn!("{} does not exist.", path.display());
            return Ok(self);
        }
        let contents = std::fs::read_to_string(path).map_err(|source| RegistryError::ConfigFile {
            path: path.display().to_string(),
            source,
        })?;
        let file: PresetFile = serde_yaml::from_str(&contents)?;
        if let Some(plugins) = file.plugins {
            self.plugins = plugins;
        }
        for (plugin, args) in file.configs {
            self.configs.entry(plugin).or_default().extend(args);
        }
        Ok(self)
    }

    /// Run the preset's plugin list, adding its overrides to the runner's layers
    pub async fn run(&self, mut runner: PipelineRunner) -> Result<RunReport, PipelineError> {
        let listing: String = self.plugins.iter().map(|p| format!("  - {p}\n")).collect();
        info!(
            "Pipeline {} is initialized. Running with plugins: \n{}",
            self.name, listing
        );
        runner
            .layers_mut()
            .preset
            .extend(self.configs.clone());
        runner.execute(&self.plugins).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new("Request", ["A", "B"])
            .load_overrides(dir.path())
            .unwrap();

        assert_eq!(pipeline.plugins(), &["A".to_string(), "B".to_string()]);
        assert!(pipeline.configs().is_empty());
    }

    #[test]
    fn test_file_replaces_list_and_adds_configs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Request.yaml"),
            "plugins: [A, C]\nconfigs:\n  C:\n    language: de\n",
        )
        .unwrap();

        let pipeline = Pipeline::new("Request", ["A", "B"])
            .load_overrides(dir.path())
            .unwrap();

        assert_eq!(pipeline.plugins(), &["A".to_string(), "C".to_string()]);
        assert_eq!(pipeline.configs()["C"]["language"], "de");
    }

    #[test]
    fn test_configs_only_file_keeps_list() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("P.yaml"), "configs:\n  A:\n    n: 1\n").unwrap();

        let pipeline = Pipeline::new("P", ["A"]).load_overrides(dir.path()).unwrap();
        assert_eq!(pipeline.plugins(), &["A".to_string()]);
        assert_eq!(pipeline.configs()["A"]["n"], 1);
    }

    #[test]
    fn test_file_configs_merge_into_builtin_arguments() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("P.yaml"), "configs:\n  A:\n    n: 2\n").unwrap();

        let pipeline = Pipeline::new("P", ["A"])
            .with_config("A", "filter", "Model")
            .with_config("A", "n", 1)
            .load_overrides(dir.path())
            .unwrap();
        assert_eq!(pipeline.configs()["A"]["filter"], "Model");
        assert_eq!(pipeline.configs()["A"]["n"], 2);
    }
}
