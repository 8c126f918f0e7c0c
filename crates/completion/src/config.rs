//! Model profiles loaded from `models.yaml`

use crate::error::CompletionError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

/// Connection details for one model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// API root, e.g. `https://api.openai.com/v1`
    pub base_url: String,

    /// Endpoint named in batch requests, e.g. `/v1/chat/completions`
    pub endpoint: String,

    /// Model id sent with every request
    pub model: String,

    /// Name of the environment variable holding the API key
    pub api_key_env: String,

    /// Extra request body fields (temperature, max_tokens, ...)
    pub model_kwargs: Map<String, Value>,
}

impl ModelConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String, CompletionError> {
        std::env::var(&self.api_key_env)
            .map_err(|_| CompletionError::MissingApiKey(self.api_key_env.clone()))
    }
}

/// Model profiles keyed by the name plugins refer to
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ModelCatalog {
    models: HashMap<String, ModelConfig>,
}

impl ModelCatalog {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, CompletionError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|source| CompletionError::ConfigFile {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, CompletionError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn get(&self, name: &str) -> Result<&ModelConfig, CompletionError> {
        self.models
            .get(name)
            .ok_or_else(|| CompletionError::UnknownModel(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODELS: &str = r#"
gpt-4o-mini:
  base_url: https://api.openai.com/v1
  endpoint: /v1/chat/completions
  model: gpt-4o-mini
  api_key_env: OPENAI_API_KEY
  model_kwargs:
    temperature: 0.0
glm-4-flash:
  base_url: https://open.bigmodel.cn/api/paas/v4
  model: glm-4-flash
  api_key_env: ZHIPU_API_KEY
"#;

    #[test]
    fn test_catalog_lookup() {
        let catalog = ModelCatalog::from_yaml(MODELS).unwrap();
        assert_eq!(catalog.names(), vec!["glm-4-flash", "gpt-4o-mini"]);

        let model = catalog.get("gpt-4o-mini").unwrap();
        assert_eq!(model.model, "gpt-4o-mini");
        assert_eq!(model.model_kwargs["temperature"], 0.0);
        assert!(catalog.get("glm-4-flash").unwrap().endpoint.is_empty());
    }

    #[test]
    fn test_unknown_model() {
        let catalog = ModelCatalog::from_yaml(MODELS).unwrap();
        assert!(matches!(
            catalog.get("nope"),
            Err(CompletionError::UnknownModel(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_missing_api_key_variable() {
        let model = ModelConfig {
            api_key_env: "PAPER_DIGEST_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };
        assert!(matches!(model.api_key(), Err(CompletionError::MissingApiKey(_))));
    }
}
