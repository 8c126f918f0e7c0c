//! Plugin trait and related types

use crate::context::GlobalContext;
use crate::error::PluginError;
use crate::record::Record;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Core plugin trait - every pipeline stage implements this
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique plugin identifier, also the key of its record slots
    fn name(&self) -> &str;

    /// Get plugin configuration
    fn config(&self) -> &PluginConfig;

    /// Transform the record collection.
    ///
    /// Unless the plugin is a source or a filter, the output has the same
    /// length and entry order as the input. Calling it twice on the same
    /// records must not add a second slot under the plugin's name.
    async fn process(
        &self,
        records: Vec<Record>,
        ctx: &mut GlobalContext,
    ) -> Result<Vec<Record>, PluginError>;
}

/// Arguments every plugin accepts, whatever its own configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Plugin name
    pub name: String,

    /// Free-form version tag
    #[serde(default)]
    pub version: Option<String>,

    /// Plugins that must run earlier in the same pipeline
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl PluginConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Pick `version` and `dependencies` out of merged plugin arguments.
    ///
    /// `default_dependencies` applies when the arguments do not name any.
    pub fn from_args(
        name: &str,
        args: &Map<String, Value>,
        default_dependencies: &[&str],
    ) -> Result<Self, serde_json::Error> {
        let version = match args.get("version") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(v) => Some(serde_json::from_value(v.clone())?),
        };
        let dependencies = match args.get("dependencies") {
            None | Some(Value::Null) => default_dependencies
                .iter()
                .map(|d| d.to_string())
                .collect(),
            Some(v) => serde_json::from_value(v.clone())?,
        };
        Ok(Self {
            name: name.to_string(),
            version,
            dependencies,
        })
    }
}

/// A plugin that can be built from merged configuration arguments.
///
/// The registry deserializes the merged arguments into [`Self::Config`];
/// fields without a serde default are required.
pub trait ConfigurablePlugin: Plugin + Sized + 'static {
    /// Registration name
    const NAME: &'static str;

    /// Dependencies declared when the arguments do not override them
    const DEPENDENCIES: &'static [&'static str] = &[];

    /// Typed constructor arguments
    type Config: DeserializeOwned;

    fn from_config(plugin: PluginConfig, config: Self::Config) -> Result<Self, PluginError>;
}
