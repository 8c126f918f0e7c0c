//! Plugin registration table and argument resolution

use crate::error::RegistryError;
use crate::plugin::{ConfigurablePlugin, Plugin, PluginConfig};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Per-plugin argument mapping
pub type PluginArgsMap = Map<String, Value>;

type Constructor =
    Box<dyn Fn(&PluginArgsMap) -> Result<Arc<dyn Plugin>, RegistryError> + Send + Sync>;

/// Name to constructor table, filled explicitly at startup
pub struct Registry {
    /// Constructors by plugin name
    constructors: BTreeMap<String, Constructor>,

    /// Directory holding `<PluginName>.yaml` default arguments
    config_dir: Option<PathBuf>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
            config_dir: None,
        }
    }

    /// Read per-plugin default arguments from this directory
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Register a plugin type built from its typed configuration
    pub fn register<P: ConfigurablePlugin>(&mut self) -> Result<(), RegistryError> {
        self.register_with(P::NAME, |args| {
            let plugin = PluginConfig::from_args(P::NAME, args, P::DEPENDENCIES)
                .map_err(|e| invalid_config(P::NAME, e))?;
            let config: P::Config = serde_json::from_value(Value::Object(args.clone()))
                .map_err(|e| invalid_config(P::NAME, e))?;
            let plugin = P::from_config(plugin, config).map_err(|e| invalid_config(P::NAME, e))?;
            Ok(Arc::new(plugin) as Arc<dyn Plugin>)
        })
    }

    /// Register a constructor closure under a name
    pub fn register_with<F>(&mut self, name: &str, constructor: F) -> Result<(), RegistryError>
    where
        F: Fn(&PluginArgsMap) -> Result<Arc<dyn Plugin>, RegistryError> + Send + Sync + 'static,
    {
        if self.constructors.contains_key(name) {
            return Err(RegistryError::DuplicatePlugin(name.to_string()));
        }
        debug!("Registering plugin: {}", name);
        self.constructors
            .insert(name.to_string(), Box::new(constructor));
        Ok(())
    }

    /// Get all registered plugin names, sorted
    pub fn plugin_names(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Fail with `PluginNotFound` unless the name is registered
    pub fn ensure_registered(&self, name: &str) -> Result<(), RegistryError> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(RegistryError::PluginNotFound(name.to_string()))
        }
    }

    /// Default arguments from `<config_dir>/<name>.yaml`, empty when absent
    pub fn plugin_defaults(&self, name: &str) -> Result<PluginArgsMap, RegistryError> {
        match &self.config_dir {
            Some(dir) => load_args_file(&dir.join(format!("{name}.yaml")), name),
            None => Ok(Map::new()),
        }
    }

    /// Look up, configure and construct one plugin
    pub fn resolve(&self, name: &str, layers: &ArgumentLayers) -> Result<ResolvedPlugin, RegistryError> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| RegistryError::PluginNotFound(name.to_string()))?;

        let defaults = self.plugin_defaults(name)?;
        let args = layers.merge(name, defaults);

        let rendered: Vec<String> = args.iter().map(|(k, v)| format!(">>>> {k}: {v}")).collect();
        info!("Configuring plugin {} with args\n{}", name, rendered.join("\n"));

        let plugin = constructor(&args)?;
        Ok(ResolvedPlugin {
            name: name.to_string(),
            args,
            plugin,
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// A constructed plugin together with the arguments it was built from
pub struct ResolvedPlugin {
    pub name: String,
    pub args: PluginArgsMap,
    pub plugin: Arc<dyn Plugin>,
}

impl std::fmt::Debug for ResolvedPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedPlugin")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("dependencies", &self.plugin.config().dependencies)
            .finish()
    }
}

/// Argument sources above the per-plugin defaults file, lowest priority first
#[derive(Debug, Clone, Default)]
pub struct ArgumentLayers {
    /// Overrides from a pipeline preset, by plugin name
    pub preset: HashMap<String, PluginArgsMap>,

    /// Fields of the run configuration, offered to every plugin
    pub run: PluginArgsMap,

    /// Caller overrides, by plugin name
    pub overrides: HashMap<String, PluginArgsMap>,
}

impl ArgumentLayers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run(mut self, run: PluginArgsMap) -> Self {
        self.run = run;
        self
    }

    pub fn with_preset(mut self, preset: HashMap<String, PluginArgsMap>) -> Self {
        self.preset = preset;
        self
    }

    /// Set one caller override, e.g. from `--set Plugin.key=value`
    pub fn set_override(&mut self, plugin: &str, key: &str, value: Value) {
        self.overrides
            .entry(plugin.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Merge all layers on top of a plugin's file defaults
    pub fn merge(&self, plugin: &str, defaults: PluginArgsMap) -> PluginArgsMap {
        let mut args = defaults;
        // Preset values are applied before the run configuration, so any
        // non-null run field wins over a preset `configs:` entry of the same
        // name. Only caller overrides rank above the run configuration.
        if let Some(preset) = self.preset.get(plugin) {
            extend(&mut args, preset);
        }
        for (key, value) in &self.run {
            if !value.is_null() {
                args.insert(key.clone(), value.clone());
            }
        }
        if let Some(overrides) = self.overrides.get(plugin) {
            extend(&mut args, overrides);
        }
        args
    }
}

fn extend(target: &mut PluginArgsMap, layer: &PluginArgsMap) {
    for (key, value) in layer {
        target.insert(key.clone(), value.clone());
    }
}

fn invalid_config(plugin: &str, reason: impl std::fmt::Display) -> RegistryError {
    RegistryError::InvalidConfig {
        plugin: plugin.to_string(),
        reason: reason.to_string(),
    }
}

/// Load a YAML mapping of arguments; a missing file yields an empty mapping
pub fn load_args_file(path: &Path, plugin: &str) -> Result<PluginArgsMap, RegistryError> {
    if !path.exists() {
        return Ok(Map::new());
    }
    let contents = std::fs::read_to_string(path).map_err(|source| RegistryError::ConfigFile {
        path: path.display().to_string(),
        source,
    })?;
    let value: Value = serde_yaml::from_str(&contents)?;
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(invalid_config(
            plugin,
            format!("{} must contain a mapping, found {}", path.display(), other),
        )),
    }
}
