//! Per-plugin side data attached to records
//!
//! A [`PluginSlot`] is the type-erased, self-describing form stored on a
//! [`Record`](crate::Record). Plugins work with their own typed struct through
//! the [`SlotData`] trait and convert to and from the erased form with serde, so
//! a record loaded from disk keeps every slot even when the plugin that wrote it
//! is not part of the current run.

use crate::error::SlotError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a plugin's data lives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotScope {
    /// Attached to a single record
    #[default]
    Local,

    /// Stored once per run in the global context
    Global,
}

/// Typed payload a plugin attaches to records under its own name
pub trait SlotData: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    /// Name of the owning plugin, used as the slot key
    const PLUGIN_NAME: &'static str;

    /// Record-scoped or context-scoped
    const SCOPE: SlotScope = SlotScope::Local;

    /// Contributes a one-line item to human-readable renderings
    const SAVE_AS_ITEM: bool = false;

    /// Contributes a multi-line block to human-readable renderings
    const SAVE_AS_TEXT: bool = false;

    /// Text contributed to renderings when one of the flags is set
    fn render(&self) -> String {
        String::new()
    }
}

/// Type-erased slot as stored on a record and written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSlot {
    /// Owning plugin
    pub plugin_name: String,

    /// Scope tag, serialized as `type` for compatibility with existing result files
    #[serde(rename = "type", default)]
    pub scope: SlotScope,

    #[serde(default)]
    pub save_as_item: bool,

    #[serde(default)]
    pub save_as_text: bool,

    /// Rendering captured from the typed value at the last write
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rendered: String,

    /// The plugin's own fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PluginSlot {
    /// Erase a typed value into a slot
    pub fn from_data<T: SlotData>(data: &T) -> Result<Self, SlotError> {
        let fields = match serde_json::to_value(data) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(SlotError::NotAnObject(T::PLUGIN_NAME.to_string())),
            Err(source) => {
                return Err(SlotError::Malformed {
                    plugin: T::PLUGIN_NAME.to_string(),
                    source,
                })
            }
        };

        Ok(Self {
            plugin_name: T::PLUGIN_NAME.to_string(),
            scope: T::SCOPE,
            save_as_item: T::SAVE_AS_ITEM,
            save_as_text: T::SAVE_AS_TEXT,
            rendered: data.render(),
            fields,
        })
    }

    /// Recover the typed value
    pub fn to_data<T: SlotData>(&self) -> Result<T, SlotError> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(|source| {
            SlotError::Malformed {
                plugin: self.plugin_name.clone(),
                source,
            }
        })
    }

    /// Text this slot contributes to a human-readable rendering
    pub fn render(&self) -> &str {
        &self.rendered
    }

    /// Convert to a plain JSON mapping
    pub fn to_plain(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Build from a plain JSON mapping
    pub fn from_plain(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Keyword-filter view of this slot, if it has the `keywords`/`ignorance` shape
    pub fn keywords_filter(&self) -> Option<KeywordsFilterView> {
        let keywords = string_list(self.fields.get("keywords")?)?;
        let ignorance = string_list(self.fields.get("ignorance")?)?;
        Some(KeywordsFilterView {
            plugin_name: self.plugin_name.clone(),
            keywords,
            ignorance,
        })
    }
}

/// Keywords and ignored keywords recorded by any keyword-filter plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordsFilterView {
    pub plugin_name: String,
    pub keywords: Vec<String>,
    pub ignorance: Vec<String>,
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}
