//! Paper records flowing through the pipeline

use crate::error::{PluginError, SlotError};
use crate::slot::{PluginSlot, SlotData};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// A typed link attached to a paper (pdf, html, doi, supplementary, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,

    #[serde(default)]
    pub title: Option<String>,

    /// Relation label, e.g. "alternate" or "related"
    #[serde(default)]
    pub rel: String,

    #[serde(default)]
    pub content_type: Option<String>,
}

impl Link {
    pub fn new(href: impl Into<String>, rel: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            rel: rel.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Shared, incrementally populated facts used by the download stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metainfo {
    pub code_link: String,
    pub category: String,
    pub journal: String,
    pub download: bool,
    pub tags: Vec<String>,
    pub id: String,
}

impl Metainfo {
    /// Overwrite only the fields present in `patch`; unknown keys are ignored
    pub fn update_from(&mut self, patch: &Map<String, Value>) -> Result<(), serde_json::Error> {
        let mut current = match serde_json::to_value(&*self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in patch {
            if current.contains_key(key) {
                current.insert(key.clone(), value.clone());
            }
        }
        *self = serde_json::from_value(Value::Object(current))?;
        Ok(())
    }
}

/// One paper plus the data every plugin attached to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Canonical source URL, fixed at creation
    entry_id: String,

    #[serde(default)]
    pub pdf_url: Option<String>,

    #[serde(with = "timestamp")]
    pub updated: DateTime<Utc>,

    #[serde(with = "timestamp")]
    pub published: DateTime<Utc>,

    pub title: String,

    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub comment: Option<String>,

    #[serde(default)]
    pub journal_ref: Option<String>,

    #[serde(default)]
    pub doi: Option<String>,

    #[serde(default)]
    pub primary_category: String,

    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub links: Vec<Link>,

    #[serde(default)]
    pub metainfo: Metainfo,

    /// Plugin name -> slot. Keys are owned by the plugin of the same name.
    #[serde(default)]
    pub local_plugin_data: BTreeMap<String, PluginSlot>,
}

impl Record {
    /// Create an empty record for the given entry id
    pub fn new(entry_id: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            pdf_url: None,
            updated: DateTime::<Utc>::default(),
            published: DateTime::<Utc>::default(),
            title: String::new(),
            authors: Vec::new(),
            summary: String::new(),
            comment: None,
            journal_ref: None,
            doi: None,
            primary_category: String::new(),
            categories: Vec::new(),
            links: Vec::new(),
            metainfo: Metainfo::default(),
            local_plugin_data: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    /// PDF location: explicit URL, a link titled "pdf", or the abstract URL rewritten
    pub fn pdf_link(&self) -> String {
        if let Some(url) = &self.pdf_url {
            return url.clone();
        }
        self.links
            .iter()
            .find(|l| l.title.as_deref() == Some("pdf"))
            .map(|l| l.href.clone())
            .unwrap_or_else(|| self.entry_id.replace("abs", "pdf"))
    }

    pub fn slot(&self, plugin_name: &str) -> Option<&PluginSlot> {
        self.local_plugin_data.get(plugin_name)
    }

    pub fn has_slot(&self, plugin_name: &str) -> bool {
        self.local_plugin_data.contains_key(plugin_name)
    }

    pub fn slots(&self) -> impl Iterator<Item = &PluginSlot> {
        self.local_plugin_data.values()
    }

    /// Attach a slot unless one already exists under the same name.
    ///
    /// Returns `false` when an existing slot was kept.
    pub fn add_slot<T: SlotData>(&mut self, data: &T) -> Result<bool, SlotError> {
        if self.has_slot(T::PLUGIN_NAME) {
            warn!(
                "Slot {} already exists on {}, skip.",
                T::PLUGIN_NAME,
                self.entry_id
            );
            return Ok(false);
        }
        let slot = PluginSlot::from_data(data)?;
        self.local_plugin_data
            .insert(T::PLUGIN_NAME.to_string(), slot);
        Ok(true)
    }

    /// Replace whatever slot the plugin had
    pub fn reset_slot<T: SlotData>(&mut self, data: &T) -> Result<(), SlotError> {
        let slot = PluginSlot::from_data(data)?;
        self.local_plugin_data
            .insert(T::PLUGIN_NAME.to_string(), slot);
        Ok(())
    }

    /// Attach a default slot if none exists
    pub fn ensure_slot<T: SlotData>(&mut self) -> Result<(), SlotError> {
        if !self.has_slot(T::PLUGIN_NAME) {
            self.reset_slot(&T::default())?;
        }
        Ok(())
    }

    /// Typed read; `Ok(None)` when the plugin never wrote this record
    pub fn slot_data<T: SlotData>(&self) -> Result<Option<T>, SlotError> {
        self.slot(T::PLUGIN_NAME)
            .map(PluginSlot::to_data::<T>)
            .transpose()
    }

    /// Typed read for data a plugin cannot work without
    pub fn require_slot_data<T: SlotData>(&self) -> Result<T, PluginError> {
        self.slot_data::<T>()?
            .ok_or_else(|| PluginError::MissingUpstream {
                entry_id: self.entry_id.clone(),
                plugin: T::PLUGIN_NAME.to_string(),
            })
    }

    /// Mutate the plugin's slot in place, creating a default one first if needed
    pub fn update_slot<T, R>(&mut self, f: impl FnOnce(&mut T) -> R) -> Result<R, SlotError>
    where
        T: SlotData,
    {
        let mut data: T = self.slot_data::<T>()?.unwrap_or_default();
        let out = f(&mut data);
        self.reset_slot(&data)?;
        Ok(out)
    }

    /// Lossless plain mapping used by the JSON-lines writer
    pub fn to_plain(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Inverse of [`Record::to_plain`]; also accepts older result files
    pub fn from_plain(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// RFC 3339 on write; RFC 3339 or `%Y-%m-%d, %H:%M:%S` on read
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const LEGACY_FORMAT: &str = "%Y-%m-%d, %H:%M:%S";

    pub fn serialize<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if let Ok(time) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(time.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, LEGACY_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}
