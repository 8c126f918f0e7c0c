//! Run-scoped shared state

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::slot::{PluginSlot, SlotData};

/// Cross-record state shared by every plugin of one pipeline run.
///
/// Keys are plugin names by convention. Writes replace the previous value.
#[derive(Debug, Clone, Default)]
pub struct GlobalContext {
    entries: HashMap<String, Value>,
}

impl GlobalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any previous one
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Deserialize a stored value; `None` when absent or of a different shape
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Store a serializable value
    pub fn insert<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        self.entries.insert(key.into(), value);
        Ok(())
    }

    /// Store a context-scoped slot under its plugin name
    pub fn set_slot<T: SlotData>(&mut self, data: &T) -> Result<(), crate::SlotError> {
        let slot = PluginSlot::from_data(data)?;
        let value = serde_json::to_value(slot).map_err(|source| crate::SlotError::Malformed {
            plugin: T::PLUGIN_NAME.to_string(),
            source,
        })?;
        self.entries.insert(T::PLUGIN_NAME.to_string(), value);
        Ok(())
    }

    /// Read back a slot stored with [`GlobalContext::set_slot`]
    pub fn slot_data<T: SlotData>(&self) -> Option<T> {
        let slot: PluginSlot = self.get_as(T::PLUGIN_NAME)?;
        slot.to_data().ok()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_last_writer_wins() {
        let mut ctx = GlobalContext::new();
        ctx.set("MarkdownTableMaker", "first");
        ctx.set("MarkdownTableMaker", "second");

        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.get_str("MarkdownTableMaker"), Some("second"));
        assert!(ctx.get("missing").is_none());
    }

    #[test]
    fn test_global_slot_round_trip() {
        #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
        struct Table {
            rows: Vec<String>,
        }
        impl SlotData for Table {
            const PLUGIN_NAME: &'static str = "Table";
            const SCOPE: crate::SlotScope = crate::SlotScope::Global;
        }

        let mut ctx = GlobalContext::new();
        let table = Table {
            rows: vec!["| a |".to_string()],
        };
        ctx.set_slot(&table).unwrap();

        assert_eq!(ctx.slot_data::<Table>(), Some(table));
        assert_eq!(ctx.get("Table").unwrap()["type"], "global");
    }
}
