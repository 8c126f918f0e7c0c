//! Paper Digest Core - plugin pipeline over paper records
//!
//! This crate provides the record model, the plugin contract, the registration
//! table and the sequential runner that the paper digest plugins plug into.

pub mod config;
pub mod context;
pub mod error;
pub mod gate;
pub mod io;
pub mod ordered;
pub mod pipeline;
pub mod plugin;
pub mod record;
pub mod registry;
pub mod runner;
pub mod slot;

pub use config::{parse_date, RunConfig};
pub use context::GlobalContext;
pub use error::{PipelineError, PluginError, RegistryError, SlotError};
pub use gate::requires_processing;
pub use ordered::OrderedMap;
pub use pipeline::Pipeline;
pub use plugin::{ConfigurablePlugin, Plugin, PluginConfig};
pub use record::{Link, Metainfo, Record};
pub use registry::{ArgumentLayers, PluginArgsMap, Registry, ResolvedPlugin};
pub use runner::{validate_dependencies, DependencyViolation, PipelineRunner, RunReport, StageReport};
pub use slot::{KeywordsFilterView, PluginSlot, SlotData, SlotScope};
