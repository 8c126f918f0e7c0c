//! Plugins command - list registered plugins

use crate::commands::registry_helper::register_all_plugins;
use anyhow::Result;
use paper_digest_core::Registry;

pub async fn list_plugins() -> Result<()> {
    let mut registry = Registry::new();
    register_all_plugins(&mut registry)?;

    println!("Available plugins:");
    println!();
    for name in registry.plugin_names() {
        println!("  {name}");
    }
    println!();
    println!("Total: {} plugins", registry.plugin_names().len());

    Ok(())
}
