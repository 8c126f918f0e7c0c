//! Pipelines command - list built-in presets

use crate::presets::builtin_pipelines;
use anyhow::Result;

pub async fn list_pipelines() -> Result<()> {
    println!("Available pipelines:");
    for pipeline in builtin_pipelines() {
        println!();
        println!("  {}", pipeline.name());
        for plugin in pipeline.plugins() {
            println!("    - {plugin}");
        }
    }
    Ok(())
}
