//! Run command - execute a preset or an explicit plugin list

use crate::commands::registry_helper::register_all_plugins;
use crate::presets::find_pipeline;
use anyhow::{Context, Result};
use clap::Args;
use paper_digest_core::{ArgumentLayers, PipelineRunner, Registry, RunConfig, RunReport};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Args)]
pub struct RunCommand {
    /// Run configuration file; skipped when missing
    #[arg(short, long, default_value = "config/run.yaml")]
    pub config: PathBuf,

    /// Directory holding `plugins/` and `pipelines/` configuration
    #[arg(long, default_value = "config")]
    pub config_dir: PathBuf,

    /// Preset pipeline to run (see `pipelines`)
    #[arg(short, long, conflicts_with = "plugins")]
    pub pipeline: Option<String>,

    /// Comma-separated plugin list, run in order
    #[arg(long, value_delimiter = ',')]
    pub plugins: Vec<String>,

    /// Preset override file under `<config-dir>/pipelines`
    #[arg(long)]
    pub pipeline_config: Option<String>,

    /// Date to search: YYYYMMDD, YYYY-MM-DD or "YYYYMMDDHHMM TO YYYYMMDDHHMM"
    #[arg(short, long)]
    pub datetime: Option<String>,

    /// arXiv category filter
    #[arg(long)]
    pub categories: Option<String>,

    /// Full search query, replacing the one built from categories and date
    #[arg(short, long)]
    pub query: Option<String>,

    #[arg(long)]
    pub output_directory: Option<PathBuf>,

    #[arg(long)]
    pub markdown_directory: Option<PathBuf>,

    /// Extra attempts when the run yields no records
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Per-plugin argument override, `Plugin.key=value` (value parsed as YAML)
    #[arg(long = "set", value_name = "PLUGIN.KEY=VALUE")]
    pub overrides: Vec<String>,

    /// Fail when a plugin runs before the plugins it depends on
    #[arg(long)]
    pub strict: bool,
}

/// One `--set` argument
#[derive(Debug, Clone, PartialEq)]
pub struct ArgOverride {
    pub plugin: String,
    pub key: String,
    pub value: Value,
}

/// Parse `Plugin.key=value`; the value is read as YAML so numbers, lists and
/// mappings keep their type
pub fn parse_override(raw: &str) -> Result<ArgOverride> {
    let (target, value) = raw
        .split_once('=')
        .with_context(|| format!("Override '{raw}' is missing '='"))?;
    let (plugin, key) = target
        .split_once('.')
        .with_context(|| format!("Override '{raw}' must look like Plugin.key=value"))?;
    if plugin.is_empty() || key.is_empty() {
        anyhow::bail!("Override '{}' must look like Plugin.key=value", raw);
    }

    let value: Value = if value.trim().is_empty() {
        Value::String(String::new())
    } else {
        serde_yaml::from_str(value)
            .with_context(|| format!("Failed to parse value of override '{raw}'"))?
    };

    Ok(ArgOverride {
        plugin: plugin.to_string(),
        key: key.to_string(),
        value,
    })
}

impl RunCommand {
    pub async fn execute(self) -> Result<()> {
        info!("=== Paper Digest Run ===");
        let run = self.run_config()?;
        info!("Query: {}", run.query);
        info!("Output directory: {}", run.output_directory.display());

        let mut registry = Registry::new().with_config_dir(self.config_dir.join("plugins"));
        register_all_plugins(&mut registry)?;

        let mut layers = ArgumentLayers::new()
            .with_run(run.to_args().context("Failed to convert run config to plugin arguments")?);
        for raw in &self.overrides {
            let o = parse_override(raw)?;
            layers.set_override(&o.plugin, &o.key, o.value);
        }

        let runner = PipelineRunner::new(Arc::new(registry))
            .with_layers(layers)
            .with_max_retries(run.max_retries_num)
            .with_retry_interval(Duration::from_secs(run.sleep_seconds))
            .strict_dependencies(self.strict);

        let report = match &run.pipeline {
            Some(name) => {
                let file = run
                    .pipeline_config
                    .clone()
                    .unwrap_or_else(|| format!("{name}.yaml"));
                let pipeline = find_pipeline(name)
                    .with_context(|| format!("Unknown pipeline: {name}"))?
                    .load_overrides_from(&self.config_dir.join("pipelines").join(file))
                    .context("Failed to load pipeline overrides")?;
                pipeline.run(runner).await?
            }
            None => {
                if run.plugins.is_empty() {
                    anyhow::bail!("Nothing to run: pass --pipeline or --plugins");
                }
                info!("Running plugins: {}", run.plugins.join(", "));
                runner.execute(&run.plugins).await?
            }
        };

        print_summary(&report);
        Ok(())
    }

    /// Load the run file, apply command-line values, then normalize
    pub fn run_config(&self) -> Result<RunConfig> {
        let mut run = load_run_config(&self.config)?;

        if let Some(pipeline) = &self.pipeline {
            run.pipeline = Some(pipeline.clone());
            run.plugins.clear();
        }
        if !self.plugins.is_empty() {
            run.plugins = self.plugins.iter().map(|p| p.trim().to_string()).collect();
            run.pipeline = None;
        }
        if let Some(file) = &self.pipeline_config {
            run.pipeline_config = Some(file.clone());
        }
        if let Some(datetime) = &self.datetime {
            run.datetime = Some(datetime.clone());
        }
        if let Some(categories) = &self.categories {
            run.categories = categories.clone();
        }
        if let Some(query) = &self.query {
            run.query = query.clone();
        }
        if let Some(dir) = &self.output_directory {
            run.output_directory = dir.clone();
        }
        if let Some(dir) = &self.markdown_directory {
            run.markdown_directory = dir.clone();
        }
        if let Some(retries) = self.max_retries {
            run.max_retries_num = retries;
        }

        run.finalize().context("Failed to normalize run configuration")?;
        Ok(run)
    }
}

fn load_run_config(path: &Path) -> Result<RunConfig> {
    if !path.exists() {
        warn!("{} does not exist, using defaults", path.display());
        return Ok(RunConfig::default());
    }
    RunConfig::from_yaml_file(path)
        .with_context(|| format!("Failed to read run config {}", path.display()))
}

fn print_summary(report: &RunReport) {
    info!("=== Run Complete ===");
    for stage in &report.stages {
        info!(
            "  [{}] {}: {} -> {} records in {:.2}s",
            stage.stage_index,
            stage.plugin_name,
            stage.input_records,
            stage.output_records,
            stage.duration.as_secs_f64()
        );
    }
    for violation in &report.violations {
        warn!("Dependency issue: {}", violation);
    }
    info!(
        "{} records after {} attempt(s), {:.2}s total",
        report.records.len(),
        report.attempts,
        report.total_duration.as_secs_f64()
    );
}
