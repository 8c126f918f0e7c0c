//! Sequential pipeline execution with dependency validation and a retry envelope

use crate::context::GlobalContext;
use crate::error::PipelineError;
use crate::record::Record;
use crate::registry::{ArgumentLayers, Registry, ResolvedPlugin};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Result from a full pipeline run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Records produced by the last stage of the final attempt
    pub records: Vec<Record>,

    /// Per-stage results of the final attempt
    pub stages: Vec<StageReport>,

    /// Number of attempts made, at least 1
    pub attempts: u32,

    /// Wall-clock time over all attempts
    pub total_duration: Duration,

    /// Dependency problems found while validating the final attempt
    pub violations: Vec<DependencyViolation>,
}

/// Result from a single pipeline stage
#[derive(Debug, Clone)]
pub struct StageReport {
    /// Stage index
    pub stage_index: usize,

    /// Plugin name
    pub plugin_name: String,

    pub input_records: usize,

    pub output_records: usize,

    /// Duration of this stage
    pub duration: Duration,
}

/// A declared dependency that the plugin list does not satisfy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyViolation {
    /// The dependency is not in the list at all
    Missing { plugin: String, dependency: String },

    /// The dependency only appears after the plugin that needs it
    OutOfOrder { plugin: String, dependency: String },
}

impl fmt::Display for DependencyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { plugin, dependency } => write!(
                f,
                "Plugin {plugin} requires {dependency} which is not in the list of plugins"
            ),
            Self::OutOfOrder { plugin, dependency } => write!(
                f,
                "Plugin {plugin} requires {dependency} to run before it"
            ),
        }
    }
}

/// Check that every declared dependency is present and runs earlier.
///
/// `resolved[i]` must be the plugin built for `names[i]`. A dependency that
/// appears both before and after the plugin is satisfied by the earlier copy.
pub fn validate_dependencies(
    names: &[String],
    resolved: &[ResolvedPlugin],
) -> Vec<DependencyViolation> {
    let mut violations = Vec::new();
    for (index, stage) in resolved.iter().enumerate() {
        for dependency in &stage.plugin.config().dependencies {
            let violation = match names.iter().position(|n| n == dependency) {
                None => Some(DependencyViolation::Missing {
                    plugin: stage.name.clone(),
                    dependency: dependency.clone(),
                }),
                Some(first) if first >= index => Some(DependencyViolation::OutOfOrder {
                    plugin: stage.name.clone(),
                    dependency: dependency.clone(),
                }),
                Some(_) => None,
            };
            if let Some(violation) = violation {
                error!("{}", violation);
                violations.push(violation);
            }
        }
    }
    violations
}

/// Runs an ordered plugin list over a fresh record collection
pub struct PipelineRunner {
    registry: Arc<Registry>,

    /// Argument layers handed to the registry on every attempt
    layers: ArgumentLayers,

    /// Extra attempts when a run yields no records
    max_retries: u32,

    /// Pause between attempts
    retry_interval: Duration,

    /// Abort on dependency violations instead of logging them
    strict_dependencies: bool,
}

impl PipelineRunner {
    /// Create a runner with no retries and permissive dependency checks
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            layers: ArgumentLayers::default(),
            max_retries: 0,
            retry_interval: Duration::from_secs(3),
            strict_dependencies: false,
        }
    }

    pub fn with_layers(mut self, layers: ArgumentLayers) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Treat dependency violations as fatal
    pub fn strict_dependencies(mut self, strict: bool) -> Self {
        self.strict_dependencies = strict;
        self
    }

    pub fn layers(&self) -> &ArgumentLayers {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut ArgumentLayers {
        &mut self.layers
    }

    /// Resolve and configure every plugin, failing on the first unknown or misconfigured one
    pub fn resolve(&self, names: &[String]) -> Result<Vec<ResolvedPlugin>, PipelineError> {
        for name in names {
            self.registry.ensure_registered(name)?;
        }
        names
            .iter()
            .map(|name| self.registry.resolve(name, &self.layers).map_err(PipelineError::from))
            .collect()
    }

    /// Run the plugin list, retrying from scratch while it yields no records
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use paper_digest_core::{PipelineRunner, Registry};
    /// # tokio_test::block_on(async {
    /// let runner = PipelineRunner::new(Arc::new(Registry::new()));
    /// let report = runner.execute(&[]).await.unwrap();
    /// assert!(report.records.is_empty());
    /// assert_eq!(report.attempts, 1);
    /// # });
    /// ```
    pub async fn execute(&self, names: &[String]) -> Result<RunReport, PipelineError> {
        info!("=== Pipeline Runner Started ===");
        info!("Plugins: {}", names.join(", "));

        let start_time = Instant::now();
        let total_attempts = self.max_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let resolved = self.resolve(names)?;

            let violations = validate_dependencies(names, &resolved);
            if self.strict_dependencies {
                if let Some(first) = violations.first() {
                    return Err(PipelineError::DependencyViolations {
                        count: violations.len(),
                        first: first.to_string(),
                    });
                }
            }

            let (records, stages) = self.run_once(&resolved).await?;

            if !records.is_empty() || attempt >= total_attempts {
                if records.is_empty() {
                    warn!("Pipeline produced no records after {} attempt(s)", attempt);
                }
                let total_duration = start_time.elapsed();
                info!("=== Pipeline Runner Completed ===");
                info!("Total time: {:.2}s", total_duration.as_secs_f64());
                info!("Records: {}", records.len());
                return Ok(RunReport {
                    records,
                    stages,
                    attempts: attempt,
                    total_duration,
                    violations,
                });
            }

            warn!(
                "Pipeline produced no records (attempt {}/{}), retrying in {:.1}s",
                attempt,
                total_attempts,
                self.retry_interval.as_secs_f64()
            );
            tokio::time::sleep(self.retry_interval).await;
        }
    }

    async fn run_once(
        &self,
        resolved: &[ResolvedPlugin],
    ) -> Result<(Vec<Record>, Vec<StageReport>), PipelineError> {
        let mut records = Vec::new();
        let mut ctx = GlobalContext::new();
        let mut stages = Vec::with_capacity(resolved.len());

        for (idx, stage) in resolved.iter().enumerate() {
            info!("--- Stage {}/{}: {} ---", idx + 1, resolved.len(), stage.name);

            let input_records = records.len();
            let stage_start = Instant::now();
            records = stage
                .plugin
                .process(records, &mut ctx)
                .await
                .map_err(|source| PipelineError::Plugin {
                    plugin: stage.name.clone(),
                    source,
                })?;
            let duration = stage_start.elapsed();

            info!(
                "  ✓ {} -> {} records in {:.2}s",
                input_records,
                records.len(),
                duration.as_secs_f64()
            );

            stages.push(StageReport {
                stage_index: idx,
                plugin_name: stage.name.clone(),
                input_records,
                output_records: records.len(),
                duration,
            });
        }

        Ok((records, stages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PluginError, RegistryError};
    use crate::plugin::{Plugin, PluginConfig};
    use crate::registry::PluginArgsMap;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Emits records only once it has been called `succeed_on` times
    struct FlakySource {
        config: PluginConfig,
        calls: Arc<AtomicUsize>,
        succeed_on: usize,
    }

    #[async_trait]
    impl Plugin for FlakySource {
        fn name(&self) -> &str {
            &self.config.name
        }

        fn config(&self) -> &PluginConfig {
            &self.config
        }

        async fn process(
            &self,
            _records: Vec<Record>,
            _ctx: &mut GlobalContext,
        ) -> Result<Vec<Record>, PluginError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.succeed_on {
                Ok(vec![Record::new("a"), Record::new("b")])
            } else {
                Ok(Vec::new())
            }
        }
    }

    /// Pass-through stage with configurable dependencies
    struct Stage {
        config: PluginConfig,
        fail: bool,
    }

    #[async_trait]
    impl Plugin for Stage {
        fn name(&self) -> &str {
            &self.config.name
        }

        fn config(&self) -> &PluginConfig {
            &self.config
        }

        async fn process(
            &self,
            records: Vec<Record>,
            ctx: &mut GlobalContext,
        ) -> Result<Vec<Record>, PluginError> {
            if self.fail {
                return Err(PluginError::ExecutionFailed("boom".to_string()));
            }
            ctx.set(self.name(), records.len() as u64);
            Ok(records)
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn stage_constructor(
        name: &'static str,
        deps: &'static [&'static str],
        fail: bool,
    ) -> impl Fn(&PluginArgsMap) -> Result<Arc<dyn Plugin>, RegistryError> + Send + Sync {
        move |args| {
            let config = PluginConfig::from_args(name, args, deps).map_err(|e| {
                RegistryError::InvalidConfig {
                    plugin: name.to_string(),
                    reason: e.to_string(),
                }
            })?;
            Ok(Arc::new(Stage { config, fail }) as Arc<dyn Plugin>)
        }
    }

    fn registry_with_source(calls: Arc<AtomicUsize>, succeed_on: usize) -> Registry {
        let mut registry = Registry::new();
        registry
            .register_with("Source", move |_| {
                Ok(Arc::new(FlakySource {
                    config: PluginConfig::new("Source"),
                    calls: Arc::clone(&calls),
                    succeed_on,
                }) as Arc<dyn Plugin>)
            })
            .unwrap();
        registry
            .register_with("A", stage_constructor("A", &[], false))
            .unwrap();
        registry
            .register_with("B", stage_constructor("B", &["A"], false))
            .unwrap();
        registry
            .register_with("Broken", stage_constructor("Broken", &[], true))
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_stages_run_in_order() {
        let registry = Arc::new(registry_with_source(Arc::new(AtomicUsize::new(0)), 1));
        let runner = PipelineRunner::new(registry);

        let report = runner.execute(&names(&["Source", "A", "B"])).await.unwrap();

        assert_eq!(report.attempts, 1);
        assert!(report.violations.is_empty());
        let order: Vec<_> = report.stages.iter().map(|s| s.plugin_name.as_str()).collect();
        assert_eq!(order, vec!["Source", "A", "B"]);
        assert_eq!(report.stages[0].input_records, 0);
        assert_eq!(report.stages[2].output_records, 2);
        let ids: Vec<_> = report.records.iter().map(Record::entry_id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_dependency_order_is_reported_not_enforced() {
        let registry = Arc::new(registry_with_source(Arc::new(AtomicUsize::new(0)), 1));
        let runner = PipelineRunner::new(registry);

        let report = runner.execute(&names(&["Source", "B", "A"])).await.unwrap();
        assert_eq!(
            report.violations,
            vec![DependencyViolation::OutOfOrder {
                plugin: "B".to_string(),
                dependency: "A".to_string(),
            }]
        );
        assert_eq!(report.records.len(), 2);

        let report = runner.execute(&names(&["Source", "A", "B"])).await.unwrap();
        assert!(report.violations.is_empty());
    }

    #[tokio::test]
    async fn test_missing_dependency_is_reported() {
        let registry = Arc::new(registry_with_source(Arc::new(AtomicUsize::new(0)), 1));
        let resolved = PipelineRunner::new(Arc::clone(&registry))
            .resolve(&names(&["Source", "B"]))
            .unwrap();

        let violations = validate_dependencies(&names(&["Source", "B"]), &resolved);
        assert!(matches!(
            violations.as_slice(),
            [DependencyViolation::Missing { dependency, .. }] if dependency == "A"
        ));
    }

    #[tokio::test]
    async fn test_strict_mode_aborts_before_execution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(registry_with_source(Arc::clone(&calls), 1));
        let runner = PipelineRunner::new(registry).strict_dependencies(true);

        let err = runner.execute(&names(&["Source", "B", "A"])).await.unwrap_err();
        assert!(matches!(err, PipelineError::DependencyViolations { count: 1, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_plugin_aborts_before_any_stage() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(registry_with_source(Arc::clone(&calls), 1));
        let runner = PipelineRunner::new(registry);

        let err = runner.execute(&names(&["Source", "Ghost"])).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Registry(RegistryError::PluginNotFound(name)) if name == "Ghost"
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_plugin_failure_names_the_plugin() {
        let registry = Arc::new(registry_with_source(Arc::new(AtomicUsize::new(0)), 1));
        let runner = PipelineRunner::new(registry);

        let err = runner.execute(&names(&["Source", "Broken"])).await.unwrap_err();
        assert!(matches!(err, PipelineError::Plugin { plugin, .. } if plugin == "Broken"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_envelope_recovers_on_third_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(registry_with_source(Arc::clone(&calls), 3));
        let runner = PipelineRunner::new(registry)
            .with_max_retries(2)
            .with_retry_interval(Duration::from_secs(3));

        let started = tokio::time::Instant::now();
        let report = runner.execute(&names(&["Source", "A"])).await.unwrap();

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_envelope_gives_up() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(registry_with_source(Arc::clone(&calls), 3));
        let runner = PipelineRunner::new(registry).with_max_retries(1);

        let report = runner.execute(&names(&["Source", "A"])).await.unwrap();

        assert!(report.records.is_empty());
        assert_eq!(report.attempts, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
