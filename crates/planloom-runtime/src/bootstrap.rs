//! Runtime assembly: config -> registry -> executor.

use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use planloom_config::{load_config, ConfigError, ObservabilityConfig, PlanloomConfig};
use planloom_core::error::ExecutionFailure;
use planloom_core::executor::{ExecutionProgressReporter, Executor, ExecutorContext, PlanOutput};
use planloom_core::function::{FunctionMeta, FunctionRegistry, RegistryError};
use planloom_core::planner::{PlanError, Planner, PlannerContext};
use planloom_core::types::Plan;
use planloom_core::validator::ValidationError;
use planloom_core::value::{Object, Value};
use planloom_plugins::register_builtin_plugins;

use crate::plan_file::PlanLoadError;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("plan load error: {0}")]
    PlanLoad(#[from] PlanLoadError),
    #[error("planner error: {0}")]
    Planner(#[from] PlanError),
    #[error(transparent)]
    Execution(#[from] ExecutionFailure),
}

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Per-run inputs.
#[derive(Clone, Default)]
pub struct RunOptions {
    pub arguments: Object,
    pub cancellation_token: Option<CancellationToken>,
    pub progress_reporter: Option<Arc<dyn ExecutionProgressReporter>>,
    /// Overrides the configured per-invocation timeout.
    pub invocation_timeout: Option<Duration>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arguments(mut self, arguments: Object) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn with_progress_reporter(mut self, reporter: Arc<dyn ExecutionProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    pub fn with_invocation_timeout(mut self, timeout: Duration) -> Self {
        self.invocation_timeout = Some(timeout);
        self
    }
}

/// A configured interpreter: built-in plugins registered, executor ready.
pub struct PlanRuntime {
    pub config: PlanloomConfig,
    executor: Executor,
}

impl PlanRuntime {
    pub fn from_config(config: PlanloomConfig) -> Result<Self, BootstrapError> {
        let mut registry = FunctionRegistry::new();
        let added =
            register_builtin_plugins(&mut registry, |name| config.plugins.is_enabled(name))?;
        tracing::info!(
            app = %config.app.name,
            environment = %config.app.environment,
            functions = added,
            "function registry ready"
        );

        let executor = Executor::new(Arc::new(registry))
            .with_invocation_timeout(config.executor.invocation_timeout());
        Ok(Self { config, executor })
    }

    pub fn from_config_path(path: impl AsRef<Path>) -> Result<Self, BootstrapError> {
        let config = load_config(path.as_ref())?;
        Self::from_config(config)
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.executor.registry
    }

    pub fn functions(&self) -> Vec<FunctionMeta> {
        self.executor.registry.metas()
    }

    pub fn validate(&self, plan: &Plan, arguments: &Object) -> Result<(), ValidationError> {
        self.executor.validate(plan, arguments)
    }

    pub async fn run(
        &self,
        plan: &Plan,
        options: RunOptions,
    ) -> Result<PlanOutput, ExecutionFailure> {
        let mut ctx = ExecutorContext::new().with_arguments(options.arguments);
        if let Some(token) = options.cancellation_token {
            ctx = ctx.with_cancellation_token(token);
        }
        if let Some(reporter) = options.progress_reporter {
            ctx = ctx.with_progress_reporter(reporter);
        }

        match options.invocation_timeout {
            Some(timeout) => {
                let executor = Executor::new(self.executor.registry.clone())
                    .with_invocation_timeout(Some(timeout));
                executor.execute(plan, &ctx).await
            }
            None => self.executor.execute(plan, &ctx).await,
        }
    }

    /// Ask `planner` for a plan, then run it.
    pub async fn plan_and_run(
        &self,
        planner: &dyn Planner,
        instruction: &str,
        options: RunOptions,
    ) -> Result<PlanOutput, BootstrapError> {
        let context = PlannerContext::from_registry(self.registry())
            .with_arguments(options.arguments.clone());
        let plan = planner.plan(instruction, &context).await?;
        tracing::info!(goal = %plan.goal, steps = plan.node_count(), "plan generated");
        Ok(self.run(&plan, options).await?)
    }
}

/// Install the global tracing subscriber once per process.
///
/// `PLANLOOM_LOG_FILE` overrides `observability.log_file`; `RUST_LOG` overrides
/// `observability.log_level`.
pub fn init_tracing(observability: &ObservabilityConfig) {
    TRACING_INIT.get_or_init(|| {
        let settings =
            TracingSettings::resolve(observability, std::env::var("PLANLOOM_LOG_FILE").ok());
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(settings.level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let file_writer = settings.log_file.as_deref().and_then(create_log_writer);
        let to_file = file_writer.is_some();
        let writer = match file_writer {
            Some(writer) => BoxMakeWriter::new(writer),
            None => BoxMakeWriter::new(std::io::stderr),
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(!to_file)
            .with_writer(writer)
            .with_span_events(settings.span_events)
            .try_init();

        tracing::info!(
            log_level = %observability.log_level,
            traces_enabled = observability.traces_enabled,
            log_file = settings.log_file.as_deref().unwrap_or("(stderr)"),
            "tracing initialized"
        );
    });
}

/// Subscriber options derived from the observability config.
#[derive(Debug)]
struct TracingSettings {
    level: &'static str,
    span_events: FmtSpan,
    log_file: Option<String>,
}

impl TracingSettings {
    fn resolve(observability: &ObservabilityConfig, env_log_file: Option<String>) -> Self {
        let level = match observability.log_level.trim().to_ascii_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "warn" => "warn",
            "error" => "error",
            _ => "info",
        };
        let span_events = if observability.traces_enabled {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let log_file = env_log_file
            .filter(|v| !v.trim().is_empty())
            .or_else(|| observability.log_file.clone());
        Self {
            level,
            span_events,
            log_file,
        }
    }
}

fn create_log_writer(path: &str) -> Option<SharedFileMakeWriter> {
    use std::fs::{create_dir_all, OpenOptions};

    let file_path = Path::new(path);
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(err) = create_dir_all(parent) {
                eprintln!(
                    "failed to create log directory '{}': {}",
                    parent.display(),
                    err
                );
                return None;
            }
        }
    }
    match OpenOptions::new().create(true).append(true).open(file_path) {
        Ok(file) => Some(SharedFileMakeWriter::new(file)),
        Err(err) => {
            eprintln!("failed to open log file '{}': {}", file_path.display(), err);
            None
        }
    }
}

#[derive(Clone)]
struct SharedFileMakeWriter {
    file: Arc<std::sync::Mutex<std::fs::File>>,
}

impl SharedFileMakeWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: Arc::new(std::sync::Mutex::new(file)),
        }
    }
}

struct SharedFileWriter {
    file: Arc<std::sync::Mutex<std::fs::File>>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedFileMakeWriter {
    type Writer = SharedFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SharedFileWriter {
            file: self.file.clone(),
        }
    }
}

impl std::io::Write for SharedFileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| std::io::Error::other("log file mutex poisoned"))?;
        std::io::Write::write(&mut *file, buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| std::io::Error::other("log file mutex poisoned"))?;
        std::io::Write::flush(&mut *file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan_file::load_plan;
    use crate::planner::StaticPlanner;
    use crate::reporter::CollectingProgressReporter;
    use planloom_config::{parse_config, PluginsConfig};
    use planloom_core::error::ErrorKind;
    use std::path::PathBuf;

    fn plan_path(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../plans")
            .join(name)
    }

    fn runtime() -> PlanRuntime {
        PlanRuntime::from_config(PlanloomConfig::default()).expect("runtime")
    }

    #[tokio::test]
    async fn test_document_answer_without_matches_is_null() {
        let plan = load_plan(&plan_path("document_answer.yaml")).expect("plan");
        let output = runtime()
            .run(
                &plan,
                RunOptions::new()
                    .with_argument("user_request", "Whis the background of Privacy Agreement?"),
            )
            .await
            .expect("run");
        assert!(output.result.is_null());
        assert!(output.emitted.is_empty());
    }

    #[tokio::test]
    async fn test_document_answer_reads_fields_of_text_as_null() {
        let plan = load_plan(&plan_path("document_answer.yaml")).expect("plan");
        let output = runtime()
            .run(&plan, RunOptions::new().with_argument("user_request", "Privacy"))
            .await
            .expect("run");
        assert!(output.result.is_null());
        assert!(output.emitted.is_empty());
        // search, details, field names, then value and contents per custom field
        assert_eq!(output.invocations, 15);
    }

    #[tokio::test]
    async fn test_privacy_background_plan() {
        let plan = load_plan(&plan_path("privacy_background.yaml")).expect("plan");
        let output = runtime()
            .run(&plan, RunOptions::new().with_argument("document_name", "privacy"))
            .await
            .expect("run");
        let record = output.result.as_object().expect("object");
        assert_eq!(record.get("document"), Some(&Value::from(101)));
        assert_eq!(record.get("status"), Some(&Value::from("Active")));
        assert_eq!(
            record.get("background"),
            Some(&Value::from(
                "Machine learning is a rapidly growing field in artificial intelligence."
            ))
        );
    }

    #[tokio::test]
    async fn test_pending_orders_plan_with_progress() {
        let plan = load_plan(&plan_path("pending_orders.json")).expect("plan");
        let reporter = Arc::new(CollectingProgressReporter::new());
        let output = runtime()
            .run(&plan, RunOptions::new().with_progress_reporter(reporter.clone()))
            .await
            .expect("run");
        assert_eq!(output.result, Value::from("Order pending for Alex Johnson"));
        assert_eq!(output.invocations, 5);

        let lines = reporter.lines();
        assert_eq!(lines.first().map(String::as_str), Some("plan_started"));
        assert!(lines.last().is_some_and(|line| line.starts_with("plan_completed")));
        assert!(lines.iter().any(|line| line.starts_with("step_started $[0].each[2][1]")));
    }

    #[tokio::test]
    async fn test_disabled_plugin_makes_plan_malformed() {
        let config = PlanloomConfig {
            plugins: PluginsConfig {
                enabled: vec!["DocumentPlugins".to_string()],
            },
            ..PlanloomConfig::default()
        };
        let runtime = PlanRuntime::from_config(config).expect("runtime");
        assert_eq!(runtime.functions().len(), 6);

        let plan = load_plan(&plan_path("pending_orders.json")).expect("plan");
        let failure = runtime.run(&plan, RunOptions::new()).await.unwrap_err();
        assert_eq!(failure.kind(), ErrorKind::MalformedPlan);
        assert_eq!(failure.path.to_string(), "$[0]");
    }

    #[test]
    fn test_configured_timeout_applies() {
        let config = parse_config("executor:\n  invocation_timeout_ms: 250\n").expect("config");
        let runtime = PlanRuntime::from_config(config).expect("runtime");
        assert_eq!(
            runtime.executor.invocation_timeout,
            Some(Duration::from_millis(250))
        );
    }

    #[tokio::test]
    async fn test_plan_and_run_with_static_planner() {
        let plan = load_plan(&plan_path("privacy_background.yaml")).expect("plan");
        let output = runtime()
            .plan_and_run(
                &StaticPlanner::new(plan),
                "background of the privacy agreement",
                RunOptions::new().with_argument("document_name", "Non-Disclosure"),
            )
            .await
            .expect("run");
        let record = output.result.as_object().expect("object");
        assert_eq!(record.get("status"), Some(&Value::from("Archived")));
    }

    #[test]
    fn test_from_config_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("planloom.yaml");
        std::fs::write(&path, "plugins:\n  enabled: [UserPlugins]\n").expect("write");
        let runtime = PlanRuntime::from_config_path(&path).expect("runtime");
        assert_eq!(runtime.functions().len(), 1);

        let missing = PlanRuntime::from_config_path(dir.path().join("absent.yaml"));
        assert!(matches!(missing, Err(BootstrapError::Config(_))));
    }

    #[test]
    fn test_tracing_settings_resolve() {
        let observability = ObservabilityConfig {
            log_level: " DEBUG ".to_string(),
            traces_enabled: true,
            log_file: Some("logs/planloom.log".to_string()),
        };
        let settings = TracingSettings::resolve(&observability, None);
        assert_eq!(settings.level, "debug");
        assert_eq!(settings.span_events, FmtSpan::NEW | FmtSpan::CLOSE);
        assert_eq!(settings.log_file.as_deref(), Some("logs/planloom.log"));

        let settings = TracingSettings::resolve(
            &ObservabilityConfig {
                log_level: "verbose".to_string(),
                ..observability
            },
            Some("override.log".to_string()),
        );
        assert_eq!(settings.level, "info");
        assert_eq!(settings.log_file.as_deref(), Some("override.log"));

        let settings =
            TracingSettings::resolve(&ObservabilityConfig::default(), Some("  ".to_string()));
        assert_eq!(settings.span_events, FmtSpan::NONE);
        assert!(settings.log_file.is_none());
    }

    #[test]
    fn test_log_writer_creates_parent_and_appends() {
        use std::io::Write;
        use tracing_subscriber::fmt::MakeWriter;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/planloom.log");
        let make_writer = create_log_writer(path.to_str().expect("utf8 path")).expect("writer");
        make_writer.make_writer().write_all(b"first\n").expect("write");
        make_writer.make_writer().write_all(b"second\n").expect("write");
        make_writer.make_writer().flush().expect("flush");
        assert_eq!(
            std::fs::read_to_string(&path).expect("read"),
            "first\nsecond\n"
        );
    }

    #[test]
    fn test_init_tracing_opens_configured_log_file_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logs/run.log");
        let observability = ObservabilityConfig {
            log_file: Some(path.to_string_lossy().into_owned()),
            ..ObservabilityConfig::default()
        };
        init_tracing(&observability);
        assert!(path.exists());

        // Later calls keep the first subscriber.
        let other = dir.path().join("logs/other.log");
        init_tracing(&ObservabilityConfig {
            log_file: Some(other.to_string_lossy().into_owned()),
            ..ObservabilityConfig::default()
        });
        assert!(!other.exists());
    }
}
