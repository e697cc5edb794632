use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use planloom_config::{load_config, PlanloomConfig};
use planloom_core::value::{Object, Value};
use planloom_runtime::{
    init_tracing, load_plan, CollectingProgressReporter, PlanRuntime, RunOptions,
    TracingProgressReporter,
};

#[derive(Debug, Parser)]
#[command(name = "planloom", about = "Planloom plan interpreter")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate and execute a plan, printing its result as JSON
    Run(RunArgs),
    /// Run only the static validation pass
    Validate(ValidateArgs),
    /// List the registered functions
    Functions(FunctionsArgs),
}

#[derive(Debug, Args, Clone)]
struct RunArgs {
    /// Plan document (.json, .yaml, .yml)
    #[arg(long)]
    plan: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Plan argument as key=value; the value is parsed as JSON, else taken as a string
    #[arg(long = "arg", value_name = "KEY=VALUE")]
    args: Vec<String>,
    /// Per-invocation timeout, overrides the config
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Print the step trace to stderr
    #[arg(long)]
    trace: bool,
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Args, Clone)]
struct ValidateArgs {
    #[arg(long)]
    plan: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Names bound at the root scope
    #[arg(long = "arg", value_name = "KEY=VALUE")]
    args: Vec<String>,
}

#[derive(Debug, Args, Clone)]
struct FunctionsArgs {
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Run(args) => {
                ensure_log_filter(args.verbose);
                run_plan(args).await
            }
            Command::Validate(args) => {
                ensure_log_filter(false);
                validate_plan(args)
            }
            Command::Functions(args) => {
                ensure_log_filter(false);
                list_functions(args)
            }
        }
    }
}

async fn run_plan(args: RunArgs) -> anyhow::Result<()> {
    let runtime = build_runtime(args.config.as_deref())?;
    let plan = load_plan(&args.plan)
        .with_context(|| format!("failed to load plan '{}'", args.plan.display()))?;

    let cancellation_token = CancellationToken::new();
    let signal_token = cancellation_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling plan");
            signal_token.cancel();
        }
    });

    let collector = Arc::new(CollectingProgressReporter::new());
    let mut options = RunOptions::new()
        .with_arguments(parse_arguments(&args.args)?)
        .with_cancellation_token(cancellation_token);
    if args.trace {
        options = options.with_progress_reporter(collector.clone());
    } else {
        options = options.with_progress_reporter(Arc::new(TracingProgressReporter::new(
            runtime.config.executor.max_trace_value_chars,
        )));
    }
    if let Some(ms) = args.timeout_ms {
        options = options.with_invocation_timeout(Duration::from_millis(ms));
    }

    let outcome = runtime.run(&plan, options).await;
    if args.trace {
        for line in collector.lines() {
            eprintln!("{}", line);
        }
    }

    let output = match outcome {
        Ok(output) => output,
        Err(failure) => {
            if !failure.emitted.is_empty() {
                eprintln!(
                    "emitted before failure: {}",
                    Value::List(failure.emitted.clone()).render_json()
                );
            }
            bail!(failure);
        }
    };
    tracing::info!(
        execution_id = %output.execution_id,
        steps = output.steps_executed,
        invocations = output.invocations,
        "plan finished"
    );
    println!("{}", serde_json::to_string_pretty(&output.result.to_json())?);
    Ok(())
}

fn validate_plan(args: ValidateArgs) -> anyhow::Result<()> {
    let runtime = build_runtime(args.config.as_deref())?;
    let plan = load_plan(&args.plan)
        .with_context(|| format!("failed to load plan '{}'", args.plan.display()))?;
    let arguments = parse_arguments(&args.args)?;
    runtime.validate(&plan, &arguments)?;
    println!(
        "plan '{}' is valid ({} steps, {} functions)",
        args.plan.display(),
        plan.node_count(),
        plan.called_functions().len()
    );
    Ok(())
}

fn list_functions(args: FunctionsArgs) -> anyhow::Result<()> {
    let runtime = build_runtime(args.config.as_deref())?;
    for meta in runtime.functions() {
        println!("{}", meta.name);
        if !meta.description.is_empty() {
            println!("    {}", meta.description);
        }
        for parameter in &meta.parameters {
            let marker = if parameter.required { "" } else { "?" };
            println!("    - {}{}: {}", parameter.name, marker, parameter.description);
        }
    }
    Ok(())
}

fn build_runtime(config: Option<&Path>) -> anyhow::Result<PlanRuntime> {
    let config = match config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => PlanloomConfig::default(),
    };
    init_tracing(&config.observability);
    Ok(PlanRuntime::from_config(config)?)
}

fn parse_arguments(raw: &[String]) -> anyhow::Result<Object> {
    let mut arguments = Object::new();
    for entry in raw {
        let Some((key, value)) = entry.split_once('=') else {
            bail!("invalid --arg '{}', expected KEY=VALUE", entry);
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("invalid --arg '{}', empty key", entry);
        }
        arguments.insert(key.to_string(), parse_argument_value(value));
    }
    Ok(arguments)
}

fn parse_argument_value(raw: &str) -> Value {
    serde_json::from_str::<serde_json::Value>(raw)
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(raw))
}

fn ensure_log_filter(verbose: bool) {
    if env::var("RUST_LOG").is_ok() {
        return;
    }
    let level = if verbose { "debug" } else { "warn" };
    env::set_var("RUST_LOG", level);
}
