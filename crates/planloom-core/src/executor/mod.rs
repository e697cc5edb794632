//! Executor module
//!
//! The Executor is responsible for:
//! - Static validation before any step runs
//! - Document-order interpretation of the plan tree via an explicit work list
//! - Scope management for conditional branches and loop iterations
//! - Emit accumulation and the final result policy

mod progress;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::{CancelReason, ExecError, ExecutionFailure};
use crate::evaluator::Evaluator;
use crate::function::FunctionRegistry;
use crate::scope::Scope;
use crate::types::{Plan, PlanNode, StepPath};
use crate::validator::{PlanValidator, ValidationError};
use crate::value::{Object, Value};

pub(crate) use progress::report_progress;
pub use progress::{ExecutionProgressEvent, ExecutionProgressReporter, ExecutionState};

/// Executor context for a single plan run
#[derive(Clone)]
pub struct ExecutorContext {
    /// Execution ID attached to every event and invocation
    pub execution_id: String,
    /// Named top-level arguments seeding the root scope
    pub arguments: Object,
    /// External cancellation signal
    pub cancellation_token: CancellationToken,
    /// Optional execution progress reporter.
    pub progress_reporter: Option<Arc<dyn ExecutionProgressReporter>>,
}

impl ExecutorContext {
    pub fn new() -> Self {
        Self {
            execution_id: uuid::Uuid::new_v4().to_string(),
            arguments: Object::new(),
            cancellation_token: CancellationToken::new(),
            progress_reporter: None,
        }
    }

    pub fn with_arguments(mut self, arguments: Object) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    pub fn with_execution_id(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = execution_id.into();
        self
    }

    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    pub fn with_progress_reporter(mut self, reporter: Arc<dyn ExecutionProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }
}

impl Default for ExecutorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a completed plan run
#[derive(Debug, Clone, Serialize)]
pub struct PlanOutput {
    pub execution_id: String,
    /// `Null` for zero emits, the value for one, a list of all for several
    pub result: Value,
    /// Every emitted value in order
    pub emitted: Vec<Value>,
    pub steps_executed: usize,
    pub invocations: usize,
}

fn result_from_emits(emitted: &[Value]) -> Value {
    match emitted {
        [] => Value::Null,
        [single] => single.clone(),
        many => Value::List(many.to_vec()),
    }
}

/// Pending unit of work. The list is a stack; blocks are pushed in reverse
/// so that popping yields document order.
enum Work<'p> {
    Step {
        node: &'p PlanNode,
        path: StepPath,
    },
    Iterate {
        item: &'p str,
        body: &'p [PlanNode],
        items: std::vec::IntoIter<Value>,
        index: usize,
        path: StepPath,
    },
    ExitScope,
}

fn push_block<'p>(work: &mut Vec<Work<'p>>, nodes: &'p [PlanNode], parent: &StepPath) {
    for (index, node) in nodes.iter().enumerate().rev() {
        work.push(Work::Step {
            node,
            path: parent.index(index),
        });
    }
}

/// Mutable state of one run
struct RunState<'p> {
    scope: Scope,
    work: Vec<Work<'p>>,
    emitted: Vec<Value>,
    steps_executed: usize,
}

/// The executor - interprets plans against a shared function registry
pub struct Executor {
    /// Function registry, read-only for the duration of a run
    pub registry: Arc<FunctionRegistry>,
    /// Per-invocation timeout, applied as cancellation of the suspended call
    pub invocation_timeout: Option<Duration>,
}

impl Executor {
    /// Create a new executor
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self {
            registry,
            invocation_timeout: None,
        }
    }

    /// Set the per-invocation timeout
    pub fn with_invocation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.invocation_timeout = timeout;
        self
    }

    /// Run only the static validation pass.
    pub fn validate(&self, plan: &Plan, arguments: &Object) -> Result<(), ValidationError> {
        PlanValidator::new(&self.registry).validate(plan, arguments.keys().map(String::as_str))
    }

    /// Execute a plan
    pub async fn execute(
        &self,
        plan: &Plan,
        ctx: &ExecutorContext,
    ) -> Result<PlanOutput, ExecutionFailure> {
        let reporter = ctx.progress_reporter.as_ref();
        tracing::info!(
            execution_id = %ctx.execution_id,
            goal = %plan.goal,
            steps = plan.node_count(),
            "plan execution started"
        );
        report_progress(
            reporter,
            ExecutionProgressEvent::new(&ctx.execution_id, "plan_started", ExecutionState::Ready)
                .with_message(plan.goal.clone())
                .with_metadata(serde_json::json!({ "steps": plan.node_count() })),
        )
        .await;

        if let Err(err) = self.validate(plan, &ctx.arguments) {
            let path = err.path().clone();
            return Err(self
                .fail(ctx, path, ExecError::MalformedPlan(err), Vec::new())
                .await);
        }

        let evaluator = Evaluator::new(&self.registry, &ctx.execution_id)
            .with_cancellation_token(ctx.cancellation_token.clone())
            .with_invocation_timeout(self.invocation_timeout)
            .with_progress_reporter(ctx.progress_reporter.clone());

        let mut state = RunState {
            scope: Scope::with_arguments(ctx.arguments.clone()),
            work: Vec::new(),
            emitted: Vec::new(),
            steps_executed: 0,
        };
        push_block(&mut state.work, &plan.steps, &StepPath::root());

        let started = Instant::now();
        while let Some(work) = state.work.pop() {
            match work {
                Work::Step { node, path } => {
                    if ctx.cancellation_token.is_cancelled() {
                        let error = ExecError::Cancelled(CancelReason::Signal);
                        return Err(self.fail(ctx, path, error, state.emitted).await);
                    }
                    let kind = node.kind();
                    tracing::debug!(
                        execution_id = %ctx.execution_id,
                        step = %path,
                        kind = %kind,
                        "step started"
                    );
                    report_progress(
                        reporter,
                        ExecutionProgressEvent::new(
                            &ctx.execution_id,
                            "step_started",
                            ExecutionState::Running { step: kind },
                        )
                        .with_step(&path, kind),
                    )
                    .await;

                    let step_started = Instant::now();
                    if let Err(error) = self.run_step(node, &path, &evaluator, &mut state).await {
                        return Err(self.fail(ctx, path, error, state.emitted).await);
                    }
                    state.steps_executed += 1;
                    report_progress(
                        reporter,
                        ExecutionProgressEvent::new(
                            &ctx.execution_id,
                            "step_completed",
                            ExecutionState::Ready,
                        )
                        .with_step(&path, kind)
                        .with_duration(step_started.elapsed()),
                    )
                    .await;
                }
                Work::Iterate {
                    item,
                    body,
                    mut items,
                    index,
                    path,
                } => {
                    let Some(element) = items.next() else {
                        continue;
                    };
                    let iteration = path.iteration(index);
                    state.scope.push_child();
                    state.scope.bind(item, element);
                    state.work.push(Work::Iterate {
                        item,
                        body,
                        items,
                        index: index + 1,
                        path,
                    });
                    state.work.push(Work::ExitScope);
                    push_block(&mut state.work, body, &iteration);
                }
                Work::ExitScope => {
                    state.scope.pop_child();
                }
            }
        }

        let output = PlanOutput {
            execution_id: ctx.execution_id.clone(),
            result: result_from_emits(&state.emitted),
            emitted: state.emitted,
            steps_executed: state.steps_executed,
            invocations: evaluator.invocation_count(),
        };
        tracing::info!(
            execution_id = %ctx.execution_id,
            steps_executed = output.steps_executed,
            invocations = output.invocations,
            emitted = output.emitted.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "plan execution completed"
        );
        report_progress(
            reporter,
            ExecutionProgressEvent::new(
                &ctx.execution_id,
                "plan_completed",
                ExecutionState::Completed,
            )
            .with_duration(started.elapsed())
            .with_metadata(serde_json::json!({
                "steps_executed": output.steps_executed,
                "invocations": output.invocations,
                "emitted": output.emitted.len(),
            })),
        )
        .await;
        Ok(output)
    }

    async fn run_step<'p>(
        &self,
        node: &'p PlanNode,
        path: &StepPath,
        evaluator: &Evaluator<'_>,
        state: &mut RunState<'p>,
    ) -> Result<(), ExecError> {
        match node {
            PlanNode::Set { target, value } => {
                let value = evaluator.evaluate(value, &state.scope, path).await?;
                state.scope.bind(target.clone(), value);
            }
            PlanNode::Call(call) => {
                evaluator.call(call, &state.scope, path).await?;
            }
            PlanNode::Conditional {
                predicate,
                then,
                otherwise,
            } => {
                let taken = evaluator
                    .evaluate(predicate, &state.scope, path)
                    .await?
                    .is_truthy();
                let branch = if taken {
                    Some((then.as_slice(), path.then_branch()))
                } else {
                    otherwise
                        .as_deref()
                        .map(|block| (block, path.else_branch()))
                };
                if let Some((block, branch_path)) = branch {
                    state.scope.push_child();
                    state.work.push(Work::ExitScope);
                    push_block(&mut state.work, block, &branch_path);
                }
            }
            PlanNode::Loop { source, item, body } => {
                let items = evaluator
                    .evaluate(source, &state.scope, path)
                    .await?
                    .into_list()?;
                tracing::debug!(
                    step = %path,
                    source = source.label(),
                    iterations = items.len(),
                    "loop source resolved"
                );
                state.work.push(Work::Iterate {
                    item,
                    body,
                    items: items.into_iter(),
                    index: 0,
                    path: path.clone(),
                });
            }
            PlanNode::Emit { value } => {
                let value = evaluator.evaluate(value, &state.scope, path).await?;
                state.emitted.push(value);
            }
        }
        Ok(())
    }

    async fn fail(
        &self,
        ctx: &ExecutorContext,
        path: StepPath,
        error: ExecError,
        emitted: Vec<Value>,
    ) -> ExecutionFailure {
        tracing::error!(
            execution_id = %ctx.execution_id,
            step = %path,
            kind = ?error.kind(),
            error = %error,
            "plan execution failed"
        );
        let reporter = ctx.progress_reporter.as_ref();
        report_progress(
            reporter,
            ExecutionProgressEvent::new(&ctx.execution_id, "step_failed", ExecutionState::Failed)
                .with_path(&path)
                .with_message(error.to_string()),
        )
        .await;
        report_progress(
            reporter,
            ExecutionProgressEvent::new(&ctx.execution_id, "plan_failed", ExecutionState::Failed)
                .with_path(&path)
                .with_message(error.to_string())
                .with_metadata(serde_json::json!({ "kind": error.kind() })),
        )
        .await;
        ExecutionFailure {
            execution_id: ctx.execution_id.clone(),
            path,
            error,
            emitted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::RwLock;

    use crate::error::ErrorKind;
    use crate::function::{FnFunction, FunctionArgs, FunctionMeta, ParameterSpec};
    use crate::types::{CallExpr, Expr};
    use crate::value::object;

    struct CollectProgressReporter {
        events: Arc<RwLock<Vec<ExecutionProgressEvent>>>,
    }

    impl CollectProgressReporter {
        fn new() -> Self {
            Self {
                events: Arc::new(RwLock::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl ExecutionProgressReporter for CollectProgressReporter {
        async fn report(&self, event: ExecutionProgressEvent) -> Result<(), String> {
            self.events.write().await.push(event);
            Ok(())
        }
    }

    struct FailingReporter;

    #[async_trait]
    impl ExecutionProgressReporter for FailingReporter {
        async fn report(&self, _event: ExecutionProgressEvent) -> Result<(), String> {
            Err("sink unavailable".to_string())
        }
    }

    /// Registry of pure test functions sharing one invocation counter.
    fn test_registry(calls: Arc<AtomicUsize>) -> Arc<FunctionRegistry> {
        let mut registry = FunctionRegistry::new();
        let counted = |calls: &Arc<AtomicUsize>| {
            let calls = calls.clone();
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        };

        let tick = counted(&calls);
        registry
            .register(Arc::new(FnFunction::new(
                FunctionMeta::new("search", "search documents")
                    .with_parameter(ParameterSpec::required("query")),
                move |_args| {
                    tick();
                    async { Ok(Value::List(vec![Value::from(1)])) }
                },
            )))
            .expect("search");

        let tick = counted(&calls);
        registry
            .register(Arc::new(FnFunction::new(
                FunctionMeta::new("getDetails", "document details")
                    .with_parameter(ParameterSpec::required("id")),
                move |args: FunctionArgs| {
                    tick();
                    async move {
                        let id = args.require_i64("id")?;
                        Ok(Value::Object(object([
                            ("id", Value::from(id)),
                            ("status", Value::from("Active")),
                        ])))
                    }
                },
            )))
            .expect("getDetails");

        let tick = counted(&calls);
        registry
            .register(Arc::new(FnFunction::new(
                FunctionMeta::new("getStatus", "current status"),
                move |_args| {
                    tick();
                    async { Ok(Value::from("Pending")) }
                },
            )))
            .expect("getStatus");

        Arc::new(registry)
    }

    fn privacy_plan() -> Plan {
        Plan::new(
            "details of privacy documents",
            vec![
                PlanNode::set(
                    "ids",
                    Expr::call(CallExpr::new("search").arg("query", Expr::lit("Privacy"))),
                ),
                PlanNode::each(
                    Expr::var("ids"),
                    "id",
                    vec![
                        PlanNode::set(
                            "doc",
                            Expr::call(CallExpr::new("getDetails").arg("id", Expr::var("id"))),
                        ),
                        PlanNode::emit(Expr::var("doc")),
                    ],
                ),
            ],
        )
    }

    #[test]
    fn test_privacy_documents_scenario() {
        tokio_test::block_on(async {
            let calls = Arc::new(AtomicUsize::new(0));
            let executor = Executor::new(test_registry(calls.clone()));
            let output = executor
                .execute(&privacy_plan(), &ExecutorContext::new())
                .await
                .expect("execute");

            // A single emit is the result itself.
            assert_eq!(
                output.result,
                Value::Object(object([
                    ("id", Value::from(1)),
                    ("status", Value::from("Active")),
                ]))
            );
            assert_eq!(
                Value::List(output.emitted.clone()),
                Value::List(vec![Value::Object(object([
                    ("id", Value::from(1)),
                    ("status", Value::from("Active")),
                ]))])
            );
            assert_eq!(output.invocations, 2);
            assert_eq!(calls.load(Ordering::SeqCst), 2);
            assert_eq!(output.steps_executed, 4);
        });
    }

    #[test]
    fn test_conditional_takes_else_branch() {
        tokio_test::block_on(async {
            let executor = Executor::new(test_registry(Arc::new(AtomicUsize::new(0))));
            let plan = Plan::new(
                "",
                vec![PlanNode::conditional(
                    Expr::equals(Expr::call(CallExpr::new("getStatus")), Expr::lit("Done")),
                    vec![PlanNode::emit(Expr::lit("yes"))],
                    Some(vec![PlanNode::emit(Expr::lit("no"))]),
                )],
            );
            let output = executor
                .execute(&plan, &ExecutorContext::new())
                .await
                .expect("execute");
            assert_eq!(output.result, Value::from("no"));
        });
    }

    #[test]
    fn test_unknown_function_fails_before_any_invocation() {
        tokio_test::block_on(async {
            let calls = Arc::new(AtomicUsize::new(0));
            let executor = Executor::new(test_registry(calls.clone()));
            let plan = Plan::new(
                "",
                vec![
                    PlanNode::call(CallExpr::new("getStatus")),
                    PlanNode::call(CallExpr::new("missing")),
                ],
            );
            let failure = executor
                .execute(&plan, &ExecutorContext::new())
                .await
                .unwrap_err();
            assert_eq!(failure.kind(), ErrorKind::MalformedPlan);
            assert_eq!(failure.path, StepPath::root().index(1));
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        });
    }

    #[test]
    fn test_multiple_emits_and_no_emits() {
        tokio_test::block_on(async {
            let executor = Executor::new(Arc::new(FunctionRegistry::new()));
            let many = Plan::new(
                "",
                vec![
                    PlanNode::emit(Expr::lit(1)),
                    PlanNode::emit(Expr::lit("two")),
                ],
            );
            let output = executor
                .execute(&many, &ExecutorContext::new())
                .await
                .expect("execute");
            assert_eq!(
                output.result,
                Value::List(vec![Value::from(1), Value::from("two")])
            );

            let none = Plan::new("", vec![PlanNode::set("x", Expr::lit(1))]);
            let output = executor
                .execute(&none, &ExecutorContext::new())
                .await
                .expect("execute");
            assert_eq!(output.result, Value::Null);
        });
    }

    #[test]
    fn test_empty_loop_runs_zero_iterations() {
        tokio_test::block_on(async {
            let executor = Executor::new(Arc::new(FunctionRegistry::new()));
            let plan = Plan::new(
                "",
                vec![PlanNode::each(
                    Expr::var("items"),
                    "item",
                    vec![PlanNode::emit(Expr::var("item"))],
                )],
            );
            let ctx = ExecutorContext::new().with_argument("items", Value::List(Vec::new()));
            let output = executor.execute(&plan, &ctx).await.expect("execute");
            assert!(output.emitted.is_empty());
            assert_eq!(output.result, Value::Null);
            assert_eq!(output.steps_executed, 1);
        });
    }

    #[test]
    fn test_iteration_scopes_are_independent() {
        tokio_test::block_on(async {
            let executor = Executor::new(Arc::new(FunctionRegistry::new()));
            // `seen` is rebound per iteration; the root `seen` stays untouched.
            let plan = Plan::new(
                "",
                vec![
                    PlanNode::set("seen", Expr::lit("root")),
                    PlanNode::each(
                        Expr::lit(Value::List(vec![Value::from("a"), Value::from("b")])),
                        "item",
                        vec![
                            PlanNode::emit(Expr::var("seen")),
                            PlanNode::set("seen", Expr::var("item")),
                            PlanNode::emit(Expr::var("seen")),
                        ],
                    ),
                    PlanNode::emit(Expr::var("seen")),
                ],
            );
            let output = executor
                .execute(&plan, &ExecutorContext::new())
                .await
                .expect("execute");
            let expected: Vec<Value> = ["root", "a", "root", "b", "root"]
                .into_iter()
                .map(Value::from)
                .collect();
            assert_eq!(output.emitted, expected);
        });
    }

    #[test]
    fn test_branch_bindings_shadow_and_are_discarded() {
        tokio_test::block_on(async {
            let executor = Executor::new(Arc::new(FunctionRegistry::new()));
            let plan = Plan::new(
                "",
                vec![
                    PlanNode::conditional(
                        Expr::var("flag"),
                        vec![
                            PlanNode::set("flag", Expr::lit("inner")),
                            PlanNode::emit(Expr::var("flag")),
                        ],
                        None,
                    ),
                    PlanNode::emit(Expr::var("flag")),
                ],
            );
            let ctx = ExecutorContext::new().with_argument("flag", true);
            let output = executor.execute(&plan, &ctx).await.expect("execute");
            assert_eq!(
                output.emitted,
                vec![Value::from("inner"), Value::Bool(true)]
            );
        });
    }

    #[test]
    fn test_non_list_loop_source_is_type_mismatch() {
        tokio_test::block_on(async {
            let executor = Executor::new(test_registry(Arc::new(AtomicUsize::new(0))));
            let plan = Plan::new(
                "",
                vec![
                    PlanNode::emit(Expr::lit("before")),
                    PlanNode::each(
                        Expr::call(CallExpr::new("getStatus")),
                        "s",
                        vec![PlanNode::emit(Expr::var("s"))],
                    ),
                ],
            );
            let failure = executor
                .execute(&plan, &ExecutorContext::new())
                .await
                .unwrap_err();
            assert_eq!(failure.kind(), ErrorKind::TypeMismatch);
            assert_eq!(failure.path.to_string(), "$[1]");
            assert_eq!(failure.emitted, vec![Value::from("before")]);
        });
    }

    #[test]
    fn test_missing_argument_fails_at_runtime_without_invoking() {
        tokio_test::block_on(async {
            let calls = Arc::new(AtomicUsize::new(0));
            let executor = Executor::new(test_registry(calls.clone()));
            let plan = Plan::new(
                "",
                vec![PlanNode::call(
                    CallExpr::new("getDetails").arg("documentId", Expr::lit(1)),
                )],
            );
            let failure = executor
                .execute(&plan, &ExecutorContext::new())
                .await
                .unwrap_err();
            assert_eq!(failure.kind(), ErrorKind::MissingArgument);
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        });
    }

    #[test]
    fn test_reruns_are_deterministic() {
        tokio_test::block_on(async {
            let executor = Executor::new(test_registry(Arc::new(AtomicUsize::new(0))));
            let plan = privacy_plan();
            let first = executor
                .execute(&plan, &ExecutorContext::new())
                .await
                .expect("first");
            let second = executor
                .execute(&plan, &ExecutorContext::new())
                .await
                .expect("second");
            assert_eq!(first.result, second.result);
            assert_eq!(
                first.result.render_json(),
                r#"{"id":1,"status":"Active"}"#
            );
            assert_ne!(first.execution_id, second.execution_id);
        });
    }

    #[test]
    fn test_cancellation_during_suspended_call() {
        tokio_test::block_on(async {
            let token = CancellationToken::new();
            let trigger = token.clone();
            let mut registry = FunctionRegistry::new();
            registry
                .register(Arc::new(FnFunction::new(
                    FunctionMeta::new("hang", "cancels the run and never returns"),
                    move |_args| {
                        let trigger = trigger.clone();
                        async move {
                            trigger.cancel();
                            tokio::time::sleep(Duration::from_secs(30)).await;
                            Ok(Value::Null)
                        }
                    },
                )))
                .expect("register");
            let executor = Executor::new(Arc::new(registry));
            let plan = Plan::new(
                "",
                vec![
                    PlanNode::emit(Expr::lit("kept")),
                    PlanNode::call(CallExpr::new("hang")),
                    PlanNode::emit(Expr::lit("never")),
                ],
            );
            let ctx = ExecutorContext::new().with_cancellation_token(token);
            let failure = executor.execute(&plan, &ctx).await.unwrap_err();
            assert!(matches!(
                failure.error,
                ExecError::Cancelled(CancelReason::Signal)
            ));
            assert_eq!(failure.path, StepPath::root().index(1));
            assert_eq!(failure.emitted, vec![Value::from("kept")]);
        });
    }

    #[test]
    fn test_invocation_timeout_fails_plan() {
        tokio_test::block_on(async {
            let mut registry = FunctionRegistry::new();
            registry
                .register(Arc::new(FnFunction::new(
                    FunctionMeta::new("slow", "sleeps"),
                    |_args| async {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        Ok(Value::Null)
                    },
                )))
                .expect("register");
            let executor = Executor::new(Arc::new(registry))
                .with_invocation_timeout(Some(Duration::from_millis(10)));
            let plan = Plan::new("", vec![PlanNode::call(CallExpr::new("slow"))]);
            let failure = executor
                .execute(&plan, &ExecutorContext::new())
                .await
                .unwrap_err();
            assert!(matches!(
                failure.error,
                ExecError::Cancelled(CancelReason::Timeout(_))
            ));
        });
    }

    #[test]
    fn test_progress_events_follow_document_order() {
        tokio_test::block_on(async {
            let executor = Executor::new(test_registry(Arc::new(AtomicUsize::new(0))));
            let reporter = Arc::new(CollectProgressReporter::new());
            let ctx = ExecutorContext::new()
                .with_execution_id("exec-progress")
                .with_progress_reporter(reporter.clone());
            executor
                .execute(&privacy_plan(), &ctx)
                .await
                .expect("execute");

            let events = reporter.events.read().await;
            let started: Vec<String> = events
                .iter()
                .filter(|e| e.phase == "step_started")
                .filter_map(|e| e.path.as_ref().map(|p| p.to_string()))
                .collect();
            assert_eq!(started, vec!["$[0]", "$[1]", "$[1].each[0][0]", "$[1].each[0][1]"]);
            assert_eq!(
                events.first().map(|e| e.phase.as_str()),
                Some("plan_started")
            );
            assert_eq!(
                events.last().map(|e| e.phase.as_str()),
                Some("plan_completed")
            );
            assert!(events
                .iter()
                .any(|e| e.phase == "step_suspended"
                    && e.state
                        == ExecutionState::Suspended {
                            function: "getDetails".to_string()
                        }));
            assert!(events.iter().all(|e| e.execution_id == "exec-progress"));
        });
    }

    #[test]
    fn test_reporter_failure_does_not_fail_plan() {
        tokio_test::block_on(async {
            let executor = Executor::new(Arc::new(FunctionRegistry::new()));
            let ctx = ExecutorContext::new().with_progress_reporter(Arc::new(FailingReporter));
            let plan = Plan::new("", vec![PlanNode::emit(Expr::lit(true))]);
            let output = executor.execute(&plan, &ctx).await.expect("execute");
            assert_eq!(output.result, Value::Bool(true));
        });
    }

    #[test]
    fn test_progress_event_serialization() {
        let event = ExecutionProgressEvent::new(
            "exec-1",
            "step_started",
            ExecutionState::Running {
                step: crate::types::StepKind::Emit,
            },
        )
        .with_step(&StepPath::root().index(0), crate::types::StepKind::Emit)
        .with_duration(Duration::from_millis(12));
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["state"], "running");
        assert_eq!(json["step"], "emit");
        assert_eq!(json["path"], "$[0]");
        assert_eq!(json["duration"], 12);
        assert!(json.get("metadata").is_none());
    }
}
