//! Expression evaluator
//!
//! Evaluates [`Expr`] trees against a [`Scope`] and a [`FunctionRegistry`].
//! Sub-expressions are evaluated left to right; a function call suspends the
//! current path until the callable returns, is cancelled, or times out.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::{CancelReason, ExecError};
use crate::executor::{
    report_progress, ExecutionProgressEvent, ExecutionProgressReporter, ExecutionState,
};
use crate::function::{
    FunctionArgs, FunctionContext, FunctionRegistry, InvocationError, RegisteredFunction,
};
use crate::scope::Scope;
use crate::types::{CallExpr, Expr, StepPath};
use crate::value::{Object, TypeMismatch, Value, ValueTag};

const MAX_LOG_JSON_CHARS: usize = 8_000;

/// Cut `input` to `max_chars` characters for log output, noting the full length.
pub fn truncate_for_log(input: &str, max_chars: usize) -> String {
    let char_count = input.chars().count();
    if char_count <= max_chars {
        return input.to_string();
    }
    let mut preview: String = input.chars().take(max_chars).collect();
    preview.push_str(&format!("... [truncated, total_chars={}]", char_count));
    preview
}

/// Evaluates expressions for one plan execution
pub struct Evaluator<'a> {
    registry: &'a FunctionRegistry,
    execution_id: &'a str,
    cancellation_token: CancellationToken,
    invocation_timeout: Option<Duration>,
    progress_reporter: Option<Arc<dyn ExecutionProgressReporter>>,
    invocations: AtomicUsize,
}

impl<'a> Evaluator<'a> {
    pub fn new(registry: &'a FunctionRegistry, execution_id: &'a str) -> Self {
        Self {
            registry,
            execution_id,
            cancellation_token: CancellationToken::new(),
            invocation_timeout: None,
            progress_reporter: None,
            invocations: AtomicUsize::new(0),
        }
    }

    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Limit how long a single function invocation may stay suspended.
    pub fn with_invocation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.invocation_timeout = timeout;
        self
    }

    pub fn with_progress_reporter(
        mut self,
        reporter: Option<Arc<dyn ExecutionProgressReporter>>,
    ) -> Self {
        self.progress_reporter = reporter;
        self
    }

    /// Number of function invocations started so far.
    pub fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Evaluate `expr` in `scope`. `path` is the step the expression belongs to.
    pub fn evaluate<'b>(
        &'b self,
        expr: &'b Expr,
        scope: &'b Scope,
        path: &'b StepPath,
    ) -> BoxFuture<'b, Result<Value, ExecError>> {
        Box::pin(self.eval_expr(expr, scope, path))
    }

    async fn eval_expr(
        &self,
        expr: &Expr,
        scope: &Scope,
        path: &StepPath,
    ) -> Result<Value, ExecError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Var(name) => Ok(scope.lookup(name)?.clone()),
            Expr::Call(call) => self.call(call, scope, path).await,
            Expr::Equals(lhs, rhs) => {
                let lhs = self.evaluate(lhs, scope, path).await?;
                let rhs = self.evaluate(rhs, scope, path).await?;
                Ok(Value::Bool(lhs.equals(&rhs)))
            }
            Expr::Json(inner) => {
                let value = self.evaluate(inner, scope, path).await?;
                Ok(Value::String(value.render_json()))
            }
            // Members of anything other than an object read as null.
            Expr::Field(field) => match self.evaluate(&field.target, scope, path).await? {
                Value::Object(mut map) => Ok(map.remove(&field.field).unwrap_or(Value::Null)),
                _ => Ok(Value::Null),
            },
            Expr::Not(inner) => {
                let value = self.evaluate(inner, scope, path).await?;
                Ok(Value::Bool(!value.is_truthy()))
            }
            Expr::And(items) => {
                for item in items {
                    if !self.evaluate(item, scope, path).await?.is_truthy() {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Expr::Or(items) => {
                for item in items {
                    if self.evaluate(item, scope, path).await?.is_truthy() {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            Expr::Concat(items) => {
                let mut out = String::new();
                for item in items {
                    let value = self.evaluate(item, scope, path).await?;
                    out.push_str(value.as_string()?);
                }
                Ok(Value::String(out))
            }
            Expr::Length(inner) => match self.evaluate(inner, scope, path).await? {
                Value::List(items) => Ok(Value::from(items.len())),
                Value::Object(map) => Ok(Value::from(map.len())),
                Value::String(s) => Ok(Value::from(s.chars().count())),
                other => Err(TypeMismatch::new(ValueTag::List, other.tag()).into()),
            },
            Expr::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.evaluate(item, scope, path).await?);
                }
                Ok(Value::List(values))
            }
            Expr::Object(entries) => {
                let mut map = Object::new();
                for (name, item) in entries.iter() {
                    let value = self.evaluate(item, scope, path).await?;
                    map.insert(name.to_string(), value);
                }
                Ok(Value::Object(map))
            }
        }
    }

    /// Evaluate the arguments of `call` left to right, then invoke it.
    pub async fn call(
        &self,
        call: &CallExpr,
        scope: &Scope,
        path: &StepPath,
    ) -> Result<Value, ExecError> {
        let mut args = Object::new();
        for (name, expr) in call.args.iter() {
            let value = self.evaluate(expr, scope, path).await?;
            args.insert(name.to_string(), value);
        }

        let entry = self
            .registry
            .get(&call.function)
            .ok_or_else(|| ExecError::UnknownFunction(call.function.clone()))?;

        // Unknown extra arguments pass through untouched.
        if let Some(missing) = entry
            .meta
            .required_parameters()
            .find(|param| !args.contains_key(&param.name))
        {
            return Err(ExecError::MissingArgument {
                function: call.function.clone(),
                parameter: missing.name.clone(),
            });
        }

        self.invoke(entry, args, path).await
    }

    async fn invoke(
        &self,
        entry: &RegisteredFunction,
        args: Object,
        path: &StepPath,
    ) -> Result<Value, ExecError> {
        let function = entry.meta.name.as_str();
        if self.cancellation_token.is_cancelled() {
            return Err(ExecError::Cancelled(CancelReason::Signal));
        }

        self.invocations.fetch_add(1, Ordering::SeqCst);
        if tracing::enabled!(tracing::Level::DEBUG) {
            let rendered_args = Value::Object(args.clone()).render_json();
            tracing::debug!(
                execution_id = %self.execution_id,
                step = %path,
                function = %function,
                args = %truncate_for_log(&rendered_args, MAX_LOG_JSON_CHARS),
                "function invocation started"
            );
        }
        report_progress(
            self.progress_reporter.as_ref(),
            ExecutionProgressEvent::new(
                self.execution_id,
                "step_suspended",
                ExecutionState::Suspended {
                    function: function.to_string(),
                },
            )
            .with_path(path),
        )
        .await;

        let ctx = FunctionContext::new(
            self.execution_id,
            path.clone(),
            function,
            self.cancellation_token.child_token(),
        );
        let started = Instant::now();
        let pending = entry.function.invoke(FunctionArgs::new(args), ctx);
        let outcome = tokio::select! {
            biased;
            _ = self.cancellation_token.cancelled() => {
                Err(ExecError::Cancelled(CancelReason::Signal))
            }
            result = with_timeout(pending, self.invocation_timeout) => {
                result.and_then(|returned| {
                    returned.map_err(|source| ExecError::Invocation {
                        function: function.to_string(),
                        source,
                    })
                })
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(value) => {
                if tracing::enabled!(tracing::Level::DEBUG) {
                    tracing::debug!(
                        execution_id = %self.execution_id,
                        step = %path,
                        function = %function,
                        elapsed_ms,
                        result = %truncate_for_log(&value.render_json(), MAX_LOG_JSON_CHARS),
                        "function invocation returned"
                    );
                }
            }
            Err(error) => {
                tracing::warn!(
                    execution_id = %self.execution_id,
                    step = %path,
                    function = %function,
                    elapsed_ms,
                    error = %error,
                    "function invocation failed"
                );
            }
        }
        outcome
    }
}

async fn with_timeout<F>(
    pending: F,
    limit: Option<Duration>,
) -> Result<Result<Value, InvocationError>, ExecError>
where
    F: Future<Output = Result<Value, InvocationError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, pending)
            .await
            .map_err(|_| ExecError::Cancelled(CancelReason::Timeout(limit))),
        None => Ok(pending.await),
    }
}
