//! Execution error taxonomy

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::function::InvocationError;
use crate::scope::UnboundVariable;
use crate::types::StepPath;
use crate::validator::ValidationError;
use crate::value::{TypeMismatch, Value};

/// Why a run was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// External cancellation signal
    Signal,
    /// A function invocation exceeded the caller-supplied timeout
    Timeout(Duration),
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal => f.write_str("cancellation requested"),
            Self::Timeout(limit) => {
                write!(f, "function call timed out after {}ms", limit.as_millis())
            }
        }
    }
}

/// Error kind, stable across message changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownFunction,
    MissingArgument,
    UnboundVariable,
    TypeMismatch,
    Invocation,
    MalformedPlan,
    Cancelled,
}

/// Errors raised while validating or executing a plan
#[derive(Debug, Clone, Error)]
pub enum ExecError {
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{function}' is missing required argument '{parameter}'")]
    MissingArgument { function: String, parameter: String },

    #[error("unbound variable '{0}'")]
    UnboundVariable(String),

    #[error(transparent)]
    TypeMismatch(#[from] TypeMismatch),

    #[error("function '{function}' failed: {source}")]
    Invocation {
        function: String,
        #[source]
        source: InvocationError,
    },

    #[error("malformed plan: {0}")]
    MalformedPlan(#[from] ValidationError),

    #[error("execution cancelled: {0}")]
    Cancelled(CancelReason),
}

impl ExecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownFunction(_) => ErrorKind::UnknownFunction,
            Self::MissingArgument { .. } => ErrorKind::MissingArgument,
            Self::UnboundVariable(_) => ErrorKind::UnboundVariable,
            Self::TypeMismatch(_) => ErrorKind::TypeMismatch,
            Self::Invocation { .. } => ErrorKind::Invocation,
            Self::MalformedPlan(_) => ErrorKind::MalformedPlan,
            Self::Cancelled(_) => ErrorKind::Cancelled,
        }
    }
}

impl From<UnboundVariable> for ExecError {
    fn from(err: UnboundVariable) -> Self {
        Self::UnboundVariable(err.0)
    }
}

/// Terminal failure of a plan run
///
/// Carries the step location, the originating error and the values emitted
/// before the failure (they are never rolled back).
#[derive(Debug, Clone, Error)]
#[error("step {path} failed: {error}")]
pub struct ExecutionFailure {
    pub execution_id: String,
    pub path: StepPath,
    #[source]
    pub error: ExecError,
    pub emitted: Vec<Value>,
}

impl ExecutionFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}
