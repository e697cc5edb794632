//! # Planloom Core
//!
//! Core abstractions and deterministic logic for running generated plans.
//!
//! This crate contains:
//! - Value model and the lexical scope chain
//! - Function registry (host callables grouped into plugins)
//! - Plan AST, static validation and the plan interpreter
//! - Planner abstraction and progress reporting
//!
//! This crate does NOT care about:
//! - Where plans come from (language models, files)
//! - What the registered functions actually do
//! - How results are displayed

pub mod error;
pub mod evaluator;
pub mod executor;
pub mod function;
pub mod planner;
pub mod scope;
pub mod types;
pub mod validator;
pub mod value;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{CancelReason, ErrorKind, ExecError, ExecutionFailure};
    pub use crate::executor::{
        ExecutionProgressEvent, ExecutionProgressReporter, ExecutionState, Executor,
        ExecutorContext, PlanOutput,
    };
    pub use crate::function::{
        CancellationToken, FnFunction, FunctionArgs, FunctionContext, FunctionMeta,
        FunctionRegistry, InvocationError, ParameterSpec, Plugin, PluginFunction, RegistryError,
    };
    pub use crate::planner::{PlanError, Planner, PlannerContext};
    pub use crate::scope::{Scope, UnboundVariable};
    pub use crate::types::{CallExpr, Expr, NamedExprs, Plan, PlanNode, StepKind, StepPath};
    pub use crate::validator::{PlanValidator, ValidationError};
    pub use crate::value::{object, Object, OpaqueHandle, TypeMismatch, Value, ValueTag};
}

// Re-export key types at crate root
pub use error::{ErrorKind, ExecError, ExecutionFailure};
pub use executor::{Executor, ExecutorContext, PlanOutput};
pub use function::{FunctionRegistry, Plugin, PluginFunction};
pub use planner::{Planner, PlannerContext};
pub use types::{Plan, PlanNode};
pub use value::Value;
