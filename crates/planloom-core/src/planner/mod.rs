//! Planner module
//!
//! The Planner is responsible for:
//! - Turning a natural-language instruction into a Plan
//! - Choosing among the functions the registry exposes
//!
//! The Planner does NOT handle:
//! - Validation (the executor validates every plan before running it)
//! - Execution, scoping or cancellation

use async_trait::async_trait;
use thiserror::Error;

use crate::function::{FunctionMeta, FunctionRegistry};
use crate::types::Plan;
use crate::value::Object;

/// Planner errors
#[derive(Debug, Error)]
pub enum PlanError {
    /// The context advertises no functions to plan with
    #[error("No suitable functions found for instruction")]
    NoSuitableFunctions,

    #[error("Failed to generate plan: {0}")]
    Generation(String),
}

/// Planner trait - produces plans from an instruction
///
/// Implementations may call a language model or return pre-authored plans.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Generate a plan for `instruction`
    async fn plan(&self, instruction: &str, context: &PlannerContext) -> Result<Plan, PlanError>;
}

/// Context provided to the planner
#[derive(Debug, Clone, Default)]
pub struct PlannerContext {
    /// Available functions and their metadata
    pub available_functions: Vec<FunctionMeta>,
    /// Arguments the plan will be started with
    pub arguments: Object,
}

impl PlannerContext {
    /// Create a new planner context
    pub fn new(available_functions: Vec<FunctionMeta>) -> Self {
        Self {
            available_functions,
            arguments: Object::new(),
        }
    }

    /// Describe every function in `registry`.
    pub fn from_registry(registry: &FunctionRegistry) -> Self {
        Self::new(registry.metas())
    }

    pub fn with_arguments(mut self, arguments: Object) -> Self {
        self.arguments = arguments;
        self
    }

    /// Get function by name
    pub fn get_function(&self, name: &str) -> Option<&FunctionMeta> {
        self.available_functions.iter().find(|f| f.name == name)
    }
}
