//! FunctionContext type definition

use tokio_util::sync::CancellationToken;

use crate::types::StepPath;

/// Execution context handed to a function invocation
///
/// Provides access to:
/// - Execution and step identification
/// - CancellationToken for cooperative cancellation
#[derive(Clone)]
pub struct FunctionContext {
    /// Execution ID of the running plan
    pub execution_id: String,
    /// Location of the step that issued the call
    pub step_path: StepPath,
    /// Registry name of the invoked function
    pub function: String,
    /// Cancellation token for cooperative cancellation.
    /// The interpreter also races the call against it.
    pub cancellation_token: CancellationToken,
}

impl FunctionContext {
    pub fn new(
        execution_id: impl Into<String>,
        step_path: StepPath,
        function: impl Into<String>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            step_path,
            function: function.into(),
            cancellation_token,
        }
    }

    /// Context for calling a function outside a plan run.
    pub fn detached(function: impl Into<String>) -> Self {
        Self::new(
            uuid::Uuid::new_v4().to_string(),
            StepPath::root(),
            function,
            CancellationToken::new(),
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}

impl std::fmt::Debug for FunctionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionContext")
            .field("execution_id", &self.execution_id)
            .field("step_path", &self.step_path)
            .field("function", &self.function)
            .finish_non_exhaustive()
    }
}
