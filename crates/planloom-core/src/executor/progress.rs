//! Execution progress reporting

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::types::{StepKind, StepPath};

/// Interpreter state at the time an event was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExecutionState {
    /// Waiting to pick the next step
    Ready,
    /// Executing a step of the given kind
    Running { step: StepKind },
    /// Awaiting the result of a function call
    Suspended { function: String },
    /// All steps executed
    Completed,
    /// Terminated by an error
    Failed,
}

/// Realtime execution progress event.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionProgressEvent {
    pub execution_id: String,
    /// Phase label, e.g. step_started/step_completed/plan_completed.
    pub phase: String,
    #[serde(flatten)]
    pub state: ExecutionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<StepPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_kind: Option<StepKind>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_millis")]
    pub duration: Option<Duration>,
    /// Optional human-readable message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Extra structured metadata.
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl ExecutionProgressEvent {
    pub fn new(
        execution_id: impl Into<String>,
        phase: impl Into<String>,
        state: ExecutionState,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            phase: phase.into(),
            state,
            path: None,
            step_kind: None,
            duration: None,
            message: None,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_step(mut self, path: &StepPath, step_kind: StepKind) -> Self {
        self.path = Some(path.clone());
        self.step_kind = Some(step_kind);
        self
    }

    pub fn with_path(mut self, path: &StepPath) -> Self {
        self.path = Some(path.clone());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

fn serialize_millis<S: serde::Serializer>(
    duration: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match duration {
        Some(d) => serializer.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
        None => serializer.serialize_none(),
    }
}

/// Sink interface for execution progress reporting.
#[async_trait]
pub trait ExecutionProgressReporter: Send + Sync {
    async fn report(&self, event: ExecutionProgressEvent) -> Result<(), String>;
}

pub(crate) async fn report_progress(
    reporter: Option<&Arc<dyn ExecutionProgressReporter>>,
    event: ExecutionProgressEvent,
) {
    if let Some(reporter) = reporter {
        if let Err(err) = reporter.report(event).await {
            tracing::warn!("failed to report execution progress: {}", err);
        }
    }
}
