//! Progress reporters.

use std::sync::Mutex;

use async_trait::async_trait;

use planloom_core::evaluator::truncate_for_log;
use planloom_core::executor::{ExecutionProgressEvent, ExecutionProgressReporter};

/// Writes every progress event to `tracing` at debug level.
pub struct TracingProgressReporter {
    max_value_chars: usize,
}

impl TracingProgressReporter {
    pub fn new(max_value_chars: usize) -> Self {
        Self { max_value_chars }
    }
}

#[async_trait]
impl ExecutionProgressReporter for TracingProgressReporter {
    async fn report(&self, event: ExecutionProgressEvent) -> Result<(), String> {
        let path = event.path.as_ref().map(ToString::to_string).unwrap_or_default();
        let message = event
            .message
            .as_deref()
            .map(|m| truncate_for_log(m, self.max_value_chars))
            .unwrap_or_default();
        tracing::debug!(
            execution_id = %event.execution_id,
            phase = %event.phase,
            step = %path,
            duration_ms = event.duration.map(|d| d.as_millis() as u64),
            message = %message,
            "execution progress"
        );
        Ok(())
    }
}

/// Keeps every event in memory and renders them as a textual trace.
#[derive(Default)]
pub struct CollectingProgressReporter {
    events: Mutex<Vec<ExecutionProgressEvent>>,
}

impl CollectingProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ExecutionProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// One line per event: `phase path kind (duration) message`.
    pub fn lines(&self) -> Vec<String> {
        self.events().iter().map(render_line).collect()
    }
}

fn render_line(event: &ExecutionProgressEvent) -> String {
    let mut line = event.phase.clone();
    if let Some(path) = &event.path {
        line.push(' ');
        line.push_str(&path.to_string());
    }
    if let Some(kind) = event.step_kind {
        line.push(' ');
        line.push_str(&kind.to_string());
    }
    if let Some(duration) = event.duration {
        line.push_str(&format!(" ({}ms)", duration.as_millis()));
    }
    if let Some(message) = &event.message {
        if !message.is_empty() {
            line.push_str(": ");
            line.push_str(message);
        }
    }
    line
}

#[async_trait]
impl ExecutionProgressReporter for CollectingProgressReporter {
    async fn report(&self, event: ExecutionProgressEvent) -> Result<(), String> {
        self.events
            .lock()
            .map_err(|_| "progress event buffer poisoned".to_string())?
            .push(event);
        Ok(())
    }
}
