//! # Planloom Runtime
//!
//! Wires the core interpreter to configuration, plugins and plan files.
//!
//! This crate provides:
//! - `PlanRuntime`: registry + executor built from a single YAML config
//! - Plan file loading (JSON / YAML)
//! - `StaticPlanner` for pre-authored plans
//! - Progress reporters writing to `tracing` or collecting a textual trace

mod bootstrap;
mod plan_file;
mod planner;
mod reporter;

pub use bootstrap::{init_tracing, BootstrapError, PlanRuntime, RunOptions};
pub use plan_file::{load_plan, parse_plan, PlanFormat, PlanLoadError};
pub use planner::StaticPlanner;
pub use reporter::{CollectingProgressReporter, TracingProgressReporter};
