//! Core type definitions for Planloom
//!
//! This module contains the static representation of a plan:
//! - Plan / PlanNode: the step tree
//! - Expr: sub-expressions carried by steps
//! - StepPath: location of a step inside the tree

mod expr;
mod path;
mod plan;

pub use expr::{CallExpr, Expr, FieldExpr, NamedExprs};
pub use path::{PathSegment, StepPath};
pub use plan::{Plan, PlanNode, StepKind};
