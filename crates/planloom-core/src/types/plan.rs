//! Plan type definitions
//!
//! A Plan is a finite tree of steps. Loops only iterate over lists that are
//! already materialized, so execution always terminates given finite
//! function calls.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::expr::{CallExpr, Expr};

/// Step type - distinguishes control semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Set,
    Call,
    Conditional,
    Loop,
    Emit,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Set => "set",
            Self::Call => "call",
            Self::Conditional => "conditional",
            Self::Loop => "loop",
            Self::Emit => "emit",
        };
        f.write_str(label)
    }
}

/// A single step in the plan tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanNode {
    /// Bind the value of `value` under `target` in the current scope
    Set { target: String, value: Expr },
    /// Invoke a function and discard its result
    Call(CallExpr),
    /// Run `then` or `otherwise` in a fresh child scope
    Conditional {
        predicate: Expr,
        #[serde(default)]
        then: Vec<PlanNode>,
        #[serde(default, rename = "else", skip_serializing_if = "Option::is_none")]
        otherwise: Option<Vec<PlanNode>>,
    },
    /// Run `body` once per element of `source`, binding the element to `item`
    Loop {
        source: Expr,
        item: String,
        #[serde(default)]
        body: Vec<PlanNode>,
    },
    /// Append a value to the plan output
    Emit { value: Expr },
}

impl PlanNode {
    pub fn set(target: impl Into<String>, value: Expr) -> Self {
        Self::Set {
            target: target.into(),
            value,
        }
    }

    pub fn call(call: CallExpr) -> Self {
        Self::Call(call)
    }

    pub fn conditional(
        predicate: Expr,
        then: Vec<PlanNode>,
        otherwise: Option<Vec<PlanNode>>,
    ) -> Self {
        Self::Conditional {
            predicate,
            then,
            otherwise,
        }
    }

    pub fn each(source: Expr, item: impl Into<String>, body: Vec<PlanNode>) -> Self {
        Self::Loop {
            source,
            item: item.into(),
            body,
        }
    }

    pub fn emit(value: Expr) -> Self {
        Self::Emit { value }
    }

    pub fn kind(&self) -> StepKind {
        match self {
            Self::Set { .. } => StepKind::Set,
            Self::Call(_) => StepKind::Call,
            Self::Conditional { .. } => StepKind::Conditional,
            Self::Loop { .. } => StepKind::Loop,
            Self::Emit { .. } => StepKind::Emit,
        }
    }
}

/// An executable plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Human-readable goal the plan was generated for
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub goal: String,
    /// Top-level steps in document order
    #[serde(default)]
    pub steps: Vec<PlanNode>,
}

impl Plan {
    pub fn new(goal: impl Into<String>, steps: Vec<PlanNode>) -> Self {
        Self {
            goal: goal.into(),
            steps,
        }
    }

    /// Names of every function called anywhere in the plan, sorted.
    pub fn called_functions(&self) -> BTreeSet<&str> {
        fn walk<'a>(nodes: &'a [PlanNode], out: &mut BTreeSet<&'a str>) {
            for node in nodes {
                match node {
                    PlanNode::Set { value, .. } | PlanNode::Emit { value } => {
                        value.collect_calls(out)
                    }
                    PlanNode::Call(call) => {
                        out.insert(call.function.as_str());
                        for (_, arg) in call.args.iter() {
                            arg.collect_calls(out);
                        }
                    }
                    PlanNode::Conditional {
                        predicate,
                        then,
                        otherwise,
                    } => {
                        predicate.collect_calls(out);
                        walk(then, out);
                        if let Some(otherwise) = otherwise {
                            walk(otherwise, out);
                        }
                    }
                    PlanNode::Loop { source, body, .. } => {
                        source.collect_calls(out);
                        walk(body, out);
                    }
                }
            }
        }
        let mut out = BTreeSet::new();
        walk(&self.steps, &mut out);
        out
    }

    /// Total number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        fn count(nodes: &[PlanNode]) -> usize {
            nodes
                .iter()
                .map(|node| {
                    1 + match node {
                        PlanNode::Conditional {
                            then, otherwise, ..
                        } => count(then) + otherwise.as_deref().map(count).unwrap_or(0),
                        PlanNode::Loop { body, .. } => count(body),
                        _ => 0,
                    }
                })
                .sum()
        }
        count(&self.steps)
    }
}
