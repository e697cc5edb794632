//! Static plan validation
//!
//! Runs before any step executes. A plan that fails here never touches the
//! function registry's callables.
//!
//! Checks:
//! - Every variable reference is bound by the caller's arguments, a preceding
//!   `set`, or an enclosing loop in its lexical position
//! - Every called function name resolves in the registry
//! - Loop sources are list-producing, or deferred to the runtime type check
//! - Set targets and loop variables are non-empty, call arguments are unique

use std::collections::HashSet;

use thiserror::Error;

use crate::function::FunctionRegistry;
use crate::types::{CallExpr, Expr, Plan, PlanNode, StepPath};
use crate::value::ValueTag;

/// Validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("step {path}: set target must not be empty")]
    EmptyTarget { path: StepPath },

    #[error("step {path}: loop variable must not be empty")]
    EmptyLoopVariable { path: StepPath },

    #[error("step {path}: unknown function '{function}'")]
    UnknownFunction { path: StepPath, function: String },

    #[error("step {path}: variable '{name}' is not bound at this point")]
    UnboundVariable { path: StepPath, name: String },

    #[error("step {path}: loop source always produces {found}, expected list")]
    LoopSourceNotList { path: StepPath, found: ValueTag },

    #[error("step {path}: argument '{argument}' passed twice to '{function}'")]
    DuplicateArgument {
        path: StepPath,
        function: String,
        argument: String,
    },
}

impl ValidationError {
    /// Location of the offending step.
    pub fn path(&self) -> &StepPath {
        match self {
            Self::EmptyTarget { path }
            | Self::EmptyLoopVariable { path }
            | Self::UnknownFunction { path, .. }
            | Self::UnboundVariable { path, .. }
            | Self::LoopSourceNotList { path, .. }
            | Self::DuplicateArgument { path, .. } => path,
        }
    }
}

/// Lexical binding frames mirroring the runtime scope chain
struct Bindings<'p> {
    roots: HashSet<String>,
    frames: Vec<HashSet<&'p str>>,
}

impl<'p> Bindings<'p> {
    fn is_bound(&self, name: &str) -> bool {
        self.frames.iter().rev().any(|frame| frame.contains(name)) || self.roots.contains(name)
    }

    fn bind(&mut self, name: &'p str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name);
        }
    }

    fn enter(&mut self) {
        self.frames.push(HashSet::new());
    }

    fn exit(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }
}

/// Plan validator bound to the registry the plan will run against
pub struct PlanValidator<'r> {
    registry: &'r FunctionRegistry,
}

impl<'r> PlanValidator<'r> {
    pub fn new(registry: &'r FunctionRegistry) -> Self {
        Self { registry }
    }

    /// Validate `plan`, treating `root_names` as bound in the root scope.
    pub fn validate<I, S>(&self, plan: &Plan, root_names: I) -> Result<(), ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut bindings = Bindings {
            roots: root_names.into_iter().map(Into::into).collect(),
            frames: vec![HashSet::new()],
        };
        self.validate_block(&plan.steps, &StepPath::root(), &mut bindings)
    }

    fn validate_block<'p>(
        &self,
        nodes: &'p [PlanNode],
        parent: &StepPath,
        bindings: &mut Bindings<'p>,
    ) -> Result<(), ValidationError> {
        for (index, node) in nodes.iter().enumerate() {
            let path = parent.index(index);
            self.validate_node(node, &path, bindings)?;
        }
        Ok(())
    }

    fn validate_node<'p>(
        &self,
        node: &'p PlanNode,
        path: &StepPath,
        bindings: &mut Bindings<'p>,
    ) -> Result<(), ValidationError> {
        match node {
            PlanNode::Set { target, value } => {
                if target.trim().is_empty() {
                    return Err(ValidationError::EmptyTarget { path: path.clone() });
                }
                self.validate_expr(value, path, bindings)?;
                bindings.bind(target);
            }
            PlanNode::Call(call) => self.validate_call(call, path, bindings)?,
            PlanNode::Conditional {
                predicate,
                then,
                otherwise,
            } => {
                self.validate_expr(predicate, path, bindings)?;
                bindings.enter();
                let result = self.validate_block(then, &path.then_branch(), bindings);
                bindings.exit();
                result?;
                if let Some(otherwise) = otherwise {
                    bindings.enter();
                    let result = self.validate_block(otherwise, &path.else_branch(), bindings);
                    bindings.exit();
                    result?;
                }
            }
            PlanNode::Loop { source, item, body } => {
                if item.trim().is_empty() {
                    return Err(ValidationError::EmptyLoopVariable { path: path.clone() });
                }
                self.validate_expr(source, path, bindings)?;
                if let Some(found) = static_tag(source) {
                    if found != ValueTag::List {
                        return Err(ValidationError::LoopSourceNotList {
                            path: path.clone(),
                            found,
                        });
                    }
                }
                bindings.enter();
                bindings.bind(item);
                let result = self.validate_block(body, &path.iteration(0), bindings);
                bindings.exit();
                result?;
            }
            PlanNode::Emit { value } => self.validate_expr(value, path, bindings)?,
        }
        Ok(())
    }

    fn validate_call(
        &self,
        call: &CallExpr,
        path: &StepPath,
        bindings: &Bindings<'_>,
    ) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for (name, expr) in call.args.iter() {
            if !seen.insert(name) {
                return Err(ValidationError::DuplicateArgument {
                    path: path.clone(),
                    function: call.function.clone(),
                    argument: name.to_string(),
                });
            }
            self.validate_expr(expr, path, bindings)?;
        }
        if !self.registry.contains(&call.function) {
            return Err(ValidationError::UnknownFunction {
                path: path.clone(),
                function: call.function.clone(),
            });
        }
        Ok(())
    }

    fn validate_expr(
        &self,
        expr: &Expr,
        path: &StepPath,
        bindings: &Bindings<'_>,
    ) -> Result<(), ValidationError> {
        match expr {
            Expr::Literal(_) => Ok(()),
            Expr::Var(name) => {
                if bindings.is_bound(name) {
                    Ok(())
                } else {
                    Err(ValidationError::UnboundVariable {
                        path: path.clone(),
                        name: name.clone(),
                    })
                }
            }
            Expr::Call(call) => self.validate_call(call, path, bindings),
            Expr::Equals(lhs, rhs) => {
                self.validate_expr(lhs, path, bindings)?;
                self.validate_expr(rhs, path, bindings)
            }
            Expr::Json(inner) | Expr::Not(inner) | Expr::Length(inner) => {
                self.validate_expr(inner, path, bindings)
            }
            Expr::Field(field) => self.validate_expr(&field.target, path, bindings),
            Expr::And(items) | Expr::Or(items) | Expr::Concat(items) | Expr::List(items) => items
                .iter()
                .try_for_each(|item| self.validate_expr(item, path, bindings)),
            Expr::Object(entries) => entries
                .iter()
                .try_for_each(|(_, item)| self.validate_expr(item, path, bindings)),
        }
    }
}

/// Tag an expression always evaluates to, when known without running it.
/// Variables, calls and field reads are checked at runtime instead.
fn static_tag(expr: &Expr) -> Option<ValueTag> {
    match expr {
        Expr::Literal(value) => Some(value.tag()),
        Expr::Equals(..) | Expr::Not(_) | Expr::And(_) | Expr::Or(_) => Some(ValueTag::Bool),
        Expr::Json(_) | Expr::Concat(_) => Some(ValueTag::String),
        Expr::Length(_) => Some(ValueTag::Number),
        Expr::List(_) => Some(ValueTag::List),
        Expr::Object(_) => Some(ValueTag::Object),
        Expr::Var(_) | Expr::Call(_) | Expr::Field(_) => None,
    }
}
