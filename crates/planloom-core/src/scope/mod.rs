//! Variable scope chain
//!
//! Scopes are kept as a stack of frames: entering a loop iteration or a
//! conditional branch pushes a child frame, leaving it pops the frame and
//! every binding made inside it. Lookups walk from the innermost frame to the
//! root; `bind` only ever touches the innermost frame.

use std::collections::HashMap;

use thiserror::Error;

use crate::value::{Object, Value};

/// A name could not be resolved anywhere in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unbound variable '{0}'")]
pub struct UnboundVariable(pub String);

#[derive(Debug, Default)]
struct Frame {
    bindings: HashMap<String, Value>,
}

/// Lexical binding environment for one plan execution.
#[derive(Debug)]
pub struct Scope {
    frames: Vec<Frame>,
}

impl Scope {
    /// Create a root scope with no bindings.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }

    /// Create a root scope seeded from caller-supplied arguments.
    pub fn with_arguments(arguments: Object) -> Self {
        Self {
            frames: vec![Frame {
                bindings: arguments.into_iter().collect(),
            }],
        }
    }

    /// Enter a child scope linked to the current one.
    pub fn push_child(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Discard the innermost child scope. The root frame is never popped;
    /// returns `false` when called at the root.
    pub fn pop_child(&mut self) -> bool {
        if self.frames.len() <= 1 {
            return false;
        }
        self.frames.pop();
        true
    }

    /// Number of frames, the root included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Bind `name` in the innermost scope, shadowing any ancestor binding.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.bindings.insert(name.into(), value);
        }
    }

    /// Resolve `name`, innermost frame first.
    pub fn lookup(&self, name: &str) -> Result<&Value, UnboundVariable> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.bindings.get(name))
            .ok_or_else(|| UnboundVariable(name.to_string()))
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.lookup(name).is_ok()
    }

    /// Binding held by the innermost frame only.
    pub fn local(&self, name: &str) -> Option<&Value> {
        self.frames
            .last()
            .and_then(|frame| frame.bindings.get(name))
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::object;

    #[test]
    fn test_root_seeded_from_arguments() {
        let scope = Scope::with_arguments(object([("user_request", "Privacy")]));
        assert_eq!(scope.lookup("user_request"), Ok(&Value::from("Privacy")));
        assert_eq!(
            scope.lookup("missing"),
            Err(UnboundVariable("missing".to_string()))
        );
    }

    #[test]
    fn test_child_shadows_without_mutating_parent() {
        let mut scope = Scope::with_arguments(object([("x", 1)]));
        scope.push_child();
        assert_eq!(scope.lookup("x"), Ok(&Value::from(1)));

        scope.bind("x", Value::from(2));
        scope.bind("inner", Value::Bool(true));
        assert_eq!(scope.lookup("x"), Ok(&Value::from(2)));
        assert!(scope.local("x").is_some());

        assert!(scope.pop_child());
        assert_eq!(scope.lookup("x"), Ok(&Value::from(1)));
        assert!(!scope.is_bound("inner"));
    }

    #[test]
    fn test_root_frame_is_never_popped() {
        let mut scope = Scope::new();
        scope.bind("kept", Value::Null);
        assert!(!scope.pop_child());
        assert_eq!(scope.depth(), 1);
        assert!(scope.is_bound("kept"));
    }

    #[test]
    fn test_lookup_walks_multiple_levels() {
        let mut scope = Scope::new();
        scope.bind("a", Value::from("root"));
        scope.push_child();
        scope.bind("b", Value::from("middle"));
        scope.push_child();
        assert_eq!(scope.depth(), 3);
        assert_eq!(scope.lookup("a"), Ok(&Value::from("root")));
        assert_eq!(scope.lookup("b"), Ok(&Value::from("middle")));
        assert!(scope.local("a").is_none());
    }
}
