//! Step path type definition
//!
//! A StepPath locates a node inside a plan tree, including the loop
//! iteration it ran in. Rendered as e.g. `$[1].each[0][2]` or `$[3].else[0]`.

use std::fmt;

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Position inside a step sequence
    Index(usize),
    /// Conditional then-block
    Then,
    /// Conditional else-block
    Else,
    /// Loop iteration number
    Iteration(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StepPath(Vec<PathSegment>);

impl StepPath {
    /// Path of the plan root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    pub fn index(&self, index: usize) -> Self {
        self.child(PathSegment::Index(index))
    }

    pub fn then_branch(&self) -> Self {
        self.child(PathSegment::Then)
    }

    pub fn else_branch(&self) -> Self {
        self.child(PathSegment::Else)
    }

    pub fn iteration(&self, iteration: usize) -> Self {
        self.child(PathSegment::Iteration(iteration))
    }
}

impl fmt::Display for StepPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            match segment {
                PathSegment::Index(i) => write!(f, "[{}]", i)?,
                PathSegment::Then => f.write_str(".then")?,
                PathSegment::Else => f.write_str(".else")?,
                PathSegment::Iteration(i) => write!(f, ".each[{}]", i)?,
            }
        }
        Ok(())
    }
}

impl Serialize for StepPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
