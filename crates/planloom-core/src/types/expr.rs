//! Expression type definitions
//!
//! Expressions are the sub-terms carried by plan steps: literals, variable
//! references, function calls and the small set of helpers generated plans
//! use (`equals`, `json`, field access, boolean helpers, concatenation).

use std::collections::BTreeSet;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::value::Value;

/// Named sub-expressions in document order.
///
/// Serialized as a map; deserialization keeps source order so arguments are
/// evaluated left to right as written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedExprs(Vec<(String, Expr)>);

impl NamedExprs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, expr: Expr) {
        self.0.push((name.into(), expr));
    }

    pub fn with(mut self, name: impl Into<String>, expr: Expr) -> Self {
        self.push(name, expr);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Expr)> {
        self.0.iter().map(|(name, expr)| (name.as_str(), expr))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Expr)> for NamedExprs {
    fn from_iter<I: IntoIterator<Item = (K, Expr)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, e)| (k.into(), e)).collect())
    }
}

impl Serialize for NamedExprs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, expr) in &self.0 {
            map.serialize_entry(name, expr)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for NamedExprs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NamedExprsVisitor;

        impl<'de> Visitor<'de> for NamedExprsVisitor {
            type Value = NamedExprs;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of argument names to expressions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, expr)) = access.next_entry::<String, Expr>()? {
                    entries.push((name, expr));
                }
                Ok(NamedExprs(entries))
            }
        }

        deserializer.deserialize_map(NamedExprsVisitor)
    }
}

/// A function call: registry name plus named argument expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    pub function: String,
    #[serde(default, skip_serializing_if = "NamedExprs::is_empty")]
    pub args: NamedExprs,
}

impl CallExpr {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            args: NamedExprs::new(),
        }
    }

    pub fn arg(mut self, name: impl Into<String>, expr: Expr) -> Self {
        self.args.push(name, expr);
        self
    }
}

/// Field access on an object value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldExpr {
    pub target: Box<Expr>,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// Constant value
    Literal(Value),
    /// Scope lookup
    Var(String),
    /// Registry function invocation
    Call(CallExpr),
    /// Tag-aware structural equality
    Equals(Box<Expr>, Box<Expr>),
    /// Canonical JSON rendering of the inner value
    Json(Box<Expr>),
    /// Member of an object value
    Field(FieldExpr),
    Not(Box<Expr>),
    /// Short-circuit conjunction, yields a bool
    And(Vec<Expr>),
    /// Short-circuit disjunction, yields a bool
    Or(Vec<Expr>),
    /// String concatenation (strings only)
    Concat(Vec<Expr>),
    /// Length of a list, object or string
    Length(Box<Expr>),
    /// List construction
    List(Vec<Expr>),
    /// Object construction
    Object(NamedExprs),
}

impl Expr {
    pub fn lit(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn null() -> Self {
        Self::Literal(Value::Null)
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    pub fn call(call: CallExpr) -> Self {
        Self::Call(call)
    }

    pub fn equals(lhs: Expr, rhs: Expr) -> Self {
        Self::Equals(Box::new(lhs), Box::new(rhs))
    }

    pub fn json(inner: Expr) -> Self {
        Self::Json(Box::new(inner))
    }

    pub fn field(target: Expr, field: impl Into<String>) -> Self {
        Self::Field(FieldExpr {
            target: Box::new(target),
            field: field.into(),
        })
    }

    pub fn not(inner: Expr) -> Self {
        Self::Not(Box::new(inner))
    }

    pub fn length(inner: Expr) -> Self {
        Self::Length(Box::new(inner))
    }

    /// Add the name of every function this expression calls to `out`.
    pub fn collect_calls<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Self::Literal(_) | Self::Var(_) => {}
            Self::Call(call) => {
                out.insert(call.function.as_str());
                for (_, arg) in call.args.iter() {
                    arg.collect_calls(out);
                }
            }
            Self::Equals(lhs, rhs) => {
                lhs.collect_calls(out);
                rhs.collect_calls(out);
            }
            Self::Json(inner) | Self::Not(inner) | Self::Length(inner) => inner.collect_calls(out),
            Self::Field(field) => field.target.collect_calls(out),
            Self::And(items) | Self::Or(items) | Self::Concat(items) | Self::List(items) => {
                items.iter().for_each(|item| item.collect_calls(out))
            }
            Self::Object(entries) => entries.iter().for_each(|(_, item)| item.collect_calls(out)),
        }
    }

    /// Short label used in logs and validation messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Literal(_) => "literal",
            Self::Var(_) => "var",
            Self::Call(_) => "call",
            Self::Equals(..) => "equals",
            Self::Json(_) => "json",
            Self::Field(_) => "field",
            Self::Not(_) => "not",
            Self::And(_) => "and",
            Self::Or(_) => "or",
            Self::Concat(_) => "concat",
            Self::Length(_) => "length",
            Self::List(_) => "list",
            Self::Object(_) => "object",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn arg_names(expr: &Expr) -> Vec<&str> {
        let Expr::Call(call) = expr else {
            panic!("expected call expression");
        };
        call.args.names().collect()
    }

    #[test]
    fn test_call_args_keep_document_order() {
        let expr: Expr = serde_json::from_str(
            r#"{
                "call": {
                    "function": "DocumentPlugins-GetCustomFieldValues",
                    "args": {
                        "fieldName": {"var": "fieldName"},
                        "documentId": {"var": "documentId"}
                    }
                }
            }"#,
        )
        .expect("parse");
        assert_eq!(arg_names(&expr), vec!["fieldName", "documentId"]);
    }

    #[test]
    fn test_yaml_call_args_keep_document_order() {
        let expr: Expr = serde_yaml::from_str(
            concat!(
                "call:\n",
                "  function: DocumentPlugins-GetCustomFieldValues\n",
                "  args:\n",
                "    fieldName:\n",
                "      var: fieldName\n",
                "    documentId:\n",
                "      var: documentId\n",
            ),
        )
        .expect("parse");
        assert_eq!(arg_names(&expr), vec!["fieldName", "documentId"]);

        // Steps are tagged by `kind`, which buffers the map before parsing it.
        let step: crate::types::PlanNode = serde_yaml::from_str(
            concat!(
                "kind: emit\n",
                "value:\n",
                "  call:\n",
                "    function: F\n",
                "    args:\n",
                "      zeta:\n",
                "        literal: 1\n",
                "      alpha:\n",
                "        literal: 2\n",
            ),
        )
        .expect("parse step");
        let crate::types::PlanNode::Emit { value } = step else {
            panic!("expected emit step");
        };
        assert_eq!(arg_names(&value), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_helper_shapes_parse() {
        let expr: Expr = serde_json::from_value(json!({
            "equals": [
                {"field": {"target": {"var": "details"}, "field": "Status"}},
                {"literal": "Active"}
            ]
        }))
        .expect("parse");
        assert_eq!(
            expr,
            Expr::equals(
                Expr::field(Expr::var("details"), "Status"),
                Expr::lit("Active")
            )
        );
        assert_eq!(expr.label(), "equals");
    }

    #[test]
    fn test_serialize_skips_empty_args() {
        let rendered = serde_json::to_value(Expr::call(CallExpr::new("GetStatus"))).expect("json");
        assert_eq!(rendered, json!({"call": {"function": "GetStatus"}}));
    }
}
