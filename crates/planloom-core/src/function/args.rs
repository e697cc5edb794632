//! FunctionArgs type definition

use crate::value::{Object, Value, ValueTag};

use super::InvocationError;

/// Arguments assembled by the evaluator for one function invocation
#[derive(Debug, Clone, Default)]
pub struct FunctionArgs {
    values: Object,
}

impl FunctionArgs {
    pub fn new(values: Object) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn as_object(&self) -> &Object {
        &self.values
    }

    pub fn into_object(self) -> Object {
        self.values
    }

    /// Get a required argument.
    pub fn require(&self, name: &str) -> Result<&Value, InvocationError> {
        self.values
            .get(name)
            .ok_or_else(|| InvocationError::invalid_argument(name, "argument is missing"))
    }

    /// Get a required string argument.
    pub fn require_str(&self, name: &str) -> Result<&str, InvocationError> {
        self.require(name)?
            .as_string()
            .map_err(|err| InvocationError::invalid_argument(name, err.to_string()))
    }

    /// Get a required integer argument.
    ///
    /// Host functions receive loosely typed arguments from generated plans,
    /// so integral numbers and numeric strings are both accepted here.
    pub fn require_i64(&self, name: &str) -> Result<i64, InvocationError> {
        match self.require(name)? {
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 => Ok(*n as i64),
            Value::String(s) => s.trim().parse::<i64>().map_err(|_| {
                InvocationError::invalid_argument(name, format!("'{}' is not an integer", s))
            }),
            other => Err(InvocationError::invalid_argument(
                name,
                format!("expected integer, found {}", describe(other)),
            )),
        }
    }
}

fn describe(value: &Value) -> String {
    match value.tag() {
        ValueTag::Number => format!("number {}", value.render_json()),
        tag => tag.to_string(),
    }
}

impl From<Object> for FunctionArgs {
    fn from(values: Object) -> Self {
        Self::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::object;

    #[test]
    fn test_require_i64_accepts_integral_values() {
        let args = FunctionArgs::new(object([
            ("id", Value::from(101)),
            ("text_id", Value::from(" 7 ")),
            ("ratio", Value::from(1.5)),
        ]));
        assert_eq!(args.require_i64("id").expect("id"), 101);
        assert_eq!(args.require_i64("text_id").expect("text id"), 7);
        assert!(args.require_i64("ratio").is_err());
        assert!(args.require_i64("missing").is_err());
    }

    #[test]
    fn test_require_str_rejects_other_tags() {
        let args = FunctionArgs::new(object([("q", Value::from(1)), ("s", Value::from("x"))]));
        assert_eq!(args.require_str("s").expect("s"), "x");
        let err = args.require_str("q").unwrap_err();
        assert!(err.to_string().contains("expected string"));
    }
}
