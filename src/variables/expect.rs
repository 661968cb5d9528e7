//! Expectations: placeholders for values resolved later in the same request.

use anyhow::Result;
use serde_json::Value;
use std::fmt;

use super::Arg;
use crate::core::SsifyError;

/// "The real value of variable `target` goes here."
///
/// Never computed itself; the resolver replaces it with the target's value before the
/// owning variable's computation runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expectation {
    target: String,
}

impl Expectation {
    /// Expect the value of the variable named `target`.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// Identifier of the expected variable.
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expectation({})", self.target)
    }
}

/// The type a literal argument is coerced to by [`ssi_expect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectType {
    /// Integer; strings are parsed, floats truncated, booleans map to 0/1.
    Int,
    /// Floating point number; strings are parsed.
    Float,
    /// String; numbers and booleans use their JSON text.
    Str,
    /// Truthiness: `false`, `null`, zero, and empty strings/arrays/objects are false.
    Bool,
}

impl ExpectType {
    /// Coerce a literal to this type.
    pub fn coerce(self, value: &Value) -> Result<Value> {
        let coerced = match (self, value) {
            (Self::Int, Value::Number(n)) => n
                .as_i64()
                .map(Value::from)
                .or_else(|| n.as_u64().map(Value::from))
                .or_else(|| n.as_f64().map(|f| Value::from(f.trunc() as i64))),
            (Self::Int, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
            (Self::Int, Value::Bool(b)) => Some(Value::from(i64::from(*b))),
            (Self::Float, Value::Number(n)) => n.as_f64().map(Value::from),
            (Self::Float, Value::String(s)) => s.trim().parse::<f64>().ok().map(Value::from),
            (Self::Float, Value::Bool(b)) => Some(Value::from(if *b { 1.0 } else { 0.0 })),
            (Self::Str, Value::String(_)) => Some(value.clone()),
            (Self::Str, Value::Number(_) | Value::Bool(_)) => {
                Some(Value::String(value.to_string()))
            }
            (Self::Bool, _) => Some(Value::Bool(is_truthy(value))),
            _ => None,
        };

        coerced.ok_or_else(|| {
            SsifyError::InvalidArgument {
                value: value.to_string(),
                expected: self.name().to_string(),
            }
            .into()
        })
    }

    fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Bool => "bool",
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Describe "the eventual value of this argument" as a declaration argument.
///
/// Included fragments compute the variables they need from their URL arguments. Those
/// arguments are strings when the fragment itself is rendered, but variables when the
/// including page builds the include directive. This helper covers both:
///
/// - a [`Variable`](super::Variable) becomes an [`Expectation`] of its identifier;
/// - an existing expectation is kept;
/// - a literal is coerced to `ty`.
pub fn ssi_expect(arg: impl Into<Arg>, ty: ExpectType) -> Result<Arg> {
    match arg.into() {
        Arg::Variable(variable) => Ok(Arg::Expect(Expectation::new(variable.identifier()))),
        Arg::Expect(expectation) => Ok(Arg::Expect(expectation)),
        Arg::Value(value) => Ok(Arg::Value(ty.coerce(&value)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::Variable;
    use serde_json::json;

    #[test]
    fn test_expect_variable_captures_identifier() {
        let count = Variable::new("tags.count");
        let arg = ssi_expect(count.clone(), ExpectType::Int).unwrap();
        assert_eq!(arg, Arg::Expect(Expectation::new(count.identifier())));
    }

    #[test]
    fn test_expect_literal_is_coerced() {
        assert_eq!(ssi_expect("3", ExpectType::Int).unwrap(), Arg::Value(json!(3)));
        assert_eq!(ssi_expect(" 7 ", ExpectType::Int).unwrap(), Arg::Value(json!(7)));
        assert_eq!(ssi_expect(2.9, ExpectType::Int).unwrap(), Arg::Value(json!(2)));
        assert_eq!(ssi_expect("1.5", ExpectType::Float).unwrap(), Arg::Value(json!(1.5)));
        assert_eq!(ssi_expect(4i64, ExpectType::Str).unwrap(), Arg::Value(json!("4")));
        assert_eq!(ssi_expect("", ExpectType::Bool).unwrap(), Arg::Value(json!(false)));
        assert_eq!(ssi_expect("x", ExpectType::Bool).unwrap(), Arg::Value(json!(true)));
    }

    #[test]
    fn test_expect_keeps_expectation() {
        let arg = ssi_expect(Expectation::new("vabc"), ExpectType::Int).unwrap();
        assert_eq!(arg, Arg::Expect(Expectation::new("vabc")));
    }

    #[test]
    fn test_expect_rejects_unparseable_literal() {
        let err = ssi_expect("three", ExpectType::Int).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SsifyError>(),
            Some(SsifyError::InvalidArgument { expected, .. }) if expected == "int"
        ));
        assert!(ssi_expect(Value::Null, ExpectType::Str).is_err());
    }
}
