//! SSI variables: values computed at request time for prerendered pages.
//!
//! A [`Variable`] names a computation (its *path*, looked up in the
//! [`Registry`](crate::computation::Registry)) together with positional and named
//! arguments. Rendering code never chooses a variable's name: the identifier is a hash
//! of the definition, so the same computation with the same arguments always maps to
//! the same SSI variable, across processes and restarts.
//!
//! Arguments are literals, nested variables, or [`Expectation`]s: placeholders for the
//! eventual value of another variable. A variable holding an expectation has a
//! provisional identifier; once the resolver substitutes the real value it builds a
//! new variable whose identifier reflects only concrete arguments.
//!
//! ```rust
//! use ssify::variables::{ExpectType, Variable, ssi_expect};
//!
//! let count = Variable::new("tags.number_of_quotes");
//! let pick = Variable::new("tags.random_number")
//!     .kwarg("limit", ssi_expect(count.clone(), ExpectType::Int).unwrap());
//!
//! assert!(count.is_concrete());
//! assert!(!pick.is_concrete());
//! assert_eq!(pick.expectations(), vec![count.identifier()]);
//! ```

mod expect;
mod set;

pub use expect::{ExpectType, Expectation, ssi_expect};
pub use set::VariableSet;

use anyhow::Result;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use crate::core::SsifyError;
use crate::directives;

/// JSON key tagging a nested variable in the canonical encoding.
pub const VAR_TAG: &str = "__var__";

/// JSON key tagging an expectation in the canonical encoding.
pub const EXPECT_TAG: &str = "__expect__";

/// Number of digest bytes kept in an identifier (32 hex digits).
const IDENTIFIER_BYTES: usize = 16;

/// One argument of a variable's computation.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// A concrete value.
    Value(Value),
    /// Another variable; its resolved value is passed to the computation.
    Variable(Box<Variable>),
    /// The eventual value of the variable with the given identifier.
    Expect(Expectation),
}

impl Arg {
    /// Canonical JSON form, also used by the wire header.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Variable(variable) => json!({ VAR_TAG: variable.definition() }),
            Self::Expect(expectation) => json!({ EXPECT_TAG: expectation.target() }),
        }
    }

    /// Rebuild an argument from its canonical JSON form.
    ///
    /// Objects with a single tag key become nested variables or expectations; every
    /// other value is a literal.
    pub fn from_json(value: Value) -> Result<Self> {
        if let Value::Object(map) = &value {
            if map.len() == 1 {
                if let Some(definition) = map.get(VAR_TAG) {
                    return Ok(Self::Variable(Box::new(Variable::from_definition(
                        definition.clone(),
                    )?)));
                }
                if let Some(target) = map.get(EXPECT_TAG) {
                    let target = target.as_str().ok_or_else(|| SsifyError::InvalidHeader {
                        reason: format!("expectation target must be a string, got {target}"),
                    })?;
                    return Ok(Self::Expect(Expectation::new(target)));
                }
            }
        }
        Ok(Self::Value(value))
    }

    /// The literal value, if this argument is concrete.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    fn collect_expectations<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Value(_) => {}
            Self::Variable(variable) => variable.collect_expectations(out),
            Self::Expect(expectation) => out.push(expectation.target()),
        }
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Variable> for Arg {
    fn from(variable: Variable) -> Self {
        Self::Variable(Box::new(variable))
    }
}

impl From<Expectation> for Arg {
    fn from(expectation: Expectation) -> Self {
        Self::Expect(expectation)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<u64> for Arg {
    fn from(value: u64) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Self::Value(Value::Bool(value))
    }
}

/// A value computed at request time by the computation registered under `path`.
///
/// Variables are immutable: the builder methods and the resolver return new values,
/// each carrying an identifier computed from its own definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    path: String,
    args: Vec<Arg>,
    kwargs: BTreeMap<String, Arg>,
    identifier: String,
}

impl Variable {
    /// A variable with no arguments.
    pub fn new(path: impl Into<String>) -> Self {
        Self::from_parts(path, Vec::new(), BTreeMap::new())
    }

    /// A variable from its path and both argument lists.
    pub fn from_parts(
        path: impl Into<String>,
        args: Vec<Arg>,
        kwargs: BTreeMap<String, Arg>,
    ) -> Self {
        let path = path.into();
        let identifier = compute_identifier(&definition_of(&path, &args, &kwargs));
        Self {
            path,
            args,
            kwargs,
            identifier,
        }
    }

    /// Rebuild a variable from a definition tuple: `[path]`, `[path, args]` or
    /// `[path, args, kwargs]`.
    pub fn from_definition(definition: Value) -> Result<Self> {
        let invalid = |reason: String| SsifyError::InvalidHeader { reason };

        let mut parts = match definition {
            Value::Array(parts) => parts,
            other => {
                return Err(invalid(format!("definition must be an array, got {other}")).into());
            }
        };
        if parts.is_empty() || parts.len() > 3 {
            return Err(invalid(format!(
                "definition must have 1 to 3 elements, got {}",
                parts.len()
            ))
            .into());
        }

        let kwargs = if parts.len() == 3 {
            match parts.pop() {
                Some(Value::Object(map)) => map
                    .into_iter()
                    .map(|(name, value)| Ok((name, Arg::from_json(value)?)))
                    .collect::<Result<BTreeMap<_, _>>>()?,
                Some(other) => {
                    return Err(invalid(format!("named arguments must be an object, got {other}"))
                        .into());
                }
                None => BTreeMap::new(),
            }
        } else {
            BTreeMap::new()
        };

        let args = if parts.len() == 2 {
            match parts.pop() {
                Some(Value::Array(items)) => {
                    items.into_iter().map(Arg::from_json).collect::<Result<Vec<_>>>()?
                }
                Some(other) => {
                    return Err(invalid(format!(
                        "positional arguments must be an array, got {other}"
                    ))
                    .into());
                }
                None => Vec::new(),
            }
        } else {
            Vec::new()
        };

        let path = match parts.pop() {
            Some(Value::String(path)) => path,
            other => {
                return Err(invalid(format!(
                    "computation path must be a string, got {}",
                    other.unwrap_or(Value::Null)
                ))
                .into());
            }
        };

        Ok(Self::from_parts(path, args, kwargs))
    }

    /// Append a positional argument.
    #[must_use]
    pub fn arg(self, arg: impl Into<Arg>) -> Self {
        let Self {
            path,
            mut args,
            kwargs,
            ..
        } = self;
        args.push(arg.into());
        Self::from_parts(path, args, kwargs)
    }

    /// Set a named argument.
    #[must_use]
    pub fn kwarg(self, name: impl Into<String>, arg: impl Into<Arg>) -> Self {
        let Self {
            path,
            args,
            mut kwargs,
            ..
        } = self;
        kwargs.insert(name.into(), arg.into());
        Self::from_parts(path, args, kwargs)
    }

    /// Publish this variable under a name chosen by hand instead of its hash.
    ///
    /// Any rebuild (builder methods, resolution of expectations) hashes again.
    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// The same definition under its hash-derived identifier.
    #[must_use]
    pub fn rehash(self) -> Self {
        let Self {
            path, args, kwargs, ..
        } = self;
        Self::from_parts(path, args, kwargs)
    }

    /// Path of the computation producing this variable's value.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Positional arguments, in order.
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Named arguments, sorted by name.
    pub fn kwargs(&self) -> &BTreeMap<String, Arg> {
        &self.kwargs
    }

    /// The SSI variable name: `v` followed by 32 hex digits of the definition's SHA-256.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The canonical definition tuple.
    ///
    /// Empty argument lists are left out, so a call without named arguments hashes the
    /// same whether they were given as an empty map or omitted.
    pub fn definition(&self) -> Value {
        definition_of(&self.path, &self.args, &self.kwargs)
    }

    /// Whether no expectation is left anywhere in the arguments.
    pub fn is_concrete(&self) -> bool {
        self.expectations().is_empty()
    }

    /// Identifiers this variable expects, including those of nested variables.
    pub fn expectations(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_expectations(&mut out);
        out
    }

    fn collect_expectations<'a>(&'a self, out: &mut Vec<&'a str>) {
        for arg in self.args.iter().chain(self.kwargs.values()) {
            arg.collect_expectations(out);
        }
    }

    /// The literal arguments, or `None` if any argument is not a plain value.
    pub fn concrete_args(&self) -> Option<(Vec<Value>, Map<String, Value>)> {
        let args = self.args.iter().map(|a| a.as_value().cloned()).collect::<Option<Vec<_>>>()?;
        let kwargs = self
            .kwargs
            .iter()
            .map(|(name, a)| a.as_value().cloned().map(|v| (name.clone(), v)))
            .collect::<Option<Map<_, _>>>()?;
        Some((args, kwargs))
    }

    /// Identifier and definition, for diagnostics.
    pub fn describe(&self) -> String {
        format!("{} {}", self.identifier, self.definition())
    }

    /// SSI echo statement printing this variable's value.
    pub fn echo(&self) -> String {
        directives::echo_statement(&self.identifier)
    }

    /// The `${name}` form, usable inside include paths and if expressions.
    pub fn as_var(&self) -> String {
        format!("${{{}}}", self.identifier)
    }

    /// Opening SSI if statement testing this variable's value.
    pub fn if_open(&self) -> String {
        directives::if_statement(&self.as_var())
    }
}

/// Variables render as their echo statement, so they can be written straight into a page.
impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.echo())
    }
}

fn definition_of(path: &str, args: &[Arg], kwargs: &BTreeMap<String, Arg>) -> Value {
    let args_json = || Value::Array(args.iter().map(Arg::to_json).collect());
    if !kwargs.is_empty() {
        let kwargs_json =
            kwargs.iter().map(|(name, arg)| (name.clone(), arg.to_json())).collect::<Map<_, _>>();
        json!([path, args_json(), kwargs_json])
    } else if !args.is_empty() {
        json!([path, args_json()])
    } else {
        json!([path])
    }
}

fn compute_identifier(definition: &Value) -> String {
    // Map keys serialize sorted, so this is the canonical encoding.
    let canonical = definition.to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    format!("v{}", hex::encode(&digest[..IDENTIFIER_BYTES]))
}
