//! The `X-Ssi-Vars-Needed` response header.
//!
//! Whole-page caches store the response *before* the set statements are prepended,
//! since those carry per-request values. The header travels with the cached response
//! and tells a later request which variables to compute: a compact JSON object mapping
//! each identifier to its definition tuple, keys sorted.
//!
//! ```text
//! X-Ssi-Vars-Needed: {"v1f…":["tags.pick",[],{"limit":{"__expect__":"v9c…"}}],"v9c…":["tags.count"]}
//! ```

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::core::SsifyError;
use crate::variables::{Variable, VariableSet};

/// Name of the header carrying the variables a cached response needs.
pub const VARS_NEEDED_HEADER: &str = "X-Ssi-Vars-Needed";

/// Encode variables as the header value.
pub fn encode(variables: &VariableSet) -> String {
    let map = variables
        .iter()
        .map(|variable| (variable.identifier().to_string(), variable.definition()))
        .collect::<Map<_, _>>();
    Value::Object(map).to_string()
}

/// Decode a header value back into variables.
///
/// Each variable is rebuilt from its definition. A key that differs from the
/// definition's hash is kept as the variable's identifier.
///
/// # Errors
///
/// [`SsifyError::InvalidHeader`] when the value is not a JSON object of definitions.
pub fn decode(header: &str) -> Result<VariableSet> {
    let value: Value = serde_json::from_str(header).map_err(|e| SsifyError::InvalidHeader {
        reason: e.to_string(),
    })?;
    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(SsifyError::InvalidHeader {
                reason: format!("expected a JSON object, got {other}"),
            }
            .into());
        }
    };

    let mut variables = VariableSet::new();
    for (identifier, definition) in map {
        let variable = Variable::from_definition(definition)
            .with_context(|| format!("Invalid definition for SSI variable {identifier}"))?;
        let variable = if variable.identifier() == identifier {
            variable
        } else {
            variable.with_identifier(identifier)
        };
        variables.insert(variable);
    }
    Ok(variables)
}
