//! Resolution of SSI variables into concrete values.
//!
//! [`resolve`] computes every variable a rendering pass needs, in an order where each
//! [`Expectation`](crate::variables::Expectation) is substituted before the variable
//! holding it is computed.
//!
//! # Algorithm
//!
//! A FIFO worklist is seeded with the requested variables, followed by any nested
//! variables they reference. For each popped variable:
//!
//! 1. Expectations (also inside nested variables) are replaced by resolved values.
//!    The result is the *declared* form, whose identifier is the name published in
//!    set statements. It differs from the queued variable's identifier whenever an
//!    expectation was substituted.
//! 2. Nested variables are replaced by their resolved values, giving the *call* form
//!    handed to the computation.
//! 3. If any value is still missing, the variable goes back to the tail of the queue.
//!    Otherwise its value is computed (once per published identifier) and stored.
//!
//! Failed attempts leave both the queue item and the resolved table untouched, so a
//! full pass over the queue without progress means no later pass can progress either.
//! Resolution then stops with [`SsifyError::DependencyCycle`]; a [`WaitGraph`] of the
//! blocked variables names the cycle, if there is one.
//!
//! ```rust
//! use serde_json::json;
//! use ssify::resolver::resolve;
//! use ssify::variables::{ExpectType, Variable, VariableSet, ssi_expect};
//!
//! let count = Variable::new("tags.count");
//! let limit = ssi_expect(count.clone(), ExpectType::Int)?;
//! let pick = Variable::new("tags.pick").kwarg("limit", limit);
//! let vars = [pick, count.clone()].into_iter().collect::<VariableSet>();
//!
//! let table = resolve(&vars, |var| match var.path() {
//!     "tags.count" => Ok(json!(4)),
//!     _ => Ok(json!(var.kwargs()["limit"].as_value().unwrap().as_i64().unwrap() - 2)),
//! })?;
//!
//! assert_eq!(table.get(count.identifier()), Some(&json!(4)));
//! let picked = Variable::new("tags.pick").kwarg("limit", 4i64);
//! assert_eq!(table.get(picked.identifier()), Some(&json!(2)));
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod dependency_graph;

pub use dependency_graph::WaitGraph;

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::{debug, trace};

use crate::computation::Registry;
use crate::core::{RequestContext, SsifyError};
use crate::directives;
use crate::variables::{Arg, Variable, VariableSet};

/// Concrete values keyed by published variable identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedTable {
    values: BTreeMap<String, Value>,
}

impl ResolvedTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value.
    pub fn insert(&mut self, identifier: impl Into<String>, value: Value) {
        self.values.insert(identifier.into(), value);
    }

    /// Value of a variable.
    pub fn get(&self, identifier: &str) -> Option<&Value> {
        self.values.get(identifier)
    }

    /// Whether a value was resolved for this identifier.
    pub fn contains(&self, identifier: &str) -> bool {
        self.values.contains_key(identifier)
    }

    /// Number of resolved variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing was resolved.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries sorted by identifier.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(id, value)| (id.as_str(), value))
    }
}

/// Resolved values plus the provisional identifiers that were renamed on the way.
struct ResolutionState {
    resolved: ResolvedTable,
    /// Queued identifier -> published identifier, for variables that were rehashed.
    aliases: HashMap<String, String>,
}

impl ResolutionState {
    fn value(&self, identifier: &str) -> Option<&Value> {
        self.resolved.get(identifier).or_else(|| {
            self.aliases.get(identifier).and_then(|published| self.resolved.get(published))
        })
    }

    fn substitute_expectations(&self, variable: &Variable, missing: &mut Vec<String>) -> Variable {
        // Nothing to substitute: keep the identifier, which may have been chosen by hand.
        if variable.is_concrete() {
            return variable.clone();
        }

        let mut substitute = |arg: &Arg| match arg {
            Arg::Expect(expectation) => match self.value(expectation.target()) {
                Some(value) => Arg::Value(value.clone()),
                None => {
                    missing.push(expectation.target().to_string());
                    arg.clone()
                }
            },
            Arg::Variable(inner) => {
                Arg::Variable(Box::new(self.substitute_expectations(inner, missing)))
            }
            Arg::Value(_) => arg.clone(),
        };

        let args = variable.args().iter().map(&mut substitute).collect();
        let kwargs = variable
            .kwargs()
            .iter()
            .map(|(name, arg)| (name.clone(), substitute(arg)))
            .collect();
        Variable::from_parts(variable.path(), args, kwargs)
    }

    fn call_form(&self, declared: &Variable, missing: &mut Vec<String>) -> Variable {
        let mut substitute = |arg: &Arg| match arg {
            Arg::Variable(inner) => match self.value(inner.identifier()) {
                Some(value) => Arg::Value(value.clone()),
                None => {
                    missing.push(inner.identifier().to_string());
                    arg.clone()
                }
            },
            _ => arg.clone(),
        };

        let args = declared.args().iter().map(&mut substitute).collect();
        let kwargs = declared
            .kwargs()
            .iter()
            .map(|(name, arg)| (name.clone(), substitute(arg)))
            .collect();
        Variable::from_parts(declared.path(), args, kwargs).with_identifier(declared.identifier())
    }
}

/// Compute all `variables`, feeding resolved values into the variables that expect them.
///
/// `compute` receives the call form of each variable: every argument a plain value, and
/// the identifier the value is published under. It runs exactly once per published
/// identifier; its errors propagate immediately.
///
/// # Errors
///
/// [`SsifyError::DependencyCycle`] when the remaining variables cannot make progress,
/// or the first error returned by `compute`.
pub fn resolve<F>(variables: &VariableSet, mut compute: F) -> Result<ResolvedTable>
where
    F: FnMut(&Variable) -> Result<Value>,
{
    let mut state = ResolutionState {
        resolved: ResolvedTable::new(),
        aliases: HashMap::new(),
    };
    let mut queue = seed_queue(variables);
    let mut waiting: HashMap<String, Vec<String>> = HashMap::new();
    let mut unresolved_streak = 0usize;

    while let Some(variable) = queue.pop_front() {
        let mut missing = Vec::new();
        let declared = state.substitute_expectations(&variable, &mut missing);
        let call = state.call_form(&declared, &mut missing);

        if !missing.is_empty() {
            trace!("SSI variable {} waits for {:?}", variable.identifier(), missing);
            waiting.insert(variable.identifier().to_string(), missing);
            queue.push_back(variable);
            unresolved_streak += 1;
            if unresolved_streak >= queue.len() {
                return Err(cycle_error(&queue, &waiting, &state.resolved).into());
            }
            continue;
        }

        let published = declared.identifier().to_string();
        if published != variable.identifier() {
            debug!("Rehashed SSI variable {} -> {}", variable.identifier(), published);
            state.aliases.insert(variable.identifier().to_string(), published.clone());
        }
        waiting.remove(variable.identifier());

        if state.resolved.contains(&published) {
            trace!("SSI variable {published} already resolved");
        } else {
            let value = compute(&call).with_context(|| {
                format!("Failed to compute SSI variable {}", declared.describe())
            })?;
            debug!("Resolved SSI variable {published} ({}) = {value}", declared.path());
            state.resolved.insert(published, value);
        }
        unresolved_streak = 0;
    }

    Ok(state.resolved)
}

/// Requested variables in order, then nested variables not requested themselves.
fn seed_queue(variables: &VariableSet) -> VecDeque<Variable> {
    let mut seen: HashSet<String> = variables.identifiers().map(str::to_string).collect();
    let mut queue: VecDeque<Variable> = variables.iter().cloned().collect();

    let mut nested = Vec::new();
    for variable in variables.iter() {
        collect_nested(variable, &mut nested);
    }
    for variable in nested {
        if seen.insert(variable.identifier().to_string()) {
            queue.push_back(variable);
        }
    }
    queue
}

fn collect_nested(variable: &Variable, out: &mut Vec<Variable>) {
    for arg in variable.args().iter().chain(variable.kwargs().values()) {
        if let Arg::Variable(inner) = arg {
            collect_nested(inner, out);
            out.push(inner.as_ref().clone());
        }
    }
}

fn cycle_error(
    queue: &VecDeque<Variable>,
    waiting: &HashMap<String, Vec<String>>,
    resolved: &ResolvedTable,
) -> SsifyError {
    let mut graph = WaitGraph::new();
    for variable in queue {
        if let Some(targets) = waiting.get(variable.identifier()) {
            for target in targets {
                graph.add_wait(variable.identifier(), target);
            }
        }
    }

    SsifyError::DependencyCycle {
        unresolved: queue.iter().map(Variable::describe).collect(),
        resolved: resolved
            .iter()
            .map(|(id, value)| format!("{id}={}", directives::value_text(value)))
            .collect(),
        cycle: graph.find_cycle().map(|cycle| cycle.join(" → ")),
    }
}

/// Resolve `variables` against the registry and render them as set statements.
pub fn provide_vars(
    ctx: &RequestContext,
    variables: &VariableSet,
    registry: &Registry,
) -> Result<String> {
    let resolved = resolve(variables, |variable| registry.compute(variable, ctx))
        .with_context(|| format!("Failed to provide SSI variables for {}", ctx.full_path()))?;
    Ok(directives::serialize(&resolved))
}
