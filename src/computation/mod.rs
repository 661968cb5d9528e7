//! Computation registry: what SSI variable paths resolve to.
//!
//! Every [`Variable`] names its computation by a dotted path such as
//! `"tags.number_of_quotes"`. A [`Registry`] maps those paths to callables receiving the
//! request context and the variable's literal arguments.
//!
//! ```rust
//! use serde_json::json;
//! use ssify::computation::Registry;
//! use ssify::core::RequestContext;
//! use ssify::variables::Variable;
//!
//! let mut registry = Registry::new();
//! registry.register("tags.add", |_ctx, args, _kwargs| {
//!     Ok(json!(args.iter().filter_map(|a| a.as_i64()).sum::<i64>()))
//! });
//!
//! let sum = Variable::new("tags.add").arg(2i64).arg(3i64);
//! let value = registry.compute(&sum, &RequestContext::new("/")).unwrap();
//! assert_eq!(value, json!(5));
//! ```

use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use crate::core::{RequestContext, SsifyError};
use crate::variables::Variable;

/// Signature of a registered computation.
pub type ComputeFn =
    dyn Fn(&RequestContext, &[Value], &Map<String, Value>) -> Result<Value> + Send + Sync;

/// Computations keyed by path.
///
/// Cloning is cheap; computations are shared behind [`Arc`].
#[derive(Clone, Default)]
pub struct Registry {
    computations: HashMap<String, Arc<ComputeFn>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `computation` under `path`, replacing any previous registration.
    pub fn register<F>(&mut self, path: impl Into<String>, computation: F) -> &mut Self
    where
        F: Fn(&RequestContext, &[Value], &Map<String, Value>) -> Result<Value>
            + Send
            + Sync
            + 'static,
    {
        self.computations.insert(path.into(), Arc::new(computation));
        self
    }

    /// Whether a computation is registered under `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.computations.contains_key(path)
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths = self.computations.keys().map(String::as_str).collect::<Vec<_>>();
        paths.sort_unstable();
        paths
    }

    /// Run the computation of a call-form variable.
    ///
    /// # Errors
    ///
    /// [`SsifyError::UnresolvedArgument`] if an argument is still a nested variable or an
    /// expectation, [`SsifyError::UnknownComputation`] if nothing is registered under the
    /// variable's path, or whatever the computation itself returns.
    pub fn compute(&self, variable: &Variable, ctx: &RequestContext) -> Result<Value> {
        let Some((args, kwargs)) = variable.concrete_args() else {
            return Err(SsifyError::UnresolvedArgument {
                path: variable.path().to_string(),
                definition: variable.definition().to_string(),
            }
            .into());
        };
        let computation =
            self.computations.get(variable.path()).ok_or_else(|| SsifyError::UnknownComputation {
                path: variable.path().to_string(),
            })?;

        trace!("Computing {} for {}", variable.path(), ctx.full_path());
        computation(ctx, &args, &kwargs)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("paths", &self.paths()).finish()
    }
}
