//! Per-request state.
//!
//! A [`RequestContext`] lives for one request/response cycle. Rendering code registers
//! every SSI variable it emits with [`RequestContext::need`]; the pipeline later resolves
//! the collected set. Include dispatch reuses the context with its location overwritten.

use std::collections::BTreeMap;

use crate::variables::{Variable, VariableSet};

/// The request-scoped data ssify needs from the surrounding HTTP layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    /// Request path, without the query string.
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub query: String,
    /// Active language code, if the surrounding system negotiated one.
    pub language: Option<String>,
    /// Free-form request metadata (cookies, headers, CSRF state).
    pub meta: BTreeMap<String, String>,
    /// SSI variables used while rendering this request.
    pub vars_needed: VariableSet,
}

impl RequestContext {
    /// Create a context for `path`, which may carry a `?query` suffix.
    pub fn new(path: impl AsRef<str>) -> Self {
        let (path, query) = split_location(path.as_ref());
        Self {
            path,
            query,
            ..Self::default()
        }
    }

    /// Set the active language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Add a metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// A copy of this context pointing at another location.
    ///
    /// Used by include dispatch: everything but path and query is kept, and the copy
    /// starts with no collected variables.
    pub fn with_location(&self, location: &str) -> Self {
        let (path, query) = split_location(location);
        Self {
            path,
            query,
            language: self.language.clone(),
            meta: self.meta.clone(),
            vars_needed: VariableSet::new(),
        }
    }

    /// Register a variable used by the current rendering pass and return it.
    pub fn need(&mut self, variable: Variable) -> Variable {
        self.vars_needed.insert(variable.clone());
        variable
    }

    /// Path with the query string appended, if any.
    pub fn full_path(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }
}

fn split_location(location: &str) -> (String, String) {
    match location.split_once('?') {
        Some((path, query)) => (path.to_string(), query.to_string()),
        None => (location.to_string(), String::new()),
    }
}
