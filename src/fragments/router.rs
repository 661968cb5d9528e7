//! Path routing for included fragments.
//!
//! Patterns are `/`-separated segments, each either literal or a `{name}` parameter
//! matching one non-empty segment: `/{lang}/quote/{number}/`.

use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use super::{IncludedFragment, LANG_ARG};
use crate::cache::CacheSet;
use crate::config::SsifyConfig;
use crate::core::{RequestContext, SsifyError};
use crate::directives;
use crate::interpreter::FragmentDispatcher;
use crate::variables::Arg;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
struct Route {
    name: String,
    segments: Vec<Segment>,
    fragment: Arc<IncludedFragment>,
}

impl Route {
    fn parse(name: &str, pattern: &str, fragment: Arc<IncludedFragment>) -> Self {
        let segments = pattern
            .split('/')
            .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(param) => Segment::Param(param.to_string()),
                None => Segment::Literal(segment.to_string()),
            })
            .collect();
        Self {
            name: name.to_string(),
            segments,
            fragment,
        }
    }

    fn params(&self) -> BTreeSet<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Param(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let parts = path.split('/').collect::<Vec<_>>();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut kwargs = BTreeMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Param(name) if !part.is_empty() => {
                    kwargs.insert(name.clone(), part.to_string());
                }
                _ => return None,
            }
        }
        Some(kwargs)
    }

    /// Build the path for exactly these arguments.
    fn reverse(&self, kwargs: &BTreeMap<String, String>) -> Option<String> {
        let given = kwargs.keys().map(String::as_str).collect::<BTreeSet<_>>();
        if given != self.params() {
            return None;
        }

        let parts = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(literal) => Some(literal.as_str()),
                Segment::Param(name) => {
                    kwargs.get(name).map(String::as_str).filter(|value| is_segment(value))
                }
            })
            .collect::<Option<Vec<_>>>()?;
        Some(parts.join("/"))
    }
}

/// Whether `value` reads back as one path segment inside an include attribute.
fn is_segment(value: &str) -> bool {
    !value.is_empty() && !value.contains(['/', '?', '\'', '\\'])
}

/// Named routes to included fragments.
///
/// Serves includes for the [`Interpreter`](crate::interpreter::Interpreter) and builds
/// include directives for pages ([`Router::include`]).
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
    languages: Vec<String>,
    caches: CacheSet,
    default_timeout: Option<Duration>,
}

impl Router {
    /// A router accepting `languages` as values of `lang` route arguments.
    pub fn new(languages: Vec<String>) -> Self {
        Self {
            routes: Vec::new(),
            languages,
            caches: CacheSet::new(),
            default_timeout: None,
        }
    }

    /// A router for the configured languages and fragment timeout, caching in `caches`.
    pub fn from_config(config: &SsifyConfig, caches: CacheSet) -> Self {
        Self::new(config.languages.clone())
            .with_caches(caches)
            .with_default_timeout(config.default_timeout())
    }

    /// Timeout for fragments of routes added afterwards that set none.
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Store rendered fragments in `caches`.
    #[must_use]
    pub fn with_caches(mut self, caches: CacheSet) -> Self {
        self.caches = caches;
        self
    }

    /// Add a route. Earlier routes win when several match a path.
    #[must_use]
    pub fn route(mut self, name: &str, pattern: &str, mut fragment: IncludedFragment) -> Self {
        if fragment.timeout.is_none() {
            fragment.timeout = self.default_timeout;
        }
        self.routes.push(Route::parse(name, pattern, Arc::new(fragment)));
        self
    }

    /// Caches rendered fragments are written to.
    pub const fn caches(&self) -> &CacheSet {
        &self.caches
    }

    /// Find the fragment serving `path`, with the arguments taken from it.
    pub fn resolve(&self, path: &str) -> Option<(&IncludedFragment, BTreeMap<String, String>)> {
        self.routes
            .iter()
            .find_map(|route| route.matches(path).map(|kwargs| (route.fragment.as_ref(), kwargs)))
    }

    /// Path of route `name` for exactly these arguments.
    pub fn reverse(&self, name: &str, kwargs: &BTreeMap<String, String>) -> Option<String> {
        self.reverse_route(name, kwargs).map(|(_, path)| path)
    }

    fn reverse_route(
        &self,
        name: &str,
        kwargs: &BTreeMap<String, String>,
    ) -> Option<(&Route, String)> {
        self.routes
            .iter()
            .filter(|route| route.name == name)
            .find_map(|route| route.reverse(kwargs).map(|path| (route, path)))
    }

    /// Build the include directive for route `name`.
    ///
    /// Literal arguments are written into the path and must each be a non-empty segment
    /// free of `/`, `?`, quotes and backslashes. Variable arguments become `${ID}`
    /// references and are registered on `ctx`, so the proxy substitutes their values
    /// before fetching the fragment. The `lang` argument comes from the context's
    /// language when the route takes one.
    ///
    /// Variables the target fragment declares for these arguments are registered on
    /// `ctx` as well: the including page provides their values.
    ///
    /// # Errors
    ///
    /// [`SsifyError::RouteNotFound`] when no route `name` takes these arguments or a
    /// literal cannot be a path segment, or the error of the fragment's declaration
    /// function.
    pub fn include(
        &self,
        ctx: &mut RequestContext,
        name: &str,
        kwargs: BTreeMap<String, Arg>,
    ) -> Result<String> {
        let mut path_kwargs = BTreeMap::new();
        for (key, arg) in &kwargs {
            let text = match arg {
                Arg::Value(value) => directives::value_text(value),
                Arg::Variable(variable) => ctx.need(variable.as_ref().clone()).as_var(),
                Arg::Expect(expectation) => format!("${{{}}}", expectation.target()),
            };
            path_kwargs.insert(key.clone(), text);
        }

        let (route, path) = self.reverse_with_lang(ctx, name, path_kwargs).ok_or_else(|| {
            SsifyError::RouteNotFound {
                name: name.to_string(),
                arguments: kwargs.keys().cloned().collect::<Vec<_>>().join(", "),
            }
        })?;

        for variable in route.fragment.declared_vars(&kwargs)? {
            trace!("Include of {name} declares {}", variable.describe());
            ctx.need(variable);
        }

        Ok(directives::include_statement(&path))
    }

    fn reverse_with_lang(
        &self,
        ctx: &RequestContext,
        name: &str,
        mut kwargs: BTreeMap<String, String>,
    ) -> Option<(&Route, String)> {
        if let Some(lang) = &ctx.language {
            let mut with_lang = kwargs.clone();
            with_lang.entry(LANG_ARG.to_string()).or_insert_with(|| lang.clone());
            if let Some(found) = self.reverse_route(name, &with_lang) {
                return Some(found);
            }
        }
        if let Some(found) = self.reverse_route(name, &kwargs) {
            return Some(found);
        }
        // A caller-supplied lang the route does not take.
        kwargs.remove(LANG_ARG)?;
        self.reverse_route(name, &kwargs)
    }
}

impl FragmentDispatcher for Router {
    fn dispatch(&self, ctx: &mut RequestContext) -> Result<String> {
        let Some((fragment, kwargs)) = self.resolve(&ctx.path) else {
            return Err(SsifyError::IncludeNotFound {
                path: ctx.full_path(),
            }
            .into());
        };
        debug!("Rendering included fragment {}", ctx.full_path());
        fragment.render(ctx, kwargs, &self.languages, &self.caches)
    }
}
