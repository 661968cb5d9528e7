//! Local emulation of an SSI-enabled proxy.
//!
//! Production deployments let the reverse proxy (Nginx with `ssi on`) evaluate the
//! directives ssify emits. For development and tests, [`Interpreter`] does the same in
//! process: it evaluates `set`, `echo`, `if`/`else`/`endif` and `include` directives
//! and returns the final page.
//!
//! # Evaluation Order
//!
//! The document is rewritten in four passes, each over the output of the previous one:
//!
//! 1. `set` statements store their (unescaped) value and disappear
//! 2. `echo` statements are replaced by the value of their variable
//! 3. `if` blocks are replaced by the selected branch
//! 4. `include` statements are replaced by the interpreted fragment
//!
//! Fragments brought in by an include are interpreted by their own recursive call,
//! sharing the variable table of the including document. Text produced by one pass is
//! never rescanned by the enclosing document.
//!
//! `if` blocks do not nest. Directive-like text that does not match one of the four
//! forms exactly is left alone.
//!
//! # Verbose Mode
//!
//! With [`Interpreter::verbose`], every evaluated directive stays in the output,
//! followed by its result and an `<!--#end-...-->` twin, so the page source shows
//! where each value came from.

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use strsim::levenshtein;
use tracing::{debug, trace};

use crate::cache::CacheSet;
use crate::core::{RequestContext, SsifyError};
use crate::directives;

/// Default limit for nested includes.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 16;

/// Largest edit distance, as a percentage of the name length, for a suggestion.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

// The value is what `directives::escape` produces: no bare quote, every backslash
// starting a pair.
static SSI_SET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--#set var='(?P<var>[^']+)' value='(?P<value>(?:[^'\\]|\\.)*)'-->")
        .expect("set directive pattern is valid")
});

static SSI_ECHO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--#echo var='(?P<var>[^']+)' encoding='none'-->")
        .expect("echo directive pattern is valid")
});

static SSI_IF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)(?P<header><!--#if expr='(?P<expr>[^']*)'-->)(?P<value>.*?)(?:<!--#else-->(?P<else>.*?))?<!--#endif-->",
    )
    .expect("if directive pattern is valid")
});

static SSI_INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--#include (?:virtual|file)='(?P<path>[^']+)'-->")
        .expect("include directive pattern is valid")
});

static SSI_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{(?P<var>[^}]+)\}").expect("variable pattern is valid")
});

/// Renders the fragment behind an include path when no cache has it.
///
/// The context passed in points at the include path; its `vars_needed` starts empty.
pub trait FragmentDispatcher: Send + Sync {
    /// Render the fragment at `ctx.path`.
    ///
    /// # Errors
    ///
    /// [`SsifyError::IncludeNotFound`] when nothing serves the path, or whatever
    /// rendering the fragment fails with.
    fn dispatch(&self, ctx: &mut RequestContext) -> Result<String>;
}

/// A dispatcher that serves nothing: every include must come from the caches.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDispatch;

impl FragmentDispatcher for NoDispatch {
    fn dispatch(&self, ctx: &mut RequestContext) -> Result<String> {
        Err(SsifyError::IncludeNotFound {
            path: ctx.full_path(),
        }
        .into())
    }
}

/// Evaluates SSI directives.
#[derive(Clone)]
pub struct Interpreter {
    dispatcher: Arc<dyn FragmentDispatcher>,
    caches: CacheSet,
    verbose: bool,
    max_include_depth: usize,
}

/// Variable table shared across the include tree of one document.
#[derive(Debug, Default)]
struct Session {
    variables: HashMap<String, String>,
}

impl Interpreter {
    /// An interpreter rendering includes with `dispatcher`, without caches.
    pub fn new(dispatcher: Arc<dyn FragmentDispatcher>) -> Self {
        Self {
            dispatcher,
            caches: CacheSet::new(),
            verbose: false,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    /// Look includes up in `caches` before dispatching.
    #[must_use]
    pub fn with_caches(mut self, caches: CacheSet) -> Self {
        self.caches = caches;
        self
    }

    /// Keep evaluated directives in the output.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Limit how deeply includes may nest.
    #[must_use]
    pub const fn max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    /// Evaluate every directive in `document`.
    ///
    /// # Errors
    ///
    /// - [`SsifyError::UndeclaredReference`] for an echo or `${}` of a variable never set
    /// - [`SsifyError::IncludeNotFound`] when an include is neither cached nor served
    /// - [`SsifyError::IncludeDepthExceeded`] when includes nest too deeply
    pub fn process(&self, document: &str, ctx: &RequestContext) -> Result<String> {
        let mut session = Session::default();
        self.process_content(document, ctx, &mut session, 0)
    }

    fn process_content(
        &self,
        content: &str,
        ctx: &RequestContext,
        session: &mut Session,
        depth: usize,
    ) -> Result<String> {
        let content = replace_all(&SSI_SET, content, |caps| {
            let name = &caps["var"];
            let value = directives::unescape(&caps["value"]);
            trace!("SSI set {name}");
            session.variables.insert(name.to_string(), value);
            Ok(if self.verbose { caps[0].to_string() } else { String::new() })
        })?;

        let content = replace_all(&SSI_ECHO, &content, |caps| {
            let value = lookup(&session.variables, &caps["var"], "echo")?.to_string();
            Ok(self.wrap(&caps[0], &value))
        })?;

        let content = replace_all(&SSI_IF, &content, |caps| {
            let expr = substitute_vars(&session.variables, &caps["expr"], "if expression")?;
            let branch = if expr.is_empty() {
                caps.name("else").map_or("", |m| m.as_str())
            } else {
                &caps["value"]
            };
            Ok(self.wrap(&caps["header"], branch))
        })?;

        replace_all(&SSI_INCLUDE, &content, |caps| {
            let path = substitute_vars(&session.variables, &caps["path"], "include path")?;
            let included = self.include(&path, ctx, session, depth)?;
            Ok(self.wrap(&caps[0], &included))
        })
    }

    fn include(
        &self,
        path: &str,
        ctx: &RequestContext,
        session: &mut Session,
        depth: usize,
    ) -> Result<String> {
        if depth >= self.max_include_depth {
            return Err(SsifyError::IncludeDepthExceeded {
                path: path.to_string(),
                depth: self.max_include_depth,
            }
            .into());
        }

        let raw = if let Some(cached) = self.caches.get(path) {
            debug!("Including {path} from cache");
            cached
        } else {
            debug!("Including {path} by dispatch");
            let mut inner = ctx.with_location(path);
            self.dispatcher
                .dispatch(&mut inner)
                .with_context(|| format!("Failed to include {path}"))?
        };
        self.process_content(&raw, ctx, session, depth + 1)
    }

    fn wrap(&self, directive: &str, content: &str) -> String {
        if self.verbose {
            format!("{directive}{content}{}", directive.replace("<!--#", "<!--#end-"))
        } else {
            content.to_string()
        }
    }
}

/// Replace every match of `re`, stopping at the first error.
fn replace_all<F>(re: &Regex, text: &str, mut replacement: F) -> Result<String>
where
    F: FnMut(&Captures<'_>) -> Result<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        out.push_str(&replacement(&caps)?);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Resolve `${name}` references in an attribute.
fn substitute_vars(
    variables: &HashMap<String, String>,
    text: &str,
    context: &str,
) -> Result<String> {
    replace_all(&SSI_VAR, text, |caps| Ok(lookup(variables, &caps["var"], context)?.to_string()))
}

fn lookup<'a>(
    variables: &'a HashMap<String, String>,
    name: &str,
    context: &str,
) -> Result<&'a str> {
    variables.get(name).map(String::as_str).ok_or_else(|| {
        SsifyError::UndeclaredReference {
            name: name.to_string(),
            context: context.to_string(),
            suggestion: closest_name(name, variables.keys()),
        }
        .into()
    })
}

fn closest_name<'a>(target: &str, names: impl Iterator<Item = &'a String>) -> Option<String> {
    names
        .map(|name| (levenshtein(target, name), name))
        .filter(|(distance, _)| *distance <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
        .min()
        .map(|(_, name)| name.clone())
}
