//! Response pipeline: the two points where ssify touches a response.
//!
//! 1. [`Pipeline::prepare_for_cache`] runs before a whole-page cache stores the
//!    response. It attaches the [`VARS_NEEDED_HEADER`] so the cached copy remembers
//!    which variables it needs.
//! 2. [`Pipeline::process_response`] runs on every response on its way out, fresh or
//!    replayed from cache. It resolves the needed variables, prepends their set
//!    statements, and with `render` enabled evaluates the directives in process.
//!
//! ```rust
//! use serde_json::json;
//! use std::sync::Arc;
//! use ssify::computation::Registry;
//! use ssify::core::RequestContext;
//! use ssify::interpreter::{Interpreter, NoDispatch};
//! use ssify::pipeline::{Pipeline, Response};
//! use ssify::variables::Variable;
//!
//! let mut registry = Registry::new();
//! registry.register("tags.greeting", |_, _, _| Ok(json!("hello")));
//! let pipeline = Pipeline::new(Arc::new(registry), Interpreter::new(Arc::new(NoDispatch)))
//!     .render(true);
//!
//! let mut ctx = RequestContext::new("/");
//! let greeting = ctx.need(Variable::new("tags.greeting"));
//! let response = Response::new(format!("<p>{greeting}</p>"));
//!
//! let response = pipeline.process_response(&ctx, response)?;
//! assert_eq!(response.body, "<p>hello</p>");
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::computation::Registry;
use crate::config::SsifyConfig;
use crate::core::RequestContext;
use crate::fragments::Router;
use crate::header::{self, VARS_NEEDED_HEADER};
use crate::interpreter::Interpreter;
use crate::resolver::provide_vars;

/// The parts of an HTTP response ssify reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code.
    pub status: u16,
    /// Headers; names compare case-insensitively through the accessors.
    pub headers: BTreeMap<String, String>,
    /// Body text.
    pub body: String,
}

impl Response {
    /// A `200` response with no headers.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Value of header `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set header `name`, replacing any value under the same name in another case.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.remove_header(name);
        self.headers.insert(name.to_string(), value.into());
    }

    /// Remove header `name` and return its value.
    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        let key = self.headers.keys().find(|key| key.eq_ignore_ascii_case(name))?.clone();
        self.headers.remove(&key)
    }
}

/// Applies ssify to responses.
#[derive(Clone)]
pub struct Pipeline {
    registry: Arc<Registry>,
    interpreter: Interpreter,
    render: bool,
    debug: bool,
}

impl Pipeline {
    /// A pipeline resolving variables with `registry`. Rendering is off.
    pub fn new(registry: Arc<Registry>, interpreter: Interpreter) -> Self {
        Self {
            registry,
            interpreter,
            render: false,
            debug: false,
        }
    }

    /// A pipeline set up from configuration, serving includes with `router`.
    pub fn from_config(registry: Arc<Registry>, router: Arc<Router>, config: &SsifyConfig) -> Self {
        let caches = router.caches().clone();
        let interpreter = Interpreter::new(router)
            .with_caches(caches)
            .verbose(config.render_verbose)
            .max_include_depth(config.max_include_depth);
        Self::new(registry, interpreter).render(config.render).debug(config.debug)
    }

    /// Evaluate directives before returning the response.
    #[must_use]
    pub const fn render(mut self, render: bool) -> Self {
        self.render = render;
        self
    }

    /// Keep the variables header on outgoing responses.
    #[must_use]
    pub const fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Record the needed variables on a response about to be cached.
    ///
    /// A header already present is left alone, as is a response for a request that
    /// needed no variables.
    pub fn prepare_for_cache(&self, ctx: &RequestContext, response: &mut Response) {
        if response.header(VARS_NEEDED_HEADER).is_none() && !ctx.vars_needed.is_empty() {
            response.set_header(VARS_NEEDED_HEADER, header::encode(&ctx.vars_needed));
        }
    }

    /// Provide the variables a response needs and, if configured, render it.
    ///
    /// Variables come from the request context; a response replayed from cache has
    /// none there, so they are decoded from its header instead. The header is dropped
    /// unless `debug` is set.
    ///
    /// # Errors
    ///
    /// Header decoding, variable resolution and interpretation errors.
    pub fn process_response(
        &self,
        ctx: &RequestContext,
        mut response: Response,
    ) -> Result<Response> {
        let header_value = if self.debug {
            response.header(VARS_NEEDED_HEADER).map(str::to_string)
        } else {
            response.remove_header(VARS_NEEDED_HEADER)
        };

        let from_header;
        let vars_needed = if !ctx.vars_needed.is_empty() {
            &ctx.vars_needed
        } else if let Some(value) = header_value {
            from_header = header::decode(&value).with_context(|| {
                format!("Response for {} carries an invalid header", ctx.full_path())
            })?;
            debug!("Decoded {} SSI variables from {VARS_NEEDED_HEADER}", from_header.len());
            &from_header
        } else {
            return self.finish(ctx, response);
        };

        if !vars_needed.is_empty() {
            let statements = provide_vars(ctx, vars_needed, &self.registry)?;
            response.body.insert_str(0, &statements);
        }
        self.finish(ctx, response)
    }

    fn finish(&self, ctx: &RequestContext, mut response: Response) -> Result<Response> {
        if self.render {
            response.body = self
                .interpreter
                .process(&response.body, ctx)
                .with_context(|| {
                    format!("Failed to render SSI directives for {}", ctx.full_path())
                })?;
        }
        Ok(response)
    }
}
