//! ssify - Two-phase rendering with SSI variables
//!
//! Pages are rendered once and cached whole, while the parts that differ per request
//! (a CSRF token, a random pick, a counter) are left as server-side include variables.
//! A reverse proxy with SSI support (Nginx `ssi on`) fills them in on every request,
//! from `set` directives ssify prepends to the cached body.
//!
//! # Architecture Overview
//!
//! 1. **Render**: views register every SSI variable they emit with
//!    [`RequestContext::need`](core::RequestContext::need) and write `echo`, `if` or
//!    `include` directives in place of the values.
//! 2. **Resolve**: the [`pipeline`] computes the needed variables through the
//!    [`computation`] registry, in dependency order ([`resolver`]).
//! 3. **Serialize**: resolved values become `set` directives ([`directives`]) in front
//!    of the body. Whole-page caches store the body without them, plus the
//!    [`header`] listing what it needs.
//! 4. **Interpret**: the proxy, or the in-process [`interpreter`] during development,
//!    evaluates the directives.
//!
//! Variable names are content hashes of the computation and its arguments, so a cached
//! page and a fresh request always agree on them.
//!
//! # Core Modules
//!
//! ## Variables and Resolution
//! - [`variables`] - Hash-identified variables, expectations and variable sets
//! - [`resolver`] - Worklist resolution of nested variables and expectations
//! - [`computation`] - Registry of named computations
//!
//! ## Directives
//! - [`directives`] - SSI statement builders and the `set` serializer
//! - [`interpreter`] - Local SSI evaluation with include dispatch
//!
//! ## Fragments and Caching
//! - [`fragments`] - Included fragments, declarations and path routing
//! - [`cache`] - Fragment caches and multi-store fan-out
//! - [`header`] - The `X-Ssi-Vars-Needed` wire format
//! - [`pipeline`] - Response processing before caching and before sending
//!
//! ## Supporting Modules
//! - [`config`] - `~/.ssify/config.toml`
//! - [`core`] - Errors and the request context
//! - [`cli`] - Command-line tools
//!
//! # Example
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
//! registry
//!     .register("tags.count", |_, _, _| Ok(json!(3)))
//!     .register("tags.double", |_, args, _| {
//!         Ok(json!(args[0].as_i64().unwrap_or(0) * 2))
//!     });
//!
//! let mut ctx = RequestContext::new("/");
//! let count = ctx.need(Variable::new("tags.count"));
//! let double = ctx.need(Variable::new("tags.double").arg(count.clone()));
//!
//! let interpreter = Interpreter::new(Arc::new(NoDispatch));
//! let pipeline = Pipeline::new(Arc::new(registry), interpreter).render(true);
//! let body = format!("{count} times two is {double}");
//! let response = pipeline.process_response(&ctx, Response::new(body))?;
//! assert_eq!(response.body, "3 times two is 6");
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cache;
pub mod cli;
pub mod computation;
pub mod config;
pub mod core;
pub mod directives;
pub mod fragments;
pub mod header;
pub mod interpreter;
pub mod pipeline;
pub mod resolver;
pub mod variables;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
