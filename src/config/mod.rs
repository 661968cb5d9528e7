//! Configuration management for ssify
//!
//! A single TOML file configures the response pipeline, the fragment caches and the
//! local interpreter. Every key is optional:
//!
//! ```toml
//! # Evaluate SSI directives in process (development only)
//! render = false
//! render_verbose = false
//!
//! # Keep X-Ssi-Vars-Needed on responses replayed from cache
//! debug = false
//!
//! # Values accepted for the `lang` argument of included fragments
//! languages = ["en", "pl"]
//!
//! # Fragment caches, by alias; defaults to "ssify", then "default"
//! cache_aliases = ["ssify"]
//!
//! # Timeout for included fragments that set none
//! default_timeout_secs = 3600
//!
//! max_include_depth = 16
//! ```
//!
//! # Location
//!
//! - `--config PATH` on the command line
//! - `SSIFY_CONFIG` environment variable
//! - Unix/macOS: `~/.ssify/config.toml`
//! - Windows: `%LOCALAPPDATA%\ssify\config.toml`

pub mod global;

pub use global::{CONFIG_ENV, SsifyConfig};
