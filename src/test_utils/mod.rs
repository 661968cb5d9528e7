//! Test utilities for ssify
//!
//! Available to unit tests and, with the `test-utils` feature, to the integration
//! suites:
//! - [`init_test_logging`] for tracing output in tests
//! - [`fixtures`]: a small quotes site (computations, fragment routes and a page)
//!   exercising every part of the two-phase flow
//!
//! # Example
//!
//! ```rust,no_run
//! use ssify::core::RequestContext;
//! use ssify::test_utils::fixtures::{quotes_page, quotes_router};
//!
//! let router = quotes_router();
//! let mut ctx = RequestContext::new("/").with_language("en");
//! let body = quotes_page(&router, &mut ctx).unwrap();
//! assert!(body.starts_with("<h1>"));
//! ```

pub mod fixtures;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` if given, else `RUST_LOG`; with
/// neither, tests run without a subscriber.
///
/// ```bash
/// RUST_LOG=ssify=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
