//! Unit test suite for ssify
//!
//! Focused tests of single modules through the public API.
//!
//! ```bash
//! cargo test --test unit
//! ```

mod directives_escaping;
mod resolver_properties;
mod variable_identity;
