//! Integration test suite for ssify
//!
//! End-to-end tests of the two-phase flow and the command-line tools.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **pipeline**: Rendering, resolution, caching and interpretation together
//! - **fragments**: Included fragments through the router and fragment caches
//! - **cli**: The `ssify` binary
//! - **config**: Configuration file discovery

mod cli;
mod config;
mod fragments;
mod pipeline;
