//! Core types shared by every ssify module
//!
//! - [`error`]: [`SsifyError`], [`ErrorContext`] and [`user_friendly_error`]
//! - [`request`]: [`RequestContext`], the per-request state threaded through
//!   rendering, resolution and interpretation
//!
//! # Error Handling Pattern
//!
//! ```rust
//! use ssify::core::{SsifyError, user_friendly_error};
//! use anyhow::Result;
//!
//! fn example_operation() -> Result<String> {
//!     Err(SsifyError::IncludeNotFound { path: "/missing".to_string() }.into())
//! }
//!
//! if let Err(e) = example_operation() {
//!     let friendly = user_friendly_error(e);
//!     assert!(friendly.to_string().contains("/missing"));
//! }
//! ```

pub mod error;
pub mod request;

pub use error::{ErrorContext, SsifyError, user_friendly_error};
pub use request::RequestContext;
