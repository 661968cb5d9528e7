//! Error handling for ssify
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`SsifyError`]) that callers can match on
//! 2. **User-friendly messages** ([`ErrorContext`]) with suggestions for the CLI
//!
//! Library functions return [`anyhow::Result`] and raise [`SsifyError`] values for
//! every failure the library itself detects. Callers that need the typed error use
//! [`anyhow::Error::downcast_ref`]:
//!
//! ```rust,no_run
//! use ssify::core::SsifyError;
//!
//! fn is_cycle(err: &anyhow::Error) -> bool {
//!     matches!(err.downcast_ref::<SsifyError>(), Some(SsifyError::DependencyCycle { .. }))
//! }
//! ```
//!
//! # Error Categories
//!
//! - **Resolution**: [`SsifyError::DependencyCycle`], [`SsifyError::UnknownComputation`],
//!   [`SsifyError::UnresolvedArgument`], [`SsifyError::InvalidArgument`]
//! - **Interpretation**: [`SsifyError::UndeclaredReference`], [`SsifyError::IncludeNotFound`],
//!   [`SsifyError::IncludeDepthExceeded`]
//! - **Included fragments**: [`SsifyError::UndeclaredVariables`], [`SsifyError::NoLangField`],
//!   [`SsifyError::RouteNotFound`]
//! - **Boundaries**: [`SsifyError::InvalidHeader`], [`SsifyError::UnknownCacheAlias`],
//!   [`SsifyError::ConfigError`]
//!
//! None of these are transient: they stem from declarations that do not match their use,
//! so nothing in the crate retries them.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for ssify operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SsifyError {
    /// Resolution made no progress during a full pass over the remaining variables.
    ///
    /// # Fields
    /// - `unresolved`: the variables still waiting, rendered with their definitions
    /// - `resolved`: `identifier=value` pairs computed before the failure
    /// - `cycle`: a concrete cycle path, if the blocked variables wait on each other
    #[error(
        "SSI variables have a dependency cycle{}.\nUnresolved SSI variables:\n{}\n\nResolved SSI variables:\n{}",
        .cycle.as_ref().map(|c| format!(": {c}")).unwrap_or_default(),
        .unresolved.join("\n"),
        .resolved.join("\n")
    )]
    DependencyCycle {
        /// Variables that could not be resolved
        unresolved: Vec<String>,
        /// Variables resolved so far
        resolved: Vec<String>,
        /// Cycle path joined with arrows, when one exists
        cycle: Option<String>,
    },

    /// An echo directive or `${}` reference used a name that was never set.
    #[error("Undeclared SSI variable '{name}' referenced in {context}")]
    UndeclaredReference {
        /// The missing variable name
        name: String,
        /// Where the reference was found (directive kind)
        context: String,
        /// The closest defined name, if any
        suggestion: Option<String>,
    },

    /// No cached fragment and no matching route for an include path.
    #[error("Included fragment not found: {path}")]
    IncludeNotFound {
        /// The include path after `${}` substitution
        path: String,
    },

    /// No route takes the name and arguments an include was built from.
    #[error("No route '{name}' accepts the arguments {arguments}")]
    RouteNotFound {
        /// Route name
        name: String,
        /// Argument names that were given, comma separated
        arguments: String,
    },

    /// Includes nested deeper than the configured limit.
    #[error("Include nesting too deep ({depth} levels) at {path}")]
    IncludeDepthExceeded {
        /// The include path that crossed the limit
        path: String,
        /// Configured maximum depth
        depth: usize,
    },

    /// An included fragment used SSI variables it did not declare.
    #[error(
        "The fragment at '{path}' is marked as included, but it uses SSI variables not declared by it: {}",
        .variables.join(", ")
    )]
    UndeclaredVariables {
        /// Request path of the fragment
        path: String,
        /// Variables used but not declared
        variables: Vec<String>,
    },

    /// A fragment with language binding was routed without a `lang` argument.
    #[error(
        "The fragment at '{path}' is marked as included with language binding, but its route doesn't provide a 'lang' argument"
    )]
    NoLangField {
        /// Request path of the fragment
        path: String,
    },

    /// No computation is registered under the variable's path.
    #[error("No computation registered for SSI variable path '{path}'")]
    UnknownComputation {
        /// The computation path
        path: String,
    },

    /// A computation was invoked with a placeholder still in its arguments.
    #[error("SSI variable '{path}' still has unresolved arguments: {definition}")]
    UnresolvedArgument {
        /// The computation path
        path: String,
        /// Canonical definition of the offending variable
        definition: String,
    },

    /// A literal could not be coerced to the type an expectation declared.
    #[error("Cannot use {value} as {expected}")]
    InvalidArgument {
        /// The literal, as JSON
        value: String,
        /// Name of the declared type
        expected: String,
    },

    /// The wire header could not be decoded.
    #[error("Invalid SSI variables header: {reason}")]
    InvalidHeader {
        /// Parser or shape error
        reason: String,
    },

    /// A configured cache alias has no store behind it.
    #[error("No fragment cache configured under alias '{alias}'")]
    UnknownCacheAlias {
        /// The requested alias
        alias: String,
    },

    /// Configuration file could not be read or parsed.
    #[error("Configuration error in {path}: {reason}")]
    ConfigError {
        /// Path of the configuration file
        path: String,
        /// Underlying failure
        reason: String,
    },
}

/// Error context wrapper that provides user-friendly error information.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: SsifyError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestions or details.
    #[must_use]
    pub const fn new(error: SsifyError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Convert any error into an [`ErrorContext`] suitable for terminal display.
///
/// Typed [`SsifyError`]s anywhere in the chain get tailored suggestions. Other errors
/// are wrapped as a configuration error carrying the full context chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(ssify_error) = cause.downcast_ref::<SsifyError>() {
            return create_error_context(ssify_error.clone());
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(SsifyError::ConfigError {
            path: "config.toml".to_string(),
            reason: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of the ssify configuration file");
    }

    let chain = error.chain().map(ToString::to_string).collect::<Vec<_>>();
    ErrorContext::new(SsifyError::ConfigError {
        path: "<unknown>".to_string(),
        reason: chain.first().cloned().unwrap_or_default(),
    })
    .with_details(chain.join("\n  caused by: "))
}

fn create_error_context(error: SsifyError) -> ErrorContext {
    match &error {
        SsifyError::DependencyCycle { cycle, .. } => {
            let details = if cycle.is_some() {
                "Two or more SSI variables expect each other's values"
            } else {
                "Some SSI variables expect values of variables that are never declared"
            };
            ErrorContext::new(error.clone())
                .with_suggestion(
                    "Check the declarations of the included fragments: every expected variable must also be declared",
                )
                .with_details(details)
        }
        SsifyError::UndeclaredReference { suggestion, .. } => {
            let ctx = ErrorContext::new(error.clone()).with_details(
                "Every echo and ${} reference must follow a set statement for the same name",
            );
            match suggestion {
                Some(similar) => ctx.with_suggestion(format!("Did you mean '{similar}'?")),
                None => ctx.with_suggestion(
                    "Make sure the variable is registered with the request context before it is rendered",
                ),
            }
        }
        SsifyError::IncludeNotFound { .. } => ErrorContext::new(error.clone())
            .with_suggestion(
                "Check the include path or pass a fragments directory with --fragments",
            ),
        SsifyError::UndeclaredVariables { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Add the variables to the fragment's declaration function"),
        SsifyError::RouteNotFound { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Pass exactly the arguments the route pattern names"),
        SsifyError::NoLangField { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Add a {lang} segment to the route or disable language binding"),
        SsifyError::UnknownComputation { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Register the computation in the registry before resolving variables"),
        SsifyError::InvalidHeader { .. } => ErrorContext::new(error.clone())
            .with_details("The header must be a JSON object mapping identifiers to definitions"),
        _ => ErrorContext::new(error),
    }
}
