//! Command-line interface for ssify.
//!
//! The CLI is a development companion to the library: it evaluates directive documents
//! the way the proxy would and inspects the values ssify puts on the wire.
//!
//! # Available Commands
//!
//! - `render` - Interpret a document, reading includes from a fragments directory
//! - `inspect` - Decode an `X-Ssi-Vars-Needed` header
//! - `hash` - Print the SSI variable identifier of a definition
//!
//! ```bash
//! # Interpret a page with fragments under ./fragments
//! ssify render page.html --fragments ./fragments
//!
//! # What does a cached response need?
//! ssify inspect @headers/vars-needed.json
//!
//! # Which variable name does this computation get?
//! ssify hash tags.random_number '[]' '{"limit": 10}'
//! ```
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: errors only
//! - `--config` / `-c`: configuration file in place of `SSIFY_CONFIG` or the default
//!   location

mod hash;
mod inspect;
mod render;

pub use render::FileDispatcher;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::SsifyConfig;

/// Runtime configuration for CLI execution, built from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Default log filter when `RUST_LOG` is unset; `None` logs errors only.
    pub log_level: Option<String>,

    /// Configuration file given with `--config`.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// A configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global tracing subscriber.
    ///
    /// `RUST_LOG` takes precedence over the level chosen by the flags. Installing twice
    /// is not an error.
    pub fn init_logging(&self) {
        let default = self.log_level.as_deref().unwrap_or("error");
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Two-phase rendering with SSI variables.
#[derive(Parser)]
#[command(
    name = "ssify",
    about = "ssify - Two-phase rendering with SSI variables",
    version,
    author,
    long_about = "ssify renders cacheable pages whose per-request values are filled in by \
                  server-side include directives. These commands evaluate and inspect what \
                  ssify produces."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging. Mutually exclusive with `--quiet`.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file (default `~/.ssify/config.toml`).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interpret SSI directives in a document
    Render(render::RenderCommand),

    /// Decode an X-Ssi-Vars-Needed header
    Inspect(inspect::InspectCommand),

    /// Print the identifier of an SSI variable definition
    Hash(hash::HashCommand),
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Build a [`CliConfig`] from the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("warn".to_string())
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
        }
    }

    /// Execute with an explicit configuration.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::Render(cmd) => {
                let settings = SsifyConfig::load_with_optional(config.config_path).await?;
                cmd.execute(&settings).await
            }
            Commands::Inspect(cmd) => cmd.execute().await,
            Commands::Hash(cmd) => cmd.execute(),
        }
    }
}
