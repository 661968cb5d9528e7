//! ssify CLI entry point
//!
//! Parses arguments, runs the command and prints errors with their suggestions:
//! - `render` - Interpret SSI directives in a document
//! - `inspect` - Decode an `X-Ssi-Vars-Needed` header
//! - `hash` - Print the identifier of a variable definition

use anyhow::Result;
use clap::Parser;
use ssify::cli;
use ssify::core::error::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
