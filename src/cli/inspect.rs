//! Decode a variables header.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::header;
use crate::variables::VariableSet;

/// Command to decode an `X-Ssi-Vars-Needed` header value.
#[derive(Args)]
pub struct InspectCommand {
    /// Header value, or `@FILE` to read it from a file
    header: String,
}

impl InspectCommand {
    pub async fn execute(self) -> Result<()> {
        let value = match self.header.strip_prefix('@') {
            Some(file) => tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("Failed to read header from {file}"))?,
            None => self.header,
        };

        let variables = header::decode(value.trim())?;
        for line in describe(&variables) {
            println!("{line}");
        }
        Ok(())
    }
}

fn describe(variables: &VariableSet) -> Vec<String> {
    if variables.is_empty() {
        return vec!["No SSI variables".dimmed().to_string()];
    }
    variables
        .iter()
        .map(|variable| {
            let state = if variable.is_concrete() {
                "concrete".green()
            } else {
                "pending".yellow()
            };
            format!("{} {state} {}", variable.identifier().bold(), variable.definition())
        })
        .collect()
}
