//! Print the identifier of a variable definition.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{Value, json};

use crate::variables::Variable;

/// Command to compute an SSI variable identifier.
#[derive(Args)]
pub struct HashCommand {
    /// Computation path, e.g. `tags.random_number`
    path: String,

    /// Positional arguments as a JSON array
    #[arg(default_value = "[]")]
    args: String,

    /// Named arguments as a JSON object
    #[arg(default_value = "{}")]
    kwargs: String,
}

impl HashCommand {
    pub fn execute(self) -> Result<()> {
        println!("{}", self.variable()?.identifier());
        Ok(())
    }

    fn variable(&self) -> Result<Variable> {
        let args: Value = serde_json::from_str(&self.args)
            .with_context(|| format!("Positional arguments are not valid JSON: {}", self.args))?;
        let kwargs: Value = serde_json::from_str(&self.kwargs)
            .with_context(|| format!("Named arguments are not valid JSON: {}", self.kwargs))?;
        Variable::from_definition(json!([self.path, args, kwargs]))
    }
}
