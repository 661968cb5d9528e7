//! Interpret a directive document locally.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::config::SsifyConfig;
use crate::core::{RequestContext, SsifyError};
use crate::interpreter::{FragmentDispatcher, Interpreter, NoDispatch};

/// Command to interpret SSI directives in a file.
#[derive(Args)]
pub struct RenderCommand {
    /// Document to interpret
    file: PathBuf,

    /// Directory included paths are read from
    #[arg(long)]
    fragments: Option<PathBuf>,

    /// Keep evaluated directives in the output
    #[arg(long)]
    verbose_directives: bool,

    /// Request path the document is rendered for
    #[arg(long, default_value = "/")]
    path: String,
}

impl RenderCommand {
    pub async fn execute(self, config: &SsifyConfig) -> Result<()> {
        let output = self.render(config).await?;
        print!("{output}");
        Ok(())
    }

    async fn render(&self, config: &SsifyConfig) -> Result<String> {
        let document = tokio::fs::read_to_string(&self.file)
            .await
            .with_context(|| format!("Failed to read {}", self.file.display()))?;

        let dispatcher: Arc<dyn FragmentDispatcher> = match &self.fragments {
            Some(root) => Arc::new(FileDispatcher::new(root)),
            None => Arc::new(NoDispatch),
        };
        let interpreter = Interpreter::new(dispatcher)
            .verbose(self.verbose_directives || config.render_verbose)
            .max_include_depth(config.max_include_depth);

        interpreter.process(&document, &RequestContext::new(&self.path))
    }
}

/// Serves include paths from files under a directory.
///
/// `/a/b/` reads `ROOT/a/b/index.html`; any other path reads the file it names. The
/// query string is ignored.
#[derive(Debug, Clone)]
pub struct FileDispatcher {
    root: PathBuf,
}

impl FileDispatcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn file_for(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
            return None;
        }
        let file = self.root.join(relative);
        if path.ends_with('/') || file.is_dir() {
            Some(file.join("index.html"))
        } else {
            Some(file)
        }
    }
}

impl FragmentDispatcher for FileDispatcher {
    fn dispatch(&self, ctx: &mut RequestContext) -> Result<String> {
        let not_found = || SsifyError::IncludeNotFound {
            path: ctx.full_path(),
        };
        let file = self.file_for(&ctx.path).ok_or_else(not_found)?;
        debug!("Reading include {} from {}", ctx.path, file.display());
        if !file.is_file() {
            return Err(not_found().into());
        }
        std::fs::read_to_string(&file).with_context(|| format!("Failed to read {}", file.display()))
    }
}
