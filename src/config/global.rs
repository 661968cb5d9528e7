//! The ssify configuration file.
//!
//! Read from `~/.ssify/config.toml` (`%LOCALAPPDATA%\ssify\config.toml` on Windows),
//! or from the path in `SSIFY_CONFIG`. A missing file means defaults everywhere.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::core::SsifyError;
use crate::interpreter::DEFAULT_MAX_INCLUDE_DEPTH;

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV: &str = "SSIFY_CONFIG";

/// Settings for the response pipeline, the fragment caches and the interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsifyConfig {
    /// Evaluate directives in process instead of leaving them to the proxy.
    #[serde(default)]
    pub render: bool,

    /// Keep evaluated directives in the output (with `render`).
    #[serde(default)]
    pub render_verbose: bool,

    /// Keep the `X-Ssi-Vars-Needed` header on responses replayed from cache.
    #[serde(default)]
    pub debug: bool,

    /// Language codes accepted as `lang` arguments of included fragments.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Fragment cache aliases to write to and read from, in order.
    ///
    /// When unset, the `ssify` cache is used if it exists, else `default`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_aliases: Option<Vec<String>>,

    /// Timeout for included fragments that set none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_timeout_secs: Option<u64>,

    /// How deeply includes may nest in the interpreter.
    #[serde(default = "default_max_include_depth")]
    pub max_include_depth: usize,
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string()]
}

const fn default_max_include_depth() -> usize {
    DEFAULT_MAX_INCLUDE_DEPTH
}

impl Default for SsifyConfig {
    fn default() -> Self {
        Self {
            render: false,
            render_verbose: false,
            debug: false,
            languages: default_languages(),
            cache_aliases: None,
            default_timeout_secs: None,
            max_include_depth: default_max_include_depth(),
        }
    }
}

impl SsifyConfig {
    /// Load from `SSIFY_CONFIG` or the default location.
    ///
    /// ```rust,no_run
    /// use ssify::config::SsifyConfig;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let config = SsifyConfig::load().await?;
    /// println!("Rendering in process: {}", config.render);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` if given, else as [`SsifyConfig::load`] does.
    ///
    /// An explicit path must exist; the implicit locations fall back to defaults.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from(&path).await;
        }

        let path = match std::env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load and validate a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read ssify config from {}", path.display()))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse ssify config from {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    /// Parse configuration text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Default configuration file location.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("ssify")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".ssify")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// [`default_timeout_secs`](Self::default_timeout_secs) as a duration.
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_secs.map(Duration::from_secs)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |reason: &str| SsifyError::ConfigError {
            path: path.display().to_string(),
            reason: reason.to_string(),
        };

        if self.languages.is_empty() {
            return Err(invalid("'languages' must list at least one language").into());
        }
        if self.max_include_depth == 0 {
            return Err(invalid("'max_include_depth' must be at least 1").into());
        }
        if self.cache_aliases.as_ref().is_some_and(Vec::is_empty) {
            return Err(invalid("'cache_aliases' must not be empty when set").into());
        }
        Ok(())
    }
}
