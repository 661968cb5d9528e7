//! Configuration file discovery through `SSIFY_CONFIG`.

use serial_test::serial;
use tempfile::TempDir;

use ssify::config::{CONFIG_ENV, SsifyConfig};

struct EnvGuard {
    previous: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(value: &std::path::Path) -> Self {
        let previous = std::env::var_os(CONFIG_ENV);
        // SAFETY: tests touching the environment are serialized.
        unsafe { std::env::set_var(CONFIG_ENV, value) };
        Self { previous }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: as above.
        unsafe {
            match &self.previous {
                Some(value) => std::env::set_var(CONFIG_ENV, value),
                None => std::env::remove_var(CONFIG_ENV),
            }
        }
    }
}

#[tokio::test]
#[serial]
async fn test_env_var_points_at_config() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ssify.toml");
    tokio::fs::write(&path, "render = true\nlanguages = [\"pl\"]\n").await.unwrap();
    let _guard = EnvGuard::set(&path);

    let config = SsifyConfig::load().await.unwrap();
    assert!(config.render);
    assert_eq!(config.languages, vec!["pl"]);
}

#[tokio::test]
#[serial]
async fn test_missing_env_file_means_defaults() {
    let temp = TempDir::new().unwrap();
    let _guard = EnvGuard::set(&temp.path().join("absent.toml"));

    assert_eq!(SsifyConfig::load().await.unwrap(), SsifyConfig::default());
}

#[tokio::test]
#[serial]
async fn test_explicit_path_wins_over_env() {
    let temp = TempDir::new().unwrap();
    let from_env = temp.path().join("env.toml");
    let explicit = temp.path().join("explicit.toml");
    tokio::fs::write(&from_env, "render = true\n").await.unwrap();
    tokio::fs::write(&explicit, "debug = true\n").await.unwrap();
    let _guard = EnvGuard::set(&from_env);

    let config = SsifyConfig::load_with_optional(Some(explicit)).await.unwrap();
    assert!(config.debug);
    assert!(!config.render);
}

#[tokio::test]
#[serial]
async fn test_invalid_toml_is_an_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ssify.toml");
    tokio::fs::write(&path, "render = \"sometimes\"\n").await.unwrap();
    let _guard = EnvGuard::set(&path);

    let err = SsifyConfig::load().await.unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse ssify config"));
}
