//! Configuration loader.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::Config;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern"));

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::expand_paths(Config::default())),
        }
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(Self::expand_paths(config))
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();

        for cap in ENV_VAR.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand `~` in every configured directory.
    fn expand_paths(mut config: Config) -> Config {
        config.storage.data_dir = Self::expand_pathbuf(&config.storage.data_dir);
        config.crawler.conf_dir = Self::expand_pathbuf(&config.crawler.conf_dir);
        config.logging.dir = config.logging.dir.as_deref().map(Self::expand_pathbuf);
        config
    }

    fn expand_pathbuf(path: &Path) -> PathBuf {
        PathBuf::from(Self::expand_path(&path.to_string_lossy()))
    }

    /// Expand shell-style paths (e.g., `~/.config`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}
