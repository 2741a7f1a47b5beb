use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Repository-specific configuration file name
pub const REPO_CONFIG_FILE: &str = ".pizza.yaml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub behavior: BehaviorConfig,
    #[serde(default)]
    pub harness: HarnessConfig,
}

impl Default for Config {
    fn default() -> Self {
        load_default_config()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BehaviorConfig {
    /// Combined with `--verbose`; either one turns on verbose logging
    #[serde(default)]
    pub verbose: bool,
}

/// Configuration for the `--run-tests` test runner
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub program: String,
    /// Arguments placed before the test name filters
    pub args: Vec<String>,
    /// Test discovery root used when `--sdist-dir` is not given
    pub source_dir: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            program: "cargo".to_string(),
            args: vec!["test".to_string()],
            source_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from the standard config paths
    pub fn load() -> Result<Self> {
        // Try loading in this order:
        // 1. .pizza.yaml in current directory (repo-specific)
        // 2. ~/.config/pizza/config.yaml (user-specific)
        // 3. Default configuration

        if let Ok(config) = Self::load_from_path(Path::new(REPO_CONFIG_FILE)) {
            return Ok(config);
        }

        if let Some(user_config_path) = Self::user_config_path() {
            if let Ok(config) = Self::load_from_path(&user_config_path) {
                return Ok(config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Config file does not exist: {}", path.display());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Get the user configuration path
    pub fn user_config_path() -> Option<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("pizza").join("config.yaml"))
        } else {
            dirs::home_dir()
                .map(|home_dir| home_dir.join(".config").join("pizza").join("config.yaml"))
        }
    }
}

/// Load the complete default configuration from embedded YAML
pub fn load_default_config() -> Config {
    const DEFAULT_CONFIG: &str = include_str!("../config/default_config.yaml");

    serde_yaml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded default configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.behavior.verbose);
        assert_eq!(config.harness.program, "cargo");
        assert_eq!(config.harness.args, vec!["test"]);
        assert!(config.harness.source_dir.is_none());
    }

    #[test]
    fn test_config_loading_from_path() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("test_config.yaml");

        let test_config = r#"
behavior:
  verbose: true

harness:
  program: cargo-nextest
  args: [nextest, run]
  source_dir: /tmp/pizza-checkout
"#;

        fs::write(&config_path, test_config).unwrap();

        let config = Config::load_from_path(&config_path).unwrap();
        assert!(config.behavior.verbose);
        assert_eq!(config.harness.program, "cargo-nextest");
        assert_eq!(config.harness.args, vec!["nextest", "run"]);
        assert_eq!(
            config.harness.source_dir,
            Some(PathBuf::from("/tmp/pizza-checkout"))
        );
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("partial.yaml");
        fs::write(&config_path, "behavior:\n  verbose: true\n").unwrap();

        let config = Config::load_from_path(&config_path).unwrap();
        assert!(config.behavior.verbose);
        assert_eq!(config.harness.program, "cargo");
        assert_eq!(config.harness.args, vec!["test"]);
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let err = Config::load_from_path(&temp_dir.path().join("absent.yaml")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("broken.yaml");
        fs::write(&config_path, "behavior: [not, a, map").unwrap();

        let err = Config::load_from_path(&config_path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_user_config_path_points_at_pizza_dir() {
        if let Some(path) = Config::user_config_path() {
            assert!(path.ends_with("pizza/config.yaml"));
        }
    }
}
