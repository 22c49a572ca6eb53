use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result, anyhow};

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const API_BASE_ENV: &str = "TESTPULSE_API_BASE";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_base: String,
    pub default_project: Option<String>,
    pub range_days: u32,
    pub initial_poll_delay_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            default_project: None,
            range_days: 30,
            initial_poll_delay_ms: 1000,
            poll_interval_ms: 3000,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the user config directory, falling back to defaults when no
    /// file exists yet. `TESTPULSE_API_BASE` wins over the stored base URL.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::get_config_path()?)?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn save_default_project(project: &str) -> Result<()> {
        Self::save_default_project_to(&Self::get_config_path()?, project)
    }

    /// Rewrite only `default_project`. A file that fails to parse is left
    /// untouched and the error returned.
    pub fn save_default_project_to(path: &Path, project: &str) -> Result<()> {
        let mut config = Self::load_from(path)
            .with_context(|| format!("Not overwriting unreadable config {}", path.display()))?;
        config.default_project = Some(project.to_string());
        config.save_to(path)
    }

    pub fn apply_env(&mut self) {
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            if !base.trim().is_empty() {
                self.api_base = base.trim().to_string();
            }
        }
    }

    pub fn initial_poll_delay(&self) -> Duration {
        Duration::from_millis(self.initial_poll_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("testpulse"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.initial_poll_delay(), Duration::from_millis(1000));
        assert_eq!(config.poll_interval(), Duration::from_millis(3000));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            api_base: "http://ci.internal:9000".to_string(),
            default_project: Some("checkout-service".to_string()),
            range_days: 14,
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "range_days": 7 }"#).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.range_days, 7);
        assert_eq!(loaded.api_base, DEFAULT_API_BASE);
        assert_eq!(loaded.poll_interval_ms, 3000);
    }

    #[test]
    fn test_env_overrides_api_base() {
        // Only test that touches this variable
        std::env::set_var(API_BASE_ENV, " http://staging:8000 ");
        let mut config = Config::default();
        config.apply_env();
        std::env::remove_var(API_BASE_ENV);

        assert_eq!(config.api_base, "http://staging:8000");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_default_project_keeps_other_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "api_base": "http://ci:9000", "poll_interval_ms": 500 }"#).unwrap();

        Config::save_default_project_to(&path, "checkout").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.default_project.as_deref(), Some("checkout"));
        assert_eq!(loaded.api_base, "http://ci:9000");
        assert_eq!(loaded.poll_interval_ms, 500);
    }

    #[test]
    fn test_default_project_leaves_malformed_file_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let original = r#"{ "api_base": "http://ci:9000", "poll_interval_ms": 500, }"#;
        fs::write(&path, original).unwrap();

        assert!(Config::save_default_project_to(&path, "checkout").is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }
}
