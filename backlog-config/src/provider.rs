//! Configuration loading using Figment
//!
//! No caching is performed; every call reads the sources again so an edited
//! config file takes effect on the next command.

use crate::discovery::{find_config_file, ConfigFile, ConfigFormat};
use crate::error::{ConfigError, ConfigResult};
use crate::types::{ReconciliationConfig, DEFAULT_BACKLOG_DIR};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix of environment variables that override file settings
pub const ENV_PREFIX: &str = "BACKLOG_";

/// Loads [`ReconciliationConfig`] for one project
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    project_root: PathBuf,
    backlog_dir: String,
}

impl ConfigLoader {
    /// Create a loader for the project rooted at `project_root`
    pub fn new<P: Into<PathBuf>>(project_root: P) -> Self {
        Self {
            project_root: project_root.into(),
            backlog_dir: DEFAULT_BACKLOG_DIR.to_string(),
        }
    }

    /// Look for the config file in a different backlog directory
    pub fn with_backlog_dir(mut self, backlog_dir: impl Into<String>) -> Self {
        self.backlog_dir = backlog_dir.into();
        self
    }

    /// Directory searched for the config file
    pub fn config_dir(&self) -> PathBuf {
        self.project_root.join(&self.backlog_dir)
    }

    /// The project config file, if one exists
    pub fn config_file(&self) -> Option<ConfigFile> {
        find_config_file(&self.config_dir())
    }

    /// Load configuration, falling back to defaults when no file exists
    pub fn load(&self) -> ConfigResult<ReconciliationConfig> {
        let file = self.config_file();
        self.extract(file.as_ref())
    }

    /// Load configuration for a project that must already be initialized
    ///
    /// Fails with [`ConfigError::ConfigMissing`] when no config file exists.
    pub fn load_required(&self) -> ConfigResult<ReconciliationConfig> {
        match self.config_file() {
            Some(file) => self.extract(Some(&file)),
            None => Err(ConfigError::ConfigMissing {
                dir: self.config_dir(),
            }),
        }
    }

    fn extract(&self, file: Option<&ConfigFile>) -> ConfigResult<ReconciliationConfig> {
        let config: ReconciliationConfig = self.build_figment(file).extract()?;
        config.validate()?;

        info!(
            "Loaded reconciliation config: {} statuses, strategy {:?}, remote operations {}",
            config.status_order.len(),
            config.resolution_strategy,
            config.remote_operations
        );
        Ok(config)
    }

    /// Build the figment with all sources in precedence order
    ///
    /// Field defaults come from `#[serde(default)]`; only `backlog_dir` is seeded
    /// so a loader pointed at another directory reports that directory.
    fn build_figment(&self, file: Option<&ConfigFile>) -> Figment {
        let mut figment =
            Figment::new().merge(Serialized::default("backlog_dir", &self.backlog_dir));

        if let Some(file) = file {
            debug!("Merging config file {}", file.path.display());
            figment = figment.merge(Self::file_provider(&file.path, file.format));
        }

        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    fn file_provider(path: &Path, format: ConfigFormat) -> Figment {
        match format {
            ConfigFormat::Toml => Figment::from(Toml::file(path)),
            ConfigFormat::Yaml => Figment::from(Yaml::file(path)),
            ConfigFormat::Json => Figment::from(Json::file(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResolutionStrategy;
    use serial_test::serial;
    use tempfile::TempDir;

    fn project_with(file_name: &str, content: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("backlog");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(file_name), content).unwrap();
        temp
    }

    #[test]
    #[serial]
    fn test_load_without_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ConfigLoader::new(temp.path()).load().unwrap();
        assert_eq!(config, ReconciliationConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_required_without_file_fails() {
        let temp = TempDir::new().unwrap();
        let err = ConfigLoader::new(temp.path()).load_required().unwrap_err();
        assert!(matches!(err, ConfigError::ConfigMissing { .. }));
    }

    #[test]
    #[serial]
    fn test_yaml_aliases() {
        let temp = project_with(
            "config.yml",
            concat!(
                "project_name: demo\n",
                "statuses: [\"Backlog\", \"Doing\", \"Shipped\"]\n",
                "task_resolution_strategy: most_recent\n",
                "zero_padded_ids: 3\n",
                "remote_operations: false\n",
            ),
        );

        let config = ConfigLoader::new(temp.path()).load_required().unwrap();
        assert_eq!(config.status_order, vec!["Backlog", "Doing", "Shipped"]);
        assert_eq!(config.resolution_strategy, ResolutionStrategy::MostRecent);
        assert_eq!(config.padding_width(), Some(3));
        assert!(!config.remote_operations);
    }

    #[test]
    #[serial]
    fn test_custom_backlog_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".tracker");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), "active_branch_days = 14\n").unwrap();

        let config = ConfigLoader::new(temp.path())
            .with_backlog_dir(".tracker")
            .load_required()
            .unwrap();
        assert_eq!(config.backlog_dir, ".tracker");
        assert_eq!(config.active_branch_days, Some(14));
    }

    #[test]
    #[serial]
    fn test_invalid_file_is_parse_error() {
        let temp = project_with("config.json", "{\"remote_operations\": \"sometimes\"}");
        let err = ConfigLoader::new(temp.path()).load().unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
