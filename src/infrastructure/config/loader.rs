use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project-local configuration directory
pub const CONFIG_DIR: &str = ".maestro";

/// Environment variable prefix; `__` separates nested keys
pub const ENV_PREFIX: &str = "MAESTRO_";

/// Configuration error types
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid retry attempts: {0}. Must be at least 1")]
    InvalidRetryAttempts(u32),

    #[error("Invalid retry backoff: {0}. Cannot be negative")]
    InvalidBackoff(f64),

    #[error("Invalid judge threshold: {0}. Must be between 0 and 10")]
    InvalidJudgeThreshold(f64),

    #[error("Invalid refinement threshold: {0}. Must be between 0 and 10")]
    InvalidRefinementThreshold(f64),

    #[error("Judge agent cannot be empty while judging is enabled")]
    EmptyJudgeAgent,

    #[error("Duplicate worker name: {0}")]
    DuplicateWorker(String),

    #[error("Worker name cannot be empty")]
    EmptyWorkerName,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("History database path cannot be empty")]
    EmptyHistoryPath,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .maestro/config.yaml (project config)
    /// 3. .maestro/local.yaml (project local overrides, optional)
    /// 4. Environment variables (MAESTRO_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        Self::load_in(Path::new("."))
    }

    /// Load configuration rooted at `project_dir` instead of the working directory.
    pub fn load_in(project_dir: &Path) -> Result<Config> {
        let config_dir = project_dir.join(CONFIG_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(config_dir.join("config.yaml")))
            .merge(Yaml::file(config_dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let retry = &config.pipeline.retry;
        if retry.attempts == 0 {
            return Err(ConfigError::InvalidRetryAttempts(retry.attempts));
        }
        if retry.backoff_secs < 0.0 || retry.backoff_secs.is_nan() {
            return Err(ConfigError::InvalidBackoff(retry.backoff_secs));
        }

        let judge = &config.judge;
        if !(0.0..=10.0).contains(&judge.threshold) {
            return Err(ConfigError::InvalidJudgeThreshold(judge.threshold));
        }
        if !(0.0..=10.0).contains(&judge.refinement_threshold) {
            return Err(ConfigError::InvalidRefinementThreshold(
                judge.refinement_threshold,
            ));
        }
        if judge.enabled && judge.judge_agent.as_deref().is_some_and(|a| a.trim().is_empty()) {
            return Err(ConfigError::EmptyJudgeAgent);
        }

        let mut seen = HashSet::new();
        for worker in &config.workers.registry {
            if worker.name.trim().is_empty() {
                return Err(ConfigError::EmptyWorkerName);
            }
            if !seen.insert(worker.name.as_str()) {
                return Err(ConfigError::DuplicateWorker(worker.name.clone()));
            }
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.history.enabled && config.history.database_path.trim().is_empty() {
            return Err(ConfigError::EmptyHistoryPath);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::config::{QualityProfile, WorkerEntry};
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pipeline.retry.attempts, 3);
        assert!((config.judge.threshold - 8.0).abs() < f64::EPSILON);
        assert_eq!(config.history.database_path, ".maestro/history.db");
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
pipeline:
  retry:
    attempts: 5
    backoff_secs: 0.5
  quality_profile: light
judge:
  judge_agent: Critic
  max_refinement_rounds: 2
workers:
  registry:
    - name: Researcher
      description: Finds sources
    - name: Writer
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.pipeline.retry.attempts, 5);
        assert_eq!(config.pipeline.quality_profile, QualityProfile::Light);
        assert_eq!(config.judge.judge_agent.as_deref(), Some("Critic"));
        assert_eq!(config.judge.max_refinement_rounds, 2);
        assert_eq!(config.workers.registry.len(), 2);
        assert!(config.workers.registry[1].description.is_empty());
        assert_eq!(config.pipeline.analysis_cache_ttl_secs, 300, "Unset fields keep defaults");
    }

    #[test]
    fn test_validate_zero_attempts() {
        let mut config = Config::default();
        config.pipeline.retry.attempts = 0;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRetryAttempts(0))
        );
    }

    #[test]
    fn test_validate_negative_backoff() {
        let mut config = Config::default();
        config.pipeline.retry.backoff_secs = -1.0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBackoff(_))
        ));
    }

    #[test]
    fn test_validate_thresholds() {
        let mut config = Config::default();
        config.judge.threshold = 11.0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidJudgeThreshold(_))
        ));

        let mut config = Config::default();
        config.judge.refinement_threshold = -0.5;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRefinementThreshold(_))
        ));
    }

    #[test]
    fn test_validate_empty_judge_agent() {
        let mut config = Config::default();
        config.judge.judge_agent = Some("  ".into());
        assert_eq!(ConfigLoader::validate(&config), Err(ConfigError::EmptyJudgeAgent));

        config.judge.enabled = false;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_validate_duplicate_workers() {
        let mut config = Config::default();
        config.workers.registry = vec![
            WorkerEntry::new("Writer", "a"),
            WorkerEntry::new("Writer", "b"),
        ];
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::DuplicateWorker("Writer".into()))
        );
    }

    #[test]
    fn test_validate_logging() {
        let mut config = Config::default();
        config.logging.level = "verbose".into();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogLevel(_))
        ));

        let mut config = Config::default();
        config.logging.format = "xml".into();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));
    }

    #[test]
    fn test_validate_empty_history_path() {
        let mut config = Config::default();
        config.history.database_path = String::new();
        assert_eq!(ConfigLoader::validate(&config), Err(ConfigError::EmptyHistoryPath));

        config.history.enabled = false;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_hierarchical_merging_with_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(
            config_dir.join("config.yaml"),
            "judge:\n  threshold: 6.0\n  max_refinement_rounds: 1\nlogging:\n  level: info\n  format: json\n",
        )
        .unwrap();
        fs::write(config_dir.join("local.yaml"), "judge:\n  threshold: 7.5\n").unwrap();

        let config = temp_env::with_vars(
            [
                ("MAESTRO_LOGGING__LEVEL", Some("debug")),
                ("MAESTRO_JUDGE__JUDGE_AGENT", Some("Critic")),
            ],
            || ConfigLoader::load_in(dir.path()),
        )
        .unwrap();

        assert!((config.judge.threshold - 7.5).abs() < f64::EPSILON, "local.yaml wins");
        assert_eq!(config.judge.max_refinement_rounds, 1, "config.yaml persists");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "debug", "environment wins");
        assert_eq!(config.judge.judge_agent.as_deref(), Some("Critic"));
    }

    #[test]
    fn test_load_from_file_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maestro.yaml");
        fs::write(&path, "pipeline:\n  retry:\n    attempts: 0\n").unwrap();

        let err = ConfigLoader::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid retry attempts"));
    }
}
