//! Configuration management
//!
//! Layered loading: built-in defaults, then an optional TOML file, then
//! `PAWHAVEN_*` environment variables (`__` separates nested keys, e.g.
//! `PAWHAVEN_API__BASE_URL`).

use crate::error::{ErrorContext, PawhavenError, PawhavenResult};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Backend connection settings shared by both request clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every `/auth/*` path is resolved against
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

/// Where the durable key-value state (token, remember flag) lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    pub state_file: String,
}

impl StorageConfig {
    /// Data directory with a leading `~` expanded to the home directory
    pub fn resolved_data_dir(&self) -> PathBuf {
        match (self.data_dir.strip_prefix("~"), dirs::home_dir()) {
            (Some(rest), Some(home)) => home.join(rest.trim_start_matches(['/', '\\'])),
            _ => PathBuf::from(&self.data_dir),
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.resolved_data_dir().join(&self.state_file)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PawhavenConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for PawhavenConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://127.0.0.1:5000".to_string(),
                timeout_seconds: 30,
                user_agent: format!("pawhaven/{}", env!("CARGO_PKG_VERSION")),
            },
            storage: StorageConfig {
                data_dir: "~/.pawhaven".to_string(),
                state_file: "local-storage.json".to_string(),
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl PawhavenConfig {
    /// Load defaults, an optional file and the environment, then validate
    pub fn load(path: Option<&Path>) -> PawhavenResult<Self> {
        let defaults = config::Config::try_from(&Self::default()).map_err(|e| {
            PawhavenError::Config {
                message: format!("Failed to build default config: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("config").with_operation("defaults"),
            }
        })?;

        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("PAWHAVEN")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: PawhavenConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| PawhavenError::Config {
                message: format!("Failed to load config: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("config")
                    .with_operation("load")
                    .with_suggestion("Check TOML syntax and PAWHAVEN_* environment variables"),
            })?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Load configuration from a TOML file only
    pub fn from_file<P: AsRef<Path>>(path: P) -> PawhavenResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PawhavenError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: PawhavenConfig = toml::from_str(&content).map_err(|e| PawhavenError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> PawhavenResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| PawhavenError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, content).map_err(|e| PawhavenError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> PawhavenResult<()> {
        let parsed = url::Url::parse(&self.api.base_url).map_err(|e| PawhavenError::Config {
            message: format!("api.base_url is not a valid URL: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("validate")
                .with_suggestion("Set api.base_url to something like https://api.example.com"),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PawhavenError::Config {
                message: format!("api.base_url must use http or https, got {}", parsed.scheme()),
                source: None,
                context: ErrorContext::new("config").with_operation("validate"),
            });
        }

        if self.api.timeout_seconds == 0 {
            return Err(PawhavenError::Config {
                message: "api.timeout_seconds must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set api.timeout_seconds to a positive value"),
            });
        }

        if self.storage.state_file.trim().is_empty() {
            return Err(PawhavenError::Config {
                message: "storage.state_file must not be empty".to_string(),
                source: None,
                context: ErrorContext::new("config").with_operation("validate"),
            });
        }

        Ok(())
    }

    /// Default config file locations, most specific first
    pub fn default_paths() -> Vec<PathBuf> {
        [
            dirs::config_dir().map(|d| d.join("pawhaven").join("config.toml")),
            dirs::home_dir().map(|d| d.join(".pawhaven").join("config.toml")),
            Some(PathBuf::from("pawhaven.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        PawhavenConfig::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = PawhavenConfig::default();
        config.api.base_url = "ftp://example.com".to_string();
        assert!(matches!(
            config.validate(),
            Err(PawhavenError::Config { .. })
        ));

        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = PawhavenConfig::default();
        config.api.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = PawhavenConfig::default();
        config.api.base_url = "https://api.pawhaven.test".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = PawhavenConfig::from_file(&path).unwrap();
        assert_eq!(loaded.api.base_url, "https://api.pawhaven.test");

        let layered = PawhavenConfig::load(Some(&path)).unwrap();
        assert_eq!(layered.api.base_url, "https://api.pawhaven.test");
        assert_eq!(layered.storage.state_file, "local-storage.json");
    }

    #[test]
    fn test_state_path_joins_data_dir() {
        let storage = StorageConfig {
            data_dir: "/var/lib/pawhaven".to_string(),
            state_file: "state.json".to_string(),
        };
        assert_eq!(
            storage.state_path(),
            PathBuf::from("/var/lib/pawhaven/state.json")
        );
    }
}
