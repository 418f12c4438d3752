//! CLI configuration.
//!
//! Loaded from a TOML file; every value has a built-in default and can be
//! overridden per-invocation by command-line flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use lifebase_core::IdentityUuids;
use lifebase_mqtt::MqttConfig;
use lifebase_types::uuid::GENERIC_ATTRIBUTE_SERVICE;

/// Tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Discovery settings.
    pub scanner: ScannerConfig,
    /// Identity-role UUID overrides.
    pub identity: IdentityUuids,
    /// Service UUIDs always excluded from walks.
    #[serde(default = "default_ignore_services")]
    pub ignore_services: Vec<Uuid>,
    /// MQTT broker settings for `interconnect`.
    pub mqtt: MqttConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scanner: ScannerConfig::default(),
            identity: IdentityUuids::default(),
            ignore_services: default_ignore_services(),
            mqtt: MqttConfig::default(),
        }
    }
}

fn default_ignore_services() -> Vec<Uuid> {
    vec![GENERIC_ATTRIBUTE_SERVICE]
}

/// Discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Advertised name LifeBase devices share.
    pub device_name: String,
    /// Optional explicit address allow-list.
    pub devices: Vec<String>,
    /// Scan and session deadline in seconds.
    pub timeout: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            device_name: lifebase_core::DEFAULT_DEVICE_NAME.to_string(),
            devices: Vec::new(),
            timeout: 30,
        }
    }
}

impl Config {
    /// Load configuration from the default path, or defaults if absent.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.scanner.device_name.is_empty() {
            errors.push(ValidationError {
                field: "scanner.device_name".to_string(),
                message: "device name cannot be empty".to_string(),
            });
        }
        for (i, address) in self.scanner.devices.iter().enumerate() {
            if address.is_empty() {
                errors.push(ValidationError {
                    field: format!("scanner.devices[{}]", i),
                    message: "device address cannot be empty".to_string(),
                });
            }
        }
        if let Err(e) = self.mqtt.validate() {
            errors.push(ValidationError {
                field: "mqtt.broker".to_string(),
                message: e.to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lifebase")
        .join("config.toml")
}

/// A single validation failure.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors raised while loading or saving configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Could not read the config file.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid TOML.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Could not write the config file.
    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Could not serialize the configuration.
    #[error("failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    /// One or more fields failed validation.
    #[error("invalid configuration: {}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = Config::default();
        config.validate().expect("default config should be valid");
        assert_eq!(config.scanner.device_name, "LifeBaseMeter");
        assert_eq!(config.scanner.timeout, 30);
        assert_eq!(config.ignore_services, vec![GENERIC_ATTRIBUTE_SERVICE]);
    }

    #[test]
    fn test_validation_reports_fields() {
        let mut config = Config::default();
        config.scanner.device_name.clear();
        config.mqtt.broker = "ftp://nope".to_string();

        let err = config.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("scanner.device_name"));
        assert!(message.contains("mqtt.broker"));
    }

    #[test]
    fn test_load_and_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.scanner.device_name = "GreenhouseMeter".to_string();
        config.scanner.devices = vec!["AA:BB:CC:DD:EE:FF".to_string()];
        config.mqtt.broker = "mqtt://broker.local".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.scanner.device_name, "GreenhouseMeter");
        assert_eq!(loaded.scanner.devices.len(), 1);
        assert_eq!(loaded.mqtt.broker, "mqtt://broker.local");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [scanner]
            timeout = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.scanner.timeout, 10);
        assert_eq!(config.scanner.device_name, "LifeBaseMeter");
        assert_eq!(
            config.identity.init,
            lifebase_types::uuid::SUBJECT_SERVICE
        );
    }

    #[test]
    fn test_load_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [scanner]
            device_name = ""
            "#,
        )
        .unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Validation(_))
        ));
    }
}
