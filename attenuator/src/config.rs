use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::calibration::{
    CalibrationConstants, LinearityRange, NEAR_ZERO_SERVO_POSITION, ServoPosition,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found at {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to read configuration file: {source}")]
    ReadError { source: std::io::Error },

    #[error("Failed to parse configuration: {source}")]
    ParseError { source: toml::de::Error },

    #[error("Failed to serialize configuration: {source}")]
    SerializeError { source: toml::ser::Error },

    #[error("Failed to write configuration file: {source}")]
    WriteError { source: std::io::Error },

    #[error("Configuration validation failed: {message}")]
    ValidationError { message: String },
}

#[derive(Deserialize, Debug, Serialize, Clone)]
pub struct SerialConfig {
    pub path: String,
    pub baud_rate: u32,
    pub device_number: u8,
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: "/dev/ttyACM0".to_string(),
            baud_rate: 9600,
            device_number: maestro::DEFAULT_DEVICE_NUMBER,
            timeout_ms: 100,
        }
    }
}

#[derive(Deserialize, Debug, Serialize, Clone)]
pub struct ServoConfig {
    pub device_index: u8,
    pub speed: u16,
    pub acceleration: u16,
    pub near_zero_position: ServoPosition,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            speed: 5,
            acceleration: 1,
            near_zero_position: NEAR_ZERO_SERVO_POSITION,
        }
    }
}

#[derive(Deserialize, Debug, Serialize, Clone)]
pub struct HttpConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

#[derive(Default, Deserialize, Debug, Serialize, Clone)]
pub struct AttenuatorConfig {
    pub serial: SerialConfig,
    pub servo: ServoConfig,
    pub calibration: CalibrationConstants,
    pub linearity_range: LinearityRange,
    pub http: HttpConfig,
}

impl AttenuatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.calibration.is_invertible() {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "calibration slope must be finite and non-zero (slope = {}, intercept = {})",
                    self.calibration.slope, self.calibration.intercept
                ),
            });
        }

        let range = &self.linearity_range;
        if !range.min_percent.is_finite()
            || !range.max_percent.is_finite()
            || range.min_percent > range.max_percent
        {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "invalid linearity range [{}, {}]",
                    range.min_percent, range.max_percent
                ),
            });
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct ConfigOptions {
    pub config_path: PathBuf,
    pub create_if_missing: bool,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            config_path: Self::default_config_path(),
            create_if_missing: true,
        }
    }
}

impl ConfigOptions {
    pub fn default_config_path() -> PathBuf {
        std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("attenuator.toml"))
    }

    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }
}

#[derive(Debug)]
pub struct ConfigManager {
    options: ConfigOptions,
}

impl ConfigManager {
    pub fn with_options(options: ConfigOptions) -> Self {
        Self { options }
    }

    pub fn load(&self) -> anyhow::Result<AttenuatorConfig> {
        let config_path = self.options.config_path.clone();

        if !config_path.exists() {
            if self.options.create_if_missing {
                let default_config = AttenuatorConfig::default();
                self.save(&default_config)
                    .context("Failed to save default config")?;
                tracing::info!("Wrote default configuration to {}", config_path.display());
                return Ok(default_config);
            } else {
                return Err(ConfigError::FileNotFound {
                    path: config_path.clone(),
                }
                .into());
            }
        }

        let content =
            fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError { source: e })?;

        let config: AttenuatorConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError { source: e })?;

        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, config: &AttenuatorConfig) -> anyhow::Result<()> {
        let config_path = &self.options.config_path;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError { source: e })?;
        }

        let content = toml::to_string_pretty(config)
            .map_err(|e| ConfigError::SerializeError { source: e })?;

        fs::write(config_path, content).map_err(|e| ConfigError::WriteError { source: e })?;

        Ok(())
    }
}

pub fn init_config_with_options(
    options: ConfigOptions,
) -> anyhow::Result<(ConfigManager, AttenuatorConfig)> {
    let manager = ConfigManager::with_options(options);
    let config = manager.load()?;
    Ok((manager, config))
}

pub fn create_default_config<P: AsRef<Path>>(path: Option<P>) -> anyhow::Result<()> {
    let config_path = path
        .map(|p| p.as_ref().to_path_buf())
        .unwrap_or_else(ConfigOptions::default_config_path);

    let options = ConfigOptions {
        config_path,
        create_if_missing: true,
    };

    let manager = ConfigManager::with_options(options);
    manager.save(&AttenuatorConfig::default())?;

    Ok(())
}
