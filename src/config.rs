use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    video::{EncoderParams, MatteParams},
};

/// Main configuration for the greenscreen pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mask keying parameters
    pub matte: MatteParams,

    /// Output encoder settings
    pub encoder: EncoderParams,

    /// Segmentation service settings
    pub segmentation: SegmentationConfig,

    /// Object store settings
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|_| ConfigError::ParseFailed {
            path: path.display().to_string(),
        })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.encoder.quality > 100 {
            return Err(ConfigError::InvalidValue {
                key: "encoder.quality".to_string(),
                value: self.encoder.quality.to_string(),
            }
            .into());
        }

        if self.encoder.codec.is_empty() {
            return Err(ConfigError::MissingKey {
                key: "encoder.codec".to_string(),
            }
            .into());
        }

        if self.encoder.fallback_fps <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "encoder.fallback_fps".to_string(),
                value: self.encoder.fallback_fps.to_string(),
            }
            .into());
        }

        self.segmentation.validate()?;
        Ok(())
    }
}

/// Segmentation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Base URL of the prediction API
    pub api_base_url: String,

    /// Model version identifier submitted with each prediction
    pub model_version: String,

    /// Environment variable holding the API token
    pub token_env: String,

    /// Seconds between prediction status polls
    pub poll_interval_secs: u64,

    /// Cap on status polls before giving up
    pub max_polls: u32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.replicate.com/v1".to_string(),
            model_version: "33432afdfc06a10da6b4018932893d39b0159f838b6d11dd1236dff85cc5ec1d"
                .to_string(),
            token_env: "REPLICATE_API_TOKEN".to_string(),
            poll_interval_secs: 2,
            max_polls: 300,
        }
    }
}

impl SegmentationConfig {
    fn validate(&self) -> Result<()> {
        if self.api_base_url.is_empty() {
            return Err(ConfigError::MissingKey {
                key: "segmentation.api_base_url".to_string(),
            }
            .into());
        }

        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "segmentation.poll_interval_secs".to_string(),
                value: self.poll_interval_secs.to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Object store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Destination bucket; empty disables uploads
    pub bucket: String,

    /// Environment variable holding the access token
    pub token_env: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            token_env: "GCS_ACCESS_TOKEN".to_string(),
        }
    }
}

impl StorageConfig {
    /// Uploads run only when a bucket is configured
    pub fn upload_enabled(&self) -> bool {
        !self.bucket.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");

        let original_config = Config::default();

        // Save and load
        original_config.save_to_file(&file_path).unwrap();
        let loaded_config = Config::from_file(&file_path).unwrap();

        assert_eq!(loaded_config.matte.threshold, original_config.matte.threshold);
        assert_eq!(loaded_config.matte.key_color, original_config.matte.key_color);
        assert_eq!(loaded_config.encoder.codec, original_config.encoder.codec);
        assert_eq!(
            loaded_config.segmentation.api_base_url,
            original_config.segmentation.api_base_url
        );
    }

    #[test]
    fn test_invalid_quality_rejected() {
        let mut config = Config::default();
        config.encoder.quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut config = Config::default();
        config.segmentation.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_upload_disabled_without_bucket() {
        let config = Config::default();
        assert!(!config.storage.upload_enabled());

        let mut with_bucket = Config::default();
        with_bucket.storage.bucket = "my-bucket".to_string();
        assert!(with_bucket.storage.upload_enabled());
    }

    #[test]
    fn test_missing_file_errors() {
        let result = Config::from_file("/definitely/not/here.toml");
        assert!(result.is_err());
    }
}
