//! # Configuration Management
//!
//! Loads application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Special-case environment variables (HOST, PORT, VOSK_MODEL_PATH)
//! 2. Environment variables (APP_SERVER_HOST, APP_SERVER_PORT, ...)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub audio: AudioConfig,
}

/// Server bind address settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Recognition model settings.
///
/// `model_dir` must point at an unpacked model directory on disk; it is
/// checked once at startup and a missing directory aborts the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub model_dir: String,
}

/// Audio format settings for incoming streams.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate assumed when a handshake omits or garbles `sampleRate`.
    pub default_sample_rate: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 4000,
            },
            models: ModelsConfig {
                model_dir: "../vosk-model-small-en-us-0.15".to_string(),
            },
            audio: AudioConfig {
                default_sample_rate: 16000,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, config.toml, and the environment.
    ///
    /// `HOST`, `PORT`, and `VOSK_MODEL_PATH` are honored without the APP_
    /// prefix because deployment platforms and the existing service scripts
    /// set them directly.
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Ok(model_dir) = env::var("VOSK_MODEL_PATH") {
            settings = settings.set_override("models.model_dir", model_dir)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.models.model_dir.trim().is_empty() {
            return Err(anyhow::anyhow!("Model directory cannot be empty"));
        }

        if self.audio.default_sample_rate == 0 {
            return Err(anyhow::anyhow!("Default sample rate must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.audio.default_sample_rate, 16000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_rejects_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_empty_model_dir() {
        let mut config = AppConfig::default();
        config.models.model_dir = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_zero_sample_rate() {
        let mut config = AppConfig::default();
        config.audio.default_sample_rate = 0;
        assert!(config.validate().is_err());
    }
}
