//! Settings Models
//!
//! Application configuration: gateway settings plus logging options.
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `.env` file and process environment (`GROQ_API_KEY`, `GROQ_MODEL`,
//!    `GROQ_BASE_URL`, `UBER_CODEGEN_TIMEOUT_SECS`, `LOG_FORMAT`)
//! 3. an optional TOML file

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};
use uber_codegen_core::{GatewaySettings, ProxyConfig};

pub const ENV_API_KEY: &str = "GROQ_API_KEY";
pub const ENV_MODEL: &str = "GROQ_MODEL";
pub const ENV_BASE_URL: &str = "GROQ_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "UBER_CODEGEN_TIMEOUT_SECS";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Unknown log format: {}", other)),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub gateway: GatewaySettings,
    pub log_format: LogFormat,
    /// Default filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway: GatewaySettings::default(),
            log_format: LogFormat::Text,
            log_level: "info".to_string(),
        }
    }
}

/// Partial configuration read from a TOML file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub stream_timeout_secs: Option<u64>,
    pub analysis_temperature: Option<f32>,
    pub generation_temperature: Option<f32>,
    pub log_format: Option<LogFormat>,
    pub log_level: Option<String>,
    pub proxy: Option<ProxyConfig>,
}

impl AppConfig {
    /// Load `.env`, the environment and an optional TOML file, then validate.
    pub fn load(config_file: Option<&Path>) -> AppResult<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        if let Some(path) = config_file {
            config.apply_file(&ConfigFile::read(path)?);
        }
        config.validate()?;
        Ok(config)
    }

    /// Apply environment values produced by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.gateway.api_key = Some(key);
        }
        if let Some(model) = get(ENV_MODEL) {
            self.gateway.model = model;
        }
        if let Some(url) = get(ENV_BASE_URL) {
            self.gateway.base_url = url;
        }
        if let Some(raw) = get(ENV_TIMEOUT_SECS) {
            self.gateway.timeout_secs = raw.trim().parse().map_err(|_| {
                AppError::config(format!("{} must be a number of seconds, got '{}'", ENV_TIMEOUT_SECS, raw))
            })?;
        }
        if let Some(raw) = get(ENV_LOG_FORMAT) {
            self.log_format = raw.parse().map_err(AppError::config)?;
        }
        Ok(())
    }

    /// Overlay every value the file sets.
    pub fn apply_file(&mut self, file: &ConfigFile) {
        if let Some(key) = &file.api_key {
            self.gateway.api_key = Some(key.clone());
        }
        if let Some(model) = &file.model {
            self.gateway.model = model.clone();
        }
        if let Some(url) = &file.base_url {
            self.gateway.base_url = url.clone();
        }
        if let Some(secs) = file.timeout_secs {
            self.gateway.timeout_secs = secs;
        }
        if let Some(secs) = file.stream_timeout_secs {
            self.gateway.stream_timeout_secs = secs;
        }
        if let Some(t) = file.analysis_temperature {
            self.gateway.analysis_temperature = t;
        }
        if let Some(t) = file.generation_temperature {
            self.gateway.generation_temperature = t;
        }
        if let Some(format) = file.log_format {
            self.log_format = format;
        }
        if let Some(level) = &file.log_level {
            self.log_level = level.clone();
        }
        if let Some(proxy) = &file.proxy {
            self.gateway.proxy = Some(proxy.clone());
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> AppResult<()> {
        let gateway = &self.gateway;
        if !gateway.base_url.starts_with("http://") && !gateway.base_url.starts_with("https://") {
            return Err(AppError::config(format!(
                "Invalid base URL: {}. Must start with http:// or https://",
                gateway.base_url
            )));
        }
        if gateway.model.trim().is_empty() {
            return Err(AppError::config("model must not be empty"));
        }
        if gateway.timeout_secs == 0 || gateway.stream_timeout_secs == 0 {
            return Err(AppError::config("timeouts must be at least 1 second"));
        }
        for (name, t) in [
            ("analysis_temperature", gateway.analysis_temperature),
            ("generation_temperature", gateway.generation_temperature),
        ] {
            if !(0.0..=2.0).contains(&t) {
                return Err(AppError::config(format!("{} must be within 0.0-2.0, got {}", name, t)));
            }
        }
        Ok(())
    }
}

impl ConfigFile {
    pub fn read(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> AppResult<Self> {
        toml::from_str(raw).map_err(|e| AppError::config(format!("invalid config file: {}", e)))
    }
}
