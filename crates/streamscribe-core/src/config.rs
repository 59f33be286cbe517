use crate::error::ConfigError;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub sink: Vec<SinkRouteConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AudioConfig {
    #[serde(default = "default_device_name")]
    pub device_name: String,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_buffer_size")]
    pub buffer_size: u32,

    #[serde(default = "default_mic_init_timeout_ms")]
    pub mic_init_timeout_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            sample_rate: default_sample_rate(),
            buffer_size: default_buffer_size(),
            mic_init_timeout_ms: default_mic_init_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_true")]
    pub interim_results: bool,

    #[serde(default = "default_max_stream_duration_ms")]
    pub max_stream_duration_ms: u64,

    #[serde(default = "default_stop_drain_timeout_ms")]
    pub stop_drain_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            interim_results: default_true(),
            max_stream_duration_ms: default_max_stream_duration_ms(),
            stop_drain_timeout_ms: default_stop_drain_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TransportConfig {
    #[serde(default = "default_transport_plugin")]
    pub plugin: String,

    #[serde(flatten)]
    pub extra: toml::Value,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            plugin: default_transport_plugin(),
            extra: toml::Value::Table(Default::default()),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SinkRouteConfig {
    pub plugin: String,

    #[serde(flatten)]
    pub extra: toml::Value,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_device_name() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_buffer_size() -> u32 {
    1024
}

fn default_mic_init_timeout_ms() -> u64 {
    1000
}

fn default_language() -> String {
    "en".to_string()
}

fn default_true() -> bool {
    true
}

// Cloud recognizers cap a single stream just shy of five minutes.
fn default_max_stream_duration_ms() -> u64 {
    290_000
}

fn default_stop_drain_timeout_ms() -> u64 {
    5000
}

fn default_transport_plugin() -> String {
    "null".to_string()
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                errors.push(var_name.to_string());
            }
        }
    }

    if let Some(first_missing) = errors.into_iter().next() {
        return Err(ConfigError::EnvVarNotFound(first_missing));
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let interpolated = interpolate_env_vars(&content)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (for testing).
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }
}
