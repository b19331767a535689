//! Configuration loading and setting resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback, where one exists)
//!
//! A missing TOML file is not an error: a warning is logged and defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SMSX_CONFIG";

pub const DEFAULT_REBRANDLY_BASE_URL: &str = "https://api.rebrandly.com/v1";
pub const DEFAULT_TWILIO_BASE_URL: &str = "https://api.twilio.com/2010-04-01";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Folder holding the stage tables (relative or absolute)
    #[serde(default)]
    pub data_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Link-shortening service settings
    #[serde(default)]
    pub shortener: ShortenerConfig,

    /// Messaging service settings
    #[serde(default)]
    pub messaging: MessagingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Rebrandly settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShortenerConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    /// Branded domain the short links are created on
    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default = "default_rebrandly_base_url")]
    pub base_url: String,

    /// Client-side request quota
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Links requested per list call (provider caps this at 25)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            domain: None,
            base_url: default_rebrandly_base_url(),
            requests_per_second: default_requests_per_second(),
            page_size: default_page_size(),
        }
    }
}

/// Twilio settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessagingConfig {
    #[serde(default)]
    pub account_sid: Option<String>,

    #[serde(default)]
    pub auth_token: Option<String>,

    /// Sender number configured with the provider, E.164
    #[serde(default)]
    pub source_number: Option<String>,

    #[serde(default = "default_twilio_base_url")]
    pub base_url: String,

    /// Prefixed to subject ids to build recipient numbers
    #[serde(default = "default_country_code")]
    pub country_code: String,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            source_number: None,
            base_url: default_twilio_base_url(),
            country_code: default_country_code(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rebrandly_base_url() -> String {
    DEFAULT_REBRANDLY_BASE_URL.to_string()
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_page_size() -> u32 {
    25
}

fn default_twilio_base_url() -> String {
    DEFAULT_TWILIO_BASE_URL.to_string()
}

fn default_country_code() -> String {
    "1".to_string()
}

/// Where a resolved setting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingSource {
    CommandLine,
    Environment,
    Toml,
}

impl fmt::Display for SettingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingSource::CommandLine => write!(f, "command line"),
            SettingSource::Environment => write!(f, "environment"),
            SettingSource::Toml => write!(f, "TOML"),
        }
    }
}

/// Non-empty, non-whitespace
pub fn is_valid_setting(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Resolve a string setting from CLI → ENV → TOML
///
/// Blank values at any tier are treated as absent. Returns `None` when no
/// tier provides a usable value.
pub fn resolve_setting(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_value: Option<&str>,
) -> Option<(String, SettingSource)> {
    if let Some(value) = cli_arg.filter(|v| is_valid_setting(v)) {
        return Some((value.trim().to_string(), SettingSource::CommandLine));
    }

    if let Ok(value) = std::env::var(env_var_name) {
        if is_valid_setting(&value) {
            return Some((value.trim().to_string(), SettingSource::Environment));
        }
    }

    toml_value
        .filter(|v| is_valid_setting(v))
        .map(|v| (v.trim().to_string(), SettingSource::Toml))
}

/// Locate the config file: explicit path → `SMSX_CONFIG` → platform config dir
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if is_valid_setting(&path) {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path()
}

/// `~/.config/smsx/config.toml` on Linux, platform equivalent elsewhere
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("smsx").join("config.toml"))
}

/// Load TOML config, falling back to defaults when the file is missing
///
/// A file that exists but does not parse is a hard error: silently ignoring
/// it would send messages with the wrong account.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        warn!("No config directory available, using defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using defaults");
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!(path = %path.display(), "Loaded config file");
    Ok(config)
}
