//! Provider credential and settings resolution for smsx-ops
//!
//! **Priority:** command line → environment → TOML → built-in default.
//! Credentials have no default; a missing one is a configuration error
//! that names every way to provide it.

use crate::services::{RebrandlySettings, TwilioSettings};
use smsx_common::config::{resolve_setting, TomlConfig};
use smsx_common::{Error, Result};
use std::path::PathBuf;
use tracing::info;

pub const ENV_DATA_FOLDER: &str = "SMSX_DATA_FOLDER";
pub const ENV_REBRANDLY_API_KEY: &str = "SMSX_REBRANDLY_API_KEY";
pub const ENV_REBRANDLY_DOMAIN: &str = "SMSX_REBRANDLY_DOMAIN";
pub const ENV_TWILIO_ACCOUNT_SID: &str = "SMSX_TWILIO_ACCOUNT_SID";
pub const ENV_TWILIO_AUTH_TOKEN: &str = "SMSX_TWILIO_AUTH_TOKEN";
pub const ENV_TWILIO_SOURCE_NUMBER: &str = "SMSX_TWILIO_SOURCE_NUMBER";

/// Folder holding the stage tables, default current directory
pub fn resolve_data_folder(cli_arg: Option<&str>, toml_config: &TomlConfig) -> PathBuf {
    let toml_value = toml_config
        .data_folder
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned());
    resolve_setting(cli_arg, ENV_DATA_FOLDER, toml_value.as_deref())
        .map(|(folder, _)| PathBuf::from(folder))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Rebrandly settings; the API key is required
pub fn resolve_rebrandly_settings(
    domain_arg: Option<&str>,
    toml_config: &TomlConfig,
) -> Result<RebrandlySettings> {
    let shortener = &toml_config.shortener;

    let api_key = require(
        None,
        ENV_REBRANDLY_API_KEY,
        shortener.api_key.as_deref(),
        "Rebrandly API key",
        "[shortener] api_key",
    )?;

    let domain = resolve_setting(domain_arg, ENV_REBRANDLY_DOMAIN, shortener.domain.as_deref())
        .map(|(domain, _)| domain);

    Ok(RebrandlySettings {
        api_key,
        domain,
        base_url: shortener.base_url.clone(),
        requests_per_second: shortener.requests_per_second,
    })
}

/// Twilio settings plus the sender number
pub fn resolve_twilio_settings(
    source_arg: Option<&str>,
    toml_config: &TomlConfig,
) -> Result<(TwilioSettings, String)> {
    let messaging = &toml_config.messaging;

    let account_sid = require(
        None,
        ENV_TWILIO_ACCOUNT_SID,
        messaging.account_sid.as_deref(),
        "Twilio account SID",
        "[messaging] account_sid",
    )?;
    let auth_token = require(
        None,
        ENV_TWILIO_AUTH_TOKEN,
        messaging.auth_token.as_deref(),
        "Twilio auth token",
        "[messaging] auth_token",
    )?;
    let source_number = require(
        source_arg,
        ENV_TWILIO_SOURCE_NUMBER,
        messaging.source_number.as_deref(),
        "Twilio source number",
        "[messaging] source_number",
    )?;

    Ok((
        TwilioSettings {
            account_sid,
            auth_token,
            base_url: messaging.base_url.clone(),
        },
        source_number,
    ))
}

fn require(
    cli_arg: Option<&str>,
    env_var: &str,
    toml_value: Option<&str>,
    what: &str,
    toml_key: &str,
) -> Result<String> {
    match resolve_setting(cli_arg, env_var, toml_value) {
        Some((value, source)) => {
            info!("{} loaded from {}", what, source);
            Ok(value)
        }
        None => Err(Error::Config(format!(
            "{} not configured. Provide it using one of:\n\
             1. Environment: {}=...\n\
             2. TOML config: {} = \"...\"",
            what, env_var, toml_key
        ))),
    }
}
