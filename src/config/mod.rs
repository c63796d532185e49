//! Configuration management for the Qrator exporter.
//! 
//! This module handles loading and managing application configuration
//! from environment variables and configuration files.

use std::env;
use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use crate::models::Config;

/// Load configuration from the file named by `CONFIG_FILE` and the environment
pub fn load_config() -> Result<Config, ConfigError> {
    let config_file = env::var("CONFIG_FILE").unwrap_or_else(|_| "config/default.toml".to_string());
    build_config(&config_file)
}

/// Layer defaults, an optional config file and environment variables
///
/// `EXPORTER__SERVER__PORT` style variables override any key; the historical
/// `QRATOR_CLIENT_ID`, `QRATOR_X_QRATOR_AUTH` and `QRATOR_API_URL` variables
/// take precedence for the credentials.
pub fn build_config(config_file: &str) -> Result<Config, ConfigError> {
    let defaults = Config::default();

    let config = ConfigBuilder::builder()
        .set_default("server.host", defaults.server.host)?
        .set_default("server.port", i64::from(defaults.server.port))?
        .set_default("qrator.api_url", defaults.qrator.api_url)?
        .set_default("qrator.client_id", defaults.qrator.client_id)?
        .set_default("qrator.auth_token", defaults.qrator.auth_token)?
        .set_default("qrator.request_timeout_seconds", defaults.qrator.request_timeout_seconds as i64)?
        .add_source(File::with_name(config_file).required(false))
        .add_source(Environment::with_prefix("EXPORTER").separator("__"))
        .set_override_option("qrator.client_id", env::var("QRATOR_CLIENT_ID").ok())?
        .set_override_option("qrator.auth_token", env::var("QRATOR_X_QRATOR_AUTH").ok())?
        .set_override_option("qrator.api_url", env::var("QRATOR_API_URL").ok())?
        .build()?;

    config.try_deserialize()
}
