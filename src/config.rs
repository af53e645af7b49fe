//! Configuration loading from environment variables
//!
//! The API key is the only required setting; its absence is a startup
//! failure, never a per-request error.

use crate::{
    constants::{COINMARKETCAP_API_URL, DEFAULT_CONVERT, DEFAULT_HOST, DEFAULT_PORT},
    error::ConfigError,
};
use std::env;

/// Application configuration
#[derive(Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub base_url: String,
    pub convert: String,
    pub host: String,
    pub port: u16,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("convert", &self.convert)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl AppConfig {
    /// Loads configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = var("CMC_API_KEY").ok_or_else(|| ConfigError::MissingVar("CMC_API_KEY".to_string()))?;

        let port = match var("SERVER_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                var: "SERVER_PORT".to_string(),
                reason: format!("'{}': {}", raw, e),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            api_key,
            base_url: var("CMC_BASE_URL").unwrap_or_else(|| COINMARKETCAP_API_URL.to_string()),
            convert: var("CMC_CONVERT")
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| DEFAULT_CONVERT.to_string()),
            host: var("SERVER_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
        })
    }

    /// Address the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
