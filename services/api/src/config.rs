//! Service configuration loaded from `API_`-prefixed environment variables
//!
//! Nested keys use `__` as separator, e.g. `API_SERVER__PORT=8080` or
//! `API_JWT__SECRET=...`. Everything except the JWT secret has a default.

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::path::PathBuf;

/// Top-level service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub jwt: JwtSettings,
    pub media: MediaSettings,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Token signing settings
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// HMAC secret used to sign and verify access tokens
    pub secret: String,
    /// Access token lifetime in seconds (default: 1 day)
    pub access_token_expiry: u64,
}

/// Uploaded media settings
#[derive(Debug, Clone, Deserialize)]
pub struct MediaSettings {
    /// Directory uploaded files are written to
    pub root: PathBuf,
    /// Largest decoded payload accepted for a single file
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Load the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::with_prefix("API"))
    }

    fn from_environment(env: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("jwt.access_token_expiry", 86_400)?
            .set_default("media.root", "media")?
            .set_default("media.max_upload_bytes", 10 * 1024 * 1024)?
            .add_source(
                env.prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Socket address string for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> Environment {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix("API").source(Some(map))
    }

    #[test]
    fn test_defaults_apply_when_only_secret_is_set() {
        let config =
            AppConfig::from_environment(env_from(&[("API_JWT__SECRET", "s3cret")])).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.jwt.secret, "s3cret");
        assert_eq!(config.jwt.access_token_expiry, 86_400);
        assert_eq!(config.media.root, PathBuf::from("media"));
        assert_eq!(config.media.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
    }

    #[test]
    fn test_environment_overrides_defaults() {
        let config = AppConfig::from_environment(env_from(&[
            ("API_JWT__SECRET", "s3cret"),
            ("API_SERVER__HOST", "127.0.0.1"),
            ("API_SERVER__PORT", "9090"),
            ("API_JWT__ACCESS_TOKEN_EXPIRY", "60"),
            ("API_MEDIA__ROOT", "/var/lib/media"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9090");
        assert_eq!(config.jwt.access_token_expiry, 60);
        assert_eq!(config.media.root, PathBuf::from("/var/lib/media"));
    }

    #[test]
    fn test_missing_secret_is_an_error() {
        assert!(AppConfig::from_environment(env_from(&[])).is_err());
    }
}
