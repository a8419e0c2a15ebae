//! Base configuration shared by every service binary. Service-specific
//! settings layer on top of this in each service's own config module.

use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;

/// Settings common to all services.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Config {
    /// Load from an optional `configuration` file, overridden by `APP__`
    /// prefixed environment variables. A `.env` file is honored when present.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_defaults_when_absent() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn port_deserializes_when_present() {
        let config: Config = serde_json::from_str(r#"{"port": 9000}"#).unwrap();
        assert_eq!(config.port, 9000);
    }
}
