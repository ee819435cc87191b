//! Process configuration loaded from the environment.

use anyhow::{Context, Result};
use bins2mqtt_publisher_hass::BrokerConfig;

const DEFAULT_MQTT_PORT: u16 = 1883;

/// Everything a single run needs, resolved at startup.
#[derive(Debug, Clone)]
pub(crate) struct Config {
    /// Broker connection settings.
    pub(crate) broker: BrokerConfig,
    /// Property reference to look up.
    pub(crate) uprn: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `MQTT_HOST`: broker hostname (required)
    /// - `MQTT_PORT`: broker port (optional, default 1883)
    /// - `MQTT_USERNAME`: broker username (required)
    /// - `MQTT_PASSWORD`: broker password (required)
    /// - `UPRN`: Unique Property Reference Number (required)
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or `MQTT_PORT`
    /// is not a valid port number.
    pub(crate) fn from_env() -> Result<Self> {
        let host = require("MQTT_HOST")?;
        let username = require("MQTT_USERNAME")?;
        let password = require("MQTT_PASSWORD")?;
        let uprn = require("UPRN")?;

        let port = match std::env::var("MQTT_PORT") {
            Ok(raw) => raw.parse().context("Invalid MQTT_PORT")?,
            Err(_) => DEFAULT_MQTT_PORT,
        };

        Ok(Self {
            broker: BrokerConfig {
                host,
                port,
                username,
                password,
            },
            uprn,
        })
    }
}

fn require(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("Missing required environment variable {name}"))
}
