//! One-shot bridge that mirrors the next Tameside bin collection dates to an
//! MQTT broker, including Home Assistant discovery metadata.
//!
//! Scheduling is left to an external invoker; each invocation fetches,
//! publishes, and exits.

mod config;

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{Local, Utc};
use reqwest::Client;
use tracing_subscriber::EnvFilter;

use bins2mqtt_core::{BinsService, Uprn};
use bins2mqtt_provider_tameside::TamesidePort;
use bins2mqtt_publisher_hass::HassPublisher;

use crate::config::Config;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    // HTTP + service setup
    let client = Client::builder().timeout(HTTP_TIMEOUT).build()?;
    let fetcher = Arc::new(TamesidePort::new(client));
    let publisher = Arc::new(HassPublisher::new(config.broker));
    let service = BinsService::new(fetcher, publisher);

    let uprn = Uprn(config.uprn);
    let now = Local::now().naive_local();

    tracing::info!(%uprn, "Fetching bin collection schedule");

    let next = service.run(&uprn, now, Utc::now()).await?;

    for (category, date) in next.iter() {
        tracing::info!(
            category = category.key(),
            date = %date.format("%Y-%m-%dT%H:%M:%S"),
            "Next collection published"
        );
    }

    Ok(())
}
