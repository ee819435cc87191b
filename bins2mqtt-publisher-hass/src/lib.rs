//! Publisher that mirrors the reduced schedule to MQTT with Home Assistant
//! discovery metadata.
//!
//! Topic layout is an external contract: `bins2mqtt/<key>` for state,
//! `homeassistant/sensor/bins2mqtt/<key>_recycling/config` for discovery,
//! and `bins2mqtt/attributes` for the shared attributes object.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rumqttc::{AsyncClient, Event, MqttOptions, Outgoing, Packet, QoS};
use serde::Serialize;

use bins2mqtt_core::{
    model::{BinCategory, NextCollections},
    ports::{PublishError, PublishPort},
};

const CLIENT_ID: &str = "bins2mqtt";
const NAMESPACE: &str = "bins2mqtt";
const DISCOVERY_PREFIX: &str = "homeassistant";
const ATTRIBUTES_TOPIC: &str = "bins2mqtt/attributes";
const QOS_LEVEL: u8 = 2;
const CHANNEL_CAPACITY: usize = 16;
const KEEP_ALIVE: Duration = Duration::from_secs(30);
const STATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone)]
/// Broker connection settings, resolved by the caller.
pub struct BrokerConfig {
    /// Broker hostname.
    pub host: String,
    /// Broker port, usually 1883.
    pub port: u16,
    /// Username for authentication.
    pub username: String,
    /// Password for authentication.
    pub password: String,
}

/// Home Assistant MQTT discovery payload for one bin sensor.
#[derive(Debug, Serialize)]
struct DiscoveryConfig {
    state_topic: String,
    json_attributes_topic: &'static str,
    qos: u8,
    name: String,
    icon: &'static str,
    device_class: &'static str,
    unique_id: String,
}

/// Shared attributes payload published once per run.
#[derive(Debug, Serialize)]
struct Attributes {
    last_updated: String,
}

/// A single retained message bound for the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BrokerMessage {
    topic: String,
    payload: String,
}

/// MQTT publisher speaking the Home Assistant discovery convention.
pub struct HassPublisher {
    config: BrokerConfig,
}

impl HassPublisher {
    /// Create a new publisher bound to the given broker settings.
    #[must_use]
    pub fn new(config: BrokerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PublishPort for HassPublisher {
    async fn publish(
        &self,
        next: &NextCollections,
        updated_at: DateTime<Utc>,
    ) -> Result<(), PublishError> {
        let messages = build_messages(next, updated_at)?;

        let mut options = MqttOptions::new(CLIENT_ID, &self.config.host, self.config.port);
        options.set_credentials(&self.config.username, &self.config.password);
        options.set_keep_alive(KEEP_ALIVE);

        let (client, mut eventloop) = AsyncClient::new(options, CHANNEL_CAPACITY);

        let expected = messages.len();
        for message in messages {
            tracing::debug!(topic = %message.topic, "Queueing retained publish");
            client
                .publish(message.topic, QoS::ExactlyOnce, true, message.payload)
                .await
                .map_err(|error| PublishError::Publish(error.to_string()))?;
        }

        // Drive the connection until every QoS 2 handshake has completed,
        // then disconnect and drain. A transport error is fatal for the run;
        // client and event loop are dropped on every exit path.
        let mut completed = 0_usize;
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::PubComp(_))) => {
                    completed += 1;
                    if completed == expected {
                        client
                            .disconnect()
                            .await
                            .map_err(|error| PublishError::Disconnect(error.to_string()))?;
                    }
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(_) => {}
                Err(error) => return Err(PublishError::Connection(error.to_string())),
            }
        }

        tracing::debug!(count = expected, "All publishes acknowledged");
        Ok(())
    }
}

/// State topic for a category: `bins2mqtt/<key>`.
fn state_topic(category: BinCategory) -> String {
    format!("{NAMESPACE}/{}", category.key())
}

/// Discovery topic for a category:
/// `homeassistant/sensor/bins2mqtt/<key>_recycling/config`.
fn discovery_topic(category: BinCategory) -> String {
    format!(
        "{DISCOVERY_PREFIX}/sensor/{NAMESPACE}/{}_recycling/config",
        category.key()
    )
}

fn discovery_config(category: BinCategory) -> DiscoveryConfig {
    DiscoveryConfig {
        state_topic: state_topic(category),
        json_attributes_topic: ATTRIBUTES_TOPIC,
        qos: QOS_LEVEL,
        name: format!("{} Recycling", category.display_name()),
        icon: "mdi:recycle",
        device_class: "timestamp",
        unique_id: format!("{NAMESPACE}-{}", category.key()),
    }
}

fn state_payload(date: NaiveDateTime) -> String {
    date.format(STATE_FORMAT).to_string()
}

/// Build the full retained message batch for one run: a state and a
/// discovery message per category present in the map, plus one shared
/// attributes message. Categories without a future date are skipped.
fn build_messages(
    next: &NextCollections,
    updated_at: DateTime<Utc>,
) -> Result<Vec<BrokerMessage>, PublishError> {
    let mut messages = Vec::with_capacity(next.len() * 2 + 1);

    for (category, date) in next.iter() {
        messages.push(BrokerMessage {
            topic: state_topic(category),
            payload: state_payload(date),
        });
        messages.push(BrokerMessage {
            topic: discovery_topic(category),
            payload: to_json(&discovery_config(category))?,
        });
    }

    messages.push(BrokerMessage {
        topic: ATTRIBUTES_TOPIC.to_owned(),
        payload: to_json(&Attributes {
            last_updated: updated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        })?,
    });

    Ok(messages)
}

fn to_json<T: Serialize>(value: &T) -> Result<String, PublishError> {
    serde_json::to_string(value).map_err(|error| PublishError::Publish(error.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use bins2mqtt_core::model::{CollectionEvent, COLLECTION_HOUR};

    use super::*;

    fn anchored(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(COLLECTION_HOUR, 0, 0))
            .expect("valid test date")
    }

    fn sample_map() -> NextCollections {
        NextCollections::from_events(
            vec![
                CollectionEvent {
                    category: BinCategory::Garden,
                    date: anchored(2099, 1, 1),
                },
                CollectionEvent {
                    category: BinCategory::Bottles,
                    date: anchored(2099, 1, 2),
                },
            ],
            anchored(2024, 1, 1),
        )
    }

    #[test]
    fn topics_derive_from_the_category_key() {
        assert_eq!(state_topic(BinCategory::Garden), "bins2mqtt/garden");
        assert_eq!(
            discovery_topic(BinCategory::Garden),
            "homeassistant/sensor/bins2mqtt/garden_recycling/config"
        );
    }

    #[test]
    fn discovery_payload_matches_the_home_assistant_contract() {
        let payload = to_json(&discovery_config(BinCategory::Garden)).expect("config serializes");
        let value: serde_json::Value = serde_json::from_str(&payload).expect("payload is JSON");

        assert_eq!(value["state_topic"], "bins2mqtt/garden");
        assert_eq!(value["json_attributes_topic"], "bins2mqtt/attributes");
        assert_eq!(value["qos"], 2);
        assert_eq!(value["name"], "Garden Recycling");
        assert_eq!(value["icon"], "mdi:recycle");
        assert_eq!(value["device_class"], "timestamp");
        assert_eq!(value["unique_id"], "bins2mqtt-garden");
    }

    #[test]
    fn state_payload_is_the_anchored_iso_timestamp() {
        assert_eq!(state_payload(anchored(2099, 1, 1)), "2099-01-01T07:00:00");
    }

    #[test]
    fn two_categories_yield_two_state_two_discovery_one_attributes() {
        let updated_at = Utc
            .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp");
        let messages = build_messages(&sample_map(), updated_at).expect("batch builds");

        assert_eq!(messages.len(), 5);

        let state_count = messages
            .iter()
            .filter(|message| {
                message.topic.starts_with("bins2mqtt/") && message.topic != ATTRIBUTES_TOPIC
            })
            .count();
        let discovery_count = messages
            .iter()
            .filter(|message| message.topic.ends_with("/config"))
            .count();

        assert_eq!(state_count, 2);
        assert_eq!(discovery_count, 2);
        assert!(
            messages
                .iter()
                .any(|message| message.topic == ATTRIBUTES_TOPIC)
        );
    }

    #[test]
    fn attributes_payload_carries_last_updated_only() {
        let updated_at = Utc
            .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp");
        let messages = build_messages(&sample_map(), updated_at).expect("batch builds");

        let attributes = messages
            .iter()
            .find(|message| message.topic == ATTRIBUTES_TOPIC)
            .expect("attributes message present");
        let value: serde_json::Value =
            serde_json::from_str(&attributes.payload).expect("payload is JSON");

        assert_eq!(value["last_updated"], "2024-01-01T12:00:00.000Z");
        assert_eq!(
            value.as_object().map(serde_json::Map::len),
            Some(1),
            "no per-category fields belong in the shared attributes object"
        );
    }

    #[test]
    fn empty_map_still_publishes_the_attributes_message() {
        let updated_at = Utc
            .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp");
        let messages = build_messages(&NextCollections::default(), updated_at)
            .expect("batch builds");

        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages.first().map(|message| message.topic.as_str()),
            Some(ATTRIBUTES_TOPIC)
        );
    }
}
