//! Traits describing the fetch and publish seams plus shared error types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Error as ReqwestError;

use crate::model::{CollectionEvent, NextCollections, Uprn};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while fetching the schedule from the council API.
pub enum FetchError {
    /// Network layer failed or the API returned a non-success status.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Response body did not match the expected shape.
    #[error("Malformed response: {0}")]
    Decode(String),
    /// A collection date string could not be parsed.
    #[error("Invalid collection date: {0:?}")]
    InvalidDate(String),
}

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while republishing to the broker.
///
/// Variants carry rendered messages so the core stays independent of the
/// MQTT client crate.
pub enum PublishError {
    /// Broker connection was refused or dropped mid-run.
    #[error("Broker connection failed: {0}")]
    Connection(String),
    /// A message could not be queued or delivered.
    #[error("Publish failed: {0}")]
    Publish(String),
    /// The final disconnect could not be issued.
    #[error("Disconnect failed: {0}")]
    Disconnect(String),
}

#[async_trait]
/// Trait for backends that fetch raw collection schedules.
pub trait CollectionPort: Send + Sync {
    /// Fetch and parse every schedule record for the property.
    ///
    /// Records are returned as received, past dates included; reduction to
    /// the next date per category happens in the core.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the request fails or the response
    /// cannot be decoded.
    async fn collection_events(&self, uprn: &Uprn) -> Result<Vec<CollectionEvent>, FetchError>;
}

#[async_trait]
/// Trait for backends that republish the reduced schedule.
pub trait PublishPort: Send + Sync {
    /// Publish state, discovery, and attributes messages for `next`.
    ///
    /// All messages are attempted before the connection is closed; there is
    /// no partial-success signal.
    ///
    /// # Errors
    ///
    /// Returns a [`PublishError`] when the broker connection or any single
    /// publish fails.
    async fn publish(
        &self,
        next: &NextCollections,
        updated_at: DateTime<Utc>,
    ) -> Result<(), PublishError>;
}
