//! Fetcher implementation for Tameside using the council's lite API.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Client;
use reqwest::header::{ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};

use bins2mqtt_core::{
    model::{BinCategory, CollectionEvent, Uprn, COLLECTION_HOUR},
    ports::{CollectionPort, FetchError},
};

const URL: &str =
    "http://lite.tameside.gov.uk/BinCollections/CollectionService.svc/GetBinCollection";

// The service only answers requests that look like the council's mobile app,
// down to the text/plain content type on a JSON body.
const APP_USER_AGENT: &str = "Tameside Council/3.0.19 (iPhone; iOS 14.4; Scale/3.00)";
const APP_ACCEPT_LANGUAGE: &str = "en-GB;q=1";

/// Request body for GetBinCollection.
///
/// Everything except the UPRN is a fixed value the mobile app sends.
#[derive(Debug, Serialize)]
struct BinCollectionRequest<'a> {
    operatingsystemid: &'static str,
    version: &'static str,
    testmode: &'static str,
    notification: &'static str,
    token: &'static str,
    uprn: &'a str,
}

impl<'a> BinCollectionRequest<'a> {
    fn new(uprn: &'a Uprn) -> Self {
        Self {
            operatingsystemid: "1",
            version: "3.0.19",
            testmode: "0",
            notification: "1",
            token: "",
            uprn: &uprn.0,
        }
    }
}

/// Top-level response wrapper from GetBinCollection.
#[derive(Debug, Deserialize)]
struct BinCollectionResponse {
    #[serde(rename = "GetBinCollectionResult")]
    result: BinCollectionResult,
}

/// Result object holding the schedule records.
#[derive(Debug, Deserialize)]
struct BinCollectionResult {
    #[serde(rename = "Data")]
    data: Vec<RawRecord>,
}

/// Single schedule record: a bin type code and a `DD/MM/YYYY` date.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "BinType")]
    bin_type: String,
    #[serde(rename = "CollectionDate")]
    collection_date: String,
}

/// Collection schedule fetcher for Tameside.
pub struct TamesidePort {
    client: Client,
}

impl TamesidePort {
    /// Create a new port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CollectionPort for TamesidePort {
    async fn collection_events(&self, uprn: &Uprn) -> Result<Vec<CollectionEvent>, FetchError> {
        let body = serde_json::to_string(&BinCollectionRequest::new(uprn))
            .map_err(|error| FetchError::Decode(error.to_string()))?;

        let payload = self
            .client
            .post(URL)
            .header(USER_AGENT, APP_USER_AGENT)
            .header(ACCEPT_LANGUAGE, APP_ACCEPT_LANGUAGE)
            .header(CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await
            .map_err(FetchError::from)?
            .error_for_status()
            .map_err(FetchError::from)?
            .text()
            .await
            .map_err(FetchError::from)?;

        let response: BinCollectionResponse = serde_json::from_str(&payload)
            .map_err(|error| FetchError::Decode(error.to_string()))?;

        decode_events(response.result.data)
    }
}

/// Turn raw records into typed events, skipping bin types we do not model.
fn decode_events(records: Vec<RawRecord>) -> Result<Vec<CollectionEvent>, FetchError> {
    let mut events = Vec::with_capacity(records.len());

    for record in records {
        let Some(category) = BinCategory::from_code(&record.bin_type) else {
            tracing::debug!(code = %record.bin_type, "Skipping unknown bin type");
            continue;
        };

        events.push(CollectionEvent {
            category,
            date: parse_collection_date(&record.collection_date)?,
        });
    }

    Ok(events)
}

/// Parse the fixed-width `DD/MM/YYYY` collection date.
///
/// Characters 0-1 are the day, 3-4 the month, 6-9 the year. The result is
/// anchored at [`COLLECTION_HOUR`].
fn parse_collection_date(raw: &str) -> Result<NaiveDateTime, FetchError> {
    let day: u32 = raw
        .get(0..2)
        .and_then(|segment| segment.parse().ok())
        .ok_or_else(|| FetchError::InvalidDate(raw.to_owned()))?;
    let month: u32 = raw
        .get(3..5)
        .and_then(|segment| segment.parse().ok())
        .ok_or_else(|| FetchError::InvalidDate(raw.to_owned()))?;
    let year: i32 = raw
        .get(6..10)
        .and_then(|segment| segment.parse().ok())
        .ok_or_else(|| FetchError::InvalidDate(raw.to_owned()))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(COLLECTION_HOUR, 0, 0))
        .ok_or_else(|| FetchError::InvalidDate(raw.to_owned()))
}
