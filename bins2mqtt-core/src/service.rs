//! High-level service facade combining the fetcher and the publisher.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::model::{NextCollections, Uprn};
use crate::ports::{CollectionPort, FetchError, PublishError, PublishPort};

#[derive(thiserror::Error, Debug)]
/// Error covering a whole fetch-then-publish run.
pub enum RunError {
    /// Talking to the council API failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// Talking to the broker failed.
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Public entry point for one fetch-and-republish cycle.
pub struct BinsService {
    fetcher: Arc<dyn CollectionPort>,
    publisher: Arc<dyn PublishPort>,
}

impl BinsService {
    /// Create a new service bound to the provided ports.
    #[must_use]
    pub fn new(fetcher: Arc<dyn CollectionPort>, publisher: Arc<dyn PublishPort>) -> Self {
        Self { fetcher, publisher }
    }

    /// Fetch the schedule and reduce it to the next date per category.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the provider call fails.
    pub async fn fetch_next_collections(
        &self,
        uprn: &Uprn,
        now: NaiveDateTime,
    ) -> Result<NextCollections, FetchError> {
        let events = self.fetcher.collection_events(uprn).await?;
        Ok(NextCollections::from_events(events, now))
    }

    /// Run one full cycle: fetch, reduce, publish.
    ///
    /// Returns the published map so the caller can log it.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] when either the fetch or the publish fails.
    pub async fn run(
        &self,
        uprn: &Uprn,
        now: NaiveDateTime,
        updated_at: DateTime<Utc>,
    ) -> Result<NextCollections, RunError> {
        let next = self.fetch_next_collections(uprn, now).await?;
        self.publisher.publish(&next, updated_at).await?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::model::{BinCategory, CollectionEvent, COLLECTION_HOUR};

    struct FixedFetcher {
        events: Vec<CollectionEvent>,
    }

    #[async_trait]
    impl CollectionPort for FixedFetcher {
        async fn collection_events(&self, _uprn: &Uprn) -> Result<Vec<CollectionEvent>, FetchError> {
            Ok(self.events.clone())
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<NextCollections>>,
    }

    #[async_trait]
    impl PublishPort for RecordingPublisher {
        async fn publish(
            &self,
            next: &NextCollections,
            _updated_at: DateTime<Utc>,
        ) -> Result<(), PublishError> {
            self.published
                .lock()
                .expect("publisher mutex poisoned")
                .push(next.clone());
            Ok(())
        }
    }

    fn anchored(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(COLLECTION_HOUR, 0, 0))
            .expect("valid test date")
    }

    #[tokio::test]
    async fn run_fetches_reduces_and_publishes_once() {
        let fetcher = Arc::new(FixedFetcher {
            events: vec![
                CollectionEvent {
                    category: BinCategory::Garden,
                    date: anchored(2099, 1, 1),
                },
                CollectionEvent {
                    category: BinCategory::Bottles,
                    date: anchored(2099, 1, 2),
                },
            ],
        });
        let publisher = Arc::new(RecordingPublisher::default());
        let service = BinsService::new(fetcher, Arc::clone(&publisher) as Arc<dyn PublishPort>);

        let now = anchored(2024, 1, 1);
        let next = service
            .run(&Uprn("100011111111".into()), now, Utc::now())
            .await
            .expect("run should succeed");

        assert_eq!(next.get(BinCategory::Garden), Some(anchored(2099, 1, 1)));
        assert_eq!(next.get(BinCategory::Bottles), Some(anchored(2099, 1, 2)));
        assert_eq!(next.len(), 2);

        let published = publisher.published.lock().expect("publisher mutex poisoned");
        assert_eq!(published.len(), 1, "exactly one publish batch per run");
        assert_eq!(published.first(), Some(&next));
    }

    #[tokio::test]
    async fn past_only_category_is_absent_from_the_published_map() {
        let fetcher = Arc::new(FixedFetcher {
            events: vec![CollectionEvent {
                category: BinCategory::General,
                date: anchored(2020, 1, 1),
            }],
        });
        let publisher = Arc::new(RecordingPublisher::default());
        let service = BinsService::new(fetcher, Arc::clone(&publisher) as Arc<dyn PublishPort>);

        let next = service
            .run(&Uprn("100011111111".into()), anchored(2024, 1, 1), Utc::now())
            .await
            .expect("run should succeed");

        assert!(next.is_empty());
    }
}
