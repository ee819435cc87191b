//! Domain data structures for bin categories and collection schedules.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Hour of day every collection date is anchored to.
///
/// A display/compare convention, not something the council API reports.
pub const COLLECTION_HOUR: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Waste streams collected by the council, one per physical bin colour.
pub enum BinCategory {
    /// Brown bin, garden waste.
    Garden,
    /// Black bin, glass and cans.
    Bottles,
    /// Blue bin, paper and cardboard.
    Cardboard,
    /// Green bin, general household waste.
    General,
}

impl BinCategory {
    /// Every category, in a fixed order.
    pub const ALL: [Self; 4] = [Self::Garden, Self::Bottles, Self::Cardboard, Self::General];

    /// Resolve a bin type code from the council API.
    ///
    /// Returns `None` for codes we do not model.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "3" => Some(Self::Garden),
            "5" => Some(Self::Bottles),
            "2" => Some(Self::Cardboard),
            "6" => Some(Self::General),
            _ => None,
        }
    }

    /// The bin type code the council API uses for this category.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Garden => "3",
            Self::Bottles => "5",
            Self::Cardboard => "2",
            Self::General => "6",
        }
    }

    /// Stable lowercase key used in topics and unique ids.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Garden => "garden",
            Self::Bottles => "bottles",
            Self::Cardboard => "cardboard",
            Self::General => "general",
        }
    }

    /// Capitalized name for entity labels.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Garden => "Garden",
            Self::Bottles => "Bottles",
            Self::Cardboard => "Cardboard",
            Self::General => "General",
        }
    }
}

impl fmt::Display for BinCategory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Unique Property Reference Number identifying the property to look up.
pub struct Uprn(pub String);

impl fmt::Display for Uprn {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// A single parsed record from the council schedule.
pub struct CollectionEvent {
    /// Category collected on that day.
    pub category: BinCategory,
    /// Collection day, anchored at [`COLLECTION_HOUR`].
    pub date: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Next future collection date per bin category.
///
/// Partial by design: a category with no future record is absent rather than
/// mapped to a placeholder.
pub struct NextCollections(BTreeMap<BinCategory, NaiveDateTime>);

impl NextCollections {
    /// Reduce raw schedule records to the earliest date on or after `now`
    /// for each category.
    ///
    /// The whole list is scanned and the true minimum kept, so no ordering
    /// of the upstream records is assumed.
    #[must_use]
    pub fn from_events(events: impl IntoIterator<Item = CollectionEvent>, now: NaiveDateTime) -> Self {
        let mut next: BTreeMap<BinCategory, NaiveDateTime> = BTreeMap::new();

        for event in events {
            if event.date < now {
                continue;
            }

            next.entry(event.category)
                .and_modify(|current| {
                    if event.date < *current {
                        *current = event.date;
                    }
                })
                .or_insert(event.date);
        }

        Self(next)
    }

    /// Next date for a single category, if one is known.
    #[must_use]
    pub fn get(&self, category: BinCategory) -> Option<NaiveDateTime> {
        self.0.get(&category).copied()
    }

    /// Iterate categories and their next dates in category order.
    pub fn iter(&self) -> impl Iterator<Item = (BinCategory, NaiveDateTime)> + '_ {
        self.0.iter().map(|(category, date)| (*category, *date))
    }

    /// Number of categories with a known next collection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no category has a future collection.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
