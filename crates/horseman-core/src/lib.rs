use chrono::{Months, NaiveDate};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use tracing::warn;

pub mod cache;
pub mod config;
mod display;
pub mod error;
pub mod export;
pub mod request;

pub use cache::TtlCache;
pub use config::ScraperConfig;
pub use display::{create_property_table, create_review_table, PropertyTableRow, ReviewTableRow};
pub use error::{HorsemanError, Result};
pub use request::{normalize_target, parse_loose_date, verify_watermark, PriceQuery};

/// Months covered by an availability calendar, starting today.
pub const AVAILABILITY_HORIZON_MONTHS: u32 = 24;

/// Outcome of running one extraction unit (a listing tile, a script block, a
/// pricing card) against a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<T> {
    Found(T),
    /// The expected markup was not there at all.
    Absent,
    /// The markup was there but could not be parsed.
    Malformed(String),
}

impl<T> Extraction<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Extraction::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Extraction::Found(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Extraction<U> {
        match self {
            Extraction::Found(value) => Extraction::Found(f(value)),
            Extraction::Absent => Extraction::Absent,
            Extraction::Malformed(reason) => Extraction::Malformed(reason),
        }
    }
}

/// Keep every found value, logging malformed units and dropping absent ones.
pub fn collect_found<T>(outcomes: impl IntoIterator<Item = Extraction<T>>, unit: &str) -> Vec<T> {
    outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            Extraction::Found(value) => Some(value),
            Extraction::Absent => None,
            Extraction::Malformed(reason) => {
                warn!("Skipping malformed {}: {}", unit, reason);
                None
            }
        })
        .collect()
}

/// A structured-metadata object of type `VacationRental`, passed through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VacationRentalRecord(pub serde_json::Value);

impl VacationRentalRecord {
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub title: String,
    pub sleeps: u32,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub full_bathrooms: u32,
    pub half_bathrooms: u32,
    pub photo_url: Option<String>,
    pub property_url: Option<String>,
    pub amenities: Vec<String>,
    pub rental_details: Vec<VacationRentalRecord>,
}

impl Property {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Assign the leading integers of a summary line to sleeps, bedrooms,
    /// bathrooms, full and half bathrooms, in that order.
    pub fn apply_summary_numbers(&mut self, values: &[u32]) {
        let slots = [
            &mut self.sleeps,
            &mut self.bedrooms,
            &mut self.bathrooms,
            &mut self.full_bathrooms,
            &mut self.half_bathrooms,
        ];
        for (slot, value) in slots.into_iter().zip(values) {
            *slot = *value;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub title: Option<String>,
    pub reviewer_name: Option<String>,
    pub property_name: Option<String>,
    pub date_line: Option<String>,
    pub content: Option<String>,
    pub response: Option<String>,
    pub stars: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedValue {
    pub original_value: String,
    pub parsed: Option<f64>,
}

/// Pricing table rows keyed by normalized label, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItems(Vec<(String, PricedValue)>);

impl LineItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row; a repeated key replaces the earlier value in place.
    pub fn insert(&mut self, key: String, value: PricedValue) {
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&PricedValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn first(&self) -> Option<(&str, &PricedValue)> {
        self.0.first().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for LineItems {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LineItems {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct LineItemsVisitor;

        impl<'de> Visitor<'de> for LineItemsVisitor {
            type Value = LineItems;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of line items")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<LineItems, A::Error> {
                let mut items = LineItems::new();
                while let Some((key, value)) = access.next_entry::<String, PricedValue>()? {
                    items.insert(key, value);
                }
                Ok(items)
            }
        }

        deserializer.deserialize_map(LineItemsVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub details: LineItems,
    pub summary: LineItems,
    pub nights: i64,
    pub total: Option<f64>,
}

/// What a price scrape produced for its correlation token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "quote", rename_all = "snake_case")]
pub enum PriceQuote {
    /// JSON captured from the pricing widget's XHR.
    Widget(serde_json::Value),
    /// Breakdown parsed from a rendered pricing table.
    Table(PriceBreakdown),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityCalendar {
    pub horizon_start: NaiveDate,
    pub horizon_end: NaiveDate,
    pub unavailable: BTreeSet<NaiveDate>,
    pub available: Vec<NaiveDate>,
}

impl AvailabilityCalendar {
    /// Build the calendar over `[today, today + 24 months]`. Unavailable dates
    /// outside the horizon are kept but do not affect the available set.
    pub fn over_horizon(unavailable: BTreeSet<NaiveDate>, today: NaiveDate) -> Self {
        let horizon_end = today
            .checked_add_months(Months::new(AVAILABILITY_HORIZON_MONTHS))
            .unwrap_or(NaiveDate::MAX);
        let available = today
            .iter_days()
            .take_while(|day| *day <= horizon_end)
            .filter(|day| !unavailable.contains(day))
            .collect();

        Self {
            horizon_start: today,
            horizon_end,
            unavailable,
            available,
        }
    }

    pub fn is_available(&self, day: NaiveDate) -> bool {
        day >= self.horizon_start && day <= self.horizon_end && !self.unavailable.contains(&day)
    }
}
