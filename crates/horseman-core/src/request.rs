//! Input validation performed before any browser session is opened.

use crate::{HorsemanError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use url::Url;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%Y%m%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Parse a target URL, defaulting the scheme to https when it is missing.
pub fn normalize_target(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(HorsemanError::InvalidUrl("empty target".to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches("//"))
    };

    let url = Url::parse(&candidate).map_err(|e| HorsemanError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(HorsemanError::InvalidUrl(format!("unsupported scheme {:?} in {}", other, raw)));
        }
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(HorsemanError::InvalidUrl(format!("missing host in {}", raw)));
    }

    Ok(url)
}

/// Lenient date parsing for values pulled out of query strings.
pub fn parse_loose_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(&text.to_uppercase()) {
        return Some(datetime.date_naive());
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(datetime.date());
    }
    // "2024-03-01T..." with an offset or fraction we don't recognise
    text.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Check the caller's shared secret. An unset expected value disables the check.
pub fn verify_watermark(provided: Option<&str>, expected: Option<&str>) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let provided = provided.unwrap_or_default();

    let matches = provided.len() == expected.len()
        && provided
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0;

    if matches {
        Ok(())
    } else {
        Err(HorsemanError::Unauthorized)
    }
}

/// Cache key for a memoized operation: the normalized URL, plus the watermark
/// when one was presented.
pub fn memo_key(target: &Url, watermark: Option<&str>) -> String {
    match watermark {
        Some(mark) => format!("{}|{}", target.as_str(), mark),
        None => target.as_str().to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuery {
    pub property: String,
    pub arrival: NaiveDate,
    pub departure: NaiveDate,
    pub adults: u32,
    pub children: u32,
}

impl PriceQuery {
    pub fn new(property: impl Into<String>, arrival: NaiveDate, departure: NaiveDate, adults: u32, children: u32) -> Self {
        Self {
            property: property.into(),
            arrival,
            departure,
            adults,
            children,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.property.trim().is_empty() {
            return Err(HorsemanError::InvalidQuery("property is required".to_string()));
        }
        if self.adults < 1 {
            return Err(HorsemanError::InvalidQuery("at least one adult is required".to_string()));
        }
        if self.departure <= self.arrival {
            return Err(HorsemanError::InvalidQuery(format!(
                "departure {} must be after arrival {}",
                self.departure, self.arrival
            )));
        }
        Ok(())
    }

    pub fn nights(&self) -> i64 {
        (self.departure - self.arrival).num_days()
    }

    /// Build the upstream request URL. Parameter order is fixed:
    /// property, arrival, departure, adults, children.
    pub fn to_url(&self, base: &str) -> Result<Url> {
        self.validate()?;
        let mut url = Url::parse(base)?;
        url.query_pairs_mut()
            .clear()
            .append_pair("property", self.property.trim())
            .append_pair("arrival", &self.arrival.format("%Y-%m-%d").to_string())
            .append_pair("departure", &self.departure.format("%Y-%m-%d").to_string())
            .append_pair("adults", &self.adults.to_string())
            .append_pair("children", &self.children.to_string());
        Ok(url)
    }
}
