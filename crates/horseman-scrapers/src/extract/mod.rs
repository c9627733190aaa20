//! Extraction pipelines: pure functions from fetched markup to records.
//!
//! Each extractor compiles its selectors once, up front, and reports every
//! unit it inspects as an [`Extraction`](horseman_core::Extraction) so callers
//! can tell a missing block from a broken one.

pub mod availability;
pub mod pricing;
pub mod property;
pub mod rental;
pub mod review;

pub use availability::{AvailabilityExtractor, LiteralError};
pub use pricing::{parse_amount, stay_nights, PricingExtractor};
pub use property::{PropertyExtractor, ShapePolicy};
pub use rental::RentalExtractor;
pub use review::{split_by_line, ReviewExtractor};

use horseman_core::{HorsemanError, Result};
use scraper::{ElementRef, Selector};

pub(crate) fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| HorsemanError::Selector(format!("{}: {}", selector, e)))
}

/// Collapse runs of whitespace (including newlines) to single spaces and trim.
pub(crate) fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized text of an element, or `None` when it is blank.
pub(crate) fn element_text(element: ElementRef) -> Option<String> {
    let text = normalize_text(&element.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

/// Normalized text of the first descendant matching `selector`.
pub(crate) fn first_text(element: ElementRef, selector: &Selector) -> Option<String> {
    element.select(selector).next().and_then(element_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Sleeps 6 \n\t 3 BR  "), "Sleeps 6 3 BR");
        assert_eq!(normalize_text("\n \n"), "");
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        assert!(matches!(parse_selector("div[[["), Err(HorsemanError::Selector(_))));
    }
}
