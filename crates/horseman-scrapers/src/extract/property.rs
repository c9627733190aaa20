use super::{element_text, first_text, parse_selector};
use horseman_core::{collect_found, Extraction, HorsemanError, Property, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

/// Which listing layouts to read when a page could carry both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShapePolicy {
    /// Tiles when the page has any, list rows otherwise.
    #[default]
    TilesFirst,
    /// Tiles followed by list rows.
    Union,
}

#[derive(Debug)]
pub struct PropertyExtractor {
    tile: Selector,
    tile_title: Selector,
    row: Selector,
    row_title: Selector,
    row_link: Selector,
    image: Selector,
    amenity: Selector,
    caption: Selector,
    numbers: Regex,
}

impl PropertyExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            tile: parse_selector("a.property-result-tile")?,
            tile_title: parse_selector("span.h3, span.media-heading")?,
            row: parse_selector("div.property-result-row")?,
            row_title: parse_selector(".property-title")?,
            row_link: parse_selector("a[href]")?,
            image: parse_selector("img[src]")?,
            amenity: parse_selector("span.amenity-list-item[data-original-title]")?,
            caption: parse_selector("span.caption")?,
            numbers: Regex::new(r"\d+").map_err(|e| HorsemanError::Selector(e.to_string()))?,
        })
    }

    /// Every listing on one results page. Links are resolved against `base`.
    pub fn extract(&self, html: &str, base: &Url, policy: ShapePolicy) -> Vec<Property> {
        let document = Html::parse_document(html);

        let tiles = collect_found(
            document.select(&self.tile).map(|tile| self.parse_tile(tile, base)),
            "property tile",
        );
        if policy == ShapePolicy::TilesFirst && !tiles.is_empty() {
            return tiles;
        }

        let rows = collect_found(
            document.select(&self.row).map(|row| self.parse_row(row, base)),
            "property row",
        );
        debug!("Found {} tiles and {} list rows", tiles.len(), rows.len());

        match policy {
            ShapePolicy::TilesFirst => rows,
            ShapePolicy::Union => tiles.into_iter().chain(rows).collect(),
        }
    }

    fn parse_tile(&self, tile: ElementRef, base: &Url) -> Extraction<Property> {
        let Some(title) = first_text(tile, &self.tile_title) else {
            debug!("Skipping property tile without a title");
            return Extraction::Absent;
        };
        let href = tile.value().attr("href");
        Extraction::Found(self.fill(Property::new(title), tile, href, base))
    }

    fn parse_row(&self, row: ElementRef, base: &Url) -> Extraction<Property> {
        let Some(title) = first_text(row, &self.row_title) else {
            debug!("Skipping property row without a title");
            return Extraction::Absent;
        };
        let href = row
            .select(&self.row_link)
            .next()
            .and_then(|link| link.value().attr("href"));
        Extraction::Found(self.fill(Property::new(title), row, href, base))
    }

    fn fill(&self, mut property: Property, item: ElementRef, href: Option<&str>, base: &Url) -> Property {
        property.property_url = href.and_then(|href| base.join(href.trim()).ok()).map(String::from);
        property.photo_url = item
            .select(&self.image)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(|src| src.trim().to_string());
        property.amenities = item
            .select(&self.amenity)
            .filter_map(|amenity| amenity.value().attr("data-original-title"))
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        if let Some(summary) = item.select(&self.caption).next().and_then(element_text) {
            let values: Vec<u32> = self
                .numbers
                .find_iter(&summary)
                .filter_map(|m| m.as_str().parse().ok())
                .collect();
            property.apply_summary_numbers(&values);
        }
        property
    }
}
