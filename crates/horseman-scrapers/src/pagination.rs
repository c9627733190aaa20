//! Pagination crawlers for listing and review pages.
//!
//! Both crawlers read page indices off the pager of the document they start
//! from, then load each page in ascending order within the same session. A
//! document without a pager is the whole result.

use crate::extract::{parse_selector, PropertyExtractor, ReviewExtractor, ShapePolicy};
use crate::session::{find_widget_frame, Session};
use horseman_core::{Property, Result, Review};
use scraper::Html;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};
use url::Url;

/// Parse pager indices, logging and dropping anything non-numeric. Index 0
/// never names a real page.
pub fn parse_page_indices<'a>(values: impl IntoIterator<Item = &'a str>) -> BTreeSet<u32> {
    values
        .into_iter()
        .filter_map(|value| match value.trim().parse::<u32>() {
            Ok(index) => Some(index),
            Err(_) => {
                warn!("Ignoring non-numeric page index {:?}", value);
                None
            }
        })
        .filter(|index| *index != 0)
        .collect()
}

/// Indices from the `data-page` attributes of a listing page's pager.
pub fn property_page_indices(html: &str) -> Result<BTreeSet<u32>> {
    let selector = parse_selector("a.result-page[data-page]")?;
    let document = Html::parse_document(html);
    let values: Vec<String> = document
        .select(&selector)
        .filter_map(|link| link.value().attr("data-page"))
        .map(String::from)
        .collect();
    Ok(parse_page_indices(values.iter().map(String::as_str)))
}

/// `base` with its `page` query parameter set to `index`.
pub fn paged_url(base: &Url, index: u32) -> Url {
    let kept: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(key, _)| key != "page")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut url = base.clone();
    url.set_query(None);
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in &kept {
            query.append_pair(key, value);
        }
        query.append_pair("page", &index.to_string());
    }
    url
}

/// Most widget pages a single crawl will load.
pub const MAX_REVIEW_PAGES: u32 = 200;

/// The pages of a reviews widget, inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewPageRange {
    pub min: u32,
    pub max: u32,
    template: Url,
}

impl ReviewPageRange {
    pub fn pages(&self) -> impl Iterator<Item = Url> + '_ {
        (self.min..=self.max).map(|index| paged_url(&self.template, index))
    }
}

/// Page range from the "get reviews" links of a reviews widget pager, or
/// `None` when the pager is empty.
pub fn review_page_range(html: &str, widget_url: &Url) -> Result<Option<ReviewPageRange>> {
    let selector = parse_selector(".pagination a[href]")?;
    let document = Html::parse_document(html);

    let links: Vec<(Url, u32)> = document
        .select(&selector)
        .filter_map(|link| link.value().attr("href"))
        .filter(|href| href.to_lowercase().contains("reviews"))
        .filter_map(|href| widget_url.join(href.trim()).ok())
        .filter_map(|url| {
            let page = url
                .query_pairs()
                .find(|(key, _)| key == "page")
                .and_then(|(_, value)| value.parse::<u32>().ok())?;
            Some((url, page))
        })
        .collect();

    let Some(max) = links.iter().map(|(_, page)| *page).max() else {
        debug!("Reviews widget has no pager");
        return Ok(None);
    };
    if max == 0 {
        return Ok(None);
    }
    let min = links
        .iter()
        .map(|(_, page)| *page)
        .filter(|page| *page > 0)
        .min()
        .unwrap_or(1);
    let max = if max - min >= MAX_REVIEW_PAGES {
        let capped = min + (MAX_REVIEW_PAGES - 1);
        warn!("Reviews pager claims pages {}..={}, stopping at {}", min, max, capped);
        capped
    } else {
        max
    };
    let template = links[0].0.clone();

    Ok(Some(ReviewPageRange { min, max, template }))
}

/// Walk a property listing. `base` is both the first page and the root every
/// `?page=N` URL is built from.
pub async fn crawl_properties(
    session: &mut Session,
    base: &Url,
    extractor: &PropertyExtractor,
    policy: ShapePolicy,
) -> Result<Vec<Property>> {
    let html = session.load(base.as_str()).await?;
    let indices = property_page_indices(&html)?;
    if indices.is_empty() {
        debug!("No listing pager on {}", base);
        return Ok(extractor.extract(&html, base, policy));
    }

    info!("Listing {} has {} pages", base, indices.len());
    let mut properties = Vec::new();
    for index in indices {
        let page = paged_url(base, index);
        let html = session.load(page.as_str()).await?;
        let found = extractor.extract(&html, base, policy);
        debug!("Page {} yielded {} properties", index, found.len());
        properties.extend(found);
    }
    Ok(properties)
}

/// Walk the reviews widget embedded in `target`. A page without the widget
/// has no reviews.
pub async fn crawl_reviews(
    session: &mut Session,
    target: &Url,
    widget_prefix: &str,
    extractor: &ReviewExtractor,
) -> Result<Vec<Review>> {
    let html = session.load(target.as_str()).await?;
    let Some(widget) = find_widget_frame(&html, target, widget_prefix)? else {
        info!("No reviews widget on {}", target);
        return Ok(Vec::new());
    };

    let widget_html = session.load(widget.as_str()).await?;
    let Some(range) = review_page_range(&widget_html, &widget)? else {
        return Ok(extractor.extract(&widget_html));
    };

    info!("Reviews widget has pages {}..={}", range.min, range.max);
    let mut reviews = Vec::new();
    if range.min > 1 {
        // the pager does not link the page it is shown on
        reviews.extend(extractor.extract(&widget_html));
    }
    for page in range.pages() {
        let html = session.load(page.as_str()).await?;
        reviews.extend(extractor.extract(&html));
    }
    Ok(reviews)
}
