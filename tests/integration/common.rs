use horseman_core::ScraperConfig;
use horseman_scrapers::{HeadlessScraper, MemoryBrowser};
use std::sync::Arc;

pub const SITE: &str = "https://www.example-rentals.com";

pub fn scraper(browser: &MemoryBrowser) -> HeadlessScraper {
    scraper_with(browser, ScraperConfig::default())
}

pub fn scraper_with(browser: &MemoryBrowser, config: ScraperConfig) -> HeadlessScraper {
    HeadlessScraper::new(Arc::new(browser.clone()), config).unwrap()
}

pub fn tile(slug: &str, title: &str, caption: &str) -> String {
    format!(
        r#"<a class="property-result-tile" href="/property/{slug}">
             <img src="https://cdn.example.com/{slug}.jpg">
             <span class="h3">{title}</span>
             <span class="caption">{caption}</span>
             <span class="amenity-list-item" data-original-title="Wi-Fi"></span>
           </a>"#
    )
}

pub fn pager(pages: &[&str]) -> String {
    pages
        .iter()
        .map(|page| format!(r#"<a class="result-page" data-page="{page}">{page}</a>"#))
        .collect()
}

pub fn page(body: &str) -> String {
    format!("<html><head><title>Rentals</title></head><body>{body}</body></html>")
}
