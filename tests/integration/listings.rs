use crate::common::{page, pager, scraper, scraper_with, tile, SITE};
use chrono::{Months, Utc};
use horseman_core::{HorsemanError, ScraperConfig};
use horseman_scrapers::{MemoryBrowser, PropertyOptions, ShapePolicy};

fn listing_browser() -> MemoryBrowser {
    let listing = format!("{}/rentals", SITE);
    let nav = pager(&["1", "2", "x"]);
    MemoryBrowser::new()
        .with_page(&listing, page(&format!("{}{}", nav, tile("ridge", "Ridge Retreat", "Sleeps 8 3 2"))))
        .with_page(
            format!("{}?page=1", listing),
            page(&format!("{}{}", nav, tile("ridge", "Ridge Retreat", "Sleeps 8 3 2"))),
        )
        .with_page(
            format!("{}?page=2", listing),
            page(&format!(
                "{}{}{}",
                nav,
                tile("creek", "Creek Cabin", "Sleeps 4 1 1"),
                tile("lake", "Lake House", "Sleeps 12 5 3 2 1")
            )),
        )
        .with_page(
            format!("{}/property/ridge", SITE),
            page(r#"<script type="application/ld+json">{"@type": "VacationRental", "name": "Ridge Retreat"}</script>"#),
        )
        .with_page(format!("{}/property/lake", SITE), page("<p>no metadata</p>"))
        .with_failure(format!("{}/property/creek", SITE))
}

#[tokio::test]
async fn test_listing_pages_are_crawled_and_memoized() {
    let browser = listing_browser();
    let scraper = scraper(&browser);
    let target = "www.example-rentals.com/rentals";

    let properties = scraper
        .scrape_properties(target, None, PropertyOptions::default())
        .await
        .unwrap();
    let titles: Vec<_> = properties.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Ridge Retreat", "Creek Cabin", "Lake House"]);
    assert_eq!(properties[2].half_bathrooms, 1);
    assert_eq!(
        properties[1].property_url.as_deref(),
        Some("https://www.example-rentals.com/property/creek")
    );

    let again = scraper
        .scrape_properties(target, None, PropertyOptions::default())
        .await
        .unwrap();
    assert_eq!(again, properties);
    assert_eq!(browser.sessions_opened(), 1);
    assert_eq!(browser.visits().len(), 3);
}

#[tokio::test]
async fn test_rental_details_enrichment_tolerates_broken_pages() {
    let browser = listing_browser();
    let options = PropertyOptions {
        policy: ShapePolicy::TilesFirst,
        with_rental_details: true,
    };

    let properties = scraper(&browser)
        .scrape_properties(&format!("{}/rentals", SITE), None, options)
        .await
        .unwrap();
    assert_eq!(properties.len(), 3);
    assert_eq!(properties[0].rental_details.len(), 1);
    assert_eq!(properties[0].rental_details[0].name(), Some("Ridge Retreat"));
    assert!(properties[1].rental_details.is_empty());
    assert!(properties[2].rental_details.is_empty());
    assert_eq!(browser.open_sessions(), 0);
}

#[tokio::test]
async fn test_failed_scrapes_are_not_memoized() {
    let listing = format!("{}/broken", SITE);
    let browser = MemoryBrowser::new().with_failure(&listing);
    let scraper = scraper(&browser);

    for _ in 0..2 {
        let result = scraper.scrape_properties(&listing, None, PropertyOptions::default()).await;
        assert!(matches!(result, Err(HorsemanError::Navigation { .. })));
    }
    assert_eq!(browser.sessions_opened(), 2);
    assert_eq!(browser.open_sessions(), 0);
}

#[tokio::test]
async fn test_availability_and_rentals_from_property_page() {
    let property = format!("{}/property/ridge", SITE);
    let today = Utc::now().date_naive();
    let booked_start = today + chrono::Days::new(3);
    let booked_end = today + chrono::Days::new(5);
    let html = page(&format!(
        r#"<script type="application/ld+json">{{"@type": "VacationRental", "name": "Ridge Retreat"}}</script>
           <script type="text/javascript">
             var bookedDates = ['{today}', ['{booked_start}', '{booked_end}']];
           </script>"#
    ));
    let browser = MemoryBrowser::new().with_page(&property, html);
    let config = ScraperConfig {
        watermark: Some("s3cret".to_string()),
        ..Default::default()
    };
    let scraper = scraper_with(&browser, config);

    let calendar = scraper
        .scrape_availability(&property, Some("s3cret"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(calendar.unavailable.len(), 4);
    assert!(!calendar.is_available(today));
    assert!(!calendar.is_available(booked_end));
    assert!(calendar.is_available(today + chrono::Days::new(1)));
    assert_eq!(calendar.horizon_end, today + Months::new(24));

    let rentals = scraper.scrape_vacation_rentals(&property, Some("s3cret")).await.unwrap();
    assert_eq!(rentals.len(), 1);

    assert!(matches!(
        scraper.scrape_availability(&property, None).await,
        Err(HorsemanError::Unauthorized)
    ));
    assert_eq!(browser.sessions_opened(), 2);
}
