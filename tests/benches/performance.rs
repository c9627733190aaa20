use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use chrono::NaiveDate;
use horseman_core::ScraperConfig;
use horseman_scrapers::extract::availability::unavailable_from_literal;
use horseman_scrapers::{
    AvailabilityExtractor, HeadlessScraper, MemoryBrowser, PropertyExtractor, PropertyOptions, ReviewExtractor,
    ShapePolicy,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use url::Url;

// Helper function to build a results page with `count` tiles
fn listing_page(count: usize) -> String {
    let tiles: String = (0..count)
        .map(|i| {
            format!(
                r#"<a class="property-result-tile" href="/property/{i}">
                     <img src="https://cdn.example.com/{i}.jpg">
                     <span class="h3">Property {i}</span>
                     <span class="caption">Sleeps {} {} {}</span>
                     <span class="amenity-list-item" data-original-title="Pool"></span>
                   </a>"#,
                i % 12 + 1,
                i % 5 + 1,
                i % 3 + 1
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", tiles)
}

// Helper function to build a reviews widget with `count` reviews
fn reviews_page(count: usize) -> String {
    let items: String = (0..count)
        .map(|i| {
            format!(
                r#"<div class="review-item">
                     <span class="fa fa-star"></span><span class="fa fa-star"></span>
                     <span class="review-item-title">Review {i}</span>
                     <div class="review-item-by-line">By Guest {i}, stayed at Cabin {i} in May 2024</div>
                     <div class="has-read-more"><p>Stay number {i}.</p><p>Thanks!</p></div>
                   </div>"#
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", items)
}

// Helper function to build a bookedDates literal of `count` one-week spans
fn booked_literal(count: usize) -> String {
    let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    let spans: Vec<String> = (0..count)
        .map(|i| {
            let from = start + chrono::Days::new(i as u64 * 10);
            let to = from + chrono::Days::new(6);
            format!("['{}', '{}']", from, to)
        })
        .collect();
    format!("[{}]", spans.join(", "))
}

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(10));

    let base = Url::parse("https://www.example-rentals.com/").unwrap();
    let properties = PropertyExtractor::new().unwrap();
    let reviews = ReviewExtractor::new().unwrap();

    for size in [10, 100, 500].iter() {
        let listing = listing_page(*size);
        group.bench_with_input(BenchmarkId::new("properties", size), &listing, |b, html| {
            b.iter(|| black_box(properties.extract(html, &base, ShapePolicy::TilesFirst)));
        });

        let widget = reviews_page(*size);
        group.bench_with_input(BenchmarkId::new("reviews", size), &widget, |b, html| {
            b.iter(|| black_box(reviews.extract(html)));
        });
    }

    group.finish();
}

fn bench_availability(c: &mut Criterion) {
    let mut group = c.benchmark_group("availability");
    group.sample_size(20);

    let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    let extractor = AvailabilityExtractor::new().unwrap();

    for size in [10, 70].iter() {
        let literal = booked_literal(*size);
        group.bench_with_input(BenchmarkId::new("literal", size), &literal, |b, literal| {
            b.iter(|| black_box(unavailable_from_literal(literal).unwrap()));
        });

        let html = format!("<script>const bookedDates = {};</script>", literal);
        group.bench_with_input(BenchmarkId::new("calendar", size), &html, |b, html| {
            b.iter(|| black_box(extractor.extract(html, today)));
        });
    }

    group.finish();
}

fn bench_crawl(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("crawl");
    group.sample_size(10);

    // Benchmark a paged listing crawl against the in-memory browser
    for pages in [1, 5].iter() {
        let base = "https://www.example-rentals.com/rentals";
        let pager: String = (1..=*pages)
            .map(|p| format!(r#"<a class="result-page" data-page="{p}">{p}</a>"#))
            .collect();
        let mut browser = MemoryBrowser::new().with_page(base, format!("{}{}", pager, listing_page(20)));
        for p in 1..=*pages {
            browser = browser.with_page(format!("{}?page={}", base, p), format!("{}{}", pager, listing_page(20)));
        }

        group.bench_with_input(BenchmarkId::new("properties", pages), &browser, |b, browser| {
            b.to_async(&rt).iter(|| async {
                // fresh scraper per iteration so the memo never hits
                let scraper = HeadlessScraper::new(Arc::new(browser.clone()), ScraperConfig::default()).unwrap();
                black_box(
                    scraper
                        .scrape_properties(base, None, PropertyOptions::default())
                        .await
                        .unwrap(),
                );
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_extraction, bench_availability, bench_crawl);

criterion_main!(benches);
