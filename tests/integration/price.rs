use crate::common::{page, scraper, SITE};
use chrono::NaiveDate;
use horseman_core::{PriceQuery, PriceQuote};
use horseman_scrapers::MemoryBrowser;
use serde_json::json;

const QUOTE_CALL: &str = "https://secure.ownerrez.com/widgets/quote/calc?property=123";
const BOOKING_BASE: &str = "https://booking.ownerrez.com/request";

fn stay_query() -> PriceQuery {
    PriceQuery::new(
        "123",
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 7, 4).unwrap(),
        2,
        0,
    )
}

const PRICING_TABLE: &str = r#"
    <div class="card-body">
      <table class="table">
        <tbody>
          <tr><td>Nightly Rate</td><td>$900.00</td></tr>
          <tr><td>Cleaning Fee</td><td>$150.00</td></tr>
          <tr><td>Pet policy</td></tr>
        </tbody>
        <tfoot>
          <tr><td>Total</td><td>$1,050.00</td></tr>
        </tfoot>
      </table>
    </div>
"#;

#[tokio::test]
async fn test_widget_payload_is_returned_once() {
    let listing = format!("{}/stay/ridge-retreat", SITE);
    let browser = MemoryBrowser::new()
        .with_page(&listing, page("<div id=\"quote\"></div>"))
        .with_widget_call(&listing, QUOTE_CALL, r#"{"total": 450.0, "nights": 3}"#);
    let scraper = scraper(&browser);

    let quote = scraper.scrape_price(&listing, None).await.unwrap();
    assert_eq!(quote, Some(PriceQuote::Widget(json!({"total": 450.0, "nights": 3}))));
    assert!(scraper.correlation().is_empty());
    assert_eq!(browser.open_sessions(), 0);
}

#[tokio::test]
async fn test_widget_call_without_token_is_not_matched() {
    let listing = format!("{}/stay/creek-cabin", SITE);
    let browser = MemoryBrowser::new()
        .with_page(&listing, page(""))
        .with_headerless_widget_call(&listing, QUOTE_CALL, r#"{"total": 1.0}"#);

    let quote = scraper(&browser).scrape_price(&listing, None).await.unwrap();
    assert!(quote.is_none());
}

#[tokio::test]
async fn test_concurrent_price_scrapes_get_their_own_payloads() {
    let first = format!("{}/stay/one", SITE);
    let second = format!("{}/stay/two", SITE);
    let browser = MemoryBrowser::new()
        .with_page(&first, page(""))
        .with_page(&second, page(""))
        .with_widget_call(&first, QUOTE_CALL, r#"{"listing": "one"}"#)
        .with_widget_call(&second, QUOTE_CALL, r#"{"listing": "two"}"#);
    let scraper = scraper(&browser);

    let (a, b) = futures::join!(scraper.scrape_price(&first, None), scraper.scrape_price(&second, None));
    assert_eq!(a.unwrap(), Some(PriceQuote::Widget(json!({"listing": "one"}))));
    assert_eq!(b.unwrap(), Some(PriceQuote::Widget(json!({"listing": "two"}))));
    assert_eq!(browser.sessions_opened(), 2);
}

#[tokio::test]
async fn test_booking_request_parses_pricing_table() {
    let url = stay_query().to_url(BOOKING_BASE).unwrap();
    assert_eq!(
        url.as_str(),
        "https://booking.ownerrez.com/request?property=123&arrival=2024-07-01&departure=2024-07-04&adults=2&children=0"
    );

    let browser = MemoryBrowser::new()
        .with_page(url.as_str(), page(PRICING_TABLE))
        // never observed on booking requests
        .with_widget_call(url.as_str(), QUOTE_CALL, r#"{"total": 0}"#);
    let scraper = scraper(&browser);

    let Some(PriceQuote::Table(breakdown)) = scraper.scrape_price_query(&stay_query(), None).await.unwrap() else {
        panic!("expected a pricing table quote");
    };
    assert_eq!(breakdown.nights, 3);
    assert_eq!(breakdown.total, Some(1050.0));
    assert_eq!(breakdown.details.keys().collect::<Vec<_>>(), vec!["nightly_rate", "cleaning_fee"]);
    assert!(scraper.correlation().is_empty());
}

#[tokio::test]
async fn test_price_scrapes_are_not_memoized() {
    let listing = format!("{}/stay/lake-house", SITE);
    let browser = MemoryBrowser::new()
        .with_page(&listing, page(""))
        .with_widget_call(&listing, QUOTE_CALL, r#"{"total": 99}"#);
    let scraper = scraper(&browser);

    scraper.scrape_price(&listing, None).await.unwrap();
    scraper.scrape_price(&listing, None).await.unwrap();
    assert_eq!(browser.sessions_opened(), 2);
}
