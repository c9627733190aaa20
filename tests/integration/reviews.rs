use crate::common::{page, scraper, SITE};
use horseman_scrapers::MemoryBrowser;

const WIDGET: &str = "https://secure.ownerrez.com/widgets/reviews?id=42";

fn review_item(title: &str, by_line: &str, stars: usize) -> String {
    format!(
        r#"<div class="review-item">
             {stars}
             <span class="review-item-title">{title}</span>
             <div class="review-item-by-line">{by_line}</div>
             <div class="has-read-more"><p>{title} was lovely.</p></div>
           </div>"#,
        stars = r#"<span class="fa fa-star"></span>"#.repeat(stars),
    )
}

fn widget_page(items: &[String]) -> String {
    let pagination = r#"
        <ul class="pagination">
          <li><a href="/widgets/reviews?id=42&page=1">1</a></li>
          <li><a href="/widgets/reviews?id=42&page=2">2</a></li>
        </ul>"#;
    page(&format!("{}{}", items.concat(), pagination))
}

#[tokio::test]
async fn test_reviews_are_read_from_every_widget_page() {
    let target = format!("{}/reviews", SITE);
    let host = page(r#"<h1>Guest reviews</h1><iframe src="//secure.ownerrez.com/widgets/reviews?id=42"></iframe>"#);
    let first = widget_page(&[review_item("Great stay", "By Jane Doe, stayed March 2024", 5)]);
    let second = widget_page(&[
        review_item("Quiet", "By Sam Lee – stayed at Creek Cabin in July 2023", 4),
        review_item("Odd", "Posted anonymously", 3),
    ]);

    let browser = MemoryBrowser::new()
        .with_page(&target, host)
        .with_page(WIDGET, first.clone())
        .with_page(format!("{}&page=1", WIDGET), first)
        .with_page(format!("{}&page=2", WIDGET), second);
    let scraper = scraper(&browser);

    let reviews = scraper.scrape_reviews(&target, None).await.unwrap();
    assert_eq!(reviews.len(), 3);

    assert_eq!(reviews[0].reviewer_name.as_deref(), Some("Jane Doe"));
    assert_eq!(reviews[0].date_line.as_deref(), Some("March 2024"));
    assert_eq!(reviews[0].stars, 5);

    assert_eq!(reviews[1].property_name.as_deref(), Some("Creek Cabin"));
    assert_eq!(reviews[1].date_line.as_deref(), Some("July 2023"));

    assert!(reviews[2].reviewer_name.is_none());
    assert!(reviews[2].date_line.is_none());
    assert_eq!(reviews[2].content.as_deref(), Some("Odd was lovely."));

    let again = scraper.scrape_reviews(&target, None).await.unwrap();
    assert_eq!(again, reviews);
    assert_eq!(browser.sessions_opened(), 1);
}

#[tokio::test]
async fn test_page_without_widget_has_no_reviews() {
    let target = format!("{}/about", SITE);
    let browser = MemoryBrowser::new().with_page(
        &target,
        page(r#"<iframe src="https://www.youtube.com/embed/tour"></iframe>"#),
    );

    let reviews = scraper(&browser).scrape_reviews(&target, None).await.unwrap();
    assert!(reviews.is_empty());
    assert_eq!(browser.visits(), vec![target]);
    assert_eq!(browser.open_sessions(), 0);
}

#[tokio::test]
async fn test_widget_without_pager_is_the_whole_result() {
    let target = format!("{}/reviews", SITE);
    let browser = MemoryBrowser::new()
        .with_page(&target, page(&format!(r#"<iframe src="{}"></iframe>"#, WIDGET)))
        .with_page(WIDGET, page(&review_item("Only one", "By Ana, stayed May 2024", 5)));

    let reviews = scraper(&browser).scrape_reviews(&target, None).await.unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].title.as_deref(), Some("Only one"));
}
