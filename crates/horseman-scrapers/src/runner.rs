//! Scrape operations exposed to callers.
//!
//! Every operation validates its input (watermark, then URL) before any
//! browser is launched, owns one session for its whole duration and closes it
//! on every exit path. Listing, review, availability and rental scrapes are
//! memoized per normalized target; price scrapes never are.

use crate::correlation::{CorrelationCache, CorrelationToken, WidgetObserver};
use crate::extract::{AvailabilityExtractor, PricingExtractor, PropertyExtractor, RentalExtractor, ReviewExtractor, ShapePolicy};
use crate::memo::Memoized;
use crate::pagination::{crawl_properties, crawl_reviews};
use crate::session::{Browser, Session, SessionOptions};
use chrono::Utc;
use horseman_core::request::memo_key;
use horseman_core::{
    normalize_target, verify_watermark, AvailabilityCalendar, PriceQuery, PriceQuote, Property, Result, Review,
    ScraperConfig, VacationRentalRecord,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropertyOptions {
    pub policy: ShapePolicy,
    /// Visit every listing and attach its `VacationRental` records.
    pub with_rental_details: bool,
}

pub struct HeadlessScraper {
    browser: Arc<dyn Browser>,
    config: ScraperConfig,
    correlation: Arc<CorrelationCache>,
    properties: Memoized<Vec<Property>>,
    reviews: Memoized<Vec<Review>>,
    availability: Memoized<Option<AvailabilityCalendar>>,
    rentals: Memoized<Vec<VacationRentalRecord>>,
    property_extractor: PropertyExtractor,
    review_extractor: ReviewExtractor,
    availability_extractor: AvailabilityExtractor,
    rental_extractor: RentalExtractor,
    pricing_extractor: PricingExtractor,
}

impl HeadlessScraper {
    pub fn new(browser: Arc<dyn Browser>, config: ScraperConfig) -> Result<Self> {
        let correlation = Arc::new(CorrelationCache::new(config.correlation_ttl(), config.correlation_capacity));

        Ok(Self {
            properties: Memoized::new(
                "properties",
                Duration::from_secs(config.properties_ttl_secs),
                config.memo_capacity,
            ),
            reviews: Memoized::new("reviews", Duration::from_secs(config.reviews_ttl_secs), config.memo_capacity),
            availability: Memoized::new(
                "availability",
                Duration::from_secs(config.availability_ttl_secs),
                config.memo_capacity,
            ),
            rentals: Memoized::new("rentals", Duration::from_secs(config.rentals_ttl_secs), config.memo_capacity),
            property_extractor: PropertyExtractor::new()?,
            review_extractor: ReviewExtractor::new()?,
            availability_extractor: AvailabilityExtractor::new()?,
            rental_extractor: RentalExtractor::new()?,
            pricing_extractor: PricingExtractor::new()?,
            browser,
            config,
            correlation,
        })
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn correlation(&self) -> &Arc<CorrelationCache> {
        &self.correlation
    }

    fn authorize(&self, target: &str, watermark: Option<&str>) -> Result<Url> {
        verify_watermark(watermark, self.config.watermark.as_deref())?;
        normalize_target(target)
    }

    /// Price quote for a listing page or booking request URL. `None` when the
    /// page produced no quote within the session.
    pub async fn scrape_price(&self, target: &str, watermark: Option<&str>) -> Result<Option<PriceQuote>> {
        let url = self.authorize(target, watermark)?;
        self.price_session(&url).await
    }

    /// Price quote for a stay, built into a booking request URL.
    pub async fn scrape_price_query(&self, query: &PriceQuery, watermark: Option<&str>) -> Result<Option<PriceQuote>> {
        verify_watermark(watermark, self.config.watermark.as_deref())?;
        let url = query.to_url(&self.config.booking_request_base)?;
        self.price_session(&url).await
    }

    async fn price_session(&self, url: &Url) -> Result<Option<PriceQuote>> {
        let token = CorrelationToken::generate();
        let intercept = !url.as_str().starts_with(&self.config.booking_request_base);
        info!("Scraping price from {} (widget: {})", url, intercept);

        let mut options = SessionOptions::default().with_header(&self.config.correlation_header, token.as_str());
        if intercept {
            options = options.with_observer(WidgetObserver::new(
                &self.config.quote_prefix,
                &self.config.correlation_header,
                Arc::clone(&self.correlation),
            ));
        }

        let mut session = Session::open(self.browser.as_ref(), options).await?;
        let loaded = session.load(url.as_str()).await;
        session.close().await;
        let html = loaded?;

        if !intercept {
            match self.pricing_extractor.extract(&html, url) {
                Some(breakdown) => self.correlation.insert(token.clone(), PriceQuote::Table(breakdown)),
                None => warn!("No pricing table on {}", url),
            }
        }

        let quote = self.correlation.take(&token);
        if quote.is_none() {
            debug!("Nothing captured for token {}", token);
        }
        Ok(quote)
    }

    pub async fn scrape_reviews(&self, target: &str, watermark: Option<&str>) -> Result<Vec<Review>> {
        let url = self.authorize(target, watermark)?;
        let key = memo_key(&url, watermark);
        let url = &url;
        self.reviews
            .get_or_try_insert_with(key, move || async move {
                let mut session = Session::open(self.browser.as_ref(), SessionOptions::default()).await?;
                let result = crawl_reviews(&mut session, url, &self.config.widget_prefix, &self.review_extractor).await;
                session.close().await;
                let reviews = result?;
                info!("Scraped {} reviews from {}", reviews.len(), url);
                Ok(reviews)
            })
            .await
    }

    pub async fn scrape_properties(
        &self,
        target: &str,
        watermark: Option<&str>,
        options: PropertyOptions,
    ) -> Result<Vec<Property>> {
        let url = self.authorize(target, watermark)?;
        let key = format!(
            "{}|{:?}|{}",
            memo_key(&url, watermark),
            options.policy,
            options.with_rental_details
        );
        let url = &url;
        self.properties
            .get_or_try_insert_with(key, move || async move {
                let mut session = Session::open(self.browser.as_ref(), SessionOptions::default()).await?;
                let result = self.crawl_listing(&mut session, url, options).await;
                session.close().await;
                let properties = result?;
                info!("Scraped {} properties from {}", properties.len(), url);
                Ok(properties)
            })
            .await
    }

    async fn crawl_listing(&self, session: &mut Session, url: &Url, options: PropertyOptions) -> Result<Vec<Property>> {
        let mut properties = crawl_properties(session, url, &self.property_extractor, options.policy).await?;
        if !options.with_rental_details {
            return Ok(properties);
        }

        for property in &mut properties {
            let Some(property_url) = property.property_url.clone() else {
                continue;
            };
            match session.load(&property_url).await {
                Ok(html) => property.rental_details = self.rental_extractor.extract(&html),
                Err(e) => warn!("Could not load rental details for {}: {}", property.title, e),
            }
        }
        Ok(properties)
    }

    pub async fn scrape_availability(
        &self,
        target: &str,
        watermark: Option<&str>,
    ) -> Result<Option<AvailabilityCalendar>> {
        let url = self.authorize(target, watermark)?;
        let key = memo_key(&url, watermark);
        let url = &url;
        self.availability
            .get_or_try_insert_with(key, move || async move {
                let mut session = Session::open(self.browser.as_ref(), SessionOptions::default()).await?;
                let loaded = session.load(url.as_str()).await;
                session.close().await;
                let html = loaded?;
                Ok(self.availability_extractor.extract(&html, Utc::now().date_naive()))
            })
            .await
    }

    pub async fn scrape_vacation_rentals(
        &self,
        target: &str,
        watermark: Option<&str>,
    ) -> Result<Vec<VacationRentalRecord>> {
        let url = self.authorize(target, watermark)?;
        let key = memo_key(&url, watermark);
        let url = &url;
        self.rentals
            .get_or_try_insert_with(key, move || async move {
                let mut session = Session::open(self.browser.as_ref(), SessionOptions::default()).await?;
                let loaded = session.load(url.as_str()).await;
                session.close().await;
                let html = loaded?;
                Ok(self.rental_extractor.extract(&html))
            })
            .await
    }
}
