pub mod correlation;
pub mod extract;
pub mod memo;
pub mod pagination;
pub mod runner;
pub mod session;

pub use correlation::{CorrelationCache, CorrelationToken, WidgetObserver};
pub use extract::{
    AvailabilityExtractor, PricingExtractor, PropertyExtractor, RentalExtractor, ReviewExtractor, ShapePolicy,
};
pub use memo::Memoized;
pub use runner::{HeadlessScraper, PropertyOptions};
pub use session::{Browser, BrowserPage, ChromiumBrowser, MemoryBrowser, Session, SessionOptions};
