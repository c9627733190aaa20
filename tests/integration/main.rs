mod common;
mod export;
mod listings;
mod price;
mod reviews;
