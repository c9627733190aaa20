use tabled::settings::{object::Columns, Modify, Style, Width};
use tabled::{Table, Tabled};

use crate::{Property, Review};

#[derive(Tabled)]
pub struct PropertyTableRow {
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Sleeps", display_with = "display_right_6")]
    pub sleeps: String,
    #[tabled(rename = "Beds", display_with = "display_right_4")]
    pub bedrooms: String,
    #[tabled(rename = "Baths", display_with = "display_right_5")]
    pub bathrooms: String,
    #[tabled(rename = "Amenities")]
    pub amenities: String,
    #[tabled(rename = "URL")]
    pub url: String,
}

#[derive(Tabled)]
pub struct ReviewTableRow {
    #[tabled(rename = "Stars", display_with = "display_right_5")]
    pub stars: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Reviewer")]
    pub reviewer: String,
    #[tabled(rename = "Stayed")]
    pub stayed: String,
    #[tabled(rename = "Review")]
    pub content: String,
}

fn display_right_4(s: &str) -> String {
    format!("{:>4}", s)
}

fn display_right_5(s: &str) -> String {
    format!("{:>5}", s)
}

fn display_right_6(s: &str) -> String {
    format!("{:>6}", s)
}

fn or_dash(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

impl PropertyTableRow {
    pub fn from_property(property: &Property) -> Self {
        Self {
            title: property.title.clone(),
            sleeps: property.sleeps.to_string(),
            bedrooms: property.bedrooms.to_string(),
            bathrooms: property.bathrooms.to_string(),
            amenities: property.amenities.join(", "),
            url: or_dash(&property.property_url),
        }
    }
}

impl ReviewTableRow {
    pub fn from_review(review: &Review) -> Self {
        let stayed = match (&review.date_line, &review.property_name) {
            (Some(date), Some(property)) => format!("{} at {}", date, property),
            (Some(date), None) => date.clone(),
            _ => "-".to_string(),
        };

        Self {
            stars: "★".repeat(review.stars as usize),
            title: or_dash(&review.title),
            reviewer: or_dash(&review.reviewer_name),
            stayed,
            content: or_dash(&review.content),
        }
    }
}

pub fn create_property_table(properties: &[Property]) -> String {
    let rows: Vec<PropertyTableRow> = properties.iter().map(PropertyTableRow::from_property).collect();

    let mut table = Table::new(&rows);
    table
        .with(Style::modern())
        .with(Modify::new(Columns::single(0)).with(Width::truncate(40)))     // Title column
        .with(Modify::new(Columns::single(4)).with(Width::wrap(40)))         // Amenities column
        .with(Modify::new(Columns::single(5)).with(Width::truncate(60)));    // URL column

    table.to_string()
}

pub fn create_review_table(reviews: &[Review]) -> String {
    let rows: Vec<ReviewTableRow> = reviews.iter().map(ReviewTableRow::from_review).collect();

    let mut table = Table::new(&rows);
    table
        .with(Style::modern())
        .with(Modify::new(Columns::single(1)).with(Width::truncate(30)))     // Title column
        .with(Modify::new(Columns::single(4)).with(Width::wrap(60)));        // Review column

    table.to_string()
}
