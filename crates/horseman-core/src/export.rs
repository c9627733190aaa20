//! CSV export of scraped listings and reviews.

use crate::{Property, Result, Review};
use std::io;

pub fn write_properties_csv<W: io::Write>(writer: W, properties: &[Property]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record([
        "Title",
        "Sleeps",
        "Bedrooms",
        "Bathrooms",
        "Full bathrooms",
        "Half bathrooms",
        "Photo URL",
        "Property URL",
        "Amenities",
    ])?;
    for property in properties {
        writer.write_record([
            property.title.clone(),
            property.sleeps.to_string(),
            property.bedrooms.to_string(),
            property.bathrooms.to_string(),
            property.full_bathrooms.to_string(),
            property.half_bathrooms.to_string(),
            property.photo_url.clone().unwrap_or_default(),
            property.property_url.clone().unwrap_or_default(),
            property.amenities.join("; "),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_reviews_csv<W: io::Write>(writer: W, reviews: &[Review]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["Title", "Reviewer", "Property", "Stayed", "Stars", "Content", "Response"])?;
    for review in reviews {
        writer.write_record([
            review.title.clone().unwrap_or_default(),
            review.reviewer_name.clone().unwrap_or_default(),
            review.property_name.clone().unwrap_or_default(),
            review.date_line.clone().unwrap_or_default(),
            review.stars.to_string(),
            review.content.clone().unwrap_or_default(),
            review.response.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
