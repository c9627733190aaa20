use crate::common::{page, scraper, tile, SITE};
use horseman_core::create_property_table;
use horseman_core::export::write_properties_csv;
use horseman_scrapers::{MemoryBrowser, PropertyOptions};
use std::fs;
use tempfile::tempdir;

#[tokio::test]
async fn test_export_scraped_properties_to_csv() {
    let temp_dir = tempdir().unwrap();
    let export_path = temp_dir.path().join("properties.csv");

    let listing = format!("{}/cabins", SITE);
    let browser = MemoryBrowser::new().with_page(
        &listing,
        page(&format!(
            "{}{}",
            tile("ridge", "Ridge Retreat", "Sleeps 8, 3 bedrooms"),
            tile("creek", "Creek Cabin", "Sleeps 4")
        )),
    );
    let properties = scraper(&browser)
        .scrape_properties(&listing, None, PropertyOptions::default())
        .await
        .unwrap();

    write_properties_csv(fs::File::create(&export_path).unwrap(), &properties).unwrap();

    assert!(export_path.exists());
    let content = fs::read_to_string(&export_path).unwrap();
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "Ridge Retreat");
    assert_eq!(&rows[0][2], "3");
    assert_eq!(&rows[1][7], "https://www.example-rentals.com/property/creek");
}

#[tokio::test]
async fn test_property_table_lists_every_title() {
    let listing = format!("{}/cabins", SITE);
    let browser = MemoryBrowser::new().with_page(&listing, page(&tile("ridge", "Ridge Retreat", "Sleeps 8")));
    let properties = scraper(&browser)
        .scrape_properties(&listing, None, PropertyOptions::default())
        .await
        .unwrap();

    let table = create_property_table(&properties);
    assert!(table.contains("Ridge Retreat"));
    assert!(table.contains("Wi-Fi"));
}
