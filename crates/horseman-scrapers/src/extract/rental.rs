use super::parse_selector;
use horseman_core::{collect_found, Extraction, Result, VacationRentalRecord};
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

const RENTAL_TYPE: &str = "VacationRental";

fn is_vacation_rental(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(kind)) => kind.eq_ignore_ascii_case(RENTAL_TYPE),
        Some(Value::Array(kinds)) => kinds
            .iter()
            .filter_map(Value::as_str)
            .any(|kind| kind.eq_ignore_ascii_case(RENTAL_TYPE)),
        _ => false,
    }
}

/// Collect rental objects from a JSON-LD document: the document itself, the
/// members of a top-level array, and the members of an `@graph` array.
fn collect_rentals(value: Value, out: &mut Vec<VacationRentalRecord>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_rentals(item, out);
            }
        }
        Value::Object(mut object) => {
            let graph = object.remove("@graph");
            let value = Value::Object(object);
            if is_vacation_rental(&value) {
                out.push(VacationRentalRecord(value));
            }
            if let Some(Value::Array(members)) = graph {
                for member in members {
                    collect_rentals(member, out);
                }
            }
        }
        _ => {}
    }
}

#[derive(Debug)]
pub struct RentalExtractor {
    json_ld: Selector,
}

impl RentalExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            json_ld: parse_selector(r#"script[type="application/ld+json"]"#)?,
        })
    }

    pub fn extract(&self, html: &str) -> Vec<VacationRentalRecord> {
        let document = Html::parse_document(html);
        let blocks = document
            .select(&self.json_ld)
            .map(|script| Self::parse_block(&script.text().collect::<String>()));
        collect_found(blocks, "JSON-LD block").into_iter().flatten().collect()
    }

    fn parse_block(text: &str) -> Extraction<Vec<VacationRentalRecord>> {
        let value: Value = match serde_json::from_str(text.trim()) {
            Ok(value) => value,
            Err(e) => return Extraction::Malformed(e.to_string()),
        };
        let mut rentals = Vec::new();
        collect_rentals(value, &mut rentals);
        if rentals.is_empty() {
            debug!("JSON-LD block holds no {} objects", RENTAL_TYPE);
            return Extraction::Absent;
        }
        Extraction::Found(rentals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_vacation_rentals_are_kept() {
        let html = r#"
            <script type="application/ld+json">{"@type": "Organization", "name": "Acme Stays"}</script>
            <script type="application/ld+json">{"@type": "vacationrental", "name": "Ridge Retreat", "containsPlace": {"occupancy": 8}}</script>
            <script type="application/ld+json">{ this is not json </script>
            <script>{"@type": "VacationRental", "name": "Not JSON-LD"}</script>
        "#;
        let rentals = RentalExtractor::new().unwrap().extract(html);
        assert_eq!(rentals.len(), 1);
        assert_eq!(rentals[0].name(), Some("Ridge Retreat"));
        assert_eq!(rentals[0].0["containsPlace"]["occupancy"], json!(8));
    }

    #[test]
    fn test_graph_and_array_documents() {
        let html = r#"
            <script type="application/ld+json">
              {"@context": "https://schema.org", "@graph": [
                {"@type": "WebPage"},
                {"@type": ["Place", "VacationRental"], "name": "Creek Cabin"}
              ]}
            </script>
            <script type="application/ld+json">
              [{"@type": "VacationRental", "name": "Lake House"}, {"@type": "Offer"}]
            </script>
        "#;
        let names: Vec<_> = RentalExtractor::new()
            .unwrap()
            .extract(html)
            .iter()
            .filter_map(|r| r.name().map(String::from))
            .collect();
        assert_eq!(names, vec!["Creek Cabin", "Lake House"]);
    }
}
