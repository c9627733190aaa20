use super::{normalize_text, parse_selector};
use horseman_core::{parse_loose_date, Extraction, LineItems, PriceBreakdown, PricedValue, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

/// Parse the amount out of a currency string such as `$1,234.50`,
/// `1.234,50 €` or `-$75`.
pub fn parse_amount(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let negative = text[..start].contains('-') || text[..start].contains('(');

    let number: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let number = number.trim_end_matches([',', '.']);

    let last_comma = number.rfind(',');
    let last_dot = number.rfind('.');
    let normalized = match (last_comma, last_dot) {
        (Some(comma), Some(dot)) if comma > dot => number.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => number.replace(',', ""),
        (Some(comma), None) => {
            let decimals = number.len() - comma - 1;
            if number.matches(',').count() == 1 && decimals <= 2 {
                number.replace(',', ".")
            } else {
                number.replace(',', "")
            }
        }
        (None, Some(_)) if number.matches('.').count() > 1 => number.replace('.', ""),
        _ => number.to_string(),
    };

    let value: f64 = normalized.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Whole days between the `arrival` and `departure` query parameters of a
/// quote URL, or 0 when either is missing or unreadable.
pub fn stay_nights(target: &Url) -> i64 {
    let lowered = target.as_str().to_lowercase();
    let Ok(url) = Url::parse(&lowered) else {
        return 0;
    };

    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| parse_loose_date(&value))
    };
    match (param("arrival"), param("departure")) {
        (Some(arrival), Some(departure)) => (departure - arrival).num_days().abs(),
        _ => {
            debug!("No stay dates in {}", target);
            0
        }
    }
}

#[derive(Debug)]
pub struct PricingExtractor {
    card: Selector,
    table: Selector,
    body: Selector,
    foot: Selector,
    row: Selector,
    cell: Selector,
}

impl PricingExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            card: parse_selector("div.card-body")?,
            table: parse_selector("table.table")?,
            body: parse_selector("tbody")?,
            foot: parse_selector("tfoot")?,
            row: parse_selector("tr")?,
            cell: parse_selector("td")?,
        })
    }

    /// The breakdown from the first pricing card whose table has both a body
    /// and a footer.
    pub fn extract(&self, html: &str, target: &Url) -> Option<PriceBreakdown> {
        let document = Html::parse_document(html);
        let breakdown = document
            .select(&self.card)
            .map(|card| self.parse_card(card, target))
            .find_map(Extraction::found);
        if breakdown.is_none() {
            debug!("No pricing table on {}", target);
        }
        breakdown
    }

    fn parse_card(&self, card: ElementRef, target: &Url) -> Extraction<PriceBreakdown> {
        let Some(table) = card.select(&self.table).next() else {
            return Extraction::Absent;
        };
        let (Some(body), Some(foot)) = (table.select(&self.body).next(), table.select(&self.foot).next()) else {
            return Extraction::Absent;
        };

        let details = self.line_items(body);
        let summary = self.line_items(foot);
        let total = summary.first().and_then(|(_, value)| value.parsed);

        Extraction::Found(PriceBreakdown {
            details,
            summary,
            nights: stay_nights(target),
            total,
        })
    }

    fn line_items(&self, section: ElementRef) -> LineItems {
        let mut items = LineItems::new();
        for row in section.select(&self.row) {
            let cells: Vec<String> = row
                .select(&self.cell)
                .map(|cell| normalize_text(&cell.text().collect::<String>()))
                .collect();
            let [key, .., value] = cells.as_slice() else {
                continue;
            };
            let key = key.to_lowercase().replace(' ', "_");
            if key.is_empty() {
                continue;
            }
            items.insert(
                key,
                PricedValue {
                    original_value: value.clone(),
                    parsed: parse_amount(value),
                },
            );
        }
        items
    }
}
