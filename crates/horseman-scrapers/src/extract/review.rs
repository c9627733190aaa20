use super::{first_text, normalize_text, parse_selector};
use horseman_core::{collect_found, Extraction, Result, Review};
use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

/// The parts of a review by-line such as `By Jane Doe, stayed March 2024`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByLine {
    pub reviewer: Option<String>,
    pub property: Option<String>,
    pub date: Option<String>,
}

fn non_empty(text: &str) -> Option<String> {
    let text = normalize_text(text);
    (!text.is_empty()).then_some(text)
}

/// Split a by-line on a comma or en dash. Anything other than exactly two
/// segments yields an empty [`ByLine`].
///
/// A trailing segment of the form `stayed at <property> in <date>` carries the
/// property name as well as the stay date.
pub fn split_by_line(line: &str) -> ByLine {
    let line = line.replace("â€“", "–");
    let segments: Vec<&str> = line.split([',', '–']).collect();
    let [name, tail] = segments.as_slice() else {
        return ByLine::default();
    };

    let name = name.trim();
    let reviewer = non_empty(
        name.strip_prefix("By")
            .filter(|rest| rest.starts_with(char::is_whitespace))
            .unwrap_or(name),
    );

    let (property, date) = match tail.rfind(" in ") {
        Some(idx) => {
            let head = &tail[..idx];
            let property = match head.find(" at ") {
                Some(at) => non_empty(&head[at + 4..]),
                None => non_empty(&head.replace("stayed", "")),
            };
            (property, non_empty(&tail[idx + 4..]))
        }
        None => (None, non_empty(&tail.replace("stayed", ""))),
    };

    ByLine {
        reviewer,
        property,
        date,
    }
}

#[derive(Debug)]
pub struct ReviewExtractor {
    item: Selector,
    star: Selector,
    title: Selector,
    by_line: Selector,
    body: Selector,
}

impl ReviewExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            item: parse_selector("div.review-item")?,
            star: parse_selector("span.fa-star")?,
            title: parse_selector("span.review-item-title")?,
            by_line: parse_selector("div.review-item-by-line")?,
            body: parse_selector("div.has-read-more")?,
        })
    }

    /// Every review in a rendered reviews widget document.
    pub fn extract(&self, html: &str) -> Vec<Review> {
        let document = Html::parse_document(html);
        collect_found(
            document.select(&self.item).map(|item| self.parse_item(item)),
            "review",
        )
    }

    fn parse_item(&self, item: ElementRef) -> Extraction<Review> {
        let mut review = Review {
            stars: item.select(&self.star).count() as u32,
            title: first_text(item, &self.title),
            ..Default::default()
        };

        if let Some(line) = first_text(item, &self.by_line) {
            let by_line = split_by_line(&line);
            review.reviewer_name = by_line.reviewer;
            review.property_name = by_line.property;
            review.date_line = by_line.date;
        }

        if let Some(body) = item.select(&self.body).next() {
            let blocks = content_blocks(body);
            review.content = blocks.first().cloned();
            review.response = blocks
                .last()
                .filter(|_| blocks.len() > 1)
                .filter(|last| Some(*last) != review.content.as_ref())
                .cloned();
        }

        if review.title.is_none() && review.content.is_none() {
            debug!("Skipping review item with neither title nor content");
            return Extraction::Absent;
        }
        Extraction::Found(review)
    }
}

/// Text of each direct child of a review body, blank children dropped.
fn content_blocks(body: ElementRef) -> Vec<String> {
    body.children()
        .filter_map(|child| match child.value() {
            Node::Text(text) => non_empty(text),
            Node::Element(_) => ElementRef::wrap(child).and_then(|el| non_empty(&el.text().collect::<String>())),
            _ => None,
        })
        .collect()
}
