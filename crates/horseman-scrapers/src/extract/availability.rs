//! Booked-date calendars embedded in property pages as a script literal:
//!
//! ```text
//! const bookedDates = ['2024-01-01', ['2024-02-01', '2024-02-03'], ];
//! ```
//!
//! The literal is read with a small fixed grammar (quoted dates and
//! two-element bracketed spans) and never evaluated.

use super::parse_selector;
use chrono::NaiveDate;
use horseman_core::{parse_loose_date, AvailabilityCalendar, Extraction, HorsemanError, Result};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, warn};

/// Spans longer than this are treated as corrupt rather than expanded.
const MAX_SPAN_DAYS: i64 = 3660;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LiteralError {
    #[error("literal ended unexpectedly")]
    UnexpectedEnd,
    #[error("unexpected '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },
    #[error("no array literal follows the declaration")]
    MissingArray,
    #[error("unbalanced brackets")]
    Unbalanced,
    #[error("not a date: {0}")]
    InvalidDate(String),
    #[error("span {start}..{end} is implausibly long")]
    SpanTooLong { start: NaiveDate, end: NaiveDate },
}

/// One element of a booked-dates literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Booked {
    Day(NaiveDate),
    /// Inclusive on both ends.
    Span(NaiveDate, NaiveDate),
}

impl Booked {
    fn expand_into(self, dates: &mut BTreeSet<NaiveDate>) -> std::result::Result<(), LiteralError> {
        match self {
            Booked::Day(day) => {
                dates.insert(day);
            }
            Booked::Span(a, b) => {
                let (start, end) = if a <= b { (a, b) } else { (b, a) };
                if (end - start).num_days() > MAX_SPAN_DAYS {
                    return Err(LiteralError::SpanTooLong { start, end });
                }
                dates.extend(start.iter_days().take_while(|day| *day <= end));
            }
        }
        Ok(())
    }
}

/// Cut the bracket-balanced array literal starting at the first `[` of
/// `text`. Brackets inside quoted strings do not count.
pub fn balanced_array(text: &str) -> std::result::Result<&str, LiteralError> {
    let start = text.find('[').ok_or(LiteralError::MissingArray)?;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for (offset, c) in text[start..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    Err(LiteralError::Unbalanced)
}

struct LiteralParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn expect(&mut self, expected: char) -> std::result::Result<(), LiteralError> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(found) => Err(LiteralError::Unexpected { found, offset: self.pos }),
            None => Err(LiteralError::UnexpectedEnd),
        }
    }

    /// `'[' (item (',' item)* ','?)? ']'`
    fn parse_literal(&mut self) -> std::result::Result<Vec<Booked>, LiteralError> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => items.push(self.parse_item()?),
                None => return Err(LiteralError::UnexpectedEnd),
            }
            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {}
                Some(found) => return Err(LiteralError::Unexpected { found, offset: self.pos }),
                None => return Err(LiteralError::UnexpectedEnd),
            }
        }

        self.skip_whitespace();
        match self.peek() {
            None => Ok(items),
            Some(found) => Err(LiteralError::Unexpected { found, offset: self.pos }),
        }
    }

    /// `date | '[' date ',' date ','? ']'`
    fn parse_item(&mut self) -> std::result::Result<Booked, LiteralError> {
        self.skip_whitespace();
        if self.peek() != Some('[') {
            return self.parse_date().map(Booked::Day);
        }

        self.pos += 1;
        let start = self.parse_date()?;
        self.expect(',')?;
        let end = self.parse_date()?;
        self.skip_whitespace();
        if self.peek() == Some(',') {
            self.pos += 1;
        }
        self.expect(']')?;
        Ok(Booked::Span(start, end))
    }

    fn parse_date(&mut self) -> std::result::Result<NaiveDate, LiteralError> {
        self.skip_whitespace();
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            Some(found) => return Err(LiteralError::Unexpected { found, offset: self.pos }),
            None => return Err(LiteralError::UnexpectedEnd),
        };
        let body_start = self.pos + 1;
        let len = self.input[body_start..]
            .find(quote)
            .ok_or(LiteralError::UnexpectedEnd)?;
        let raw = &self.input[body_start..body_start + len];
        self.pos = body_start + len + 1;

        parse_loose_date(raw).ok_or_else(|| LiteralError::InvalidDate(raw.to_string()))
    }
}

/// Parse a booked-dates array literal.
pub fn parse_booked_literal(literal: &str) -> std::result::Result<Vec<Booked>, LiteralError> {
    LiteralParser::new(literal).parse_literal()
}

/// Expand a literal into the set of unavailable dates.
pub fn unavailable_from_literal(literal: &str) -> std::result::Result<BTreeSet<NaiveDate>, LiteralError> {
    let mut dates = BTreeSet::new();
    for booked in parse_booked_literal(literal)? {
        booked.expand_into(&mut dates)?;
    }
    Ok(dates)
}

#[derive(Debug)]
pub struct AvailabilityExtractor {
    script: Selector,
    declaration: Regex,
}

impl AvailabilityExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            script: parse_selector("script")?,
            declaration: Regex::new(r"(?i)(?:const|var|let)\s*bookedDates\s*=\s*")
                .map_err(|e| HorsemanError::Selector(e.to_string()))?,
        })
    }

    /// Unavailable dates from every booked-dates block in the document, or
    /// `None` when the document declares none.
    pub fn unavailable_dates(&self, html: &str) -> Option<BTreeSet<NaiveDate>> {
        let document = Html::parse_document(html);
        let mut blocks_seen = 0;
        let mut unavailable = BTreeSet::new();

        let scripts = document.select(&self.script).filter(|script| {
            script
                .value()
                .attr("type")
                .map_or(true, |kind| kind.to_ascii_lowercase().contains("javascript"))
        });
        for script in scripts {
            match self.parse_block(&script.text().collect::<String>()) {
                Extraction::Found(dates) => {
                    blocks_seen += 1;
                    unavailable.extend(dates);
                }
                Extraction::Malformed(reason) => {
                    blocks_seen += 1;
                    warn!("Skipping malformed bookedDates block: {}", reason);
                }
                Extraction::Absent => {}
            }
        }

        debug!("Read {} bookedDates blocks, {} unavailable dates", blocks_seen, unavailable.len());
        (blocks_seen > 0).then_some(unavailable)
    }

    /// Calendar over the horizon starting at `today`.
    pub fn extract(&self, html: &str, today: NaiveDate) -> Option<AvailabilityCalendar> {
        self.unavailable_dates(html)
            .map(|unavailable| AvailabilityCalendar::over_horizon(unavailable, today))
    }

    fn parse_block(&self, script: &str) -> Extraction<BTreeSet<NaiveDate>> {
        let script: String = script.chars().filter(|c| *c != '\n' && *c != '\r').collect();
        let Some(declaration) = self.declaration.find(&script) else {
            return Extraction::Absent;
        };

        let result = balanced_array(&script[declaration.end()..]).and_then(unavailable_from_literal);
        match result {
            Ok(dates) => Extraction::Found(dates),
            Err(e) => Extraction::Malformed(e.to_string()),
        }
    }
}
