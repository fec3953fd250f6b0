//! Element-set text parsing
//!
//! Validates the fixed-column two-line element format and splits the two
//! upstream payload shapes into records:
//! - bulk feed: plain text, repeated `name / line 1 / line 2` groups
//! - featured feed: JSON object carrying both lines in one `tle` string

use std::sync::OnceLock;

use orbtrack_common::{CatalogId, SourceTag};
use regex::Regex;
use serde::Deserialize;

use super::error::{ElementLinesError, FetchError};
use super::types::{ElementLines, ElementSetRecord};

const LINE_LENGTH: usize = 69;

const LINE1_PATTERN: &str =
    r"^1 [0-9A-Z ]{5}[A-Z ] .{8} [ 0-9]{5}\.[0-9 ]{8} .{10} .{8} .{8} . [ 0-9]{4}[0-9]$";
const LINE2_PATTERN: &str = concat!(
    r"^2 [0-9A-Z ]{5} [ 0-9]{3}\.[ 0-9]{4} [ 0-9]{3}\.[ 0-9]{4} [0-9]{7} ",
    r"[ 0-9]{3}\.[ 0-9]{4} [ 0-9]{3}\.[ 0-9]{4} [ 0-9]{2}\.[ 0-9]{8}[ 0-9]{5}[0-9]$"
);

fn line_patterns() -> &'static (Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        (
            Regex::new(LINE1_PATTERN).expect("line 1 pattern is valid"),
            Regex::new(LINE2_PATTERN).expect("line 2 pattern is valid"),
        )
    })
}

/// Modulo-10 checksum over the first 68 columns: digits count their value,
/// a minus sign counts one.
pub fn checksum(line: &str) -> u32 {
    line.chars()
        .take(LINE_LENGTH - 1)
        .map(|c| match c {
            '0'..='9' => c.to_digit(10).unwrap_or(0),
            '-' => 1,
            _ => 0,
        })
        .sum::<u32>()
        % 10
}

/// Catalog number field (columns 3-7) of an element line
fn catalog_field(line: &str) -> Option<&str> {
    line.get(2..7)
}

/// Parse the catalog number of an element line.
pub fn parse_catalog_id(line: &str) -> Result<CatalogId, ElementLinesError> {
    let field = catalog_field(line).ok_or_else(|| ElementLinesError::InvalidId(line.to_string()))?;
    field
        .trim()
        .parse::<CatalogId>()
        .map_err(|_| ElementLinesError::InvalidId(field.to_string()))
}

/// Check both lines against the element line layout.
pub fn validate_element_lines(lines: &ElementLines) -> Result<(), ElementLinesError> {
    let (line1_re, line2_re) = line_patterns();

    for (number, line, pattern) in [(1u8, &lines.line1, line1_re), (2u8, &lines.line2, line2_re)] {
        if line.len() != LINE_LENGTH {
            return Err(ElementLinesError::Length {
                line: number,
                len: line.len(),
            });
        }
        if !pattern.is_match(line) {
            return Err(ElementLinesError::Layout(number));
        }
        let found = line[LINE_LENGTH - 1..].parse::<u32>().unwrap_or(u32::MAX);
        let expected = checksum(line);
        if found != expected {
            return Err(ElementLinesError::Checksum {
                line: number,
                expected,
                found,
            });
        }
    }

    let id1 = catalog_field(&lines.line1).unwrap_or_default();
    let id2 = catalog_field(&lines.line2).unwrap_or_default();
    if id1 != id2 {
        return Err(ElementLinesError::IdMismatch(id1.to_string(), id2.to_string()));
    }

    Ok(())
}

/// Result of scanning a bulk feed
#[derive(Debug, Default)]
pub struct BulkParse {
    pub records: Vec<ElementSetRecord>,
    pub rejected: usize,
}

/// Parse a bulk text feed into at most `max_records` records.
///
/// Lines are trimmed and blank lines dropped, then consumed in groups of
/// three. A group whose id or lines fail validation is skipped.
pub fn parse_bulk_feed(text: &str, max_records: usize) -> BulkParse {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut parsed = BulkParse::default();

    for group in lines.chunks_exact(3) {
        if parsed.records.len() >= max_records {
            break;
        }

        let [name, line1, line2] = [group[0], group[1], group[2]];
        match parse_bulk_record(name, line1, line2) {
            Ok(record) => parsed.records.push(record),
            Err(e) => {
                tracing::debug!("Skipping bulk record {:?}: {}", name, e);
                parsed.rejected += 1;
            }
        }
    }

    parsed
}

fn parse_bulk_record(
    name: &str,
    line1: &str,
    line2: &str,
) -> Result<ElementSetRecord, ElementLinesError> {
    let catalog_id = parse_catalog_id(line2)?;
    let lines = ElementLines::new(line1, line2);
    validate_element_lines(&lines)?;

    Ok(ElementSetRecord::new(catalog_id, name, lines, SourceTag::Bulk))
}

#[derive(Debug, Deserialize)]
struct FeaturedInfo {
    #[serde(default)]
    satid: Option<CatalogId>,
}

#[derive(Debug, Deserialize)]
struct FeaturedPayload {
    tle: String,
    #[serde(default)]
    info: Option<FeaturedInfo>,
}

/// Extract element lines from a featured-provider JSON body.
pub fn parse_featured_payload(
    body: &str,
    expected_id: CatalogId,
) -> Result<ElementLines, FetchError> {
    let payload: FeaturedPayload = serde_json::from_str(body)
        .map_err(|e| FetchError::malformed(format!("invalid JSON: {}", e)))?;

    if let Some(satid) = payload.info.and_then(|i| i.satid) {
        if satid != expected_id {
            return Err(FetchError::malformed(format!(
                "requested {} but provider returned {}",
                expected_id, satid
            )));
        }
    }

    let mut tle_lines = payload.tle.split('\n').map(str::trim).filter(|l| !l.is_empty());
    let (Some(line1), Some(line2)) = (tle_lines.next(), tle_lines.next()) else {
        return Err(FetchError::malformed("tle field does not hold two lines"));
    };

    let lines = ElementLines::new(line1, line2);
    validate_element_lines(&lines).map_err(|e| FetchError::malformed(e.to_string()))?;

    let id = parse_catalog_id(&lines.line2).map_err(|e| FetchError::malformed(e.to_string()))?;
    if id != expected_id {
        return Err(FetchError::malformed(format!(
            "element lines are for {} not {}",
            id, expected_id
        )));
    }

    Ok(lines)
}
