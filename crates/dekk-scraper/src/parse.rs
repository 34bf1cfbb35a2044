//! Lenient parsing of supplier text fields.
//!
//! Supplier data is untrusted and frequently malformed. None of these helpers
//! fail: unparseable input becomes zero, or `None` for timestamps.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Tire dimension token such as `225/45R17`, `265/70 R 17` or `245/40ZR18`.
static TIRE_DIMENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{3}/\d{2}\s*Z?R\s*\d{2}").expect("valid regex"));

/// Returns `true` when `title` contains a tire dimension token.
#[must_use]
pub fn has_tire_dimension(title: &str) -> bool {
    TIRE_DIMENSION.is_match(title)
}

/// Parses a decimal, accepting `,` as the decimal separator.
#[must_use]
pub fn parse_decimal(raw: &str) -> Decimal {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    Decimal::from_str(&cleaned).unwrap_or(Decimal::ZERO)
}

/// Parses a non-negative quantity. Negative stock (back-orders) clamps to 0;
/// fractional values are truncated.
#[must_use]
pub fn parse_quantity(raw: &str) -> u32 {
    let value = parse_decimal(raw).trunc();
    if value.is_sign_negative() {
        return 0;
    }
    value.to_u32().unwrap_or(u32::MAX)
}

/// Parses an integer dimension such as a rim diameter (`"17"`, `"17.0"`, `"R17"`).
#[must_use]
pub fn parse_rim(raw: &str) -> u32 {
    let trimmed = raw.trim().trim_start_matches(['R', 'r']);
    parse_quantity(trimmed)
}

/// Parses a supplier timestamp. Accepts RFC 3339 and `YYYY-MM-DD HH:MM:SS`
/// (interpreted as UTC).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Normalizes a dimension field to its integer text form (`"225.0"` → `"225"`).
/// Non-numeric values pass through trimmed.
#[must_use]
pub fn normalize_dimension(raw: &str) -> String {
    let trimmed = raw.trim();
    match Decimal::from_str(trimmed) {
        Ok(d) if d.fract().is_zero() => d.trunc().normalize().to_string(),
        _ => trimmed.to_string(),
    }
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
