//! Low-level value parsing for scraped strings: weights, prices, sizes, and
//! bare integers.

use std::sync::LazyLock;

use regex::Regex;

/// Kilograms to pounds.
pub const KG_TO_LBS: f64 = 2.20462;

static WEIGHT_KG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d\.\d\d)").expect("valid weight regex"));

/// Parses a SHARP weight string (kilograms, e.g. `"1.60kg"` or `"1,60 kg"`)
/// into pounds rounded to two decimals.
///
/// Returns `None` when no `d.dd` value is present.
#[must_use]
pub fn parse_weight_lbs(raw: &str) -> Option<f64> {
    let normalized = raw.replace(',', ".");
    let kg: f64 = WEIGHT_KG
        .captures(&normalized)?
        .get(1)?
        .as_str()
        .parse()
        .ok()?;
    Some(round_cents(kg * KG_TO_LBS))
}

/// Parses a price string into integer cents, truncating beyond two decimals.
///
/// A leading currency symbol or code is stripped and thousands separators are
/// ignored: `"£1,049.99"` → `104_999`, `"399.9"` → `39_990`.
#[must_use]
pub fn parse_price_cents(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start_matches(|c: char| !c.is_ascii_digit());
    let numeric: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .filter(|c| *c != ',')
        .collect();
    if numeric.is_empty() {
        return None;
    }

    let (whole, fraction) = numeric.split_once('.').unwrap_or((numeric.as_str(), ""));
    let whole: i64 = whole.parse().ok()?;
    let cents: String = fraction
        .chars()
        .filter(char::is_ascii_digit)
        .chain(std::iter::repeat('0'))
        .take(2)
        .collect();
    let cents: i64 = cents.parse().ok()?;
    whole.checked_mul(100)?.checked_add(cents)
}

/// Keeps only ASCII digits and parses them, e.g. `"87%"` → `87`.
#[must_use]
pub fn parse_digits(raw: &str) -> Option<i32> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Splits a size list such as `"XS, S, M / L"` into individual sizes.
#[must_use]
pub fn parse_sizes(raw: &str) -> Vec<String> {
    raw.split([',', '/', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
