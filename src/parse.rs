//! Free-text field extractors. A value that does not match its pattern comes
//! back as `None`; that is the normal outcome for messy scraped text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::distance::GeoPoint;

static BEDROOM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d+]+").unwrap());
static FLOAT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d.]+").unwrap());
static GROUPED_INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d,]+").unwrap());
static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());
static LATLON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"=([\d,.]+)").unwrap());

/// Bedroom count from text such as `"3 beds"`, `"4+"` or `"3+1"`.
///
/// The first run of digits and `+` signs that holds a digit is taken. A
/// trailing `+` is replaced with `0` and the result is read as a numeral, so
/// `"4+"` gives 40, not "at least 4". Any `+` left inside the token is evaluated as addition, so
/// `"3+1"` gives 4. The scraped data's intent for `N+` is unknown; this rule
/// keeps the historical output stable.
pub fn parse_bedroom_count(text: &str) -> Option<i64> {
    let token = BEDROOM_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|t| t.bytes().any(|b| b.is_ascii_digit()))?;
    if !token.contains('+') {
        return token.parse().ok();
    }

    let mut expr = token.to_owned();
    if expr.ends_with('+') {
        expr.pop();
        expr.push('0');
    }

    let mut total: i64 = 0;
    for term in expr.split('+') {
        if term.is_empty() {
            // unary plus, e.g. "+3" or "3++1"
            continue;
        }
        total = total.checked_add(term.parse::<i64>().ok()?)?;
    }
    Some(total)
}

/// `area` when present, otherwise the land size.
pub fn fill_area<T>(area: Option<T>, fallback_land_size: Option<T>) -> Option<T> {
    area.or(fallback_land_size)
}

/// Keeps a supplied per-area price, otherwise derives it from price and area.
pub fn compute_price_per_area(existing: Option<f64>, price: Option<f64>, area: Option<f64>) -> Option<f64> {
    if existing.is_some() {
        return existing;
    }
    match (price, area) {
        (Some(price), Some(area)) if area != 0.0 => Some(price / area),
        _ => None,
    }
}

/// Leading decimal token, e.g. `"0.4 km"` -> 0.4. Used for distances and psf.
pub fn parse_float(text: &str) -> Option<f64> {
    FLOAT_RE.find(text)?.as_str().parse().ok()
}

/// Leading digit run with thousands separators stripped, e.g. `"S$ 1,250,000"`.
pub fn parse_grouped_number(text: &str) -> Option<f64> {
    let token = GROUPED_INT_RE.find(text)?.as_str().replace(',', "");
    if token.is_empty() {
        return None;
    }
    token.parse().ok()
}

pub fn parse_price(text: &str) -> Option<f64> {
    parse_grouped_number(text)
}

pub fn parse_area(text: &str) -> Option<f64> {
    parse_grouped_number(text)
}

/// Lease length in years. The `freehold` token maps to `freehold_years`.
pub fn parse_tenure(text: &str, freehold_years: f64) -> Option<f64> {
    let replaced = text.replace("freehold", &format!("{}", freehold_years as i64));
    INT_RE.find(&replaced)?.as_str().parse().ok()
}

/// Coordinate pair embedded after an `=`, as in a map link `...?q=1.30,103.85`.
pub fn parse_latlon(text: &str) -> Option<GeoPoint> {
    let pair = LATLON_RE.captures(text)?.get(1)?.as_str();
    let mut parts = pair.split(',');
    let lat = parts.next()?.parse().ok()?;
    let lon = parts.next()?.parse().ok()?;
    Some(GeoPoint { lat, lon })
}

/// Removes every occurrence of a literal label such as `"type: "`.
pub fn strip_label(text: &str, label: &str) -> String {
    if label.is_empty() {
        return text.to_owned();
    }
    text.replace(label, "")
}
