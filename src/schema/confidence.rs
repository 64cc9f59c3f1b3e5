//! Flexible confidence parsing.
//!
//! Agents express confidence three ways: a bare number (`0.8`), a percent
//! string (`"80%"`), or a qualitative word (`"high"`). All three
//! deserialize to an `f64`; anything else rejects the whole document.

use serde::de::{self, Deserializer};
use serde::Deserialize;

/// Parse a confidence expression into a raw f64. Range checking happens at
/// validation, not here.
pub fn parse_confidence(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    match s.to_ascii_lowercase().as_str() {
        "high" => return Some(0.8),
        "medium" | "med" => return Some(0.5),
        "low" => return Some(0.2),
        _ => {}
    }
    if let Some(pct) = s.strip_suffix('%') {
        return pct.trim().parse::<f64>().ok().map(|v| v / 100.0);
    }
    s.parse::<f64>().ok()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfidenceRepr {
    Number(f64),
    Text(String),
}

/// Serde adapter for `f64` confidence fields.
pub fn flexible<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match ConfidenceRepr::deserialize(deserializer)? {
        ConfidenceRepr::Number(n) => Ok(n),
        ConfidenceRepr::Text(s) => parse_confidence(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid confidence value: {:?}", s))),
    }
}
