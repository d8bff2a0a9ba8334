//! County FIPS code helpers
//!
//! Sources disagree on how they store FIPS codes: text with or without
//! leading zeros, integers, or floats written by spreadsheet tools. Every
//! code is normalized to a 5-character zero-padded string on the way in.

use std::fmt;

use serde::Deserializer;
use serde::de::{self, Visitor};

use crate::error::{Result, StudyError};

/// Normalize a county FIPS code to 5 zero-padded digits
///
/// Accepts `"1001"`, `"01001"`, `" 1001 "` and `"1001.0"`.
pub fn normalize_fips(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_suffix(".0")
        .unwrap_or(trimmed);

    if digits.is_empty() || digits.len() > 5 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StudyError::validation(format!("invalid county FIPS code '{raw}'")));
    }

    Ok(format!("{digits:0>5}"))
}

/// Build a county FIPS code from separate state and county codes
pub fn compose_fips(state: u32, county: u32) -> Result<String> {
    if state > 99 || county > 999 {
        return Err(StudyError::validation(format!(
            "state {state} / county {county} do not form a FIPS code"
        )));
    }
    Ok(format!("{state:02}{county:03}"))
}

/// Two-digit state part of a county FIPS code
#[must_use]
pub fn state_part(fips: &str) -> &str {
    fips.get(..2).unwrap_or(fips)
}

/// Serde adapter that accepts text or numeric FIPS codes
pub fn deserialize_fips<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(FipsVisitor)
}

struct FipsVisitor;

impl Visitor<'_> for FipsVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a county FIPS code as text or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<String, E> {
        normalize_fips(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<String, E> {
        normalize_fips(&v.to_string()).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<String, E> {
        normalize_fips(&v.to_string()).map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<String, E> {
        if v.fract() != 0.0 || v < 0.0 {
            return Err(E::custom(format!("invalid county FIPS code {v}")));
        }
        normalize_fips(&format!("{v:.0}")).map_err(E::custom)
    }
}
