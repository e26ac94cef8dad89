//! Byte-size parsing and formatting.
//!
//! Accepts `4096`, `64k`, `128MB`, `128MiB`, `1.5GB`. Decimal and binary
//! suffixes are both interpreted as powers of 1024, matching how file sizes
//! have always been reported for this dataset.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SizeParseError {
    #[error("size is empty")]
    Empty,

    #[error("invalid size number '{0}'")]
    InvalidNumber(String),

    #[error("unknown size unit '{0}' (expected B, K, M, G or T)")]
    UnknownUnit(String),

    #[error("size '{0}' does not fit in 64 bits")]
    Overflow(String),
}

/// Parse a human-friendly byte size.
pub fn parse_byte_size(input: &str) -> Result<u64, SizeParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SizeParseError::Empty);
    }

    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    if number.is_empty() {
        return Err(SizeParseError::InvalidNumber(trimmed.to_string()));
    }

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1 << 10,
        "m" | "mb" | "mib" => 1 << 20,
        "g" | "gb" | "gib" => 1 << 30,
        "t" | "tb" | "tib" => 1 << 40,
        other => return Err(SizeParseError::UnknownUnit(other.to_string())),
    };

    if let Ok(whole) = number.parse::<u64>() {
        return whole
            .checked_mul(multiplier)
            .ok_or_else(|| SizeParseError::Overflow(trimmed.to_string()));
    }

    let fractional: f64 = number
        .parse()
        .map_err(|_| SizeParseError::InvalidNumber(number.to_string()))?;
    let bytes = (fractional * multiplier as f64).round();
    if !bytes.is_finite() || bytes >= u64::MAX as f64 {
        return Err(SizeParseError::Overflow(trimmed.to_string()));
    }
    Ok(bytes as u64)
}

/// Render a byte count with a binary unit, e.g. `1.64 MiB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Serde helper accepting either an integer or a size string.
pub(crate) fn deserialize_byte_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bytes(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Bytes(bytes) => Ok(bytes),
        Raw::Text(text) => parse_byte_size(&text).map_err(serde::de::Error::custom),
    }
}
