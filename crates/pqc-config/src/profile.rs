//! The serialization profile applied to consolidated output files.
//!
//! The profile is a named configuration value rather than a writer detail:
//! compression, dictionary encoding and row-group size shape downstream query
//! latency, so two runs (or two implementations) configured with the same
//! profile must produce equivalently laid out files.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the built-in profile.
pub const DEFAULT_PROFILE_NAME: &str = "snappy-dict-50k";

/// Default number of rows per row group.
pub const DEFAULT_ROW_GROUP_SIZE: usize = 50_000;

/// Compression codec for output column chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "codec", rename_all = "snake_case")]
pub enum CompressionCodec {
    Uncompressed,
    Snappy,
    Zstd { level: i32 },
}

impl fmt::Display for CompressionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionCodec::Uncompressed => write!(f, "uncompressed"),
            CompressionCodec::Snappy => write!(f, "snappy"),
            CompressionCodec::Zstd { level } => write!(f, "zstd({})", level),
        }
    }
}

/// Named, fixed writer settings for output files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializationProfile {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_compression")]
    pub compression: CompressionCodec,

    #[serde(default = "default_true")]
    pub dictionary_enabled: bool,

    #[serde(default = "default_row_group_size")]
    pub row_group_size: usize,

    /// Whether column statistics are written (page level when enabled).
    #[serde(default = "default_true")]
    pub statistics_enabled: bool,
}

fn default_name() -> String {
    DEFAULT_PROFILE_NAME.to_string()
}

fn default_compression() -> CompressionCodec {
    CompressionCodec::Snappy
}

fn default_true() -> bool {
    true
}

fn default_row_group_size() -> usize {
    DEFAULT_ROW_GROUP_SIZE
}

impl Default for SerializationProfile {
    fn default() -> Self {
        Self {
            name: default_name(),
            compression: default_compression(),
            dictionary_enabled: true,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            statistics_enabled: true,
        }
    }
}

impl fmt::Display for SerializationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, dictionary={}, row_group_size={})",
            self.name, self.compression, self.dictionary_enabled, self.row_group_size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_matches_production_writer() {
        let profile = SerializationProfile::default();
        assert_eq!(profile.name, "snappy-dict-50k");
        assert_eq!(profile.compression, CompressionCodec::Snappy);
        assert!(profile.dictionary_enabled);
        assert_eq!(profile.row_group_size, 50_000);
    }

    #[test]
    fn codec_is_internally_tagged() {
        let json = serde_json::to_string(&CompressionCodec::Zstd { level: 3 }).unwrap();
        assert_eq!(json, r#"{"codec":"zstd","level":3}"#);
        let back: CompressionCodec = serde_json::from_str(r#"{"codec":"snappy"}"#).unwrap();
        assert_eq!(back, CompressionCodec::Snappy);
    }

    #[test]
    fn profile_from_toml() {
        let profile: SerializationProfile = toml::from_str(
            r#"
            name = "zstd-archive"
            row_group_size = 100000
            [compression]
            codec = "zstd"
            level = 9
            "#,
        )
        .unwrap();
        assert_eq!(profile.compression, CompressionCodec::Zstd { level: 9 });
        assert!(profile.dictionary_enabled);
        assert_eq!(profile.to_string(), "zstd-archive (zstd(9), dictionary=true, row_group_size=100000)");
    }
}
