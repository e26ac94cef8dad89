//! Parquet consolidator configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the consolidator configuration file
//! - The named serialization profile applied to every output file
//! - Config resolution (CLI → env → XDG → defaults)
//! - Semantic validation
//! - Human-friendly byte-size parsing

pub mod config;
pub mod profile;
pub mod resolve;
pub mod size;
pub mod validate;

pub use config::{ConsolidatorConfig, PartitionLayout, PlannerConfig, ScratchConfig, StoreConfig};
pub use profile::{CompressionCodec, SerializationProfile};
pub use resolve::{
    load_file, resolve_config, ConfigError, ConfigPaths, ConfigSource, ResolvedConfig, CONFIG_ENV_VAR,
};
pub use size::{format_bytes, parse_byte_size, SizeParseError};
pub use validate::{validate, ValidationError};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
