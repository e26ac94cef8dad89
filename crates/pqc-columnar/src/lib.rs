//! Parquet consolidator columnar engine.
//!
//! This crate provides:
//! - Schema inspection and comparison of staged Parquet files
//! - Ordered concatenation into a [`MergedTable`]
//! - Row-count-balanced splitting and profile-driven Parquet writing
//! - Read-back verification of row-count conservation

pub mod error;
pub mod merge;
pub mod verify;
pub mod writer;

pub use error::{ColumnarError, Result};
pub use merge::{chunk_ranges, describe_schema_difference, MergedTable, Merger, OutputFile, SourceTable};
pub use verify::{verify_outputs, OutputVerifier, ReadBackVerifier, VerificationReport};
pub use writer::{writer_properties, write_parquet, PROFILE_METADATA_KEY};

/// Rows decoded per batch when reading staged files.
pub const DEFAULT_READ_BATCH_SIZE: usize = 8192;
