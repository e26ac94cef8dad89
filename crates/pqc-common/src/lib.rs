//! Parquet consolidator common types, identities, and errors.
//!
//! This crate provides foundational types shared across the consolidator crates:
//! - Partition and remote file identity types
//! - The error taxonomy used in per-partition reports
//! - Report schema versioning
//! - Report output formats

pub mod error;
pub mod id;
pub mod output;
pub mod schema;

pub use error::{Error, ErrorKind, Result};
pub use id::{FileDescriptor, FileSet, PartitionKey, RunId};
pub use output::OutputFormat;
pub use schema::SCHEMA_VERSION;
