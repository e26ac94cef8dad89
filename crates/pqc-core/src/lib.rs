//! Parquet consolidator engine.
//!
//! This crate provides:
//! - The [`RemoteStore`](store::RemoteStore) capability with `object_store` and in-memory backends
//! - Pipeline stages: listing, planning, fetching, uploading, finalizing
//! - The [`Consolidator`] orchestrator and per-partition reports
//! - Logging setup, exit codes and the `pqc` command line

pub mod cli;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod report;
pub mod store;

pub use error::ConsolidationError;
pub use exit_codes::ExitCode;
pub use orchestrator::Consolidator;
pub use report::{ConsolidationResult, DryRunAnalysis, PartitionStatus, RunReport, RunSummary};
pub use store::{MemoryStore, ObjectStoreRemote, RemoteStore, StoreError, StoreOp};
