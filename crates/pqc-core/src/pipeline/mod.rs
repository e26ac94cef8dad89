//! Consolidation pipeline stages.
//!
//! Each stage is a small struct borrowing the store; the orchestrator owns
//! the order in which they run.

pub mod fetcher;
pub mod finalizer;
pub mod lister;
pub mod naming;
pub mod planner;
pub mod uploader;

pub use fetcher::{Fetcher, Scratch, StagedFile};
pub use finalizer::{delete_files, Finalization, Finalizer, PartialDeletionWarning};
pub use lister::{FileLister, Listing};
pub use naming::{is_consolidated_output, OutputNamer};
pub use planner::{plan, ConsolidationPlan, PlanAction, SkipReason};
pub use uploader::{UploadFailure, UploadedFile, Uploader};
