//! Consolidation planning.
//!
//! The plan is computed once from the listed sizes and never revised: output
//! chunks are balanced by row count, so actual output sizes may drift from
//! the target.
//!
//! Only *pending* files count towards `min_files`: files smaller than the
//! target that no earlier run produced. Outputs of a previous run compress
//! well below the target, so counting them would merge them again on every
//! re-run.

use std::fmt;

use pqc_common::{ErrorKind, FileDescriptor, FileSet};
use pqc_config::PlannerConfig;
use serde::Serialize;

use super::naming::is_consolidated_output;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    Skip,
    Consolidate,
}

/// Why a partition is left alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    NotFound,
    BelowThreshold { found: usize, min: usize },
    EmptyData,
    /// Too few files still need merging; the rest are earlier outputs or
    /// already at the target size.
    Settled { pending: usize, min: usize },
    /// Consolidating would not reduce the file count.
    AlreadyCompact { files: usize, planned: usize },
}

impl SkipReason {
    /// Report classification, for reasons that have one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SkipReason::NotFound => Some(ErrorKind::NotFound),
            SkipReason::BelowThreshold { .. } => Some(ErrorKind::BelowThreshold),
            SkipReason::EmptyData
            | SkipReason::Settled { .. }
            | SkipReason::AlreadyCompact { .. } => None,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotFound => write!(f, "partition not found"),
            SkipReason::BelowThreshold { found, min } => {
                write!(f, "{} file(s), minimum is {}", found, min)
            }
            SkipReason::EmptyData => write!(f, "no data to consolidate"),
            SkipReason::Settled { pending, min } => write!(
                f,
                "already consolidated: {} pending file(s), minimum is {}",
                pending, min
            ),
            SkipReason::AlreadyCompact { files, planned } => write!(
                f,
                "already compact: {} file(s) would become {}",
                files, planned
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidationPlan {
    pub action: PlanAction,
    pub input_files: usize,
    /// Input files that still need merging.
    pub pending_files: usize,
    pub total_size_bytes: u64,
    /// `max(1, ceil(total / target))`, or 0 when there is no data.
    pub output_file_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
}

impl ConsolidationPlan {
    pub fn is_consolidate(&self) -> bool {
        self.action == PlanAction::Consolidate
    }
}

/// Decide what to do with `files`.
///
/// `partition_found` distinguishes a missing partition from an empty one.
pub fn plan(files: &FileSet, partition_found: bool, config: &PlannerConfig) -> ConsolidationPlan {
    let input_files = files.len();
    let pending_files = files
        .iter()
        .filter(|f| is_pending(files, f, config.target_output_size_bytes))
        .count();
    let total_size_bytes = files.total_size();
    let output_file_count = output_count(total_size_bytes, config.target_output_size_bytes);

    let skip_reason = if !partition_found {
        Some(SkipReason::NotFound)
    } else if input_files < config.min_files {
        Some(SkipReason::BelowThreshold {
            found: input_files,
            min: config.min_files,
        })
    } else if total_size_bytes == 0 {
        Some(SkipReason::EmptyData)
    } else if pending_files < config.min_files {
        Some(SkipReason::Settled {
            pending: pending_files,
            min: config.min_files,
        })
    } else if output_file_count >= input_files {
        Some(SkipReason::AlreadyCompact {
            files: input_files,
            planned: output_file_count,
        })
    } else {
        None
    };

    ConsolidationPlan {
        action: if skip_reason.is_some() {
            PlanAction::Skip
        } else {
            PlanAction::Consolidate
        },
        input_files,
        pending_files,
        total_size_bytes,
        output_file_count,
        skip_reason,
    }
}

fn is_pending(files: &FileSet, file: &FileDescriptor, target: u64) -> bool {
    file.size_bytes < target && !is_consolidated_output(&files.partition, file.file_name())
}

fn output_count(total: u64, target: u64) -> usize {
    if total == 0 {
        return 0;
    }
    let count = total.div_ceil(target.max(1)).max(1);
    usize::try_from(count).unwrap_or(usize::MAX)
}
