//! Per-partition results and the run report.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use pqc_common::{ErrorKind, PartitionKey, RunId, SCHEMA_VERSION};
use pqc_config::format_bytes;
use serde::Serialize;

use crate::exit_codes::ExitCode;
use crate::pipeline::PartialDeletionWarning;

/// Number of file names sampled into a dry-run analysis.
pub const ANALYSIS_SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionStatus {
    Skipped,
    /// Dry-run partition that a live run would consolidate.
    Planned,
    Consolidated,
    Failed,
}

impl PartitionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PartitionStatus::Skipped => "skipped",
            PartitionStatus::Planned => "planned",
            PartitionStatus::Consolidated => "consolidated",
            PartitionStatus::Failed => "failed",
        }
    }
}

/// Read-only view of a partition produced by dry-run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DryRunAnalysis {
    pub file_count: usize,
    pub total_bytes: u64,
    pub average_file_bytes: u64,
    pub planned_output_files: usize,
    /// Projected drop in file count, in percent.
    pub reduction_percent: f64,
    pub sample_files: Vec<String>,
    /// Files a live run with `purge_undersized` would delete.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub would_purge: Vec<String>,
}

impl DryRunAnalysis {
    pub fn new(
        names: &[&str],
        total_bytes: u64,
        planned_output_files: usize,
        would_purge: Vec<String>,
    ) -> Self {
        let file_count = names.len();
        let (average_file_bytes, reduction_percent) = if file_count == 0 {
            (0, 0.0)
        } else {
            let reduced = file_count.saturating_sub(planned_output_files);
            (
                total_bytes / file_count as u64,
                reduced as f64 * 100.0 / file_count as f64,
            )
        };
        Self {
            file_count,
            total_bytes,
            average_file_bytes,
            planned_output_files,
            reduction_percent,
            sample_files: names
                .iter()
                .take(ANALYSIS_SAMPLE_SIZE)
                .map(|n| n.to_string())
                .collect(),
            would_purge,
        }
    }
}

/// Outcome of one partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidationResult {
    pub partition: PartitionKey,
    pub status: PartitionStatus,
    pub files_before: usize,
    pub files_after: usize,
    pub bytes_before: u64,
    pub bytes_after: u64,
    /// Negative when outputs are larger than the inputs they replaced.
    pub bytes_freed: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    pub output_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_output_files: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub warnings: Vec<PartialDeletionWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<DryRunAnalysis>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub purged_files: Vec<String>,
    pub excluded_files: usize,
    pub elapsed_ms: u64,
}

impl ConsolidationResult {
    /// A result for `partition` with nothing changed yet.
    pub fn new(partition: PartitionKey, status: PartitionStatus) -> Self {
        Self {
            partition,
            status,
            files_before: 0,
            files_after: 0,
            bytes_before: 0,
            bytes_after: 0,
            bytes_freed: 0,
            rows: None,
            output_files: Vec::new(),
            planned_output_files: None,
            reason: None,
            error_kind: None,
            warnings: Vec::new(),
            analysis: None,
            purged_files: Vec::new(),
            excluded_files: 0,
            elapsed_ms: 0,
        }
    }

    /// Set before/after counters for an untouched file set.
    pub fn unchanged(mut self, files: usize, bytes: u64) -> Self {
        self.files_before = files;
        self.files_after = files;
        self.bytes_before = bytes;
        self.bytes_after = bytes;
        self.bytes_freed = 0;
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == PartitionStatus::Failed
    }
}

/// Totals across a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub attempted: usize,
    pub consolidated: usize,
    pub skipped: usize,
    pub planned: usize,
    pub failed: usize,
    pub files_removed: usize,
    pub bytes_freed: i64,
    pub warnings: usize,
}

impl RunSummary {
    pub fn from_results(results: &[ConsolidationResult]) -> Self {
        let mut summary = RunSummary {
            attempted: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.status {
                PartitionStatus::Skipped => summary.skipped += 1,
                PartitionStatus::Planned => summary.planned += 1,
                PartitionStatus::Consolidated => summary.consolidated += 1,
                PartitionStatus::Failed => summary.failed += 1,
            }
            summary.files_removed += result.files_before.saturating_sub(result.files_after);
            summary.bytes_freed += result.bytes_freed;
            summary.warnings += result.warnings.len();
        }
        summary
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub schema_version: String,
    pub run_id: RunId,
    pub dry_run: bool,
    pub store: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<ConsolidationResult>,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn new(
        run_id: RunId,
        dry_run: bool,
        store: String,
        started_at: DateTime<Utc>,
        results: Vec<ConsolidationResult>,
    ) -> Self {
        let summary = RunSummary::from_results(&results);
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            run_id,
            dry_run,
            store,
            started_at,
            finished_at: Utc::now(),
            results,
            summary,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        let s = &self.summary;
        if s.failed == 0 {
            ExitCode::Success
        } else if s.failed == s.attempted {
            ExitCode::AllFailed
        } else {
            ExitCode::PartialFail
        }
    }

    /// Itemised human-readable table.
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        let mode = if self.dry_run { "dry run" } else { "live" };
        let _ = writeln!(out, "Consolidation {} ({}) on {}", self.run_id, mode, self.store);
        let _ = writeln!(
            out,
            "{:<14} {:<13} {:>7} {:>7} {:>12}  DETAIL",
            "PARTITION", "STATUS", "BEFORE", "AFTER", "FREED"
        );
        for r in &self.results {
            let detail = match (&r.status, &r.reason, &r.analysis) {
                (_, _, Some(a)) => format!(
                    "{} -> {} file(s), avg {}, -{:.1}%",
                    a.file_count,
                    a.planned_output_files,
                    format_bytes(a.average_file_bytes),
                    a.reduction_percent
                ),
                (PartitionStatus::Failed, Some(reason), _) => match r.error_kind {
                    Some(kind) => format!("[{}] {}", kind, reason),
                    None => reason.clone(),
                },
                (_, Some(reason), _) => reason.clone(),
                (_, None, None) => match r.rows {
                    Some(rows) => format!("{} rows into {} file(s)", rows, r.output_files.len()),
                    None => String::new(),
                },
            };
            let _ = writeln!(
                out,
                "{:<14} {:<13} {:>7} {:>7} {:>12}  {}",
                r.partition.as_str(),
                r.status.as_str(),
                r.files_before,
                r.files_after,
                signed_bytes(r.bytes_freed),
                detail
            );
            for w in &r.warnings {
                let _ = writeln!(out, "  warning: could not delete {}: {}", w.path, w.reason);
            }
        }
        let s = &self.summary;
        let _ = writeln!(
            out,
            "{} partition(s): {} consolidated, {} skipped, {} planned, {} failed; {} file(s) removed, {} freed",
            s.attempted,
            s.consolidated,
            s.skipped,
            s.planned,
            s.failed,
            s.files_removed,
            signed_bytes(s.bytes_freed)
        );
        out
    }
}

fn signed_bytes(bytes: i64) -> String {
    if bytes < 0 {
        format!("-{}", format_bytes(bytes.unsigned_abs()))
    } else {
        format_bytes(bytes.unsigned_abs())
    }
}
