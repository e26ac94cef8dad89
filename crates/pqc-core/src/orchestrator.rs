//! Drives partitions through the consolidation pipeline.
//!
//! Lister → Planner → (stop on dry-run or skip) → Fetcher → Merger →
//! Verifier → Uploader → Finalizer. Partitions run strictly one after
//! another, and a failure in one is recorded without stopping the rest.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use pqc_columnar::{Merger, OutputVerifier, ReadBackVerifier};
use pqc_common::{PartitionKey, RunId};
use pqc_config::ConsolidatorConfig;
use tracing::{debug, error, info, warn};

use crate::error::ConsolidationError;
use crate::pipeline::{
    delete_files, plan, ConsolidationPlan, Fetcher, FileLister, Finalization, Finalizer, Listing,
    OutputNamer, Scratch, UploadedFile, Uploader,
};
use crate::report::{ConsolidationResult, DryRunAnalysis, PartitionStatus, RunReport};
use crate::store::RemoteStore;

/// Result of the live part of a partition run.
struct Replacement {
    rows: usize,
    uploaded: Vec<UploadedFile>,
    finalization: Finalization,
}

/// Consolidation engine bound to one store and one configuration.
pub struct Consolidator<'a> {
    store: &'a dyn RemoteStore,
    config: ConsolidatorConfig,
    verifier: &'a dyn OutputVerifier,
}

impl<'a> Consolidator<'a> {
    pub fn new(store: &'a dyn RemoteStore, config: ConsolidatorConfig) -> Self {
        Self {
            store,
            config,
            verifier: &ReadBackVerifier,
        }
    }

    /// Replace the read-back check run on outputs before upload.
    pub fn with_verifier(mut self, verifier: &'a dyn OutputVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn config(&self) -> &ConsolidatorConfig {
        &self.config
    }

    /// Run every partition in order and collect a report.
    pub fn run(&self, partitions: &[PartitionKey], dry_run: bool) -> RunReport {
        let run_id = RunId::new();
        let started_at = Utc::now();
        info!(
            run_id = %run_id,
            partitions = partitions.len(),
            dry_run,
            store = %self.store.describe(),
            "starting consolidation run"
        );

        let results: Vec<ConsolidationResult> = partitions
            .iter()
            .map(|p| self.run_partition(p, dry_run))
            .collect();

        let report = RunReport::new(run_id, dry_run, self.store.describe(), started_at, results);
        info!(
            run_id = %report.run_id,
            consolidated = report.summary.consolidated,
            skipped = report.summary.skipped,
            planned = report.summary.planned,
            failed = report.summary.failed,
            "consolidation run finished"
        );
        report
    }

    /// Process one partition. Never fails: problems are folded into the result.
    pub fn run_partition(&self, partition: &PartitionKey, dry_run: bool) -> ConsolidationResult {
        let started = Instant::now();
        let mut result = self.process(partition, dry_run);
        result.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result.status {
            PartitionStatus::Failed => error!(
                partition = %partition,
                kind = ?result.error_kind,
                reason = result.reason.as_deref().unwrap_or(""),
                "partition failed"
            ),
            status => info!(
                partition = %partition,
                status = status.as_str(),
                files_before = result.files_before,
                files_after = result.files_after,
                bytes_freed = result.bytes_freed,
                "partition done"
            ),
        }
        result
    }

    fn process(&self, partition: &PartitionKey, dry_run: bool) -> ConsolidationResult {
        let lister = FileLister::new(self.store, &self.config);
        let listing = match lister.list(partition) {
            Ok(listing) => listing,
            Err(source) => {
                let err = ConsolidationError::Listing {
                    dir: self.config.partition_dir(partition),
                    source,
                };
                return failed(partition, &err);
            }
        };

        let files_before = listing.file_set.len();
        let bytes_before = listing.file_set.total_size();
        let plan = plan(&listing.file_set, listing.partition_found, &self.config.planner);
        debug!(partition = %partition, action = ?plan.action, outputs = plan.output_file_count, "planned");

        if dry_run {
            return self.dry_run_result(partition, &listing, &plan);
        }

        let mut result = ConsolidationResult::new(partition.clone(), PartitionStatus::Skipped)
            .unchanged(files_before, bytes_before);
        result.excluded_files = listing.excluded_in_flight.len();
        result.planned_output_files = Some(plan.output_file_count);

        if self.config.planner.purge_undersized && !listing.excluded_in_flight.is_empty() {
            let purge = delete_files(
                self.store,
                listing
                    .excluded_in_flight
                    .iter()
                    .map(|f| (f.path.as_str(), f.size_bytes)),
            );
            info!(partition = %partition, purged = purge.deleted.len(), "purged undersized files");
            result.purged_files = purge.deleted;
            result.warnings.extend(purge.warnings);
        }

        if let Some(reason) = &plan.skip_reason {
            result.reason = Some(reason.to_string());
            result.error_kind = reason.kind();
            return result;
        }

        match self.replace(&listing, &plan) {
            Ok(replacement) => {
                let outputs = replacement.uploaded.len();
                let deleted = replacement.finalization.deleted.len();
                let uploaded_bytes: u64 = replacement.uploaded.iter().map(|f| f.byte_size).sum();

                result.status = PartitionStatus::Consolidated;
                result.rows = Some(replacement.rows);
                result.files_after = files_before - deleted + outputs;
                result.bytes_after =
                    bytes_before - replacement.finalization.deleted_bytes + uploaded_bytes;
                result.bytes_freed = result.bytes_before as i64 - result.bytes_after as i64;
                result.output_files = replacement.uploaded.into_iter().map(|f| f.path).collect();
                if !replacement.finalization.warnings.is_empty() {
                    warn!(
                        partition = %partition,
                        remaining = replacement.finalization.warnings.len(),
                        "some originals were not deleted; the next run will pick them up"
                    );
                }
                result.warnings.extend(replacement.finalization.warnings);
                result
            }
            Err(err) => {
                let mut outcome = failed(partition, &err).unchanged(files_before, bytes_before);
                outcome.files_after += err.orphaned_outputs().len();
                outcome.excluded_files = result.excluded_files;
                outcome.purged_files = result.purged_files;
                outcome.planned_output_files = result.planned_output_files;
                outcome.warnings = result.warnings;
                outcome.warnings.extend(err.orphaned_outputs().iter().cloned());
                outcome
            }
        }
    }

    fn dry_run_result(
        &self,
        partition: &PartitionKey,
        listing: &Listing,
        plan: &ConsolidationPlan,
    ) -> ConsolidationResult {
        let status = if plan.is_consolidate() {
            PartitionStatus::Planned
        } else {
            PartitionStatus::Skipped
        };
        let mut result = ConsolidationResult::new(partition.clone(), status)
            .unchanged(listing.file_set.len(), listing.file_set.total_size());
        result.planned_output_files = Some(plan.output_file_count);
        result.excluded_files = listing.excluded_in_flight.len();
        if let Some(reason) = &plan.skip_reason {
            result.reason = Some(reason.to_string());
            result.error_kind = reason.kind();
        }

        let names: Vec<&str> = listing.file_set.iter().map(|f| f.file_name()).collect();
        let would_purge = if self.config.planner.purge_undersized {
            listing.excluded_in_flight.iter().map(|f| f.path.clone()).collect()
        } else {
            Vec::new()
        };
        result.analysis = Some(DryRunAnalysis::new(
            &names,
            listing.file_set.total_size(),
            if plan.is_consolidate() { plan.output_file_count } else { listing.file_set.len() },
            would_purge,
        ));
        result
    }

    /// The live pipeline. Scratch space is removed on every path out.
    fn replace(
        &self,
        listing: &Listing,
        plan: &ConsolidationPlan,
    ) -> Result<Replacement, ConsolidationError> {
        let partition = &listing.file_set.partition;
        let scratch = Scratch::create(&self.config.scratch.resolve_root(), partition)?;
        let scratch_path = scratch.path().to_path_buf();

        let outcome = self.replace_in(&scratch, listing, plan);

        if let Err(e) = scratch.close() {
            warn!(path = %scratch_path.display(), error = %e, "failed to remove scratch directory");
        }
        outcome
    }

    fn replace_in(
        &self,
        scratch: &Scratch,
        listing: &Listing,
        plan: &ConsolidationPlan,
    ) -> Result<Replacement, ConsolidationError> {
        let files = &listing.file_set;
        let dir = self.config.partition_dir(&files.partition);

        let staged = Fetcher::new(self.store)
            .fetch(files, scratch.inputs())
            .map_err(ConsolidationError::Fetch)?;
        let paths: Vec<PathBuf> = staged.into_iter().map(|s| s.local_path).collect();

        let merged = Merger.merge(&paths)?;
        let namer = OutputNamer::new(&self.config.layout, &files.partition, Utc::now())
            .avoiding(files, plan.output_file_count);
        let outputs = merged.write_chunks(
            plan.output_file_count,
            scratch.outputs(),
            &self.config.profile,
            |idx| namer.name(idx),
        )?;
        let verified = self
            .verifier
            .verify(&outputs, &merged.schema(), merged.total_row_count())?;
        debug!(partition = %files.partition, files = verified.files_checked, rows = verified.total_rows, "outputs verified");

        let uploaded = Uploader::new(self.store)
            .upload(&outputs, &dir)
            .map_err(|f| ConsolidationError::Upload {
                source: f.error,
                uploaded: f.uploaded,
                rolled_back: f.rolled_back,
                rollback_failures: f.rollback_failures,
            })?;

        let finalization = Finalizer::new(self.store).finalize(files);
        Ok(Replacement {
            rows: merged.total_row_count(),
            uploaded,
            finalization,
        })
    }
}

fn failed(partition: &PartitionKey, err: &ConsolidationError) -> ConsolidationResult {
    let mut result = ConsolidationResult::new(partition.clone(), PartitionStatus::Failed);
    result.reason = Some(err.to_string());
    result.error_kind = Some(err.kind());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreOp};
    use pqc_common::ErrorKind;

    fn key(k: &str) -> PartitionKey {
        PartitionKey::new(k).unwrap()
    }

    #[test]
    fn missing_partition_is_skipped() {
        let store = MemoryStore::new();
        let engine = Consolidator::new(&store, ConsolidatorConfig::default());
        let result = engine.run_partition(&key("2025-08-15"), false);
        assert_eq!(result.status, PartitionStatus::Skipped);
        assert_eq!(result.error_kind, Some(ErrorKind::NotFound));
        assert!(store.mutations().is_empty());
    }

    #[test]
    fn unreadable_inputs_fail_without_mutation() {
        let store = MemoryStore::new();
        let mut config = ConsolidatorConfig::default();
        let scratch = tempfile::tempdir().unwrap();
        config.scratch.root = Some(scratch.path().to_path_buf());
        let dir = config.partition_dir(&key("2025-08-15"));
        for i in 0..6 {
            store.insert(&format!("{dir}/telemetry-{i}.parquet"), vec![7u8; 2048]);
        }

        let engine = Consolidator::new(&store, config);
        let result = engine.run_partition(&key("2025-08-15"), false);
        assert_eq!(result.status, PartitionStatus::Failed);
        assert_eq!(result.files_after, 6);
        assert!(store.mutations().is_empty());
        // Scratch directory is gone.
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn dry_run_reports_plan() {
        let store = MemoryStore::new();
        let config = ConsolidatorConfig::default();
        let dir = config.partition_dir(&key("2025-08-15"));
        for i in 0..8 {
            store.insert(&format!("{dir}/telemetry-{i}.parquet"), vec![0u8; 4096]);
        }
        let engine = Consolidator::new(&store, config);
        let report = engine.run(&[key("2025-08-15"), key("2025-08-14")], true);

        assert_eq!(report.results[0].status, PartitionStatus::Planned);
        let analysis = report.results[0].analysis.as_ref().unwrap();
        assert_eq!(analysis.planned_output_files, 1);
        assert_eq!(analysis.sample_files.len(), 5);
        assert_eq!(report.results[1].status, PartitionStatus::Skipped);
        assert!(store.calls().iter().all(|c| c.op == StoreOp::List));
    }
}
