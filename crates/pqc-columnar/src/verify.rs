//! Read-back verification of written output files.
//!
//! This is the last gate before anything leaves the machine: every output is
//! re-opened and fully decoded, and the decoded rows must add up to the merged
//! table's row count.

use arrow::datatypes::Schema;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::{ColumnarError, Result};
use crate::merge::{describe_schema_difference, read_all, OutputFile};

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub files_checked: usize,
    pub total_rows: usize,
}

/// Check run on written outputs before any of them is uploaded.
pub trait OutputVerifier {
    fn verify(
        &self,
        outputs: &[OutputFile],
        expected_schema: &Schema,
        expected_total: usize,
    ) -> Result<VerificationReport>;
}

/// [`OutputVerifier`] that re-reads each output with [`verify_outputs`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadBackVerifier;

impl OutputVerifier for ReadBackVerifier {
    fn verify(
        &self,
        outputs: &[OutputFile],
        expected_schema: &Schema,
        expected_total: usize,
    ) -> Result<VerificationReport> {
        verify_outputs(outputs, expected_schema, expected_total)
    }
}

/// Re-count the rows of every output and compare with `expected_total`.
///
/// Each output must also carry `expected_schema` and the row count recorded
/// when it was written.
pub fn verify_outputs(
    outputs: &[OutputFile],
    expected_schema: &Schema,
    expected_total: usize,
) -> Result<VerificationReport> {
    let mut total_rows = 0usize;
    for output in outputs {
        let (schema, _, rows) = read_all(&output.local_path)?;

        if let Some(detail) = describe_schema_difference(expected_schema, &schema) {
            return Err(ColumnarError::SchemaMismatch {
                reference: "merged table".into(),
                path: output.local_path.clone(),
                detail,
            });
        }
        if rows != output.row_count {
            error!(file = %output.file_name, expected = output.row_count, actual = rows, "output row count mismatch");
            return Err(ColumnarError::Integrity {
                expected: output.row_count,
                actual: rows,
                detail: format!("re-read of {}", output.file_name),
            });
        }
        total_rows += rows;
    }

    if total_rows != expected_total {
        error!(expected = expected_total, actual = total_rows, "row count not conserved");
        return Err(ColumnarError::Integrity {
            expected: expected_total,
            actual: total_rows,
            detail: format!("sum over {} output files", outputs.len()),
        });
    }

    debug!(files = outputs.len(), rows = total_rows, "outputs verified");
    Ok(VerificationReport {
        files_checked: outputs.len(),
        total_rows,
    })
}
