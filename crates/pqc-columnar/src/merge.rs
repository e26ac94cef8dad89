//! Ordered merge of staged Parquet files and row-balanced splitting.
//!
//! Merging runs in two passes. The first reads only footers and rejects any
//! input whose schema diverges from the first file, so a mismatch is detected
//! before a single row has been decoded or written. The second decodes every
//! file in input order into one [`MergedTable`].

use std::fs::File;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::datatypes::{Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use pqc_config::SerializationProfile;
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{ColumnarError, Result};
use crate::writer::{write_parquet, writer_properties, PROFILE_METADATA_KEY};
use crate::DEFAULT_READ_BATCH_SIZE;

/// Rows contributed by one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceTable {
    pub path: PathBuf,
    pub row_count: usize,
}

/// One serialized output chunk in local scratch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputFile {
    pub local_path: PathBuf,
    pub file_name: String,
    pub row_count: usize,
    pub byte_size: u64,
}

/// Explain how `actual` differs from `expected` by column names and types.
///
/// Nullability and metadata are ignored; `None` means the schemas agree.
pub fn describe_schema_difference(expected: &Schema, actual: &Schema) -> Option<String> {
    let expected_fields = expected.fields();
    let actual_fields = actual.fields();
    if expected_fields.len() != actual_fields.len() {
        return Some(format!(
            "expected {} columns, found {}",
            expected_fields.len(),
            actual_fields.len()
        ));
    }
    expected_fields
        .iter()
        .zip(actual_fields.iter())
        .enumerate()
        .find(|(_, (e, a))| e.name() != a.name() || e.data_type() != a.data_type())
        .map(|(idx, (e, a))| {
            format!(
                "column {}: expected `{}: {}`, found `{}: {}`",
                idx,
                e.name(),
                e.data_type(),
                a.name(),
                a.data_type()
            )
        })
}

fn open_builder(path: &Path) -> Result<ParquetRecordBatchReaderBuilder<File>> {
    let file = File::open(path).map_err(|e| ColumnarError::io(path, e))?;
    ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| ColumnarError::parquet(path, e))
}

/// Decode every row of `path`, checking the total against the footer.
pub(crate) fn read_all(path: &Path) -> Result<(SchemaRef, Vec<RecordBatch>, usize)> {
    let builder = open_builder(path)?;
    let footer_rows = builder.metadata().file_metadata().num_rows();
    let schema = builder.schema().clone();
    let reader = builder
        .with_batch_size(DEFAULT_READ_BATCH_SIZE)
        .build()
        .map_err(|e| ColumnarError::parquet(path, e))?;

    let mut batches = Vec::new();
    let mut rows = 0usize;
    for batch in reader {
        let batch = batch?;
        rows += batch.num_rows();
        batches.push(batch);
    }

    if i64::try_from(rows).ok() != Some(footer_rows) {
        return Err(ColumnarError::CorruptFile {
            path: path.to_path_buf(),
            footer_rows,
            decoded_rows: rows,
        });
    }
    Ok((schema, batches, rows))
}

/// Builds a [`MergedTable`] from staged local files.
#[derive(Debug, Default)]
pub struct Merger;

impl Merger {
    /// Merge `paths` in order.
    ///
    /// Fails with [`ColumnarError::SchemaMismatch`] before decoding any rows
    /// if an input's columns differ from the first input's.
    pub fn merge(&self, paths: &[PathBuf]) -> Result<MergedTable> {
        let (reference_path, rest) = paths.split_first().ok_or(ColumnarError::NoInputs)?;
        let reference = open_builder(reference_path)?.schema().clone();

        let mut nullable: Vec<bool> = reference.fields().iter().map(|f| f.is_nullable()).collect();
        for path in rest {
            let schema = open_builder(path)?.schema().clone();
            if let Some(detail) = describe_schema_difference(&reference, &schema) {
                return Err(ColumnarError::SchemaMismatch {
                    reference: reference_path.clone(),
                    path: path.clone(),
                    detail,
                });
            }
            for (flag, field) in nullable.iter_mut().zip(schema.fields().iter()) {
                *flag |= field.is_nullable();
            }
        }

        // Inputs may disagree on nullability only; the merged column is
        // nullable if any input allows nulls.
        let fields: Vec<Field> = reference
            .fields()
            .iter()
            .zip(&nullable)
            .map(|(f, &n)| Field::clone(f).with_nullable(n))
            .collect();
        // Writer metadata such as pyarrow's `pandas` entry is carried over;
        // the profile tag is re-stamped when the outputs are written.
        let mut metadata = reference.metadata().clone();
        metadata.remove(PROFILE_METADATA_KEY);
        let schema: SchemaRef = Arc::new(Schema::new_with_metadata(fields, metadata));
        debug!(inputs = paths.len(), columns = schema.fields().len(), "input schemas agree");

        let mut batches = Vec::new();
        let mut sources = Vec::with_capacity(paths.len());
        let mut total_rows = 0usize;
        for path in paths {
            let (_, file_batches, rows) = read_all(path)?;
            for batch in file_batches {
                batches.push(RecordBatch::try_new(schema.clone(), batch.columns().to_vec())?);
            }
            trace!(path = %path.display(), rows, "decoded staged file");
            total_rows += rows;
            sources.push(SourceTable {
                path: path.clone(),
                row_count: rows,
            });
        }

        debug!(total_rows, "merged staged files");
        Ok(MergedTable {
            schema,
            batches,
            total_rows,
            sources,
        })
    }
}

/// Split `total_rows` into at most `count` contiguous, balanced ranges.
///
/// Earlier ranges take the remainder, so lengths differ by at most one. The
/// count is clamped to `1..=total_rows`; zero rows yield a single empty range.
pub fn chunk_ranges(total_rows: usize, count: usize) -> Vec<Range<usize>> {
    let count = count.clamp(1, total_rows.max(1));
    let base = total_rows / count;
    let remainder = total_rows % count;

    let mut ranges = Vec::with_capacity(count);
    let mut start = 0;
    for i in 0..count {
        let len = base + usize::from(i < remainder);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

/// All input rows, in input order, under one combined schema.
#[derive(Debug)]
pub struct MergedTable {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
    total_rows: usize,
    sources: Vec<SourceTable>,
}

impl MergedTable {
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    pub fn total_row_count(&self) -> usize {
        self.total_rows
    }

    pub fn sources(&self) -> &[SourceTable] {
        &self.sources
    }

    /// Zero-copy slices covering `range` of the merged rows.
    pub fn rows(&self, range: Range<usize>) -> Vec<RecordBatch> {
        let mut out = Vec::new();
        let mut offset = 0usize;
        for batch in &self.batches {
            let batch_range = offset..offset + batch.num_rows();
            offset = batch_range.end;

            let start = range.start.max(batch_range.start);
            let end = range.end.min(batch_range.end);
            if start < end {
                out.push(batch.slice(start - batch_range.start, end - start));
            }
            if batch_range.end >= range.end {
                break;
            }
        }
        out
    }

    /// Split into `count` row-balanced chunks and write each to `dir`.
    ///
    /// `name_for` maps a chunk index to its file name.
    pub fn write_chunks(
        &self,
        count: usize,
        dir: &Path,
        profile: &SerializationProfile,
        name_for: impl Fn(usize) -> String,
    ) -> Result<Vec<OutputFile>> {
        let ranges = chunk_ranges(self.total_rows, count);
        let mut outputs = Vec::with_capacity(ranges.len());
        for (idx, range) in ranges.into_iter().enumerate() {
            let file_name = name_for(idx);
            let local_path = dir.join(&file_name);
            let row_count = range.len();
            let batches = self.rows(range);
            let byte_size = write_parquet(
                &local_path,
                self.schema.clone(),
                &batches,
                writer_properties(profile)?,
            )?;
            debug!(file = %file_name, rows = row_count, bytes = byte_size, "wrote output chunk");
            outputs.push(OutputFile {
                local_path,
                file_name,
                row_count,
                byte_size,
            });
        }
        Ok(outputs)
    }
}
