//! Profile-driven Parquet writer.

use std::fs::File;
use std::path::Path;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::metadata::KeyValue;
use parquet::file::properties::{EnabledStatistics, WriterProperties, WriterVersion};
use pqc_config::{CompressionCodec, SerializationProfile};
use tracing::trace;

use crate::error::{ColumnarError, Result};

/// Footer key recording which profile wrote a file.
pub const PROFILE_METADATA_KEY: &str = "pqc.serialization_profile";

/// Translate a serialization profile into writer properties.
///
/// Every knob that influences file layout is set explicitly so the output
/// does not drift with library defaults.
pub fn writer_properties(profile: &SerializationProfile) -> Result<WriterProperties> {
    if profile.row_group_size == 0 {
        return Err(ColumnarError::InvalidProfile(format!(
            "profile '{}' has a zero row group size",
            profile.name
        )));
    }

    let compression = match profile.compression {
        CompressionCodec::Uncompressed => Compression::UNCOMPRESSED,
        CompressionCodec::Snappy => Compression::SNAPPY,
        CompressionCodec::Zstd { level } => {
            let level = ZstdLevel::try_new(level).map_err(|e| {
                ColumnarError::InvalidProfile(format!("profile '{}': {}", profile.name, e))
            })?;
            Compression::ZSTD(level)
        }
    };

    let statistics = if profile.statistics_enabled {
        EnabledStatistics::Page
    } else {
        EnabledStatistics::None
    };

    Ok(WriterProperties::builder()
        .set_writer_version(WriterVersion::PARQUET_1_0)
        .set_compression(compression)
        .set_dictionary_enabled(profile.dictionary_enabled)
        .set_max_row_group_size(profile.row_group_size)
        .set_statistics_enabled(statistics)
        .set_created_by(format!("parquet_consolidator {}", env!("CARGO_PKG_VERSION")))
        .set_key_value_metadata(Some(vec![KeyValue::new(
            PROFILE_METADATA_KEY.to_string(),
            profile.name.clone(),
        )]))
        .build())
}

/// Write `batches` to a new file at `path`, returning the file size in bytes.
///
/// An empty batch list still produces a valid file carrying the schema.
pub fn write_parquet(
    path: &Path,
    schema: SchemaRef,
    batches: &[RecordBatch],
    props: WriterProperties,
) -> Result<u64> {
    let file = File::create(path).map_err(|e| ColumnarError::io(path, e))?;
    let mut writer =
        ArrowWriter::try_new(file, schema, Some(props)).map_err(|e| ColumnarError::parquet(path, e))?;
    for batch in batches {
        writer
            .write(batch)
            .map_err(|e| ColumnarError::parquet(path, e))?;
    }
    writer.close().map_err(|e| ColumnarError::parquet(path, e))?;

    let bytes = std::fs::metadata(path)
        .map_err(|e| ColumnarError::io(path, e))?
        .len();
    trace!(path = %path.display(), bytes, "wrote parquet file");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use parquet::file::reader::{FileReader, SerializedFileReader};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn batch(start: i64, len: usize) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("vin", DataType::Utf8, true),
        ]));
        let ids: Vec<i64> = (start..start + len as i64).collect();
        let vins: Vec<String> = ids.iter().map(|i| format!("VIN{}", i % 3)).collect();
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(ids)),
                Arc::new(StringArray::from(vins)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn zero_row_group_size_rejected() {
        let profile = SerializationProfile {
            row_group_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            writer_properties(&profile),
            Err(ColumnarError::InvalidProfile(_))
        ));
    }

    #[test]
    fn bad_zstd_level_rejected() {
        let profile = SerializationProfile {
            compression: CompressionCodec::Zstd { level: 99 },
            ..Default::default()
        };
        assert!(writer_properties(&profile).is_err());
    }

    #[test]
    fn row_groups_follow_profile() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.parquet");
        let profile = SerializationProfile {
            row_group_size: 100,
            ..Default::default()
        };
        let batches = vec![batch(0, 150), batch(150, 100)];
        let props = writer_properties(&profile).unwrap();
        let bytes = write_parquet(&path, batches[0].schema(), &batches, props).unwrap();
        assert!(bytes > 0);

        let reader = SerializedFileReader::new(File::open(&path).unwrap()).unwrap();
        let meta = reader.metadata();
        assert_eq!(meta.file_metadata().num_rows(), 250);
        let group_rows: Vec<i64> = meta.row_groups().iter().map(|g| g.num_rows()).collect();
        assert_eq!(group_rows, vec![100, 100, 50]);

        let column = meta.row_group(0).column(0);
        assert_eq!(column.compression(), Compression::SNAPPY);

        let kv = meta.file_metadata().key_value_metadata().unwrap();
        assert!(kv
            .iter()
            .any(|e| e.key == PROFILE_METADATA_KEY && e.value.as_deref() == Some("snappy-dict-50k")));
    }

    #[test]
    fn empty_batches_produce_valid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.parquet");
        let schema = batch(0, 1).schema();
        let props = writer_properties(&SerializationProfile::default()).unwrap();
        write_parquet(&path, schema, &[], props).unwrap();

        let reader = SerializedFileReader::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(reader.metadata().file_metadata().num_rows(), 0);
    }
}
