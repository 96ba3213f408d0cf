//! Inspect command implementation

use std::path::Path;

use anyhow::{Context, Result};
use parquet::{
    data_type::ByteArray,
    file::{
        metadata::{ColumnChunkMetaData, RowGroupMetaData},
        statistics::Statistics,
    },
    schema::printer::print_schema,
};
use pqtable::{ParquetTableReader, ReadOptions, Table};
use serde::Serialize;

use crate::utils;

#[derive(Serialize)]
struct InspectSummary {
    file: String,
    file_size: String,
    row_count: u64,
    row_group_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_by: Option<String>,
    schema: Vec<String>,
    columns: Vec<ColumnSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dropped_columns: Vec<DroppedSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    key_value_metadata: Vec<KeyValueSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    row_groups: Vec<RowGroupSummary>,
}

#[derive(Serialize)]
struct ColumnSummary {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_domain: Option<String>,
    leaf_index: usize,
    max_def: i16,
    max_rep: i16,
}

#[derive(Serialize)]
struct DroppedSummary {
    path: String,
    reason: String,
}

#[derive(Serialize)]
struct KeyValueSummary {
    key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

#[derive(Serialize)]
struct RowGroupSummary {
    index: usize,
    row_count: i64,
    compressed_size: String,
    uncompressed_size: String,
    chunks: Vec<ChunkSummary>,
}

#[derive(Serialize)]
struct ChunkSummary {
    path: String,
    codec: String,
    encodings: Vec<String>,
    value_count: i64,
    compressed_size: i64,
    uncompressed_size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    null_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<String>,
}

/// Run the inspect command
pub fn run(details: bool, file: String) -> Result<()> {
    let path = utils::input_file(&file)?;
    let summary = summarize(&path, file, details)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn summarize(path: &Path, file: String, details: bool) -> Result<InspectSummary> {
    let file_size = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {file}"))?
        .len();
    let reader = ParquetTableReader::open(path.to_path_buf(), ReadOptions::default())
        .with_context(|| format!("Failed to open {file}"))?;

    let metadata = reader.metadata();
    let columns = reader
        .column_plans()
        .iter()
        .map(|plan| ColumnSummary {
            name: plan.info.name.clone(),
            kind: plan.info.kind.to_string(),
            nullable: plan.info.nullable,
            time_domain: plan.info.time_domain.map(|domain| format!("{domain:?}")),
            leaf_index: plan.leaf_index,
            max_def: plan.layout.max_def,
            max_rep: plan.layout.max_rep,
        })
        .collect();
    let row_groups = if details {
        metadata
            .row_groups()
            .iter()
            .enumerate()
            .map(|(index, rg)| row_group_summary(index, rg))
            .collect()
    } else {
        Vec::new()
    };
    let mut schema = Vec::new();
    print_schema(&mut schema, metadata.file_metadata().schema());

    Ok(InspectSummary {
        file,
        file_size: utils::format_size(file_size),
        row_count: Table::row_count(&reader).unwrap_or_default(),
        row_group_count: metadata.num_row_groups(),
        created_by: metadata.file_metadata().created_by().map(str::to_string),
        schema: String::from_utf8_lossy(&schema)
            .lines()
            .map(str::to_string)
            .collect(),
        columns,
        dropped_columns: reader
            .dropped_columns()
            .iter()
            .map(|d| DroppedSummary {
                path: d.path.clone(),
                reason: d.reason.clone(),
            })
            .collect(),
        key_value_metadata: reader
            .key_value_metadata()
            .into_iter()
            .map(|(key, value)| KeyValueSummary { key, value })
            .collect(),
        row_groups,
    })
}

fn row_group_summary(index: usize, rg: &RowGroupMetaData) -> RowGroupSummary {
    RowGroupSummary {
        index,
        row_count: rg.num_rows(),
        compressed_size: utils::format_size(rg.compressed_size().max(0) as u64),
        uncompressed_size: utils::format_size(rg.total_byte_size().max(0) as u64),
        chunks: rg.columns().iter().map(chunk_summary).collect(),
    }
}

fn chunk_summary(chunk: &ColumnChunkMetaData) -> ChunkSummary {
    let stats = chunk.statistics();
    let (min, max) = stats.map(stat_bounds).unwrap_or_default();
    ChunkSummary {
        path: chunk.column_path().string(),
        codec: chunk.compression().to_string(),
        encodings: chunk.encodings().iter().map(ToString::to_string).collect(),
        value_count: chunk.num_values(),
        compressed_size: chunk.compressed_size(),
        uncompressed_size: chunk.uncompressed_size(),
        null_count: stats.and_then(Statistics::null_count_opt),
        min,
        max,
    }
}

/// Min and max of a column chunk, for the physical types with a readable form.
fn stat_bounds(stats: &Statistics) -> (Option<String>, Option<String>) {
    macro_rules! bounds {
        ($stats:expr, $show:expr) => {
            (
                $stats.min_opt().and_then($show),
                $stats.max_opt().and_then($show),
            )
        };
    }
    fn shown<T: std::fmt::Display>(v: &T) -> Option<String> {
        Some(v.to_string())
    }
    match stats {
        Statistics::Boolean(s) => bounds!(s, shown),
        Statistics::Int32(s) => bounds!(s, shown),
        Statistics::Int64(s) => bounds!(s, shown),
        Statistics::Float(s) => bounds!(s, shown),
        Statistics::Double(s) => bounds!(s, shown),
        Statistics::ByteArray(s) => {
            bounds!(s, |v: &ByteArray| v.as_utf8().ok().map(str::to_string))
        }
        Statistics::Int96(_) | Statistics::FixedLenByteArray(_) => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use pqtable::WriteOptions;
    use pqtable_testkit::{
        data_gen::{TableGen, all_kinds_columns, generate_table},
        source::write_to_temp_file,
    };

    use super::*;

    #[test]
    fn test_inspect_summary() {
        let dir = tempfile::tempdir().unwrap();
        let table = generate_table(all_kinds_columns(), &TableGen::new(6, 250));
        let options = WriteOptions::new()
            .with_row_group_rows(100)
            .with_key_value("origin", Some("inspect-test".to_string()));
        let path = write_to_temp_file(&table, dir.path(), &options).unwrap();

        let summary = summarize(&path, "table.parquet".to_string(), true).unwrap();
        assert_eq!(summary.row_count, 250);
        assert_eq!(summary.row_group_count, 3);
        assert_eq!(summary.columns.len(), all_kinds_columns().len());
        assert!(summary.dropped_columns.is_empty());
        assert_eq!(summary.key_value_metadata.len(), 1);
        assert!(!summary.schema.is_empty());

        let row_counts: Vec<i64> = summary.row_groups.iter().map(|rg| rg.row_count).collect();
        assert_eq!(row_counts, vec![100, 100, 50]);
        let ids = summary.row_groups[0]
            .chunks
            .iter()
            .find(|chunk| chunk.path == "id")
            .unwrap();
        assert_eq!(ids.min.as_deref(), Some("0"));
        assert_eq!(ids.max.as_deref(), Some("99"));
        assert_eq!(ids.null_count, Some(0));

        let brief = summarize(&path, "table.parquet".to_string(), false).unwrap();
        assert!(brief.row_groups.is_empty());
        assert!(serde_json::to_string(&brief).unwrap().contains("\"row_count\":250"));
    }
}
