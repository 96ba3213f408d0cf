//! Copy command implementation

use std::time::Instant;

use anyhow::{Context, Result};
use pqtable::{
    ArrayEncoding, CacheMode, ParquetTableReader, ReadOptions, WriteOptions, write_table_to_path,
};

use crate::utils;

/// Run the copy command
pub fn run(flat: bool, row_group_rows: Option<usize>, input: String, output: String) -> Result<()> {
    let path = utils::input_file(&input)?;
    let start_time = Instant::now();
    let read_options = ReadOptions::new().with_cache_mode(CacheMode::Sequential);
    let reader = ParquetTableReader::open(path, read_options)
        .with_context(|| format!("Failed to open {input}"))?;

    let mut options = WriteOptions::new().with_created_by(concat!(
        "pqtable-cmd version ",
        env!("CARGO_PKG_VERSION")
    ));
    if flat {
        options = options.with_array_encoding(ArrayEncoding::Flat);
    }
    if let Some(rows) = row_group_rows {
        options = options.with_row_group_rows(rows);
    }
    for (key, value) in reader.key_value_metadata() {
        options = options.with_key_value(key, value);
    }

    let rows = write_table_to_path(&reader, &output, &options)
        .with_context(|| format!("Failed to write {output}"))?;
    let size = std::fs::metadata(&output)?.len();
    println!(
        "Copied {rows} rows to {output} ({}) in {:.3} seconds",
        utils::format_size(size),
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}
