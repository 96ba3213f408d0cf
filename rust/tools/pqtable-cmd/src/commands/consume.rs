//! Consume command implementation

use std::{path::Path, time::Instant};

use anyhow::{Context, Result};
use pqtable::{ReadOptions, RowSequence, Table, open_path};

use crate::{commands::EngineArg, utils};

#[derive(Debug, Default, PartialEq)]
pub struct ConsumeStats {
    pub rows: u64,
    pub cells: u64,
    pub null_cells: u64,
    pub data_size: u64,
}

/// Run the consume command
pub fn run(
    engine: EngineArg,
    workers: Option<usize>,
    temp_dir: Option<String>,
    iterations: u64,
    file: String,
) -> Result<()> {
    let path = utils::input_file(&file)?;
    let mut options = ReadOptions::new().with_cache_mode(engine.into());
    if let Some(workers) = workers {
        options = options.with_worker_count(workers);
    }
    if let Some(temp_dir) = temp_dir {
        options = options.with_temp_dir(temp_dir);
    }
    for _ in 0..iterations.max(1) {
        run_single(&path, options.clone())?;
    }
    Ok(())
}

fn run_single(path: &Path, options: ReadOptions) -> Result<()> {
    println!("Consuming: {}", path.display());
    let start_time = Instant::now();
    let table =
        open_path(path, options).with_context(|| format!("Failed to open {}", path.display()))?;
    let open_time = start_time.elapsed();
    let stats = consume_table(&table)?;
    let elapsed = start_time.elapsed();

    println!("Consumption completed:");
    println!("  Engine: {}", if table.is_cached() { "cached" } else { "sequential" });
    println!("  Open time: {:.3} seconds", open_time.as_secs_f64());
    println!("  Total time: {:.3} seconds", elapsed.as_secs_f64());
    println!("  Total rows: {}", stats.rows);
    println!("  Total cells: {} ({} null)", stats.cells, stats.null_cells);
    println!("  Total data size: {}", utils::format_size(stats.data_size));
    if let Some(bytes_per_sec) = utils::per_second(stats.data_size as f64, elapsed) {
        println!("  Throughput: {:.2} MB/s", bytes_per_sec / (1024.0 * 1024.0));
    }
    if let Some(rows_per_sec) = utils::per_second(stats.rows as f64, elapsed) {
        println!("  Rows/sec: {rows_per_sec:.0}");
    }
    Ok(())
}

/// Reads every cell of `table` once.
pub fn consume_table(table: &dyn Table) -> Result<ConsumeStats> {
    let mut stats = ConsumeStats::default();
    let mut rows = table.rows()?;
    let column_count = table.columns().len();
    while rows.next()? {
        stats.rows += 1;
        for icol in 0..column_count {
            stats.cells += 1;
            match rows.cell(icol)? {
                Some(value) => stats.data_size += value.data_size() as u64,
                None => stats.null_cells += 1,
            }
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use pqtable::{ParquetTableReader, WriteOptions};
    use pqtable_testkit::{
        data_gen::{TableGen, generate_table, wide_columns},
        source::write_to_bytes,
    };

    use super::*;

    #[test]
    fn test_consume_engines_agree() {
        let table = generate_table(wide_columns(12), &TableGen::new(5, 150));
        let data = write_to_bytes(&table, &WriteOptions::default()).unwrap();
        let reader = ParquetTableReader::open(data, ReadOptions::default()).unwrap();

        let sequential = consume_table(&reader).unwrap();
        let cached = consume_table(&reader.build_cache().unwrap()).unwrap();
        assert_eq!(sequential, cached);
        assert_eq!(sequential.rows, 150);
        assert_eq!(sequential.cells, 150 * 12);
        assert_eq!(consume_table(&table).unwrap(), sequential);
    }
}
