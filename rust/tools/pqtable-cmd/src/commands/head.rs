//! Head command implementation

use anyhow::{Context, Result};
use pqtable::{CacheMode, Cell, ColumnInfo, ReadOptions, RowSequence, Table, open_path};

use crate::{commands::cell_to_json, utils};

/// Run the head command
pub fn run(rows: u64, json: bool, cached: bool, file: String) -> Result<()> {
    let path = utils::input_file(&file)?;
    let mode = if cached {
        CacheMode::Cached
    } else {
        CacheMode::Sequential
    };
    let options = ReadOptions::new().with_cache_mode(mode);
    let table = open_path(&path, options).with_context(|| format!("Failed to open {file}"))?;
    let columns = table.columns();

    if !json {
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        println!("{}", names.join("\t"));
    }
    match table.random_access() {
        Some(access) => {
            let count = rows.min(Table::row_count(access).unwrap_or_default());
            for irow in 0..count {
                print_row(columns, &access.row_at(irow)?, json);
            }
        }
        None => {
            let mut seq = table.rows()?;
            let mut printed = 0;
            while printed < rows && seq.next()? {
                print_row(columns, &seq.row()?, json);
                printed += 1;
            }
        }
    }
    Ok(())
}

fn print_row(columns: &[ColumnInfo], row: &[Cell], json: bool) {
    if json {
        let object: serde_json::Map<_, _> = columns
            .iter()
            .zip(row)
            .map(|(column, cell)| (column.name.clone(), cell_to_json(cell)))
            .collect();
        println!("{}", serde_json::Value::Object(object));
    } else {
        let cells: Vec<_> = row
            .iter()
            .map(|cell| cell.as_ref().map_or_else(|| "null".to_string(), ToString::to_string))
            .collect();
        println!("{}", cells.join("\t"));
    }
}
