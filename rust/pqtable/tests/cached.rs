use std::path::Path;

use pqtable::{
    CacheMode, ErrorKind, MemoryTable, ParquetTableReader, ReadOptions, Table, WriteOptions,
    open_table,
};
use pqtable_testkit::{
    data_gen::{TableGen, all_kinds_columns, generate_table, wide_columns},
    source::{FailingSource, write_to_bytes},
};

fn dir_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

/// Raw stored items of every column, concatenated per column.
fn column_contents(table: &pqtable::CachedTable) -> Vec<Vec<u8>> {
    (0..table.columns().len())
        .map(|icol| {
            let store = table.column_store(icol).unwrap();
            let mut content = Vec::new();
            for i in 0..store.len() {
                content.extend_from_slice(&store.read_item(i).unwrap());
            }
            content
        })
        .collect()
}

#[test]
fn test_cache_build_is_deterministic() {
    let table = generate_table(wide_columns(50), &TableGen::new(42, 400));
    let data = write_to_bytes(&table, &WriteOptions::new().with_row_group_rows(90)).unwrap();

    let mut baseline = None;
    for workers in [1, 2, 8] {
        let options = ReadOptions::new().with_worker_count(workers);
        let reader = ParquetTableReader::open(data.clone(), options).unwrap();
        let cached = reader.build_cache().unwrap();
        assert_eq!(cached.columns().len(), 50);
        let contents = column_contents(&cached);
        match &baseline {
            None => baseline = Some(contents),
            Some(expected) => assert!(*expected == contents, "{workers} workers"),
        }
    }
}

#[test]
fn test_cached_matches_sequential() {
    let table = generate_table(all_kinds_columns(), &TableGen::new(77, 333));
    let data = write_to_bytes(&table, &WriteOptions::new().with_row_group_rows(100)).unwrap();
    let reader = ParquetTableReader::open(data, ReadOptions::default()).unwrap();

    let cached = reader.build_cache().unwrap();
    assert_eq!(Table::row_count(&cached), Table::row_count(&reader));
    let from_cache = MemoryTable::from_table(&cached).unwrap();
    let from_sequential = MemoryTable::from_table(&reader).unwrap();
    assert_eq!(from_cache.row_data(), from_sequential.row_data());
    assert_eq!(from_cache.columns(), from_sequential.columns());
}

#[test]
fn test_scratch_dir_removed_on_drop() {
    let temp = tempfile::tempdir().unwrap();
    let table = generate_table(wide_columns(10), &TableGen::new(3, 50));
    let data = write_to_bytes(&table, &WriteOptions::default()).unwrap();
    let options = ReadOptions::new().with_temp_dir(temp.path());
    let reader = ParquetTableReader::open(data, options).unwrap();

    let cached = reader.build_cache().unwrap();
    assert!(cached.scratch_path().starts_with(temp.path()));
    // Seven fixed-size stores, three indexed ones with data and offsets files.
    assert_eq!(dir_entries(cached.scratch_path()), 13);
    assert!(cached.stored_size() > 0);
    drop(cached);
    assert_eq!(dir_entries(temp.path()), 0);
}

#[test]
fn test_failed_build_leaves_no_files() {
    let temp = tempfile::tempdir().unwrap();
    let table = generate_table(wide_columns(12), &TableGen::new(8, 200));
    let data = write_to_bytes(&table, &WriteOptions::new().with_row_group_rows(40)).unwrap();

    // Open #1 reads the footer; the workers take the following ones, so the
    // fifth column task to start fails after four stores have been written.
    let source = FailingSource::fail_opens(data.clone(), 6..7);
    let options = ReadOptions::new()
        .with_worker_count(1)
        .with_temp_dir(temp.path());
    let reader = ParquetTableReader::open(source, options.clone()).unwrap();
    let err = reader.build_cache().err().unwrap();
    match err.kind() {
        ErrorKind::CacheBuild { source, .. } => {
            assert!(matches!(source.kind(), ErrorKind::Io { .. }))
        }
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(dir_entries(temp.path()), 0);

    let source = FailingSource::fail_from(data, 2);
    let reader = ParquetTableReader::open(source, options.with_worker_count(4)).unwrap();
    assert!(reader.build_cache().is_err());
    assert_eq!(dir_entries(temp.path()), 0);
}

#[test]
fn test_cache_modes() {
    let table = generate_table(wide_columns(6), &TableGen::new(2, 30));
    let data = write_to_bytes(&table, &WriteOptions::default()).unwrap();
    let options = ReadOptions::new().with_worker_count(1);

    let opened = open_table(data.clone(), options.clone()).unwrap();
    assert!(opened.is_cached());

    let sequential = options.clone().with_cache_mode(CacheMode::Sequential);
    let opened = open_table(data.clone(), sequential).unwrap();
    assert!(!opened.is_cached());
    assert!(opened.random_access().is_none());

    // An I/O failure in Auto mode falls back to sequential access.
    let source = FailingSource::fail_opens(data.clone(), 2..3);
    let opened = open_table(source, options.clone()).unwrap();
    assert!(!opened.is_cached());
    assert_eq!(
        MemoryTable::from_table(&opened).unwrap().row_data(),
        table.row_data()
    );

    // In Cached mode it is an error.
    let source = FailingSource::fail_opens(data, 2..3);
    let cached = options.with_cache_mode(CacheMode::Cached);
    let err = open_table(source, cached).err().unwrap();
    assert!(matches!(err.kind(), ErrorKind::CacheBuild { .. }));
}

#[test]
fn test_cache_modes_with_failing_chunk_reads() {
    let table = generate_table(all_kinds_columns(), &TableGen::new(5, 120));
    let data = write_to_bytes(&table, &WriteOptions::new().with_row_group_rows(50)).unwrap();
    let options = ReadOptions::new().with_worker_count(1);

    // The handle of the first column task opens fine, then fails while reading
    // its pages.
    let source = FailingSource::fail_reads(data.clone(), 2..3);
    let opened = open_table(source, options.clone()).unwrap();
    assert!(!opened.is_cached());
    assert_eq!(
        MemoryTable::from_table(&opened).unwrap().row_data(),
        table.row_data()
    );

    let source = FailingSource::fail_reads(data, 2..3);
    let cached = options.with_cache_mode(CacheMode::Cached);
    let err = open_table(source, cached).err().unwrap();
    match err.kind() {
        ErrorKind::CacheBuild { source, .. } => {
            assert!(matches!(source.kind(), ErrorKind::Io { .. }), "{source}");
            assert!(!source.is_format_error());
        }
        other => panic!("unexpected error {other}"),
    }
}
