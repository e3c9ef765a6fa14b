//! Loading new-layout archives.

use rstest::rstest;
use tempfile::TempDir;
use z21::{
    ButtonType, DiagnosticKind, DuplicatePolicy, Format, LoadOptions, Z21Error, Z21Loader, load,
};

use crate::support::{
    SCHEMA_SQL, leftover_entries, sample_sql, sqlite_archive, sqlite_bytes, wal_sqlite_bytes,
    write_archive,
};

fn loader_in(temp: &TempDir) -> Z21Loader {
    Z21Loader::with_options(LoadOptions::new().with_temp_dir(temp.path()))
}

#[test]
fn test_load_sqlite_archive() {
    let dir = TempDir::new().unwrap();
    let path = sqlite_archive(dir.path(), &sample_sql());

    let loaded = load(&path).unwrap();
    let file = &loaded.file;
    assert_eq!(file.format, Format::Sqlite);
    // Three type-0 rows; the wagon is not a locomotive.
    assert_eq!(file.locomotives.len(), 3);
    assert_eq!(file.images, vec!["images/loco_193.png".to_string()]);

    let vectron = file.locomotive(193).unwrap();
    assert_eq!(vectron.max_speed, 200);
    let horn = vectron.function(1).unwrap();
    assert_eq!(horn.button_type, ButtonType::Timed);
    assert_eq!(horn.time_delay, Some(1.5));
    assert!(file.locomotive(1116).unwrap().functions.is_empty());
}

#[test]
fn test_sqlite_functions_sorted() {
    let dir = TempDir::new().unwrap();
    let path = sqlite_archive(dir.path(), &sample_sql());

    let loaded = load(&path).unwrap();
    let keys: Vec<(u32, u8)> = loaded
        .file
        .locomotive(193)
        .unwrap()
        .functions
        .iter()
        .map(|f| f.sort_key())
        .collect();
    assert_eq!(keys, vec![(0, 0), (0, 5), (3, 1)]);
}

#[test]
fn test_load_twice_is_equal() {
    let dir = TempDir::new().unwrap();
    let path = sqlite_archive(dir.path(), &sample_sql());
    assert_eq!(load(&path).unwrap().file, load(&path).unwrap().file);
}

#[test]
fn test_temp_database_removed_after_load() {
    let dir = TempDir::new().unwrap();
    let temp = TempDir::new().unwrap();
    let path = sqlite_archive(dir.path(), &sample_sql());

    loader_in(&temp).load(&path).unwrap();
    assert!(leftover_entries(temp.path()).is_empty());
}

#[test]
fn test_wal_database_leaves_no_journal_files() {
    let dir = TempDir::new().unwrap();
    let temp = TempDir::new().unwrap();
    let db = wal_sqlite_bytes(&sample_sql());
    let path = write_archive(dir.path(), "wal.z21", &[("Loco.sqlite", db.as_slice())]);

    let loaded = loader_in(&temp).load(&path).unwrap();
    assert_eq!(loaded.file.locomotives.len(), 3);
    assert_eq!(leftover_entries(temp.path()), Vec::<std::path::PathBuf>::new());
}

#[test]
fn test_temp_database_removed_after_decoder_failure() {
    let dir = TempDir::new().unwrap();
    let temp = TempDir::new().unwrap();
    let path = sqlite_archive(dir.path(), "CREATE TABLE unrelated (x INTEGER);");

    let err = loader_in(&temp).load(&path).unwrap_err();
    assert!(matches!(err, Z21Error::Schema { .. }));
    assert!(leftover_entries(temp.path()).is_empty());
}

#[test]
fn test_schema_error_names_table_and_column() {
    let dir = TempDir::new().unwrap();
    let sql = "CREATE TABLE vehicles (id INTEGER PRIMARY KEY, type INTEGER, address INTEGER);
               CREATE TABLE functions (vehicle_id INTEGER, function INTEGER);";
    let path = sqlite_archive(dir.path(), sql);

    match load(&path) {
        Err(Z21Error::Schema { table, column }) => {
            assert_eq!(table, "vehicles");
            assert_eq!(column, "name");
        }
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn test_non_database_payload_is_container_error() {
    let dir = TempDir::new().unwrap();
    let path = write_archive(
        dir.path(),
        "broken.z21",
        &[("Loco.sqlite", b"definitely not an sqlite database".as_slice())],
    );

    match load(&path) {
        Err(Z21Error::Container { path: reported, message }) => {
            assert_eq!(reported, path);
            assert!(message.starts_with("Loco.sqlite: "), "{message}");
        }
        other => panic!("expected container error, got {other:?}"),
    }
}

#[test]
fn test_missing_address_row_is_skipped() {
    let dir = TempDir::new().unwrap();
    let sql = format!(
        "{SCHEMA_SQL}
        INSERT INTO vehicles (id, name, type, address) VALUES (1, 'No address', 0, NULL), (2, 'Kept', 0, 4);"
    );
    let path = sqlite_archive(dir.path(), &sql);

    let loaded = load(&path).unwrap();
    assert_eq!(loaded.file.locomotives.len(), 1);
    assert_eq!(loaded.diagnostics.len(), 1);
    assert_eq!(loaded.diagnostics[0].record, "vehicles[id=1]");
}

#[rstest]
#[case(DuplicatePolicy::KeepFirst, Some("First"))]
#[case(DuplicatePolicy::KeepLast, Some("Second"))]
#[case(DuplicatePolicy::Reject, None)]
fn test_duplicate_address_policy(#[case] policy: DuplicatePolicy, #[case] kept: Option<&str>) {
    let dir = TempDir::new().unwrap();
    let sql = format!(
        "{SCHEMA_SQL}
        INSERT INTO vehicles (id, name, type, address, position)
            VALUES (1, 'First', 0, 3, 1), (2, 'Other', 0, 4, 2), (3, 'Second', 0, 3, 3);"
    );
    let path = sqlite_archive(dir.path(), &sql);

    let loader = Z21Loader::with_options(LoadOptions::new().with_duplicate_addresses(policy));
    match (loader.load(&path), kept) {
        (Ok(loaded), Some(name)) => {
            assert_eq!(loaded.file.locomotives.len(), 2);
            assert_eq!(loaded.file.locomotives[0].name, name);
            assert_eq!(loaded.diagnostics[0].kind, DiagnosticKind::DuplicateAddress);
        }
        (Err(Z21Error::DuplicateAddress { address }), None) => assert_eq!(address, 3),
        (other, _) => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_empty_database_tables_load_empty() {
    let dir = TempDir::new().unwrap();
    let path = write_archive(
        dir.path(),
        "empty.z21",
        &[("Loco.sqlite", sqlite_bytes(SCHEMA_SQL).as_slice())],
    );
    let loaded = load(&path).unwrap();
    assert!(loaded.file.locomotives.is_empty());
    assert!(loaded.diagnostics.is_empty());
}
