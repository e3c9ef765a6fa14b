//! JSON export of loaded files.

use std::collections::BTreeSet;

use tempfile::TempDir;
use z21::export::{Summary, from_json, select_addresses, to_json};
use z21::{Z21File, load};

use crate::support::{SAMPLE_XML, sample_sql, sqlite_archive, xml_archive};

fn tuples(file: &Z21File) -> BTreeSet<(u16, String, usize)> {
    file.locomotives
        .iter()
        .map(|l| (l.address, l.name.clone(), l.function_count()))
        .collect()
}

#[test]
fn test_reimport_preserves_locomotive_tuples() {
    let dir = TempDir::new().unwrap();
    for path in [
        xml_archive(dir.path(), SAMPLE_XML),
        sqlite_archive(dir.path(), &sample_sql()),
    ] {
        let file = load(&path).unwrap().file;
        let json = to_json(&file, true).unwrap();
        let reimported = from_json(json.as_bytes()).unwrap();
        assert_eq!(tuples(&reimported), tuples(&file));
        assert_eq!(reimported, file);
    }
}

#[test]
fn test_summary_of_loaded_file() {
    let dir = TempDir::new().unwrap();
    let file = load(sqlite_archive(dir.path(), &sample_sql())).unwrap().file;

    let summary = Summary::of(&file);
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["format"], "sqlite");
    assert_eq!(json["locomotives"][0]["address"], 193);
    assert_eq!(json["locomotives"][0]["function_count"], 3);
}

#[test]
fn test_select_addresses_of_loaded_file() {
    let dir = TempDir::new().unwrap();
    let file = load(xml_archive(dir.path(), SAMPLE_XML)).unwrap().file;
    let selected = select_addresses(&file, &[50]);
    assert_eq!(selected.locomotives.len(), 1);
    assert_eq!(selected.locomotives[0].name, "Köf");
}
