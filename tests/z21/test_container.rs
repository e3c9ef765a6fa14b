//! Container-level failures and format detection.

use rstest::rstest;
use tempfile::TempDir;
use z21::{Format, HybridPolicy, LoadOptions, Z21Error, Z21Loader, load};

use crate::support::{SAMPLE_XML, sample_sql, sqlite_bytes, write_archive};

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = load(dir.path().join("absent.z21")).unwrap_err();
    assert!(matches!(err, Z21Error::Container { ref message, .. } if message == "file not found"));
}

#[test]
fn test_not_a_zip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plain.z21");
    std::fs::write(&path, SAMPLE_XML).unwrap();
    assert!(matches!(load(&path), Err(Z21Error::Container { .. })));
}

#[test]
fn test_unknown_inner_entry() {
    let dir = TempDir::new().unwrap();
    let path = write_archive(
        dir.path(),
        "other.z21",
        &[("readme.txt", b"hello".as_slice()), ("data.json", b"{}".as_slice())],
    );
    match load(&path) {
        Err(Z21Error::UnknownFormat { entries, .. }) => {
            assert_eq!(entries, vec!["readme.txt".to_string(), "data.json".to_string()]);
        }
        other => panic!("expected UnknownFormat, got {other:?}"),
    }
}

#[rstest]
#[case(HybridPolicy::PreferSqlite, Some(Format::Sqlite))]
#[case(HybridPolicy::PreferXml, Some(Format::Xml))]
#[case(HybridPolicy::Reject, None)]
fn test_hybrid_archive(#[case] policy: HybridPolicy, #[case] expected: Option<Format>) {
    let dir = TempDir::new().unwrap();
    let db = sqlite_bytes(&sample_sql());
    let path = write_archive(
        dir.path(),
        "hybrid.z21",
        &[
            ("loco_data.xml", SAMPLE_XML.as_bytes()),
            ("Loco.sqlite", db.as_slice()),
        ],
    );

    let result = Z21Loader::with_options(LoadOptions::new().with_hybrid(policy)).load(&path);
    match expected {
        Some(format) => assert_eq!(result.unwrap().file.format, format),
        None => assert!(matches!(result, Err(Z21Error::AmbiguousFormat { .. }))),
    }
}
