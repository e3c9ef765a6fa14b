//! Loading old-layout archives.

use tempfile::TempDir;
use z21::{DiagnosticKind, Format, Z21Error, load};

use crate::support::{SAMPLE_XML, write_archive, xml_archive};

#[test]
fn test_load_xml_archive() {
    let dir = TempDir::new().unwrap();
    let path = xml_archive(dir.path(), SAMPLE_XML);

    let loaded = load(&path).unwrap();
    assert_eq!(loaded.file.format, Format::Xml);
    assert_eq!(loaded.file.version, Some(3));
    assert_eq!(loaded.file.locomotives.len(), 2);
    assert!(loaded.diagnostics.is_empty());

    let br218 = loaded.file.locomotive(3).unwrap();
    assert_eq!(br218.name, "BR 218");
    assert_eq!(br218.max_speed, 140);
}

#[test]
fn test_functions_sorted_by_position_then_number() {
    let dir = TempDir::new().unwrap();
    let path = xml_archive(dir.path(), SAMPLE_XML);

    let loaded = load(&path).unwrap();
    let numbers: Vec<u8> = loaded
        .file
        .locomotive(3)
        .unwrap()
        .functions
        .iter()
        .map(|f| f.number)
        .collect();
    assert_eq!(numbers, vec![0, 1, 2]);
}

#[test]
fn test_load_twice_is_equal() {
    let dir = TempDir::new().unwrap();
    let path = xml_archive(dir.path(), SAMPLE_XML);
    assert_eq!(load(&path).unwrap().file, load(&path).unwrap().file);
}

#[test]
fn test_missing_address_is_skipped_with_one_diagnostic() {
    let dir = TempDir::new().unwrap();
    let xml = r#"<z21><locos>
        <loco><name>Nameless address</name><functions><function_element><function>0</function></function_element></functions></loco>
        <loco><address>7</address><name>Kept</name></loco>
    </locos></z21>"#;
    let path = xml_archive(dir.path(), xml);

    let loaded = load(&path).unwrap();
    assert_eq!(loaded.file.locomotives.len(), 1);
    assert_eq!(loaded.diagnostics.len(), 1);
    assert_eq!(loaded.diagnostics[0].kind, DiagnosticKind::SkippedRecord);
    assert!(loaded.diagnostics[0].message.contains("address"));
}

#[test]
fn test_payload_in_subdirectory() {
    let dir = TempDir::new().unwrap();
    let path = write_archive(
        dir.path(),
        "nested.z21",
        &[("export/loco_data.xml", SAMPLE_XML.as_bytes())],
    );
    assert_eq!(load(&path).unwrap().file.locomotives.len(), 2);
}

#[test]
fn test_malformed_xml() {
    let dir = TempDir::new().unwrap();
    let path = xml_archive(dir.path(), "<z21><locos><loco></locos></z21>");
    assert!(matches!(load(&path), Err(Z21Error::MalformedData(_))));
}

#[test]
fn test_latin1_archive_keeps_umlauts() {
    let dir = TempDir::new().unwrap();
    let mut xml = br#"<?xml version="1.0" encoding="ISO-8859-1"?><z21><locos><loco>"#.to_vec();
    xml.extend_from_slice(b"<address>50</address><name>K\xF6f III</name></loco></locos></z21>");
    let path = write_archive(dir.path(), "latin1.z21", &[("loco_data.xml", xml.as_slice())]);

    let loaded = load(&path).unwrap();
    assert_eq!(loaded.file.locomotive(50).unwrap().name, "Köf III");
}
