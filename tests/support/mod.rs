//! Fixture archives built on the fly.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tempfile::TempDir;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const SAMPLE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<z21>
  <exportmeta><version>3</version></exportmeta>
  <locos>
    <loco>
      <address>3</address>
      <name>BR 218</name>
      <max_speed>140</max_speed>
      <functions>
        <function_element><function>2</function><image_name>bell</image_name><position>1</position></function_element>
        <function_element><function>1</function><image_name>horn</image_name><position>1</position></function_element>
        <function_element><function>0</function><image_name>light</image_name><position>0</position></function_element>
      </functions>
    </loco>
    <loco>
      <address>50</address>
      <name>Köf</name>
      <functions>
        <function_element><function>0</function><image_name>light</image_name></function_element>
      </functions>
    </loco>
  </locos>
</z21>"#;

pub const SCHEMA_SQL: &str = "
    CREATE TABLE vehicles (
        id INTEGER PRIMARY KEY, name TEXT, type INTEGER, max_speed INTEGER,
        address INTEGER, position INTEGER, traction_direction INTEGER,
        image_name TEXT, railway TEXT
    );
    CREATE TABLE functions (
        id INTEGER PRIMARY KEY, vehicle_id INTEGER, function INTEGER,
        position INTEGER, button_type INTEGER, time REAL, image_name TEXT,
        shortcut TEXT
    );
";

pub const SAMPLE_DATA_SQL: &str = "
    INSERT INTO vehicles (id, name, type, max_speed, address, position, traction_direction)
        VALUES (1, 'Vectron', 0, 200, 193, 1, 1),
               (2, 'BR 218', 0, 140, 218, 2, 1),
               (3, 'Taurus', 0, 230, 1116, 3, 0),
               (4, 'Wagon', 1, 0, 0, 4, 1);
    INSERT INTO functions (vehicle_id, function, position, button_type, time, image_name)
        VALUES (1, 5, 0, 0, 0, 'fan'),
               (1, 0, 0, 0, 0, 'light'),
               (1, 1, 3, 2, 1.5, 'horn'),
               (2, 0, 0, 0, 0, 'light'),
               (2, 1, 1, 1, 0, 'horn');
";

pub fn sample_sql() -> String {
    format!("{SCHEMA_SQL}{SAMPLE_DATA_SQL}")
}

/// Write a ZIP archive holding `entries` and return its path.
pub fn write_archive(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (entry, bytes) in entries {
        zip.start_file(*entry, options).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap();
    path
}

pub fn xml_archive(dir: &Path, xml: &str) -> PathBuf {
    write_archive(dir, "rocoData.z21", &[("loco_data.xml", xml.as_bytes())])
}

/// Bytes of a fresh SQLite database after running `sql`.
pub fn sqlite_bytes(sql: &str) -> Vec<u8> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("build.sqlite");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(sql).unwrap();
    }
    std::fs::read(&path).unwrap()
}

/// Like [`sqlite_bytes`], with the database switched to WAL journal mode.
pub fn wal_sqlite_bytes(sql: &str) -> Vec<u8> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("build.sqlite");
    {
        let conn = Connection::open(&path).unwrap();
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
        conn.execute_batch(sql).unwrap();
    }
    let bytes = std::fs::read(&path).unwrap();
    // Header bytes 18 and 19 are the write and read format versions; 2 means WAL.
    assert_eq!(&bytes[18..20], &[2, 2]);
    bytes
}

pub fn sqlite_archive(dir: &Path, sql: &str) -> PathBuf {
    let db = sqlite_bytes(sql);
    write_archive(
        dir,
        "z21_new.z21",
        &[("Loco.sqlite", db.as_slice()), ("images/loco_193.png", &b"\x89PNG"[..])],
    )
}

/// Everything left in `dir`, files and directories alike.
pub fn leftover_entries(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

/// Real files under `tests/data/`, if present.
pub fn real_file(name: &str) -> Option<PathBuf> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name);
    path.exists().then_some(path)
}
