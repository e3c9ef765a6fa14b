//! Scenarios against real exports from the Z21 app.
//!
//! Drop `rocoData.z21` and `z21_new.z21` into `tests/data/` to run these;
//! without them each test returns early.

use z21::{Format, load};

use crate::support::real_file;

#[test]
fn test_real_xml_file() {
    let Some(path) = real_file("rocoData.z21") else {
        eprintln!("skipping: tests/data/rocoData.z21 not present");
        return;
    };
    let loaded = load(&path).unwrap();
    assert_eq!(loaded.file.format, Format::Xml);
    assert!(loaded.file.locomotives.len() >= 23);
}

#[test]
fn test_real_sqlite_file() {
    let Some(path) = real_file("z21_new.z21") else {
        eprintln!("skipping: tests/data/z21_new.z21 not present");
        return;
    };
    let loaded = load(&path).unwrap();
    assert_eq!(loaded.file.format, Format::Sqlite);
    assert!(loaded.file.locomotives.len() >= 65);
    for loco in &loaded.file.locomotives {
        let keys: Vec<_> = loco.functions.iter().map(|f| f.sort_key()).collect();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]), "{loco} functions out of order");
    }
}
