//! The `z21-export` binary.

use std::process::Command;

use tempfile::TempDir;

use crate::support::{SAMPLE_XML, sample_sql, sqlite_archive, xml_archive};

fn z21_export() -> Command {
    Command::new(env!("CARGO_BIN_EXE_z21-export"))
}

#[test]
fn test_cli_exports_json_to_stdout() {
    let dir = TempDir::new().unwrap();
    let path = xml_archive(dir.path(), SAMPLE_XML);

    let output = z21_export().arg(&path).arg("--compact").output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["format"], "xml");
    assert_eq!(json["locomotives"].as_array().unwrap().len(), 2);
}

#[test]
fn test_cli_summary_to_file_with_address_filter() {
    let dir = TempDir::new().unwrap();
    let path = sqlite_archive(dir.path(), &sample_sql());
    let out = dir.path().join("summary.json");

    let status = z21_export()
        .arg(&path)
        .args(["--summary", "--address", "218", "-o"])
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&out).unwrap()).unwrap();
    let locos = json["locomotives"].as_array().unwrap();
    assert_eq!(locos.len(), 1);
    assert_eq!(locos[0]["name"], "BR 218");
    assert_eq!(locos[0]["function_count"], 2);
}

#[test]
fn test_cli_failure_exit_code() {
    let dir = TempDir::new().unwrap();
    let output = z21_export()
        .arg(dir.path().join("absent.z21"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: "), "{stderr}");
    assert!(output.stdout.is_empty());
}
