//! JSON export and re-import.
//!
//! The JSON mirrors the model types field for field, so [`from_json`] reads
//! back anything [`to_json`] writes.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::{Result, Z21Error};
use crate::model::{Format, Z21File};

/// Serialize the whole file.
pub fn to_json(file: &Z21File, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(file)
    } else {
        serde_json::to_string(file)
    };
    json.map_err(|e| Z21Error::json(e.to_string()))
}

/// Serialize any exportable value to `writer`, followed by a newline.
pub fn to_writer<T, W>(value: &T, mut writer: W, pretty: bool) -> Result<()>
where
    T: Serialize + ?Sized,
    W: Write,
{
    let result = if pretty {
        serde_json::to_writer_pretty(&mut writer, value)
    } else {
        serde_json::to_writer(&mut writer, value)
    };
    result.map_err(|e| Z21Error::json(e.to_string()))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Read a file previously written by [`to_json`].
pub fn from_json(bytes: &[u8]) -> Result<Z21File> {
    serde_json::from_slice(bytes).map_err(|e| Z21Error::json(e.to_string()))
}

/// One line of the summary view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocoSummary {
    pub address: u16,
    pub name: String,
    pub function_count: usize,
}

/// Compact view of a file: format, version and one line per locomotive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub format: Format,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    pub locomotives: Vec<LocoSummary>,
}

impl Summary {
    pub fn of(file: &Z21File) -> Self {
        Self {
            format: file.format,
            version: file.version,
            locomotives: file
                .locomotives
                .iter()
                .map(|loco| LocoSummary {
                    address: loco.address,
                    name: loco.name.clone(),
                    function_count: loco.function_count(),
                })
                .collect(),
        }
    }
}

/// A copy of `file` restricted to locomotives with the given addresses.
///
/// Locomotives keep their source order. Unknown addresses are ignored.
pub fn select_addresses(file: &Z21File, addresses: &[u16]) -> Z21File {
    let mut selected = file.clone();
    selected
        .locomotives
        .retain(|loco| addresses.contains(&loco.address));
    selected
}
