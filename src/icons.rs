//! Function icon lookup.
//!
//! `icon_mapping.json` maps the raw icon keys stored in function records to
//! display metadata:
//!
//! ```json
//! { "matches": {
//!     "light": { "path": "icons/light_Normal.png", "filename": "light_Normal.png" },
//!     "horn": "horn_Normal.png"
//! } }
//! ```
//!
//! Values are either an object with a `filename` or a bare file name.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, Z21Error};
use crate::model::Z21File;

#[derive(Deserialize)]
struct MappingFile {
    #[serde(default)]
    matches: IndexMap<String, Value>,
}

/// Icon keys and their display metadata, in file order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IconMapping {
    matches: IndexMap<String, Value>,
}

impl IconMapping {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let file: MappingFile = serde_json::from_slice(bytes)
            .map_err(|e| Z21Error::json(format!("icon mapping: {e}")))?;
        tracing::debug!("Loaded {} icon mapping(s)", file.matches.len());
        Ok(Self {
            matches: file.matches,
        })
    }

    /// Metadata for `key`.
    pub fn resolve(&self, key: &str) -> Option<&Value> {
        self.matches.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.matches.contains_key(key)
    }

    /// Image file name for `key`, from either value shape.
    pub fn filename(&self, key: &str) -> Option<&str> {
        let name = match self.resolve(key)? {
            Value::Object(map) => map.get("filename")?.as_str()?,
            Value::String(name) => name.as_str(),
            _ => return None,
        };
        (!name.is_empty()).then_some(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.matches.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Icon keys used by `file` that have no mapping, deduplicated, in
    /// first-use order. Functions without an icon are ignored.
    pub fn unmapped_icons<'a>(&self, file: &'a Z21File) -> Vec<&'a str> {
        let mut unmapped: Vec<&str> = Vec::new();
        for (_, function) in file.functions() {
            let icon = function.icon.as_str();
            if !icon.is_empty() && !self.contains(icon) && !unmapped.contains(&icon) {
                unmapped.push(icon);
            }
        }
        unmapped
    }
}

/// File names tried for an icon key that has no mapping.
pub fn fallback_file_names(key: &str) -> [String; 4] {
    [
        key.to_string(),
        format!("{key}_normal.png"),
        format!("{key}_Normal.png"),
        format!("{key}.png"),
    ]
}
