//! Error types for loading Z21 files.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that abort a load.
///
/// Record-level defects are not errors; they are reported as
/// [`Diagnostic`](crate::Diagnostic)s next to the loaded file.
#[derive(Debug, Error)]
pub enum Z21Error {
    /// The path is missing, is not a ZIP archive, or its payload is unusable.
    #[error("Container error in {}: {message}", path.display())]
    Container { path: PathBuf, message: String },

    /// The archive holds neither `loco_data.xml` nor `Loco.sqlite`.
    #[error("Unknown format in {}: no loco_data.xml or Loco.sqlite among [{}]", path.display(), entries.join(", "))]
    UnknownFormat { path: PathBuf, entries: Vec<String> },

    /// The archive holds both inner files and the hybrid policy rejects it.
    #[error("Ambiguous format in {}: archive contains both loco_data.xml and Loco.sqlite", path.display())]
    AmbiguousFormat { path: PathBuf },

    /// A required SQLite table or column is absent.
    #[error("Schema error: missing column {column} in table {table}")]
    Schema { table: String, column: String },

    /// The XML payload is not well-formed.
    #[error("Malformed data: {0}")]
    MalformedData(String),

    /// Two locomotives share an address and the duplicate policy rejects it.
    #[error("Duplicate locomotive address: {address}")]
    DuplicateAddress { address: u16 },

    /// SQLite query failure on an otherwise valid database.
    #[error("Database error: {0}")]
    Database(String),

    /// JSON export or import error.
    #[error("JSON error: {0}")]
    Json(String),

    /// IO error outside the container itself (export targets, icon files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Z21Error {
    /// Create a container error for `path`.
    pub fn container(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Container {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Create a schema error for a missing column.
    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Schema {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Create a schema error for a missing table.
    ///
    /// The column is reported as `*` since no column of the table exists.
    pub fn missing_table(table: impl Into<String>) -> Self {
        Self::Schema {
            table: table.into(),
            column: "*".to_string(),
        }
    }

    /// Create a malformed data error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedData(message.into())
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    /// Create a JSON error.
    pub fn json(message: impl Into<String>) -> Self {
        Self::Json(message.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Z21Error>;
