//! `.z21` container access.
//!
//! A `.z21` file is a ZIP archive. Which inner file it carries decides the
//! format:
//!
//! ```text
//! rocoData.z21 (ZIP)              z21_new.z21 (ZIP)
//! ├── loco_data.xml   → Xml       ├── Loco.sqlite   → Sqlite
//! └── *.png / *.jpg               └── *.png / *.jpg
//! ```
//!
//! The format is chosen here, once, and carried as a [`Format`] tag. The
//! database payload is written into a private temporary directory because
//! SQLite needs random access and may add `-wal`/`-shm` files next to it.
//! The directory and everything in it live as long as the
//! [`ExtractedDatabase`] guard.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use zip::ZipArchive;

use crate::error::{Result, Z21Error};
use crate::model::Format;
use crate::options::{HybridPolicy, LoadOptions};

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg"];

/// Classify an archive entry by its final path component, ignoring ASCII case.
pub fn classify_entry(name: &str) -> Option<Format> {
    if name.ends_with('/') {
        return None;
    }
    let file_name = name.rsplit('/').next().unwrap_or(name);
    [Format::Xml, Format::Sqlite]
        .into_iter()
        .find(|format| file_name.eq_ignore_ascii_case(format.entry_name()))
}

fn is_image(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Pick the payload entry among `entries`.
///
/// Entries closer to the archive root win over deeper ones of the same
/// format. When both formats are present, `hybrid` decides.
pub fn select_entry(
    path: &Path,
    entries: &[String],
    hybrid: HybridPolicy,
) -> Result<(Format, String)> {
    let shallowest = |format: Format| {
        entries
            .iter()
            .filter(|name| classify_entry(name) == Some(format))
            .min_by_key(|name| name.matches('/').count())
            .cloned()
    };

    match (shallowest(Format::Xml), shallowest(Format::Sqlite)) {
        (Some(xml), None) => Ok((Format::Xml, xml)),
        (None, Some(sqlite)) => Ok((Format::Sqlite, sqlite)),
        (Some(xml), Some(sqlite)) => match hybrid {
            HybridPolicy::PreferSqlite => Ok((Format::Sqlite, sqlite)),
            HybridPolicy::PreferXml => Ok((Format::Xml, xml)),
            HybridPolicy::Reject => Err(Z21Error::AmbiguousFormat {
                path: path.to_path_buf(),
            }),
        },
        (None, None) => Err(Z21Error::UnknownFormat {
            path: path.to_path_buf(),
            entries: entries.to_vec(),
        }),
    }
}

/// An opened `.z21` archive with its format already detected.
pub struct Container {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
    format: Format,
    entry: String,
    images: Vec<String>,
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("entry", &self.entry)
            .field("images", &self.images.len())
            .finish()
    }
}

impl Container {
    /// Open `path` as a ZIP archive and detect its format.
    pub fn open(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Z21Error::container(path, "file not found")
            } else {
                Z21Error::container(path, format!("failed to open: {e}"))
            }
        })?;

        let mut archive = ZipArchive::new(BufReader::new(file))
            .map_err(|e| Z21Error::container(path, format!("not a valid ZIP archive: {e}")))?;

        let entries: Vec<String> = (0..archive.len())
            .filter_map(|i| {
                let file = archive.by_index_raw(i).ok()?;
                Some(file.name().to_string())
            })
            .collect();

        let (format, entry) = select_entry(path, &entries, options.hybrid)?;
        let images = entries.iter().filter(|name| is_image(name)).cloned().collect();

        tracing::debug!(
            "Detected {format} format in {} (entry {entry}, {} entries)",
            path.display(),
            entries.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            archive,
            format,
            entry,
            images,
        })
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Name of the archive entry holding the payload.
    pub fn entry_name(&self) -> &str {
        &self.entry
    }

    /// Image entries, in archive order.
    pub fn images(&self) -> &[String] {
        &self.images
    }

    /// Extract the payload of the detected format.
    pub fn extract(&mut self, options: &LoadOptions) -> Result<Payload> {
        let path = self.path.clone();
        let mut entry = self.archive.by_name(&self.entry).map_err(|e| {
            Z21Error::container(&path, format!("failed to read {}: {e}", self.entry))
        })?;

        match self.format {
            Format::Xml => {
                let mut bytes = Vec::new();
                entry.read_to_end(&mut bytes).map_err(|e| {
                    Z21Error::container(&path, format!("failed to read {}: {e}", self.entry))
                })?;
                tracing::debug!("Read {} bytes of XML from {}", bytes.len(), self.entry);
                Ok(Payload::Xml(bytes))
            }
            Format::Sqlite => {
                let db = ExtractedDatabase::create(options.temp_dir.as_deref()).map_err(|e| {
                    Z21Error::container(&path, format!("failed to create temporary directory: {e}"))
                })?;

                let written = File::create(db.path())
                    .and_then(|mut file| {
                        let n = std::io::copy(&mut entry, &mut file)?;
                        file.flush()?;
                        Ok(n)
                    })
                    .map_err(|e| {
                        Z21Error::container(&path, format!("failed to extract {}: {e}", self.entry))
                    })?;
                tracing::debug!(
                    "Extracted {written} bytes of {} into {}",
                    self.entry,
                    db.dir().display()
                );
                Ok(Payload::Sqlite(db))
            }
        }
    }
}

/// The payload of a `.z21` archive, ready for a decoder.
#[derive(Debug)]
pub enum Payload {
    Xml(Vec<u8>),
    Sqlite(ExtractedDatabase),
}

/// Temporary copy of `Loco.sqlite` in its own directory.
///
/// Dropping it removes the directory with the database and any journal
/// files SQLite created beside it.
#[derive(Debug)]
pub struct ExtractedDatabase {
    dir: TempDir,
    path: PathBuf,
}

impl ExtractedDatabase {
    /// Create an empty `z21-*` directory under `parent`, or the system temp
    /// dir when `parent` is `None`.
    fn create(parent: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("z21-");
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        let path = dir.path().join(Format::Sqlite.entry_name());
        Ok(Self { dir, path })
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the database and its journal files.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}
