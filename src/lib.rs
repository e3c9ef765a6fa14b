//! # z21
//!
//! Loader for Z21 locomotive data files.
//!
//! A `.z21` file is a ZIP archive carrying either the old `loco_data.xml`
//! or the newer `Loco.sqlite`. Both load into the same [`Z21File`] model.
//!
//! ```no_run
//! let loaded = z21::load("rocoData.z21")?;
//! for loco in &loaded.file.locomotives {
//!     println!("{loco}: {} function(s)", loco.function_count());
//! }
//! # Ok::<(), z21::Z21Error>(())
//! ```
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! loader     → Z21Loader, load(path)
//!   ↓
//! format     → Decoder trait, dispatch on Format
//!   ↓
//! xml/sqlite → payload decoders
//!   ↓
//! fields     → field tables, record → model mapping
//!   ↓
//! container  → ZIP access, format detection, temp extraction
//!   ↓
//! model      → Z21File, Locomotive, FunctionInfo, ...
//! ```

// ============================================================================
// MODULES
// ============================================================================

/// Fatal load errors
pub mod error;

/// Format-independent data model
pub mod model;

/// Record-level defects reported next to a loaded file
pub mod diagnostics;

/// Load options and policies
pub mod options;

/// Field tables shared by both decoders
pub mod fields;

/// ZIP container access and format detection
pub mod container;

/// Decoder trait
pub mod format;

/// `loco_data.xml` decoder
pub mod xml;

/// `Loco.sqlite` decoder
pub mod sqlite;

/// Unified entry point
pub mod loader;

/// JSON export and re-import
pub mod export;

/// Function icon mapping
pub mod icons;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use container::{Container, Payload};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use error::{Result, Z21Error};
pub use format::{Decoder, decoder_for};
pub use icons::IconMapping;
pub use loader::{Loaded, Z21Loader, load};
pub use model::{
    Accessory, ButtonType, Direction, Format, FunctionInfo, Layout, LocoDetails, Locomotive,
    RailVehicleType, Settings, SpeedDisplay, Z21File,
};
pub use options::{DuplicatePolicy, HybridPolicy, LoadOptions};
pub use sqlite::SqliteDecoder;
pub use xml::XmlDecoder;
