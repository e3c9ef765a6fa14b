//! Unified entry point: path in, [`Z21File`] out.
//!
//! ```text
//! Container::open ──► detect format ──► extract payload
//!                                           │
//!                     decoder_for(format) ◄─┘
//!                           │
//!                  duplicate policy ──► sort functions ──► Loaded
//! ```

use std::path::Path;

use rustc_hash::FxHashMap;

use crate::container::Container;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::{Result, Z21Error};
use crate::format::decoder_for;
use crate::model::Z21File;
use crate::options::{DuplicatePolicy, LoadOptions};

/// A loaded file and the record-level defects found while loading it.
#[derive(Clone, Debug)]
pub struct Loaded {
    pub file: Z21File,
    pub diagnostics: Vec<Diagnostic>,
}

/// Loads `.z21` files with a fixed set of options.
#[derive(Clone, Debug, Default)]
pub struct Z21Loader {
    options: LoadOptions,
}

impl Z21Loader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: LoadOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Load a `.z21` file.
    ///
    /// Any temporary file created for the database payload is removed
    /// before this returns, on success and on error alike.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Loaded> {
        let path = path.as_ref();
        let mut container = Container::open(path, &self.options)?;
        let format = container.format();

        let mut diagnostics = Diagnostics::new();
        let mut file = {
            let payload = container.extract(&self.options)?;
            decoder_for(format)
                .decode(&payload, &mut diagnostics)
                .map_err(|e| relabel(e, path, container.entry_name()))?
        };

        file.images = container.images().to_vec();
        apply_duplicate_policy(&mut file, self.options.duplicate_addresses, &mut diagnostics)?;
        for loco in &mut file.locomotives {
            loco.sort_functions();
        }

        tracing::info!(
            "Loaded {} ({format}): {} locomotive(s), {} function(s), {} diagnostic(s)",
            path.display(),
            file.locomotives.len(),
            file.functions().count(),
            diagnostics.len()
        );

        Ok(Loaded {
            file,
            diagnostics: diagnostics.into_vec(),
        })
    }
}

/// Load `path` with default options.
pub fn load(path: impl AsRef<Path>) -> Result<Loaded> {
    Z21Loader::new().load(path)
}

/// Container errors raised against the extracted temp file name the archive
/// and entry instead.
fn relabel(error: Z21Error, path: &Path, entry: &str) -> Z21Error {
    match error {
        Z21Error::Container { message, .. } => {
            Z21Error::container(path, format!("{entry}: {message}"))
        }
        other => other,
    }
}

/// Resolve locomotives that share an address.
fn apply_duplicate_policy(
    file: &mut Z21File,
    policy: DuplicatePolicy,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    let mut seen: FxHashMap<u16, usize> = FxHashMap::default();
    let mut kept = Vec::with_capacity(file.locomotives.len());

    for loco in std::mem::take(&mut file.locomotives) {
        let Some(&index) = seen.get(&loco.address) else {
            seen.insert(loco.address, kept.len());
            kept.push(loco);
            continue;
        };

        let label = format!("address {}", loco.address);
        match policy {
            DuplicatePolicy::Reject => {
                return Err(Z21Error::DuplicateAddress {
                    address: loco.address,
                });
            }
            DuplicatePolicy::KeepFirst => diagnostics.report(
                DiagnosticKind::DuplicateAddress,
                label,
                format!("dropped '{}'; keeping '{}'", loco.name, kept_name(&kept, index)),
            ),
            DuplicatePolicy::KeepLast => {
                diagnostics.report(
                    DiagnosticKind::DuplicateAddress,
                    label,
                    format!("replaced '{}' with '{}'", kept_name(&kept, index), loco.name),
                );
                kept[index] = loco;
            }
        }
    }

    file.locomotives = kept;
    Ok(())
}

fn kept_name(kept: &[crate::model::Locomotive], index: usize) -> &str {
    kept.get(index).map(|l| l.name.as_str()).unwrap_or_default()
}
