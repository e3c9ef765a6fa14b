//! Load options.

use std::path::PathBuf;

/// What to do when two locomotives in one file share an address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Keep the first record, drop later ones with a diagnostic.
    #[default]
    KeepFirst,
    /// Keep the last record, in the position of the first one.
    KeepLast,
    /// Fail the load with [`Z21Error::DuplicateAddress`](crate::Z21Error::DuplicateAddress).
    Reject,
}

/// What to do with an archive holding both `loco_data.xml` and `Loco.sqlite`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HybridPolicy {
    /// Read the database; it is the newer of the two layouts.
    #[default]
    PreferSqlite,
    PreferXml,
    /// Fail the load with [`Z21Error::AmbiguousFormat`](crate::Z21Error::AmbiguousFormat).
    Reject,
}

/// Options for [`Z21Loader`](crate::Z21Loader).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub duplicate_addresses: DuplicatePolicy,
    pub hybrid: HybridPolicy,
    /// Directory for the extracted database; the system temp dir if unset.
    pub temp_dir: Option<PathBuf>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duplicate_addresses(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_addresses = policy;
        self
    }

    pub fn with_hybrid(mut self, policy: HybridPolicy) -> Self {
        self.hybrid = policy;
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }
}
