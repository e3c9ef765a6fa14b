//! Diagnostics for record-level defects.
//!
//! A defect in one locomotive or function record never aborts a load. The
//! decoders report it here instead, and the loader hands the list back next
//! to the loaded file.

use std::fmt;

use serde::Serialize;

/// What went wrong with a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A required field was missing or unusable; the record was dropped.
    SkippedRecord,
    /// An optional field could not be parsed; its default was used.
    InvalidValue,
    /// A locomotive repeated an address already seen; one of them was dropped.
    DuplicateAddress,
    /// A locomotive mapped the same function number twice; the later one was dropped.
    DuplicateFunction,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::SkippedRecord => "skipped record",
            DiagnosticKind::InvalidValue => "invalid value",
            DiagnosticKind::DuplicateAddress => "duplicate address",
            DiagnosticKind::DuplicateFunction => "duplicate function",
        }
    }
}

/// A single record-level defect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Where the record came from, e.g. `locos/loco[2]` or `vehicles[id=14]`.
    pub record: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, record: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            record: record.into(),
            message: message.into(),
        }
    }

    /// Create a skipped-record diagnostic naming the unusable required fields.
    pub fn skipped(record: impl Into<String>, missing: &[&str]) -> Self {
        Self::new(
            DiagnosticKind::SkippedRecord,
            record,
            format!("missing or invalid required field(s): {}", missing.join(", ")),
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.record, self.kind.as_str(), self.message)
    }
}

/// Collector passed through the decoders.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and log it.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{diagnostic}");
        self.items.push(diagnostic);
    }

    pub fn report(
        &mut self,
        kind: DiagnosticKind,
        record: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic::new(kind, record, message));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of diagnostics of the given kind.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
