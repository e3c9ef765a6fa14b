//! Common trait for the two payload decoders.

use crate::container::Payload;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::model::{Format, Z21File};
use crate::sqlite::SqliteDecoder;
use crate::xml::XmlDecoder;

/// Decodes one payload format into the unified model.
///
/// Implementations report record-level defects to `diagnostics` and keep
/// going; they return an error only when the payload as a whole is
/// unusable. The returned file's functions are in source order; the loader
/// sorts them.
pub trait Decoder: Send + Sync {
    /// Human-readable name of the decoder.
    fn name(&self) -> &'static str;

    /// The format this decoder reads.
    fn format(&self) -> Format;

    /// Decode a payload extracted by the container.
    fn decode(&self, payload: &Payload, diagnostics: &mut Diagnostics) -> Result<Z21File>;
}

/// The decoder for `format`.
pub fn decoder_for(format: Format) -> &'static dyn Decoder {
    match format {
        Format::Xml => &XmlDecoder,
        Format::Sqlite => &SqliteDecoder,
    }
}
