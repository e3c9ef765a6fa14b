//! Decoder for the old `loco_data.xml` layout.
//!
//! ## Structure
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <z21>
//!   <exportmeta><version>3</version></exportmeta>
//!   <locos>
//!     <loco>
//!       <address>3</address>
//!       <name>BR 218</name>
//!       <max_speed>140</max_speed>
//!       <traction_direction>1</traction_direction>
//!       <functions>
//!         <function_element>
//!           <function>0</function>
//!           <image_name>light</image_name>
//!           <position>0</position>
//!           <button_type>0</button_type>
//!         </function_element>
//!       </functions>
//!       <cvs><cv><number>29</number><value>6</value></cv></cvs>
//!     </loco>
//!   </locos>
//! </z21>
//! ```
//!
//! Field values are read from child element text. An attribute of the same
//! name on the record element is accepted too; child elements take
//! precedence.

use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::encoding::Decoder as TextDecoder;
use quick_xml::events::{BytesStart, Event};

use crate::container::Payload;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{Result, Z21Error};
use crate::fields::{self, FieldValue, RawRecord};
use crate::format::Decoder;
use crate::model::{Format, Locomotive, Z21File};

/// XML payload decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlDecoder;

impl Decoder for XmlDecoder {
    fn name(&self) -> &'static str {
        "XML"
    }

    fn format(&self) -> Format {
        Format::Xml
    }

    fn decode(&self, payload: &Payload, diagnostics: &mut Diagnostics) -> Result<Z21File> {
        match payload {
            Payload::Xml(bytes) => self.decode_bytes(bytes, diagnostics),
            Payload::Sqlite(_) => Err(Z21Error::malformed(
                "XML decoder received a SQLite payload",
            )),
        }
    }
}

impl XmlDecoder {
    /// Decode `loco_data.xml` content.
    pub fn decode_bytes(&self, input: &[u8], diagnostics: &mut Diagnostics) -> Result<Z21File> {
        let root = parse_tree(input)?;
        let mut file = Z21File::new(Format::Xml);

        if let Some(version) = root.child("exportmeta").and_then(|m| m.child("version")) {
            match FieldValue::Text(version.text.clone()).as_i64() {
                Some(v) => file.version = Some(v),
                None => diagnostics.report(
                    DiagnosticKind::InvalidValue,
                    "exportmeta/version",
                    format!("expected an integer, found '{}'", version.text),
                ),
            }
        }

        if let Some(locos) = root.child("locos") {
            for (i, loco_element) in locos.children_named("loco").enumerate() {
                let label = format!("locos/loco[{}]", i + 1);
                if let Some(loco) = read_locomotive(loco_element, &label, diagnostics) {
                    file.locomotives.push(loco);
                }
            }
        }

        if let Some(accessories) = root.child("accessories") {
            for (i, element) in accessories.children_named("accessory").enumerate() {
                let record = element.record(format!("accessories/accessory[{}]", i + 1));
                if let Some(accessory) = fields::build_accessory(&record, diagnostics) {
                    file.accessories.push(accessory);
                }
            }
        }

        if let Some(layouts) = root.child("layouts") {
            for (i, element) in layouts.children_named("layout").enumerate() {
                let record = element.record(format!("layouts/layout[{}]", i + 1));
                if let Some(layout) = fields::build_layout(&record, diagnostics) {
                    file.layouts.push(layout);
                }
            }
        }

        if let Some(settings) = root.child("settings") {
            let record = settings.record("settings");
            file.settings = Some(fields::build_settings(&record, diagnostics));
        }

        tracing::debug!(
            "Decoded {} locomotive(s) from XML",
            file.locomotives.len()
        );
        Ok(file)
    }
}

fn read_locomotive(
    element: &XmlElement,
    label: &str,
    diagnostics: &mut Diagnostics,
) -> Option<Locomotive> {
    let mut loco = fields::build_locomotive(&element.record(label), diagnostics)?;

    if let Some(functions) = element.child("functions") {
        for (j, function_element) in functions.children_named("function_element").enumerate() {
            let function_label = format!("{label}/functions/function_element[{}]", j + 1);
            let record = function_element.record(function_label.as_str());
            if let Some(function) = fields::build_function(&record, diagnostics) {
                fields::attach_function(&mut loco, function, &function_label, diagnostics);
            }
        }
    }

    if let Some(cvs) = element.child("cvs") {
        let mut values = BTreeMap::new();
        for (k, cv_element) in cvs.children_named("cv").enumerate() {
            let record = cv_element.record(format!("{label}/cvs/cv[{}]", k + 1));
            if let Some((number, value)) = fields::build_cv(&record, diagnostics) {
                values.insert(number, value);
            }
        }
        loco.cvs = Some(values);
    }

    Some(loco)
}

// ============================================================================
// ELEMENT TREE
// ============================================================================

/// Minimal element tree; the documents are small.
#[derive(Debug, Default)]
struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<XmlElement>,
}

impl XmlElement {
    fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Flatten attributes and leaf children into a record.
    fn record(&self, label: impl Into<String>) -> RawRecord {
        let mut record = RawRecord::new(label);
        for (key, value) in &self.attributes {
            record.insert_text(key.as_str(), value.as_str());
        }
        for child in self.children.iter().filter(|c| c.children.is_empty()) {
            record.insert_text(child.name.as_str(), child.text.trim());
        }
        record
    }
}

fn start_element(e: &BytesStart<'_>, decoder: TextDecoder) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Z21Error::malformed(format!("attribute error: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .decode_and_unescape_value(decoder)
            .map_err(|e| Z21Error::malformed(format!("attribute value error: {e}")))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        ..XmlElement::default()
    })
}

/// Parse `input` into a tree and return the root element.
///
/// Text is decoded with the encoding named in the XML declaration, UTF-8
/// when there is none.
fn parse_tree(input: &[u8]) -> Result<XmlElement> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                stack.push(start_element(e, reader.decoder())?);
            }
            Ok(Event::Empty(ref e)) => {
                let element = start_element(e, reader.decoder())?;
                close_element(element, &mut stack, &mut root)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Z21Error::malformed("unexpected closing tag"))?;
                close_element(element, &mut stack, &mut root)?;
            }
            Ok(Event::Text(ref t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| Z21Error::malformed(format!("text error: {e}")))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(ref c)) => {
                let text = c
                    .decode()
                    .map_err(|e| Z21Error::malformed(format!("CDATA error: {e}")))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Z21Error::malformed(format!(
                    "XML parse error at position {}: {e}",
                    reader.error_position()
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(Z21Error::malformed(format!(
            "unexpected end of document: <{}> is not closed",
            open.name
        )));
    }
    root.ok_or_else(|| Z21Error::malformed("document has no root element"))
}

fn close_element(
    element: XmlElement,
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(Z21Error::malformed(format!(
                "second root element <{}>",
                element.name
            )));
        }
    }
    Ok(())
}
