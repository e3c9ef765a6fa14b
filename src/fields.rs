//! Field mapping from source records to the model.
//!
//! Both decoders flatten what they read into a [`RawRecord`]: a list of
//! named values. The tables in this module say which source field feeds
//! which model attribute and which fields a record cannot do without. The
//! SQLite decoder also uses them to build its `SELECT` lists and to check
//! the schema before querying.

use indexmap::IndexMap;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::model::{
    Accessory, ButtonType, Direction, FunctionInfo, Layout, Locomotive, RailVehicleType,
    Settings, SpeedDisplay,
};

// ============================================================================
// RAW VALUES
// ============================================================================

/// A value as stored in the source, before conversion.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Real(f64),
}

impl FieldValue {
    /// Integer view. Text is trimmed and parsed; reals must be integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            FieldValue::Real(r) => integral(*r),
            FieldValue::Text(t) => {
                let t = t.trim();
                t.parse::<i64>()
                    .ok()
                    .or_else(|| t.parse::<f64>().ok().and_then(integral))
            }
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Real(r) => Some(*r),
            FieldValue::Text(t) => t.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    /// Boolean view: non-zero numbers and `true`/`yes` are true.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Text(t) => match t.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => Some(true),
                "false" | "no" => Some(false),
                _ => self.as_i64_lenient().map(|i| i != 0),
            },
            _ => self.as_i64_lenient().map(|i| i != 0),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Text(t) => t.clone(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Real(r) => r.to_string(),
        }
    }

    fn as_i64_lenient(&self) -> Option<i64> {
        match self {
            FieldValue::Real(r) => Some(r.round() as i64),
            _ => self.as_i64(),
        }
    }
}

fn integral(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

/// One source record: an XML element's children or a SQLite row.
#[derive(Clone, Debug)]
pub struct RawRecord {
    label: String,
    fields: IndexMap<String, FieldValue>,
}

impl RawRecord {
    /// Create an empty record; `label` identifies it in diagnostics.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Store a value. Blank text counts as absent and is not stored.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        if matches!(&value, FieldValue::Text(t) if t.trim().is_empty()) {
            return;
        }
        self.fields.insert(name.into(), value);
    }

    /// Store a text value.
    pub fn insert_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.insert(name, FieldValue::Text(value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Look a field up under its source name, then under its aliases.
    pub fn lookup<T>(&self, spec: &FieldSpec<T>) -> Option<&FieldValue> {
        spec.names().find_map(|name| self.get(name))
    }
}

// ============================================================================
// FIELD TABLES
// ============================================================================

/// Maps one source field onto one model attribute.
#[derive(Clone, Copy, Debug)]
pub struct FieldSpec<T> {
    /// Field name in the source (XML element/attribute or SQLite column).
    pub source: &'static str,
    /// Alternative spellings seen in the wild.
    pub aliases: &'static [&'static str],
    pub target: T,
    /// A record without this field is skipped.
    pub required: bool,
}

impl<T> FieldSpec<T> {
    pub const fn required(source: &'static str, target: T) -> Self {
        Self {
            source,
            aliases: &[],
            target,
            required: true,
        }
    }

    pub const fn optional(source: &'static str, target: T) -> Self {
        Self {
            source,
            aliases: &[],
            target,
            required: false,
        }
    }

    pub const fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    /// Source name followed by the aliases.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.source).chain(self.aliases.iter().copied())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocoField {
    Address,
    Name,
    MaxSpeed,
    Direction,
    ImageName,
    FullName,
    Railway,
    Description,
    ArticleNumber,
    DecoderType,
    BuildYear,
    BufferLength,
    ModelBufferLength,
    ServiceWeight,
    ModelWeight,
    Rmin,
    Ip,
    DriversCab,
    InStockSince,
    Active,
    SpeedDisplay,
    VehicleType,
}

/// Locomotive fields. The SQLite column names keep the app's own spelling
/// (`buffer_lenght`).
pub const LOCO_FIELDS: &[FieldSpec<LocoField>] = &[
    FieldSpec::required("address", LocoField::Address),
    FieldSpec::required("name", LocoField::Name),
    FieldSpec::optional("max_speed", LocoField::MaxSpeed),
    FieldSpec::optional("traction_direction", LocoField::Direction),
    FieldSpec::optional("image_name", LocoField::ImageName),
    FieldSpec::optional("full_name", LocoField::FullName),
    FieldSpec::optional("railway", LocoField::Railway),
    FieldSpec::optional("description", LocoField::Description),
    FieldSpec::optional("article_number", LocoField::ArticleNumber),
    FieldSpec::optional("decoder_type", LocoField::DecoderType),
    FieldSpec::optional("build_year", LocoField::BuildYear),
    FieldSpec::optional("buffer_lenght", LocoField::BufferLength).aliases(&["buffer_length"]),
    FieldSpec::optional("model_buffer_lenght", LocoField::ModelBufferLength)
        .aliases(&["model_buffer_length"]),
    FieldSpec::optional("service_weight", LocoField::ServiceWeight),
    FieldSpec::optional("model_weight", LocoField::ModelWeight),
    FieldSpec::optional("rmin", LocoField::Rmin),
    FieldSpec::optional("ip", LocoField::Ip),
    FieldSpec::optional("drivers_cab", LocoField::DriversCab),
    FieldSpec::optional("in_stock_since", LocoField::InStockSince)
        .aliases(&["inStockSince", "in_stock_since_date"]),
    FieldSpec::optional("active", LocoField::Active),
    FieldSpec::optional("speed_display", LocoField::SpeedDisplay),
    FieldSpec::optional("type", LocoField::VehicleType),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionField {
    Number,
    Icon,
    ButtonType,
    Position,
    Shortcut,
    Time,
    Active,
}

pub const FUNCTION_FIELDS: &[FieldSpec<FunctionField>] = &[
    FieldSpec::required("function", FunctionField::Number),
    FieldSpec::optional("image_name", FunctionField::Icon),
    FieldSpec::optional("button_type", FunctionField::ButtonType),
    FieldSpec::optional("position", FunctionField::Position),
    FieldSpec::optional("shortcut", FunctionField::Shortcut),
    FieldSpec::optional("time", FunctionField::Time),
    FieldSpec::optional("active", FunctionField::Active),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CvField {
    Number,
    Value,
}

pub const CV_FIELDS: &[FieldSpec<CvField>] = &[
    FieldSpec::required("number", CvField::Number).aliases(&["cv"]),
    FieldSpec::required("value", CvField::Value),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessoryField {
    Address,
    Name,
    Kind,
    State,
}

pub const ACCESSORY_FIELDS: &[FieldSpec<AccessoryField>] = &[
    FieldSpec::required("address", AccessoryField::Address),
    FieldSpec::required("name", AccessoryField::Name),
    FieldSpec::optional("type", AccessoryField::Kind).aliases(&["accessory_type"]),
    FieldSpec::optional("state", AccessoryField::State),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutField {
    Name,
}

pub const LAYOUT_FIELDS: &[FieldSpec<LayoutField>] = &[FieldSpec::required("name", LayoutField::Name)];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsField {
    AutoStop,
    BoostMode,
}

pub const SETTINGS_FIELDS: &[FieldSpec<SettingsField>] = &[
    FieldSpec::optional("auto_stop", SettingsField::AutoStop),
    FieldSpec::optional("boost_mode", SettingsField::BoostMode),
];

// ============================================================================
// BUILDERS
// ============================================================================

/// Source names of the required fields that are absent or fail `usable`.
fn unusable_required<T: Copy>(
    record: &RawRecord,
    specs: &[FieldSpec<T>],
    usable: impl Fn(T, &FieldValue) -> bool,
) -> Vec<&'static str> {
    specs
        .iter()
        .filter(|spec| spec.required)
        .filter(|spec| !record.lookup(spec).is_some_and(|v| usable(spec.target, v)))
        .map(|spec| spec.source)
        .collect()
}

/// Convert an optional field, reporting values that do not convert.
fn convert<T, R>(
    record: &RawRecord,
    spec: &FieldSpec<T>,
    diagnostics: &mut Diagnostics,
    expected: &str,
    f: impl FnOnce(&FieldValue) -> Option<R>,
) -> Option<R> {
    let value = record.lookup(spec)?;
    let converted = f(value);
    if converted.is_none() {
        diagnostics.report(
            DiagnosticKind::InvalidValue,
            record.label(),
            format!(
                "{}: expected {expected}, found '{}'; using default",
                spec.source,
                value.as_text()
            ),
        );
    }
    converted
}

fn to_u16(v: &FieldValue) -> Option<u16> {
    v.as_i64().and_then(|i| u16::try_from(i).ok())
}

fn to_u8(v: &FieldValue) -> Option<u8> {
    v.as_i64().and_then(|i| u8::try_from(i).ok())
}

fn to_u32(v: &FieldValue) -> Option<u32> {
    v.as_i64().and_then(|i| u32::try_from(i).ok())
}

fn to_name(v: &FieldValue) -> Option<String> {
    let text = v.as_text();
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Build a locomotive (without functions or CVs) from a record.
///
/// Returns `None` and reports one [`DiagnosticKind::SkippedRecord`] when
/// the address or name is missing or unusable.
pub fn build_locomotive(record: &RawRecord, diagnostics: &mut Diagnostics) -> Option<Locomotive> {
    let missing = unusable_required(record, LOCO_FIELDS, |target, value| match target {
        LocoField::Address => to_u16(value).is_some(),
        LocoField::Name => to_name(value).is_some(),
        _ => true,
    });
    if !missing.is_empty() {
        diagnostics.push(Diagnostic::skipped(record.label(), &missing));
        return None;
    }

    let mut loco = Locomotive::new(0, String::new());
    for spec in LOCO_FIELDS {
        let details = &mut loco.details;
        match spec.target {
            LocoField::Address => {
                loco.address = record.lookup(spec).and_then(to_u16).unwrap_or_default();
            }
            LocoField::Name => {
                loco.name = record.lookup(spec).and_then(to_name).unwrap_or_default();
            }
            LocoField::MaxSpeed => {
                if let Some(v) = convert(record, spec, diagnostics, "a speed", to_u32) {
                    loco.max_speed = v;
                }
            }
            LocoField::Direction => {
                if let Some(v) = convert(record, spec, diagnostics, "an integer", FieldValue::as_i64)
                {
                    loco.direction = Direction::from_code(v);
                }
            }
            LocoField::ImageName => details.image_name = text(record, spec),
            LocoField::FullName => details.full_name = text(record, spec),
            LocoField::Railway => details.railway = text(record, spec),
            LocoField::Description => details.description = text(record, spec),
            LocoField::ArticleNumber => details.article_number = text(record, spec),
            LocoField::DecoderType => details.decoder_type = text(record, spec),
            LocoField::BuildYear => details.build_year = text(record, spec),
            LocoField::BufferLength => details.buffer_length = text(record, spec),
            LocoField::ModelBufferLength => details.model_buffer_length = text(record, spec),
            LocoField::ServiceWeight => details.service_weight = text(record, spec),
            LocoField::ModelWeight => details.model_weight = text(record, spec),
            LocoField::Rmin => details.rmin = text(record, spec),
            LocoField::Ip => details.ip = text(record, spec),
            LocoField::DriversCab => details.drivers_cab = text(record, spec),
            LocoField::InStockSince => details.in_stock_since = text(record, spec),
            LocoField::Active => {
                if let Some(v) = convert(record, spec, diagnostics, "a boolean", FieldValue::as_bool)
                {
                    details.active = v;
                }
            }
            LocoField::SpeedDisplay => {
                if let Some(v) = convert(record, spec, diagnostics, "0, 1 or 2", |v| {
                    v.as_i64().and_then(SpeedDisplay::from_code)
                }) {
                    details.speed_display = v;
                }
            }
            LocoField::VehicleType => {
                if let Some(v) = convert(record, spec, diagnostics, "0, 1 or 2", |v| {
                    v.as_i64().and_then(RailVehicleType::from_code)
                }) {
                    details.vehicle_type = v;
                }
            }
        }
    }
    Some(loco)
}

fn text<T>(record: &RawRecord, spec: &FieldSpec<T>) -> Option<String> {
    record.lookup(spec).map(FieldValue::as_text)
}

/// Build one function mapping. Skips the record when the function number
/// is missing or outside `0..=255`.
pub fn build_function(record: &RawRecord, diagnostics: &mut Diagnostics) -> Option<FunctionInfo> {
    let missing = unusable_required(record, FUNCTION_FIELDS, |target, value| match target {
        FunctionField::Number => to_u8(value).is_some(),
        _ => true,
    });
    if !missing.is_empty() {
        diagnostics.push(Diagnostic::skipped(record.label(), &missing));
        return None;
    }

    let mut function = FunctionInfo::new(0);
    for spec in FUNCTION_FIELDS {
        match spec.target {
            FunctionField::Number => {
                function.number = record.lookup(spec).and_then(to_u8).unwrap_or_default();
            }
            FunctionField::Icon => function.icon = text(record, spec).unwrap_or_default(),
            FunctionField::ButtonType => {
                if let Some(v) = convert(record, spec, diagnostics, "0, 1 or 2", |v| {
                    v.as_i64().and_then(ButtonType::from_code)
                }) {
                    function.button_type = v;
                }
            }
            FunctionField::Position => {
                if let Some(v) = convert(record, spec, diagnostics, "a position", to_u32) {
                    function.position = v;
                }
            }
            FunctionField::Shortcut => function.shortcut = text(record, spec),
            FunctionField::Time => {
                function.time_delay =
                    convert(record, spec, diagnostics, "a number", FieldValue::as_f64)
                        .filter(|t| *t > 0.0);
            }
            FunctionField::Active => {
                if let Some(v) = convert(record, spec, diagnostics, "a boolean", FieldValue::as_bool)
                {
                    function.active = v;
                }
            }
        }
    }
    Some(function)
}

/// Build one `(cv number, value)` pair.
pub fn build_cv(record: &RawRecord, diagnostics: &mut Diagnostics) -> Option<(u16, u8)> {
    let missing = unusable_required(record, CV_FIELDS, |target, value| match target {
        CvField::Number => to_u16(value).is_some_and(|n| n > 0),
        CvField::Value => to_u8(value).is_some(),
    });
    if !missing.is_empty() {
        diagnostics.push(Diagnostic::skipped(record.label(), &missing));
        return None;
    }

    let mut number = 0;
    let mut value = 0;
    for spec in CV_FIELDS {
        match spec.target {
            CvField::Number => number = record.lookup(spec).and_then(to_u16).unwrap_or_default(),
            CvField::Value => value = record.lookup(spec).and_then(to_u8).unwrap_or_default(),
        }
    }
    Some((number, value))
}

pub fn build_accessory(record: &RawRecord, diagnostics: &mut Diagnostics) -> Option<Accessory> {
    let missing = unusable_required(record, ACCESSORY_FIELDS, |target, value| match target {
        AccessoryField::Address => to_u16(value).is_some(),
        AccessoryField::Name => to_name(value).is_some(),
        _ => true,
    });
    if !missing.is_empty() {
        diagnostics.push(Diagnostic::skipped(record.label(), &missing));
        return None;
    }

    let mut accessory = Accessory {
        address: 0,
        name: String::new(),
        kind: "unknown".to_string(),
        state: 0,
    };
    for spec in ACCESSORY_FIELDS {
        match spec.target {
            AccessoryField::Address => {
                accessory.address = record.lookup(spec).and_then(to_u16).unwrap_or_default();
            }
            AccessoryField::Name => {
                accessory.name = record.lookup(spec).and_then(to_name).unwrap_or_default();
            }
            AccessoryField::Kind => {
                if let Some(kind) = text(record, spec) {
                    accessory.kind = kind;
                }
            }
            AccessoryField::State => {
                if let Some(v) = convert(record, spec, diagnostics, "an integer", FieldValue::as_i64)
                {
                    accessory.state = v;
                }
            }
        }
    }
    Some(accessory)
}

pub fn build_layout(record: &RawRecord, diagnostics: &mut Diagnostics) -> Option<Layout> {
    let missing = unusable_required(record, LAYOUT_FIELDS, |target, value| match target {
        LayoutField::Name => to_name(value).is_some(),
    });
    if !missing.is_empty() {
        diagnostics.push(Diagnostic::skipped(record.label(), &missing));
        return None;
    }
    let name = LAYOUT_FIELDS
        .iter()
        .find_map(|spec| record.lookup(spec).and_then(to_name))
        .unwrap_or_default();
    Some(Layout { name })
}

pub fn build_settings(record: &RawRecord, diagnostics: &mut Diagnostics) -> Settings {
    let mut settings = Settings::default();
    for spec in SETTINGS_FIELDS {
        let value = convert(record, spec, diagnostics, "a boolean", FieldValue::as_bool);
        match spec.target {
            SettingsField::AutoStop => settings.auto_stop = value.unwrap_or_default(),
            SettingsField::BoostMode => settings.boost_mode = value.unwrap_or_default(),
        }
    }
    settings
}

/// Add a function to a locomotive unless its number is already mapped.
///
/// The first mapping of a number wins; later ones are reported.
pub fn attach_function(
    loco: &mut Locomotive,
    function: FunctionInfo,
    label: &str,
    diagnostics: &mut Diagnostics,
) {
    if loco.function(function.number).is_some() {
        diagnostics.report(
            DiagnosticKind::DuplicateFunction,
            label,
            format!(
                "function F{} already mapped for address {}; ignoring this mapping",
                function.number, loco.address
            ),
        );
        return;
    }
    loco.functions.push(function);
}
