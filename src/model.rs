//! Format-independent model of a Z21 file.
//!
//! Both decoders produce the same types, so consumers never care whether a
//! file came from the old XML layout or the newer SQLite layout.
//!
//! ```text
//! Z21File
//! ├── format: Format                (xml | sqlite)
//! ├── locomotives: Vec<Locomotive>  (source order)
//! │   ├── functions: Vec<FunctionInfo>  (sorted by position, number)
//! │   └── cvs: Option<BTreeMap<u16, u8>>
//! ├── accessories: Vec<Accessory>
//! ├── layouts: Vec<Layout>
//! └── settings: Option<Settings>
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// FORMAT
// ============================================================================

/// Inner layout of a `.z21` archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Old layout: `loco_data.xml`.
    Xml,
    /// New layout: `Loco.sqlite`.
    Sqlite,
}

impl Format {
    /// Name of the archive entry that marks this format.
    pub fn entry_name(self) -> &'static str {
        match self {
            Format::Xml => "loco_data.xml",
            Format::Sqlite => "Loco.sqlite",
        }
    }

    /// Short lowercase tag, as used in JSON output.
    pub fn tag(self) -> &'static str {
        match self {
            Format::Xml => "xml",
            Format::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ============================================================================
// ENUMERATED FIELDS
// ============================================================================

/// How a function button behaves in the control app.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonType {
    /// Switch: press on, press off.
    #[default]
    Toggle,
    /// Push-button: active while held.
    Momentary,
    /// Time button: active for a fixed delay.
    Timed,
}

impl ButtonType {
    /// Decode the numeric code stored in both source formats.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ButtonType::Toggle),
            1 => Some(ButtonType::Momentary),
            2 => Some(ButtonType::Timed),
            _ => None,
        }
    }

    /// Numeric code as stored in the source formats.
    pub fn code(self) -> i64 {
        match self {
            ButtonType::Toggle => 0,
            ButtonType::Momentary => 1,
            ButtonType::Timed => 2,
        }
    }

    /// Label shown by the control app.
    pub fn label(self) -> &'static str {
        match self {
            ButtonType::Toggle => "switch",
            ButtonType::Momentary => "push-button",
            ButtonType::Timed => "time button",
        }
    }
}

/// Default travel direction of a locomotive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    /// `1` means forward; every other value means reverse.
    pub fn from_code(code: i64) -> Self {
        if code == 1 {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }
}

/// Unit used to display speed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedDisplay {
    #[default]
    Kmh,
    RegulationStep,
    Mph,
}

impl SpeedDisplay {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(SpeedDisplay::Kmh),
            1 => Some(SpeedDisplay::RegulationStep),
            2 => Some(SpeedDisplay::Mph),
            _ => None,
        }
    }
}

/// Kind of rail vehicle stored in the `vehicles` table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RailVehicleType {
    #[default]
    Loco,
    Wagon,
    Accessory,
}

impl RailVehicleType {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(RailVehicleType::Loco),
            1 => Some(RailVehicleType::Wagon),
            2 => Some(RailVehicleType::Accessory),
            _ => None,
        }
    }
}

// ============================================================================
// ENTITIES
// ============================================================================

/// One function button of a locomotive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionInfo {
    /// Function number (F0, F1, ...).
    pub number: u8,
    /// Raw icon key; resolve it with [`IconMapping`](crate::IconMapping).
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub button_type: ButtonType,
    /// Display position; lower positions come first.
    #[serde(default)]
    pub position: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<String>,
    /// Delay in seconds, only meaningful for [`ButtonType::Timed`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_delay: Option<f64>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl FunctionInfo {
    /// Create a toggle function with no icon at position 0.
    pub fn new(number: u8) -> Self {
        Self {
            number,
            icon: String::new(),
            button_type: ButtonType::Toggle,
            position: 0,
            shortcut: None,
            time_delay: None,
            active: true,
        }
    }

    /// Display order key: position first, then function number.
    pub fn sort_key(&self) -> (u32, u8) {
        (self.position, self.number)
    }
}

impl fmt::Display for FunctionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}({})", self.number, self.icon)
    }
}

/// Descriptive locomotive data only the SQLite layout carries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocoDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub railway: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoder_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_buffer_length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rmin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drivers_cab: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_stock_since: Option<String>,
    pub active: bool,
    pub speed_display: SpeedDisplay,
    pub vehicle_type: RailVehicleType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regulation_step: Option<i64>,
}

impl Default for LocoDetails {
    fn default() -> Self {
        Self {
            image_name: None,
            full_name: None,
            railway: None,
            description: None,
            article_number: None,
            decoder_type: None,
            build_year: None,
            buffer_length: None,
            model_buffer_length: None,
            service_weight: None,
            model_weight: None,
            rmin: None,
            ip: None,
            drivers_cab: None,
            in_stock_since: None,
            active: true,
            speed_display: SpeedDisplay::Kmh,
            vehicle_type: RailVehicleType::Loco,
            categories: Vec::new(),
            regulation_step: None,
        }
    }
}

/// A locomotive and its function mapping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Locomotive {
    /// Digital address; expected to be unique within a file.
    pub address: u16,
    pub name: String,
    #[serde(default)]
    pub max_speed: u32,
    #[serde(default)]
    pub direction: Direction,
    /// Sorted by `(position, number)`.
    #[serde(default)]
    pub functions: Vec<FunctionInfo>,
    /// CV number to value; `None` when the source has no CV data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvs: Option<BTreeMap<u16, u8>>,
    #[serde(default)]
    pub details: LocoDetails,
}

impl Locomotive {
    pub fn new(address: u16, name: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
            max_speed: 0,
            direction: Direction::Forward,
            functions: Vec::new(),
            cvs: None,
            details: LocoDetails::default(),
        }
    }

    /// Look up a function by number.
    pub fn function(&self, number: u8) -> Option<&FunctionInfo> {
        self.functions.iter().find(|f| f.number == number)
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Sort functions into display order. Stable for equal keys.
    pub fn sort_functions(&mut self) {
        self.functions.sort_by_key(FunctionInfo::sort_key);
    }

    /// Look up a CV value.
    pub fn cv(&self, number: u16) -> Option<u8> {
        self.cvs.as_ref()?.get(&number).copied()
    }
}

impl fmt::Display for Locomotive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Locomotive(address={}, name='{}')", self.address, self.name)
    }
}

/// Turnout, signal, light or other accessory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessory {
    pub address: u16,
    pub name: String,
    /// Free-form kind such as `turnout`, `signal` or `light`.
    #[serde(default = "unknown_kind")]
    pub kind: String,
    #[serde(default)]
    pub state: i64,
}

/// Track layout entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub name: String,
}

/// App-wide settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub auto_stop: bool,
    #[serde(default)]
    pub boost_mode: bool,
}

// ============================================================================
// ROOT
// ============================================================================

/// A loaded `.z21` file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Z21File {
    pub format: Format,
    /// Data version reported by the source, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default)]
    pub locomotives: Vec<Locomotive>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessories: Vec<Accessory>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layouts: Vec<Layout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    /// Image entries found in the archive, in archive order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl Z21File {
    /// Create an empty file of the given format.
    pub fn new(format: Format) -> Self {
        Self {
            format,
            version: None,
            locomotives: Vec::new(),
            accessories: Vec::new(),
            layouts: Vec::new(),
            settings: None,
            images: Vec::new(),
        }
    }

    /// Find a locomotive by address.
    pub fn locomotive(&self, address: u16) -> Option<&Locomotive> {
        self.locomotives.iter().find(|l| l.address == address)
    }

    /// The first layout, if the source has any.
    pub fn layout(&self) -> Option<&Layout> {
        self.layouts.first()
    }

    /// Iterate over every function of every locomotive.
    pub fn functions(&self) -> impl Iterator<Item = (&Locomotive, &FunctionInfo)> {
        self.locomotives
            .iter()
            .flat_map(|loco| loco.functions.iter().map(move |f| (loco, f)))
    }
}

fn default_true() -> bool {
    true
}

fn unknown_kind() -> String {
    "unknown".to_string()
}
