//! Device records and the parsers that build them from device-bridge output.
//!
//! The bridge (`adb`) is a line-oriented text tool.  Enumeration looks like:
//!
//! ```text
//! List of devices attached
//! ABC123         device usb:1-1 product:panther model:Pixel_7 device:panther
//! R58N12345XY    unauthorized usb:1-2
//! ```
//!
//! The first line is a header and is always discarded.  Every following line
//! is whitespace-tokenized: token 0 is the serial, token 1 the raw status and
//! the remaining tokens are optional `key:value` hints.
//!
//! Parsing never fails.  Malformed input degrades to "field unknown" (an empty
//! string) so a single odd line can never abort a whole poll cycle.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw status token that the bridge prints for a usable device.
pub const ONLINE_STATUS_TOKEN: &str = "device";

/// Marker that precedes `WxH` in the output of `wm size`.
pub const PHYSICAL_SIZE_MARKER: &str = "Physical size:";

/// Property holding the manufacturer name (e.g. `samsung`, `Google`).
pub const PROP_MANUFACTURER: &str = "ro.product.manufacturer";
/// Property holding the raw model number (e.g. `SM-A725F`, `Pixel 7`).
pub const PROP_MODEL: &str = "ro.product.model";
/// Property holding the build product name (e.g. `panther`).
pub const PROP_PRODUCT_NAME: &str = "ro.product.name";
/// Fallback for [`PROP_PRODUCT_NAME`] on builds that leave it empty.
pub const PROP_PRODUCT_DEVICE: &str = "ro.product.device";
/// Property holding the Android release string (e.g. `14`).
pub const PROP_ANDROID_VERSION: &str = "ro.build.version.release";

/// Connection status of a device as reported by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceStatus {
    /// The bridge reported `device`: the device accepts commands.
    Online,
    /// Anything else: `offline`, `unauthorized`, `recovery`, `no permissions`, ...
    Offline,
}

impl DeviceStatus {
    /// Maps a raw status token to a status.  Only `"device"` is online.
    pub fn from_token(token: &str) -> Self {
        if token == ONLINE_STATUS_TOKEN {
            Self::Online
        } else {
            Self::Offline
        }
    }

    /// Returns `true` for [`DeviceStatus::Online`].
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online => f.write_str("Online"),
            Self::Offline => f.write_str("Offline"),
        }
    }
}

/// One attached device at one point in time.
///
/// A `Device` is a value: it is built once per poll cycle and never mutated.
/// Consumers detect change by comparing snapshots with `==`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Unique, stable identifier.  The only key that survives across cycles.
    pub serial: String,
    pub status: DeviceStatus,
    /// Build model name from `ro.product.name`, falling back to
    /// `ro.product.device` (e.g. `panther`).  May be empty.
    pub model: String,
    /// Raw model number from `ro.product.model` (e.g. `SM-A725F`).  May be empty.
    pub model_number: String,
    /// Marketing name shown to the operator (e.g. `Galaxy A72`).  Best effort;
    /// may be empty or equal to `model_number`.
    pub product: String,
    /// Android release string.  Empty for offline devices.
    pub android_version: String,
    /// Physical resolution as `"WxH"`, or empty when unknown.
    pub resolution: String,
}

impl Device {
    /// Parses [`Device::resolution`] into a [`Resolution`], if it is well formed.
    pub fn parsed_resolution(&self) -> Option<Resolution> {
        Resolution::parse(&self.resolution)
    }
}

/// An immutable, point-in-time collection of devices.
///
/// The poller publishes one snapshot per cycle; a newer snapshot always
/// replaces an older one wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Poll cycle that produced this snapshot.  Cycle 0 is the empty initial value.
    pub cycle: u64,
    pub devices: Vec<Device>,
}

impl DeviceSnapshot {
    pub fn new(cycle: u64, devices: Vec<Device>) -> Self {
        Self { cycle, devices }
    }

    /// Looks up a device by serial.
    pub fn get(&self, serial: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.serial == serial)
    }

    /// Returns `true` when both snapshots hold the same devices, ignoring the
    /// cycle counter.
    pub fn same_devices(&self, other: &DeviceSnapshot) -> bool {
        self.devices == other.devices
    }

    pub fn online_count(&self) -> usize {
        self.devices.iter().filter(|d| d.status.is_online()).count()
    }
}

/// One parsed line of the enumeration output, before any property queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumerationEntry {
    pub serial: String,
    pub status: DeviceStatus,
    /// `model:` hint with underscores rendered as spaces (`Pixel_7` → `Pixel 7`).
    pub model_hint: String,
    /// `product:` hint (build product name).
    pub product_hint: String,
    /// `device:` hint (device codename).
    pub device_hint: String,
}

/// Parses the full enumeration output into entries.
///
/// The header line is discarded, as are blank lines and daemon chatter lines
/// starting with `*` (e.g. `* daemon started successfully`).  Lines with fewer
/// than two tokens carry no status and are skipped.
pub fn parse_enumeration(output: &str) -> Vec<EnumerationEntry> {
    output
        .lines()
        .skip(1)
        .filter_map(parse_enumeration_line)
        .collect()
}

/// Parses a single non-header enumeration line.
///
/// Returns `None` for blank lines, daemon chatter, and lines without a status.
pub fn parse_enumeration_line(line: &str) -> Option<EnumerationEntry> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('*') {
        return None;
    }

    let mut tokens = trimmed.split_whitespace();
    let serial = tokens.next()?;
    let Some(status_token) = tokens.next() else {
        tracing::trace!(line = trimmed, "enumeration line without status skipped");
        return None;
    };
    let status = DeviceStatus::from_token(status_token);

    let mut entry = EnumerationEntry {
        serial: serial.to_string(),
        status,
        model_hint: String::new(),
        product_hint: String::new(),
        device_hint: String::new(),
    };

    for token in tokens {
        let Some((key, value)) = token.split_once(':') else {
            continue;
        };
        match key {
            "model" => entry.model_hint = value.replace('_', " "),
            "product" => entry.product_hint = value.to_string(),
            "device" => entry.device_hint = value.to_string(),
            _ => {}
        }
    }

    Some(entry)
}

/// Extracts `WxH` from the output of `wm size`.
///
/// Only the `Physical size:` line is considered; an `Override size:` line is
/// ignored because the mirror always renders the physical panel.  Returns an
/// empty string when the marker is missing or the value is not `WxH`.
pub fn parse_physical_size(output: &str) -> String {
    output
        .lines()
        .find_map(|line| {
            let (_, rest) = line.split_once(PHYSICAL_SIZE_MARKER)?;
            let value = rest.trim();
            Resolution::parse(value).map(|_| value.to_string())
        })
        .unwrap_or_default()
}

/// Returns the properties that may carry a marketing name for `manufacturer`.
///
/// Vendors disagree on where the consumer-facing name lives, so each family
/// gets its own candidate list, queried in order.  Google model numbers are
/// already marketing names, so nothing is queried for them.
pub fn marketing_name_properties(manufacturer: &str) -> &'static [&'static str] {
    match manufacturer.trim().to_ascii_lowercase().as_str() {
        "google" => &[],
        "samsung" => &["ro.product.marketname", "ro.config.marketing_name"],
        "xiaomi" | "redmi" | "poco" => &["ro.product.marketname", "ro.product.vendor.marketname"],
        "oneplus" | "oppo" | "realme" => &["ro.vendor.oplus.market.name", "ro.product.marketname"],
        _ => &["ro.product.marketname"],
    }
}

/// A physical screen resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Parses `"WxH"` (e.g. `"1080x2400"`).  Both sides must be non-zero.
    pub fn parse(value: &str) -> Option<Self> {
        let (w, h) = value.trim().split_once('x')?;
        let width: u32 = w.trim().parse().ok()?;
        let height: u32 = h.trim().parse().ok()?;
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { width, height })
    }

    /// Width divided by height.  Portrait phones are below 1.0.
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
