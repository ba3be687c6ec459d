//! TOML-based configuration persistence for DroidFleet.
//!
//! Reads and writes [`AppConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\DroidFleet\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/droidfleet/config.toml` (or `~/.config/droidfleet/`)
//! - macOS:    `~/Library/Application Support/DroidFleet/config.toml`
//!
//! Example file:
//!
//! ```toml
//! [general]
//! log_level = "info"
//!
//! [bridge]
//! adb_path = "C:\\tools\\platform-tools\\adb.exe"
//!
//! [mirror]
//! scrcpy_path = "scrcpy"
//! max_size = 1024
//!
//! [monitor]
//! refresh_interval_secs = 3
//!
//! [display]
//! devices_per_row = 4
//! theme = "light"
//! ```
//!
//! Every field has a serde default, so a missing file, a missing section or a
//! config written by an older version all load cleanly.  Values are range
//! checked only when converted into runtime [`Settings`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use fleet_core::{AdoptionPolicy, DEFAULT_SIDEBAR_WIDTH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::settings::{Settings, Theme};
use crate::infrastructure::mirror_tool::MirrorOptions;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// `tracing` filter used when `RUST_LOG` is unset (`"info"`, `"debug"`, ...).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Schema version string – bump when breaking changes are introduced.
    #[serde(default = "default_version")]
    pub version: String,
}

/// Device-bridge (`adb`) settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    /// Path to the `adb` executable; a bare name is looked up on `PATH`.
    #[serde(default = "default_adb_path")]
    pub adb_path: PathBuf,
}

/// Mirror tool (`scrcpy`) and window adoption settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MirrorConfig {
    #[serde(default = "default_scrcpy_path")]
    pub scrcpy_path: PathBuf,
    #[serde(default = "default_max_size")]
    pub max_size: u32,
    #[serde(default = "default_bit_rate")]
    pub bit_rate: u32,
    #[serde(default = "default_video_codec")]
    pub video_codec: String,
    #[serde(default = "default_max_fps")]
    pub max_fps: u32,
    #[serde(default)]
    pub audio: bool,
    /// Delay between two window lookups while waiting for the mirror window.
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
    /// Failed lookups after which adoption is abandoned.
    #[serde(default = "default_max_probe_attempts")]
    pub max_probe_attempts: u32,
    /// Width of the control sidebar next to each mirror, in pixels.
    #[serde(default = "default_sidebar_width")]
    pub sidebar_width: u32,
}

/// Device polling settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfig {
    /// Seconds between two device enumerations (1..=60).
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

/// Presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    /// Columns used when arranging mirror windows (1..=10).
    #[serde(default = "default_devices_per_row")]
    pub devices_per_row: u32,
    #[serde(default)]
    pub theme: Theme,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_version() -> String {
    "1.0".to_string()
}
fn default_adb_path() -> PathBuf {
    PathBuf::from("adb")
}
fn default_scrcpy_path() -> PathBuf {
    PathBuf::from("scrcpy")
}
fn default_max_size() -> u32 {
    MirrorOptions::default().max_size
}
fn default_bit_rate() -> u32 {
    MirrorOptions::default().bit_rate
}
fn default_video_codec() -> String {
    MirrorOptions::default().video_codec
}
fn default_max_fps() -> u32 {
    MirrorOptions::default().max_fps
}
fn default_probe_interval_ms() -> u64 {
    AdoptionPolicy::default().probe_interval.as_millis() as u64
}
fn default_max_probe_attempts() -> u32 {
    AdoptionPolicy::default().max_attempts
}
fn default_sidebar_width() -> u32 {
    DEFAULT_SIDEBAR_WIDTH
}
fn default_refresh_interval_secs() -> u64 {
    Settings::default().refresh_interval.as_secs()
}
fn default_devices_per_row() -> u32 {
    Settings::default().devices_per_row
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            version: default_version(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            adb_path: default_adb_path(),
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            scrcpy_path: default_scrcpy_path(),
            max_size: default_max_size(),
            bit_rate: default_bit_rate(),
            video_codec: default_video_codec(),
            max_fps: default_max_fps(),
            audio: false,
            probe_interval_ms: default_probe_interval_ms(),
            max_probe_attempts: default_max_probe_attempts(),
            sidebar_width: default_sidebar_width(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            devices_per_row: default_devices_per_row(),
            theme: Theme::default(),
        }
    }
}

// ── Conversions into runtime types ────────────────────────────────────────────

impl AppConfig {
    /// Runtime settings, with out-of-range values clamped.
    pub fn settings(&self) -> Settings {
        Settings::new(
            Duration::from_secs(self.monitor.refresh_interval_secs),
            self.display.devices_per_row,
            self.display.theme,
        )
    }

    /// Copies runtime settings back into the persisted sections.
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.monitor.refresh_interval_secs = settings.refresh_interval.as_secs();
        self.display.devices_per_row = settings.devices_per_row;
        self.display.theme = settings.theme;
    }

    pub fn mirror_options(&self) -> MirrorOptions {
        MirrorOptions {
            max_size: self.mirror.max_size,
            bit_rate: self.mirror.bit_rate,
            video_codec: self.mirror.video_codec.clone(),
            max_fps: self.mirror.max_fps,
            audio: self.mirror.audio,
        }
    }

    /// Adoption policy; a zero attempt ceiling is raised to one probe.
    pub fn adoption_policy(&self) -> AdoptionPolicy {
        AdoptionPolicy::new(
            Duration::from_millis(self.mirror.probe_interval_ms.max(1)),
            self.mirror.max_probe_attempts.max(1),
        )
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the platform config file, returning
/// `AppConfig::default()` if the file does not yet exist.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning the defaults when it is absent.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to the platform config file.
///
/// # Errors
///
/// See [`save_config_to`].
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &config_file_path()?)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory including the `DroidFleet` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("DroidFleet"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("droidfleet"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("DroidFleet")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
