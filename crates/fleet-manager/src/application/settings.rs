//! Process-wide runtime settings with change notification.
//!
//! [`SettingsHub`] is constructed once at startup and shared by `Arc` with
//! every consumer.  Consumers either read [`SettingsHub::current`] when they
//! need a value, or [`subscribe`](SettingsHub::subscribe) and react to
//! changes, for example the device poller picking up a new refresh interval.
//!
//! # Why a `watch` channel? (for beginners)
//!
//! `tokio::sync::watch` stores exactly one value.  Writers replace it;
//! readers always see the latest value and are woken when it changes.  There
//! is no backlog: a consumer that misses three quick updates simply sees the
//! final state, which is exactly what a settings panel needs.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);
pub const MAX_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(2);

pub const MIN_DEVICES_PER_ROW: u32 = 1;
pub const MAX_DEVICES_PER_ROW: u32 = 10;
pub const DEFAULT_DEVICES_PER_ROW: u32 = 5;

/// Colour scheme of the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dark => "dark",
            Self::Light => "light",
        })
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            other => Err(format!("unknown theme '{other}' (expected 'dark' or 'light')")),
        }
    }
}

/// Runtime settings.  Always within range once constructed through [`Settings::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Delay between two device enumerations.
    pub refresh_interval: Duration,
    /// Columns used when arranging mirror windows.
    pub devices_per_row: u32,
    pub theme: Theme,
}

impl Settings {
    /// Builds settings, clamping every value into its allowed range.
    pub fn new(refresh_interval: Duration, devices_per_row: u32, theme: Theme) -> Self {
        Self {
            refresh_interval: refresh_interval.clamp(MIN_REFRESH_INTERVAL, MAX_REFRESH_INTERVAL),
            devices_per_row: devices_per_row.clamp(MIN_DEVICES_PER_ROW, MAX_DEVICES_PER_ROW),
            theme,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            devices_per_row: DEFAULT_DEVICES_PER_ROW,
            theme: Theme::Dark,
        }
    }
}

/// Publish/subscribe holder for [`Settings`].
pub struct SettingsHub {
    tx: watch::Sender<Settings>,
}

impl SettingsHub {
    pub fn new(initial: Settings) -> Self {
        let initial = Settings::new(initial.refresh_interval, initial.devices_per_row, initial.theme);
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// A snapshot of the current settings.
    pub fn current(&self) -> Settings {
        *self.tx.borrow()
    }

    /// A receiver that is notified on every effective change.
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    /// Applies `change` to the current settings, clamps the result and
    /// publishes it.  Subscribers are only notified when a value changed.
    ///
    /// Returns the settings now in effect.
    pub fn update<F>(&self, change: F) -> Settings
    where
        F: FnOnce(&mut Settings),
    {
        self.tx.send_if_modified(|settings| {
            let mut next = *settings;
            change(&mut next);
            let next = Settings::new(next.refresh_interval, next.devices_per_row, next.theme);
            if next == *settings {
                return false;
            }
            info!(
                refresh_secs = next.refresh_interval.as_secs_f64(),
                devices_per_row = next.devices_per_row,
                theme = %next.theme,
                "settings updated"
            );
            *settings = next;
            true
        });
        self.current()
    }
}

impl Default for SettingsHub {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
