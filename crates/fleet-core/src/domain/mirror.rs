//! Mirror window vocabulary shared by the session driver and the layout engine.
//!
//! A mirror session launches the external mirror tool (scrcpy), waits for its
//! native window to appear, and *adopts* it: the foreign window is reparented
//! beneath a container owned by DroidFleet.  This module holds the pure parts
//! of that lifecycle:
//!
//! - [`WindowHandle`] – an opaque native window identifier.
//! - [`MirrorPhase`] / [`CloseReason`] – the adoption state machine states.
//! - [`AdoptionPolicy`] – probe interval and retry ceiling.
//! - [`AspectLock`] – the height a container must have for a given width.
//!
//! ```text
//! Launching ──► WaitingForWindow ──► Adopted ──► Closed(ClosedByUser)
//!     │               │   ▲ │
//!     │               └───┘ └──► Closed(AdoptionTimeout | AdoptionFailed)
//!     └──► Closed(LaunchFailed)
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::layout::content_height;

/// Width in pixels of the control sidebar next to the mirrored screen.
pub const DEFAULT_SIDEBAR_WIDTH: u32 = 27;

/// Height mismatch, in pixels, that the aspect lock tolerates before correcting.
pub const ASPECT_TOLERANCE_PX: u32 = 5;

/// An opaque native window handle (`HWND` on Windows, X11 `Window` on Linux).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub u64);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl FromStr for WindowHandle {
    type Err = std::num::ParseIntError;

    /// Accepts hexadecimal with a `0x` prefix or plain decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16)?,
            None => s.parse()?,
        };
        Ok(Self(value))
    }
}

/// Why a session reached [`MirrorPhase::Closed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloseReason {
    /// The mirror tool could not be spawned.
    LaunchFailed,
    /// No window with the session title appeared within the retry ceiling.
    AdoptionTimeout,
    /// The window was found but could not be reparented.
    AdoptionFailed,
    /// The operator closed the container.
    ClosedByUser,
}

/// Lifecycle phase of a mirror session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MirrorPhase {
    Launching,
    WaitingForWindow,
    Adopted,
    Closed(CloseReason),
}

impl MirrorPhase {
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

/// How often and how many times to look for the mirror window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdoptionPolicy {
    /// Delay between two probes.
    pub probe_interval: Duration,
    /// Number of failed probes after which adoption is abandoned.
    pub max_attempts: u32,
}

impl AdoptionPolicy {
    pub fn new(probe_interval: Duration, max_attempts: u32) -> Self {
        Self {
            probe_interval,
            max_attempts,
        }
    }

    /// Total time spent probing before giving up.
    pub fn timeout(&self) -> Duration {
        self.probe_interval * self.max_attempts
    }
}

impl Default for AdoptionPolicy {
    /// 500 ms × 20 probes ≈ 10 seconds.
    fn default() -> Self {
        Self::new(Duration::from_millis(500), 20)
    }
}

/// Builds the title token passed to the mirror tool.
///
/// The tool echoes it verbatim into its window title, which is how the
/// session finds the window again.  `unix_millis` and `nonce` make the token
/// unique per session even for repeated launches against the same serial.
pub fn mirror_window_title(serial: &str, unix_millis: u128, nonce: u64) -> String {
    format!("DroidFleet_Mirror_{serial}_{unix_millis}_{nonce}")
}

/// Keeps a container's height consistent with the mirrored device's shape.
///
/// The container holds the mirrored screen plus a fixed-width sidebar, so only
/// `width - sidebar_width` is available to the device content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectLock {
    ratio: f64,
    sidebar_width: u32,
    tolerance: u32,
}

impl AspectLock {
    /// `ratio` is width / height of the device panel; `0.0` means unknown.
    pub fn new(ratio: f64, sidebar_width: u32) -> Self {
        let ratio = if ratio.is_finite() && ratio > 0.0 { ratio } else { 0.0 };
        Self {
            ratio,
            sidebar_width,
            tolerance: ASPECT_TOLERANCE_PX,
        }
    }

    /// Builds a lock from a `"WxH"` resolution string; unknown when malformed.
    pub fn from_resolution(resolution: &str, sidebar_width: u32) -> Self {
        let ratio = super::device::Resolution::parse(resolution)
            .map(|r| r.aspect_ratio())
            .unwrap_or(0.0);
        Self::new(ratio, sidebar_width)
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn sidebar_width(&self) -> u32 {
        self.sidebar_width
    }

    /// `false` when the device resolution was unknown; such a lock never corrects.
    pub fn is_known(&self) -> bool {
        self.ratio > 0.0
    }

    /// Height the container should have at `width`, or `None` when unknown.
    pub fn expected_height(&self, width: u32) -> Option<u32> {
        if !self.is_known() {
            return None;
        }
        content_height(self.content_width(width), self.ratio)
    }

    /// Returns the corrected height when `height` is off by more than the
    /// tolerance, `None` when no correction is needed.
    pub fn correction(&self, width: u32, height: u32) -> Option<u32> {
        let expected = self.expected_height(width)?;
        (expected.abs_diff(height) > self.tolerance).then_some(expected)
    }

    /// Width left for the device screen in a container `width` pixels wide.
    pub fn content_width(&self, width: u32) -> u32 {
        width.saturating_sub(self.sidebar_width).max(1)
    }

    /// Initial container size for a given height: content width plus sidebar.
    pub fn size_for_height(&self, height: u32) -> Option<(u32, u32)> {
        if !self.is_known() {
            return None;
        }
        let content = (f64::from(height) * self.ratio).round() as u32;
        Some((content + self.sidebar_width, height))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_lock_corrects_height_to_rounded_expected_value() {
        // Arrange: ratio 0.45, sidebar 27 → content 500 px → 1111.1 px high
        let lock = AspectLock::new(0.45, 27);

        // Act
        let corrected = lock.correction(527, 900);

        // Assert
        assert_eq!(corrected, Some(((527.0_f64 - 27.0) / 0.45).round() as u32));
        assert_eq!(corrected, Some(1111));
    }

    #[test]
    fn test_aspect_lock_tolerates_small_mismatch() {
        let lock = AspectLock::new(0.45, 27);
        assert_eq!(lock.correction(527, 1111), None);
        assert_eq!(lock.correction(527, 1116), None);
        assert_eq!(lock.correction(527, 1106), None);
        assert_eq!(lock.correction(527, 1117), Some(1111));
    }

    #[test]
    fn test_aspect_lock_unknown_ratio_never_corrects() {
        let lock = AspectLock::new(0.0, 27);
        assert!(!lock.is_known());
        assert_eq!(lock.correction(527, 10), None);
        assert_eq!(lock.size_for_height(800), None);
    }

    #[test]
    fn test_aspect_lock_rejects_non_finite_ratio() {
        assert!(!AspectLock::new(f64::NAN, 27).is_known());
        assert!(!AspectLock::new(f64::INFINITY, 27).is_known());
        assert!(!AspectLock::new(-1.0, 27).is_known());
    }

    #[test]
    fn test_aspect_lock_from_resolution() {
        let lock = AspectLock::from_resolution("1080x2400", DEFAULT_SIDEBAR_WIDTH);
        assert!((lock.ratio() - 0.45).abs() < 1e-9);
        assert!(!AspectLock::from_resolution("", DEFAULT_SIDEBAR_WIDTH).is_known());
    }

    #[test]
    fn test_aspect_lock_width_narrower_than_sidebar_uses_one_pixel_content() {
        let lock = AspectLock::new(0.5, 27);
        assert_eq!(lock.expected_height(10), Some(2));
    }

    #[test]
    fn test_content_width_excludes_sidebar() {
        let lock = AspectLock::new(0.0, 27);
        assert_eq!(lock.content_width(527), 500);
        assert_eq!(lock.content_width(20), 1);
    }

    #[test]
    fn test_size_for_height_adds_sidebar() {
        let lock = AspectLock::new(0.45, 27);
        assert_eq!(lock.size_for_height(800), Some((360 + 27, 800)));
    }

    #[test]
    fn test_window_title_embeds_serial_and_is_unique_per_nonce() {
        let a = mirror_window_title("ABC123", 1_700_000_000_000, 1);
        let b = mirror_window_title("ABC123", 1_700_000_000_000, 2);
        assert!(a.contains("ABC123"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_window_handle_parses_hex_and_decimal() {
        assert_eq!("0x1a2b".parse::<WindowHandle>().unwrap(), WindowHandle(0x1a2b));
        assert_eq!("4096".parse::<WindowHandle>().unwrap(), WindowHandle(4096));
        assert!("zz".parse::<WindowHandle>().is_err());
        assert_eq!(WindowHandle(255).to_string(), "0xff");
    }

    #[test]
    fn test_default_policy_times_out_after_ten_seconds() {
        let policy = AdoptionPolicy::default();
        assert_eq!(policy.max_attempts, 20);
        assert_eq!(policy.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_phase_is_closed() {
        assert!(MirrorPhase::Closed(CloseReason::ClosedByUser).is_closed());
        assert!(!MirrorPhase::Adopted.is_closed());
    }
}
