//! Grid layout for mirror windows.
//!
//! The layout engine tiles N mirror containers across a screen rectangle in a
//! fixed number of columns.  Every container gets the same width; its height
//! follows from the aspect ratio of the mirrored device, so rows can have
//! different heights.  The next row starts below the tallest window of the
//! previous one, so windows never overlap.
//!
//! ```text
//!   screen.x                          columns = 3
//!   ┌──────────┬──────────┬──────────┐ screen.y
//!   │ serial 0 │ serial 1 │ serial 2 │
//!   │          │          │          │
//!   │          ├──────────┤          │
//!   │          │          │          │
//!   ├──────────┼──────────┴──────────┘ row_top += tallest(row 0)
//!   │ serial 3 │ serial 4 │
//!   └──────────┴──────────┘
//! ```
//!
//! [`arrange`] is a pure function: identical inputs always produce identical
//! output, and nothing is cached between calls.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::mirror::DEFAULT_SIDEBAR_WIDTH;

/// Height / width used when a device's resolution is unknown (typical phone).
pub const FALLBACK_HEIGHT_FACTOR: f64 = 2.2;

/// Errors returned by [`arrange`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// A grid needs at least one column.
    #[error("column count must be at least 1")]
    ZeroColumns,
}

/// The screen area available for mirror windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ScreenRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// One mirror window to place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutInput {
    pub serial: String,
    /// Width / height of the device panel; `0.0` when unknown.
    pub aspect_ratio: f64,
    /// Pixels of the container taken by the control sidebar.
    pub sidebar_width: u32,
}

impl LayoutInput {
    /// Input with the default sidebar width.
    pub fn new(serial: impl Into<String>, aspect_ratio: f64) -> Self {
        Self {
            serial: serial.into(),
            aspect_ratio,
            sidebar_width: DEFAULT_SIDEBAR_WIDTH,
        }
    }
}

/// Final geometry of one mirror window, in screen coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub serial: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Output of [`arrange`]: one geometry per input, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutResult {
    pub windows: Vec<WindowGeometry>,
    pub columns: u32,
    /// Number of rows actually used (0 when there are no inputs).
    pub rows: u32,
}

impl LayoutResult {
    pub fn get(&self, serial: &str) -> Option<&WindowGeometry> {
        self.windows.iter().find(|w| w.serial == serial)
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Height of a mirrored panel `content_width` pixels wide.
///
/// Returns `None` when `ratio` is not a positive finite number.
pub fn content_height(content_width: u32, ratio: f64) -> Option<u32> {
    if !(ratio.is_finite() && ratio > 0.0) {
        return None;
    }
    Some((f64::from(content_width) / ratio).round() as u32)
}

fn window_height(content_width: u32, ratio: f64) -> u32 {
    content_height(content_width, ratio)
        .unwrap_or_else(|| (f64::from(content_width) * FALLBACK_HEIGHT_FACTOR).round() as u32)
}

/// Tiles `inputs` across `screen` in `columns` columns.
///
/// `columns` is used as given, even when there are fewer inputs than columns;
/// the last row is then simply short.
///
/// # Errors
///
/// [`LayoutError::ZeroColumns`] when `columns` is 0.
pub fn arrange(
    inputs: &[LayoutInput],
    columns: u32,
    screen: ScreenRect,
) -> Result<LayoutResult, LayoutError> {
    if columns == 0 {
        return Err(LayoutError::ZeroColumns);
    }

    let window_width = screen.width / columns;
    let mut windows = Vec::with_capacity(inputs.len());
    let mut row_top: i64 = 0;
    let mut row_tallest: u32 = 0;
    let mut col: u32 = 0;
    let mut rows: u32 = 0;

    for input in inputs {
        if col == 0 {
            rows += 1;
        }

        let content = window_width.saturating_sub(input.sidebar_width);
        let height = window_height(content, input.aspect_ratio);

        windows.push(WindowGeometry {
            serial: input.serial.clone(),
            x: offset(screen.x, i64::from(col) * i64::from(window_width)),
            y: offset(screen.y, row_top),
            width: window_width,
            height,
        });

        row_tallest = row_tallest.max(height);
        col += 1;
        if col == columns {
            col = 0;
            row_top += i64::from(row_tallest);
            row_tallest = 0;
        }
    }

    Ok(LayoutResult {
        windows,
        columns,
        rows,
    })
}

fn offset(origin: i32, delta: i64) -> i32 {
    (i64::from(origin) + delta).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

// ── Tests ─────────────────────────────────────────────────────────────────────
