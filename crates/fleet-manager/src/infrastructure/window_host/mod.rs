//! Native window capability used to adopt mirror tool windows.
//!
//! Adoption needs exactly three things from the windowing system: find a
//! top-level window by its exact title, make it a child of one of our windows,
//! and move/resize a window.  [`WindowHost`] is that capability; each
//! supported platform provides one implementation, re-exported as
//! [`NativeWindowHost`]:
//!
//! | platform | implementation                  | APIs                                    |
//! |----------|---------------------------------|-----------------------------------------|
//! | Windows  | [`win32::Win32WindowHost`]      | `FindWindowW`, `SetParent`, `SetWindowPos` |
//! | Linux    | [`linux::X11WindowHost`]        | `XQueryTree`, `XReparentWindow`, `XMoveResizeWindow` |
//! | other    | [`UnsupportedWindowHost`]       | always fails                            |
//!
//! Container surfaces (the windows that receive an adopted mirror) are
//! described by [`ContainerSurface`].  [`NativeContainer`] adapts any native
//! window handle through a [`WindowHost`].

use std::sync::{Arc, Mutex};

use fleet_core::{WindowGeometry, WindowHandle};
use thiserror::Error;

pub mod mock;

#[cfg(target_os = "windows")]
pub mod win32;

#[cfg(target_os = "windows")]
pub use self::win32::Win32WindowHost as NativeWindowHost;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "linux")]
pub use self::linux::X11WindowHost as NativeWindowHost;

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
pub use self::UnsupportedWindowHost as NativeWindowHost;

/// Errors produced by the native window capability.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WindowHostError {
    /// The windowing system could not be reached (e.g. no X display).
    #[error("window system unavailable: {0}")]
    Unavailable(String),

    /// A native call failed.
    #[error("{call} failed for window {window}: {detail}")]
    CallFailed {
        call: &'static str,
        window: WindowHandle,
        detail: String,
    },

    /// Window adoption is not implemented on this platform.
    #[error("window adoption is not supported on this platform")]
    Unsupported,
}

/// A window rectangle in screen (or parent client) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl WindowRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl From<&WindowGeometry> for WindowRect {
    fn from(g: &WindowGeometry) -> Self {
        Self::new(g.x, g.y, g.width, g.height)
    }
}

/// Platform window operations needed for mirror adoption.
pub trait WindowHost: Send + Sync {
    /// Looks for a top-level window whose title equals `title` exactly.
    fn find_window_by_title(&self, title: &str) -> Result<Option<WindowHandle>, WindowHostError>;

    /// Makes `child` a child window of `parent`.
    fn reparent_window(&self, child: WindowHandle, parent: WindowHandle)
        -> Result<(), WindowHostError>;

    /// Moves and resizes `window`.
    fn set_window_geometry(&self, window: WindowHandle, rect: WindowRect)
        -> Result<(), WindowHostError>;
}

/// A window that can host an adopted mirror.
pub trait ContainerSurface: Send + Sync {
    fn native_handle(&self) -> WindowHandle;

    /// Resizes the container, keeping its position.
    fn resize(&self, width: u32, height: u32) -> Result<(), WindowHostError>;

    fn set_geometry(&self, rect: WindowRect) -> Result<(), WindowHostError>;

    /// Moves and resizes an adopted child window; `rect` is relative to the
    /// container's client area.
    fn place_child(&self, child: WindowHandle, rect: WindowRect) -> Result<(), WindowHostError>;
}

/// [`ContainerSurface`] for an existing native window, driven through a
/// [`WindowHost`].
pub struct NativeContainer {
    handle: WindowHandle,
    host: Arc<dyn WindowHost>,
    rect: Mutex<WindowRect>,
}

impl NativeContainer {
    /// Wraps `handle`.  `initial` is the window's current rectangle, used as
    /// the position for subsequent [`resize`](ContainerSurface::resize) calls.
    pub fn new(handle: WindowHandle, host: Arc<dyn WindowHost>, initial: WindowRect) -> Self {
        Self {
            handle,
            host,
            rect: Mutex::new(initial),
        }
    }

    /// The last rectangle applied to this container.
    pub fn rect(&self) -> WindowRect {
        *self.rect.lock().expect("lock poisoned")
    }
}

impl ContainerSurface for NativeContainer {
    fn native_handle(&self) -> WindowHandle {
        self.handle
    }

    fn resize(&self, width: u32, height: u32) -> Result<(), WindowHostError> {
        let current = self.rect();
        self.set_geometry(WindowRect::new(current.x, current.y, width, height))
    }

    fn set_geometry(&self, rect: WindowRect) -> Result<(), WindowHostError> {
        self.host.set_window_geometry(self.handle, rect)?;
        *self.rect.lock().expect("lock poisoned") = rect;
        Ok(())
    }

    fn place_child(&self, child: WindowHandle, rect: WindowRect) -> Result<(), WindowHostError> {
        self.host.set_window_geometry(child, rect)
    }
}

/// Fallback for platforms without a native implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedWindowHost;

impl WindowHost for UnsupportedWindowHost {
    fn find_window_by_title(&self, _title: &str) -> Result<Option<WindowHandle>, WindowHostError> {
        Err(WindowHostError::Unsupported)
    }

    fn reparent_window(&self, _: WindowHandle, _: WindowHandle) -> Result<(), WindowHostError> {
        Err(WindowHostError::Unsupported)
    }

    fn set_window_geometry(&self, _: WindowHandle, _: WindowRect) -> Result<(), WindowHostError> {
        Err(WindowHostError::Unsupported)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::mock::MockWindowHost;
    use super::*;

    #[test]
    fn test_native_container_resize_keeps_position() {
        // Arrange
        let host = Arc::new(MockWindowHost::new());
        let container = NativeContainer::new(
            WindowHandle(0x10),
            host.clone(),
            WindowRect::new(40, 60, 400, 800),
        );

        // Act
        container.resize(527, 1111).unwrap();

        // Assert
        assert_eq!(container.rect(), WindowRect::new(40, 60, 527, 1111));
        assert_eq!(
            host.geometry_calls(),
            vec![(WindowHandle(0x10), WindowRect::new(40, 60, 527, 1111))]
        );
    }

    #[test]
    fn test_native_container_keeps_rect_when_host_fails() {
        let host = Arc::new(MockWindowHost::new());
        host.set_should_fail(true);
        let initial = WindowRect::new(0, 0, 100, 200);
        let container = NativeContainer::new(WindowHandle(1), host, initial);

        assert!(container.set_geometry(WindowRect::new(5, 5, 5, 5)).is_err());
        assert_eq!(container.rect(), initial);
    }

    #[test]
    fn test_native_container_places_child_without_moving_itself() {
        let host = Arc::new(MockWindowHost::new());
        let initial = WindowRect::new(40, 60, 527, 1000);
        let container = NativeContainer::new(WindowHandle(0x10), host.clone(), initial);

        container
            .place_child(WindowHandle(0x99), WindowRect::new(0, 0, 500, 1000))
            .unwrap();

        assert_eq!(container.rect(), initial);
        assert_eq!(
            host.geometry_calls(),
            vec![(WindowHandle(0x99), WindowRect::new(0, 0, 500, 1000))]
        );
    }

    #[test]
    fn test_window_rect_from_geometry() {
        let geometry = WindowGeometry {
            serial: "A".into(),
            x: -10,
            y: 20,
            width: 400,
            height: 880,
        };
        assert_eq!(WindowRect::from(&geometry), WindowRect::new(-10, 20, 400, 880));
    }

    #[test]
    fn test_unsupported_host_fails_every_call() {
        let host = UnsupportedWindowHost;
        assert_eq!(host.find_window_by_title("x"), Err(WindowHostError::Unsupported));
        assert!(host.reparent_window(WindowHandle(1), WindowHandle(2)).is_err());
    }
}
