//! X11 implementation of [`WindowHost`] via Xlib.
//!
//! Each call opens its own display connection and closes it before
//! returning, so the host can be used from any thread.  Title lookup walks the
//! whole window tree from the root, because window managers reparent client
//! windows into their own frame windows.
//!
//! Xlib reports protocol errors (such as a stale window id) asynchronously
//! through a process-wide handler whose default implementation exits the
//! process.  A recording handler is installed on first use instead: it stores
//! the first error raised on the calling thread, and every mutating call
//! checks that slot after `XSync` so `BadWindow` / `BadMatch` surface as
//! [`WindowHostError::CallFailed`].

use std::cell::Cell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_uint};
use std::ptr;
use std::sync::Once;

use fleet_core::WindowHandle;
use tracing::debug;
use x11::xlib;

use super::{WindowHost, WindowHostError, WindowRect};

static INSTALL_ERROR_HANDLER: Once = Once::new();

/// A protocol error delivered to [`record_x_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct XErrorRecord {
    error_code: u8,
    request_code: u8,
}

thread_local! {
    // Xlib runs the handler on the thread that called XSync.
    static PENDING_X_ERROR: Cell<Option<XErrorRecord>> = const { Cell::new(None) };
}

unsafe extern "C" fn record_x_error(
    _display: *mut xlib::Display,
    event: *mut xlib::XErrorEvent,
) -> c_int {
    if let Some(event) = event.as_ref() {
        debug!(
            error_code = event.error_code,
            request_code = event.request_code,
            resource = event.resourceid,
            "X11 protocol error"
        );
        let record = XErrorRecord {
            error_code: event.error_code,
            request_code: event.request_code,
        };
        PENDING_X_ERROR.with(|slot| {
            if slot.get().is_none() {
                slot.set(Some(record));
            }
        });
    }
    0
}

fn take_x_error() -> Option<XErrorRecord> {
    PENDING_X_ERROR.with(Cell::take)
}

fn error_name(code: u8) -> &'static str {
    match code {
        xlib::BadWindow => "BadWindow",
        xlib::BadMatch => "BadMatch",
        xlib::BadValue => "BadValue",
        xlib::BadAccess => "BadAccess",
        _ => "X protocol error",
    }
}

/// An open Xlib display, closed on drop.
struct Display(*mut xlib::Display);

impl Display {
    fn open() -> Result<Self, WindowHostError> {
        INSTALL_ERROR_HANDLER.call_once(|| {
            // SAFETY: installs a handler with the signature Xlib expects.
            unsafe { xlib::XSetErrorHandler(Some(record_x_error)) };
        });

        // SAFETY: a null name selects the DISPLAY environment variable.
        let display = unsafe { xlib::XOpenDisplay(ptr::null()) };
        if display.is_null() {
            let display_env = std::env::var("DISPLAY").unwrap_or_else(|_| "<unset>".to_string());
            return Err(WindowHostError::Unavailable(format!(
                "XOpenDisplay failed; DISPLAY={display_env}"
            )));
        }
        Ok(Self(display))
    }

    /// Flushes queued requests and waits until the server processed them.
    fn sync(&self) {
        // SAFETY: `self.0` is a live display.
        unsafe { xlib::XSync(self.0, xlib::False) };
    }

    /// Runs `request`, waits for the server, and fails if the server answered
    /// it with a protocol error.
    fn checked(
        &self,
        call: &'static str,
        window: WindowHandle,
        request: impl FnOnce(*mut xlib::Display),
    ) -> Result<(), WindowHostError> {
        take_x_error();
        request(self.0);
        self.sync();
        x_error_result(call, window, take_x_error())
    }

    fn window_name(&self, window: xlib::Window) -> Option<String> {
        let mut name: *mut c_char = ptr::null_mut();
        // SAFETY: on success XFetchName stores a NUL-terminated string that
        // must be released with XFree.
        unsafe {
            if xlib::XFetchName(self.0, window, &mut name) == 0 || name.is_null() {
                return None;
            }
            let value = CStr::from_ptr(name).to_string_lossy().into_owned();
            xlib::XFree(name.cast());
            Some(value)
        }
    }

    fn children(&self, window: xlib::Window) -> Vec<xlib::Window> {
        let mut root: xlib::Window = 0;
        let mut parent: xlib::Window = 0;
        let mut children: *mut xlib::Window = ptr::null_mut();
        let mut count: c_uint = 0;

        // SAFETY: out-pointers are valid locals; the returned array holds
        // `count` windows and must be released with XFree.
        unsafe {
            if xlib::XQueryTree(self.0, window, &mut root, &mut parent, &mut children, &mut count) == 0 {
                return Vec::new();
            }
            if children.is_null() {
                return Vec::new();
            }
            let list = std::slice::from_raw_parts(children, count as usize).to_vec();
            xlib::XFree(children.cast());
            list
        }
    }

    fn find_by_title(&self, title: &str) -> Option<xlib::Window> {
        // SAFETY: `self.0` is a live display.
        let root = unsafe { xlib::XDefaultRootWindow(self.0) };
        let mut stack = vec![root];
        while let Some(window) = stack.pop() {
            if window != root && self.window_name(window).as_deref() == Some(title) {
                return Some(window);
            }
            stack.extend(self.children(window));
        }
        None
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        // SAFETY: `self.0` was opened by XOpenDisplay and is not used after this.
        unsafe { xlib::XCloseDisplay(self.0) };
    }
}

fn x_error_result(
    call: &'static str,
    window: WindowHandle,
    error: Option<XErrorRecord>,
) -> Result<(), WindowHostError> {
    match error {
        None => Ok(()),
        Some(record) => Err(WindowHostError::CallFailed {
            call,
            window,
            detail: format!(
                "{} (code {}, request {})",
                error_name(record.error_code),
                record.error_code,
                record.request_code
            ),
        }),
    }
}

/// Linux X11 implementation of [`WindowHost`].
#[derive(Debug, Default, Clone, Copy)]
pub struct X11WindowHost;

impl X11WindowHost {
    pub fn new() -> Self {
        Self
    }
}

impl WindowHost for X11WindowHost {
    fn find_window_by_title(&self, title: &str) -> Result<Option<WindowHandle>, WindowHostError> {
        // Titles with interior NULs cannot exist on the server.
        if CString::new(title).is_err() {
            return Ok(None);
        }
        let display = Display::open()?;
        let found = display.find_by_title(title);
        // Windows that vanish mid-walk raise BadWindow; they are simply skipped.
        display.sync();
        take_x_error();
        Ok(found.map(|window| WindowHandle(window as u64)))
    }

    fn reparent_window(
        &self,
        child: WindowHandle,
        parent: WindowHandle,
    ) -> Result<(), WindowHostError> {
        let display = Display::open()?;
        display.checked("XReparentWindow", child, |raw| {
            // SAFETY: `raw` is live; the server validates the window ids and
            // reports stale ones through the error handler.
            unsafe {
                xlib::XReparentWindow(raw, child.0 as xlib::Window, parent.0 as xlib::Window, 0, 0);
            }
        })?;
        debug!(%child, %parent, "window reparented");
        Ok(())
    }

    fn set_window_geometry(
        &self,
        window: WindowHandle,
        rect: WindowRect,
    ) -> Result<(), WindowHostError> {
        if rect.width == 0 || rect.height == 0 {
            return Err(WindowHostError::CallFailed {
                call: "XMoveResizeWindow",
                window,
                detail: format!("zero-sized rectangle {}x{}", rect.width, rect.height),
            });
        }
        let display = Display::open()?;
        display.checked("XMoveResizeWindow", window, |raw| {
            // SAFETY: see `reparent_window`.
            unsafe {
                xlib::XMoveResizeWindow(
                    raw,
                    window.0 as xlib::Window,
                    rect.x,
                    rect.y,
                    rect.width,
                    rect.height,
                );
            }
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// With a display the lookup must succeed and miss; without one the host
    /// must report the window system as unavailable.
    #[test]
    fn test_x11_lookup_of_unknown_title_smoke() {
        let host = X11WindowHost::new();
        let result = host.find_window_by_title("DroidFleet_Mirror_no-such-device_0_0");

        if std::env::var("DISPLAY").is_ok() {
            assert!(matches!(result, Ok(None) | Err(WindowHostError::Unavailable(_))));
        } else {
            assert!(matches!(result, Err(WindowHostError::Unavailable(_))));
        }
    }

    fn deliver(error_code: u8, request_code: u8) {
        // SAFETY: all-zero is a valid XErrorEvent; the handler only reads it.
        let mut event: xlib::XErrorEvent = unsafe { std::mem::zeroed() };
        event.error_code = error_code;
        event.request_code = request_code;
        unsafe { record_x_error(ptr::null_mut(), &mut event) };
    }

    #[test]
    fn test_bad_window_during_reparent_becomes_call_failed() {
        // Arrange: the server rejects a stale child id (X_ReparentWindow = 7)
        take_x_error();
        deliver(xlib::BadWindow, 7);

        // Act
        let result = x_error_result("XReparentWindow", WindowHandle(0x4a00007), take_x_error());

        // Assert
        match result {
            Err(WindowHostError::CallFailed { call, window, detail }) => {
                assert_eq!(call, "XReparentWindow");
                assert_eq!(window, WindowHandle(0x4a00007));
                assert!(detail.contains("BadWindow"));
            }
            other => panic!("expected CallFailed, got {other:?}"),
        }
        assert_eq!(take_x_error(), None);
    }

    #[test]
    fn test_first_x_error_is_kept() {
        take_x_error();
        deliver(xlib::BadMatch, 7);
        deliver(xlib::BadWindow, 12);

        assert_eq!(
            take_x_error(),
            Some(XErrorRecord {
                error_code: xlib::BadMatch,
                request_code: 7
            })
        );
    }

    #[test]
    fn test_no_x_error_is_success() {
        take_x_error();
        assert_eq!(x_error_result("XMoveResizeWindow", WindowHandle(1), take_x_error()), Ok(()));
    }

    #[test]
    fn test_zero_sized_geometry_is_rejected_without_display() {
        let host = X11WindowHost::new();
        let err = host
            .set_window_geometry(WindowHandle(1), WindowRect::new(0, 0, 0, 10))
            .unwrap_err();
        assert!(matches!(err, WindowHostError::CallFailed { .. }));
    }
}
