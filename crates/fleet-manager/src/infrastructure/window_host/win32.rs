//! Win32 implementation of [`WindowHost`].
//!
//! Mirror windows are located with `FindWindowW` (exact title match over
//! top-level windows), turned into child windows by swapping `WS_POPUP` /
//! `WS_CAPTION` / `WS_THICKFRAME` for `WS_CHILD`, and attached with
//! `SetParent`.

use std::ffi::c_void;

use fleet_core::WindowHandle;
use tracing::debug;
use windows::core::PCWSTR;
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::WindowsAndMessaging::{
    FindWindowW, GetWindowLongW, SetParent, SetWindowLongW, SetWindowPos, GWL_STYLE,
    SET_WINDOW_POS_FLAGS, SWP_FRAMECHANGED, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SWP_NOZORDER,
    WS_CAPTION, WS_CHILD, WS_POPUP, WS_THICKFRAME,
};

use super::{WindowHost, WindowHostError, WindowRect};

/// Flags for the post-`SetParent` frame refresh: apply the new style, keep
/// position and size.
const STYLE_REFRESH: SET_WINDOW_POS_FLAGS = SET_WINDOW_POS_FLAGS(
    SWP_NOMOVE.0 | SWP_NOSIZE.0 | SWP_NOZORDER.0 | SWP_NOACTIVATE.0 | SWP_FRAMECHANGED.0,
);

fn to_hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.0 as usize as *mut c_void)
}

fn from_hwnd(hwnd: HWND) -> WindowHandle {
    WindowHandle(hwnd.0 as usize as u64)
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Windows implementation of [`WindowHost`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32WindowHost;

impl Win32WindowHost {
    pub fn new() -> Self {
        Self
    }
}

impl WindowHost for Win32WindowHost {
    fn find_window_by_title(&self, title: &str) -> Result<Option<WindowHandle>, WindowHostError> {
        let wide = to_wide(title);
        // SAFETY: `wide` is NUL-terminated and outlives the call; a null class
        // name matches any window class.
        let found = unsafe { FindWindowW(PCWSTR::null(), PCWSTR(wide.as_ptr())) };
        match found {
            Ok(hwnd) if !hwnd.is_invalid() => Ok(Some(from_hwnd(hwnd))),
            // FindWindowW reports "no such window" as an error.
            _ => Ok(None),
        }
    }

    fn reparent_window(
        &self,
        child: WindowHandle,
        parent: WindowHandle,
    ) -> Result<(), WindowHostError> {
        let child_hwnd = to_hwnd(child);

        // SAFETY: both handles come from the window system; Win32 validates
        // them and fails the call for stale handles.
        unsafe {
            let style = GetWindowLongW(child_hwnd, GWL_STYLE) as u32;
            let child_style =
                (style & !(WS_POPUP.0 | WS_CAPTION.0 | WS_THICKFRAME.0)) | WS_CHILD.0;
            SetWindowLongW(child_hwnd, GWL_STYLE, child_style as i32);

            SetParent(child_hwnd, Some(to_hwnd(parent))).map_err(|e| {
                WindowHostError::CallFailed {
                    call: "SetParent",
                    window: child,
                    detail: e.to_string(),
                }
            })?;

            // The container sizes the child once it knows its content area.
            SetWindowPos(child_hwnd, None, 0, 0, 0, 0, STYLE_REFRESH)
            .map_err(|e| WindowHostError::CallFailed {
                call: "SetWindowPos",
                window: child,
                detail: e.to_string(),
            })?;
        }

        debug!(%child, %parent, "window reparented");
        Ok(())
    }

    fn set_window_geometry(
        &self,
        window: WindowHandle,
        rect: WindowRect,
    ) -> Result<(), WindowHostError> {
        // SAFETY: see `reparent_window`.
        unsafe {
            SetWindowPos(
                to_hwnd(window),
                None,
                rect.x,
                rect.y,
                rect.width as i32,
                rect.height as i32,
                SWP_NOZORDER | SWP_NOACTIVATE,
            )
        }
        .map_err(|e| WindowHostError::CallFailed {
            call: "SetWindowPos",
            window,
            detail: e.to_string(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
