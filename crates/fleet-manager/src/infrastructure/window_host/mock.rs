//! In-memory window system for unit and integration testing.
//!
//! [`MockWindowHost`] holds a table of titled windows that tests populate,
//! optionally making a window "appear" only after a number of failed lookups.
//! [`MockContainer`] records every resize and can run a hook from inside
//! `resize`, which is how tests reproduce the resize event a real window
//! raises when it is resized programmatically.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use fleet_core::WindowHandle;

use super::{ContainerSurface, WindowHost, WindowHostError, WindowRect};

#[derive(Debug, Clone, Copy)]
struct PendingWindow {
    handle: WindowHandle,
    /// Lookups that still miss before the window becomes visible.
    misses_left: u32,
}

/// A mock implementation of [`WindowHost`].
#[derive(Debug, Default)]
pub struct MockWindowHost {
    windows: Mutex<HashMap<String, PendingWindow>>,
    find_calls: AtomicU32,
    reparent_calls: Mutex<Vec<(WindowHandle, WindowHandle)>>,
    geometry_calls: Mutex<Vec<(WindowHandle, WindowRect)>>,
    should_fail: AtomicBool,
    reparent_fails: AtomicBool,
}

impl MockWindowHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a top-level window that is visible immediately.
    pub fn add_window(&self, title: &str, handle: WindowHandle) {
        self.add_window_after(title, handle, 0);
    }

    /// Registers a window that becomes visible after `misses` lookups.
    pub fn add_window_after(&self, title: &str, handle: WindowHandle, misses: u32) {
        self.windows.lock().expect("lock poisoned").insert(
            title.to_string(),
            PendingWindow {
                handle,
                misses_left: misses,
            },
        );
    }

    /// Makes every call fail with [`WindowHostError::Unavailable`].
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Makes only [`WindowHost::reparent_window`] fail.
    pub fn set_reparent_fails(&self, fail: bool) {
        self.reparent_fails.store(fail, Ordering::SeqCst);
    }

    pub fn find_calls(&self) -> u32 {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn reparent_calls(&self) -> Vec<(WindowHandle, WindowHandle)> {
        self.reparent_calls.lock().expect("lock poisoned").clone()
    }

    pub fn geometry_calls(&self) -> Vec<(WindowHandle, WindowRect)> {
        self.geometry_calls.lock().expect("lock poisoned").clone()
    }

    fn check_available(&self) -> Result<(), WindowHostError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(WindowHostError::Unavailable("mock window system offline".into()));
        }
        Ok(())
    }
}

impl WindowHost for MockWindowHost {
    fn find_window_by_title(&self, title: &str) -> Result<Option<WindowHandle>, WindowHostError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let mut windows = self.windows.lock().expect("lock poisoned");
        let Some(window) = windows.get_mut(title) else {
            return Ok(None);
        };
        if window.misses_left > 0 {
            window.misses_left -= 1;
            return Ok(None);
        }
        Ok(Some(window.handle))
    }

    fn reparent_window(
        &self,
        child: WindowHandle,
        parent: WindowHandle,
    ) -> Result<(), WindowHostError> {
        self.check_available()?;
        if self.reparent_fails.load(Ordering::SeqCst) {
            return Err(WindowHostError::CallFailed {
                call: "reparent",
                window: child,
                detail: "mock refused".into(),
            });
        }
        self.reparent_calls
            .lock()
            .expect("lock poisoned")
            .push((child, parent));
        Ok(())
    }

    fn set_window_geometry(
        &self,
        window: WindowHandle,
        rect: WindowRect,
    ) -> Result<(), WindowHostError> {
        self.check_available()?;
        self.geometry_calls
            .lock()
            .expect("lock poisoned")
            .push((window, rect));
        Ok(())
    }
}

type ResizeHook = Arc<dyn Fn(&MockContainer, u32, u32) + Send + Sync>;

/// A mock implementation of [`ContainerSurface`].
pub struct MockContainer {
    handle: WindowHandle,
    resizes: Mutex<Vec<(u32, u32)>>,
    geometries: Mutex<Vec<WindowRect>>,
    placements: Mutex<Vec<(WindowHandle, WindowRect)>>,
    on_resize: Mutex<Option<ResizeHook>>,
}

impl MockContainer {
    pub fn new(handle: WindowHandle) -> Self {
        Self {
            handle,
            resizes: Mutex::new(Vec::new()),
            geometries: Mutex::new(Vec::new()),
            placements: Mutex::new(Vec::new()),
            on_resize: Mutex::new(None),
        }
    }

    /// Runs `hook` synchronously inside every [`resize`](ContainerSurface::resize)
    /// and [`set_geometry`](ContainerSurface::set_geometry), after recording it.
    pub fn set_on_resize<F>(&self, hook: F)
    where
        F: Fn(&MockContainer, u32, u32) + Send + Sync + 'static,
    {
        *self.on_resize.lock().expect("lock poisoned") = Some(Arc::new(hook));
    }

    pub fn resizes(&self) -> Vec<(u32, u32)> {
        self.resizes.lock().expect("lock poisoned").clone()
    }

    pub fn geometries(&self) -> Vec<WindowRect> {
        self.geometries.lock().expect("lock poisoned").clone()
    }

    /// Every `(child, rect)` passed to [`place_child`](ContainerSurface::place_child).
    pub fn placements(&self) -> Vec<(WindowHandle, WindowRect)> {
        self.placements.lock().expect("lock poisoned").clone()
    }

    fn fire_hook(&self, width: u32, height: u32) {
        let hook = self.on_resize.lock().expect("lock poisoned").clone();
        if let Some(hook) = hook {
            hook(self, width, height);
        }
    }
}

impl ContainerSurface for MockContainer {
    fn native_handle(&self) -> WindowHandle {
        self.handle
    }

    fn resize(&self, width: u32, height: u32) -> Result<(), WindowHostError> {
        self.resizes
            .lock()
            .expect("lock poisoned")
            .push((width, height));
        self.fire_hook(width, height);
        Ok(())
    }

    fn set_geometry(&self, rect: WindowRect) -> Result<(), WindowHostError> {
        self.geometries.lock().expect("lock poisoned").push(rect);
        self.fire_hook(rect.width, rect.height);
        Ok(())
    }

    fn place_child(&self, child: WindowHandle, rect: WindowRect) -> Result<(), WindowHostError> {
        self.placements
            .lock()
            .expect("lock poisoned")
            .push((child, rect));
        Ok(())
    }
}
