//! MirrorSession: lifecycle of one embedded mirror window.
//!
//! A session launches the mirror tool with a unique window title, waits for
//! a window with that title to appear, adopts it into a container surface,
//! and from then on keeps the container's height consistent with the device's
//! aspect ratio whenever the container is resized.
//!
//! # State machine (for beginners)
//!
//! ```text
//!                launch ok                 window found + reparented
//!  Launching ─────────────► WaitingForWindow ─────────────────────────► Adopted
//!      │                         │      │                                 │
//!      │ launch failed           │      │ reparent failed                 │ close()
//!      ▼                         │      ▼                                 ▼
//!  Closed(LaunchFailed)          │   Closed(AdoptionFailed)      Closed(ClosedByUser)
//!                                │
//!                                │ retry ceiling reached
//!                                ▼
//!                        Closed(AdoptionTimeout)
//! ```
//!
//! `close()` is accepted from every phase that is not already closed.
//!
//! # Resize feedback loop
//!
//! Correcting the container's height resizes the container, which raises
//! another resize event that calls [`MirrorSession::handle_resize`] again
//! before the first call has returned.  The session holds a `correcting` flag
//! (an `AtomicBool` taken with `compare_exchange` and released by a guard) so
//! the nested call returns [`ResizeOutcome::Suppressed`] instead of recursing.
//!
//! # Known limitation
//!
//! Closing a session does not terminate the mirror tool.  The process handle
//! is released and its pid logged; the tool exits when the operator closes its
//! window or the device disconnects.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fleet_core::{
    mirror_window_title, AdoptionPolicy, AspectLock, CloseReason, Device, MirrorPhase,
    WindowHandle,
};
use thiserror::Error;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::infrastructure::mirror_tool::{MirrorLauncher, MirrorProcess, MirrorToolError};
use crate::infrastructure::window_host::{
    ContainerSurface, WindowHost, WindowHostError, WindowRect,
};

/// Distinguishes sessions created within the same millisecond.
static TITLE_NONCE: AtomicU64 = AtomicU64::new(0);

/// Errors produced by a mirror session.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("failed to launch mirror tool for {serial}")]
    Launch {
        serial: String,
        #[source]
        source: MirrorToolError,
    },

    #[error("no window titled '{title}' appeared after {attempts} probes")]
    AdoptionTimeout { title: String, attempts: u32 },

    #[error("failed to adopt window {window}")]
    Adoption {
        window: WindowHandle,
        #[source]
        source: WindowHostError,
    },

    #[error("mirror session for {serial} is {phase:?}; cannot {operation}")]
    InvalidPhase {
        serial: String,
        phase: MirrorPhase,
        operation: &'static str,
    },
}

/// Result of a single adoption probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Adopted(WindowHandle),
    /// The window has not appeared yet; `attempt` failed probes so far.
    Pending { attempt: u32 },
}

/// What [`MirrorSession::handle_resize`] did with a resize event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResizeOutcome {
    /// Not adopted, aspect lock disabled, or ratio unknown.
    Ignored,
    /// Height already matches the aspect ratio.
    WithinTolerance,
    /// The container was resized to `height`.
    Corrected { height: u32 },
    /// Raised by our own correction; not acted on.
    Suppressed,
    /// The correcting resize failed.
    CorrectionFailed(WindowHostError),
}

#[derive(Debug)]
struct SessionState {
    phase: MirrorPhase,
    retry_count: u32,
    process: Option<MirrorProcess>,
}

/// One mirrored device.
#[derive(Debug)]
pub struct MirrorSession {
    serial: String,
    window_title: String,
    aspect: AspectLock,
    policy: AdoptionPolicy,
    aspect_locked: AtomicBool,
    correcting: AtomicBool,
    native_window: OnceLock<WindowHandle>,
    state: Mutex<SessionState>,
}

impl MirrorSession {
    /// Creates a session in the `Launching` phase with a fresh window title.
    pub fn new(serial: impl Into<String>, aspect: AspectLock, policy: AdoptionPolicy) -> Self {
        let serial = serial.into();
        let unix_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let nonce = TITLE_NONCE.fetch_add(1, Ordering::Relaxed);
        let window_title = mirror_window_title(&serial, unix_millis, nonce);

        Self {
            serial,
            window_title,
            aspect,
            policy,
            aspect_locked: AtomicBool::new(true),
            correcting: AtomicBool::new(false),
            native_window: OnceLock::new(),
            state: Mutex::new(SessionState {
                phase: MirrorPhase::Launching,
                retry_count: 0,
                process: None,
            }),
        }
    }

    /// Creates a session for `device`, deriving the aspect ratio from its
    /// reported resolution.
    pub fn for_device(device: &Device, policy: AdoptionPolicy, sidebar_width: u32) -> Self {
        Self::new(
            device.serial.clone(),
            AspectLock::from_resolution(&device.resolution, sidebar_width),
            policy,
        )
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn window_title(&self) -> &str {
        &self.window_title
    }

    pub fn aspect(&self) -> AspectLock {
        self.aspect
    }

    /// Width / height of the device panel; `0.0` when unknown.
    pub fn aspect_ratio(&self) -> f64 {
        self.aspect.ratio()
    }

    pub fn policy(&self) -> AdoptionPolicy {
        self.policy
    }

    /// The adopted window, once adoption succeeded.
    pub fn native_window(&self) -> Option<WindowHandle> {
        self.native_window.get().copied()
    }

    pub fn phase(&self) -> MirrorPhase {
        self.state.lock().expect("lock poisoned").phase
    }

    pub fn retry_count(&self) -> u32 {
        self.state.lock().expect("lock poisoned").retry_count
    }

    /// Pid of the mirror tool while the session still owns it.
    pub fn pid(&self) -> Option<u32> {
        self.state
            .lock()
            .expect("lock poisoned")
            .process
            .as_ref()
            .map(MirrorProcess::pid)
    }

    pub fn is_aspect_locked(&self) -> bool {
        self.aspect_locked.load(Ordering::SeqCst)
    }

    pub fn set_aspect_locked(&self, locked: bool) {
        self.aspect_locked.store(locked, Ordering::SeqCst);
    }

    /// Disables aspect enforcement until the returned guard is dropped, then
    /// restores whatever state was in effect before.
    pub fn unlock_aspect(&self) -> AspectUnlockGuard<'_> {
        let previous = self.aspect_locked.swap(false, Ordering::SeqCst);
        AspectUnlockGuard {
            flag: &self.aspect_locked,
            previous,
        }
    }

    /// Starts the mirror tool.  Moves to `WaitingForWindow` on success and to
    /// `Closed(LaunchFailed)` on failure.
    pub fn launch(&self, launcher: &dyn MirrorLauncher) -> Result<u32, MirrorError> {
        let mut state = self.state.lock().expect("lock poisoned");
        if state.phase != MirrorPhase::Launching {
            return Err(self.invalid_phase(state.phase, "launch"));
        }

        match launcher.launch(&self.serial, &self.window_title) {
            Ok(process) => {
                let pid = process.pid();
                state.process = Some(process);
                state.phase = MirrorPhase::WaitingForWindow;
                info!(serial = %self.serial, pid, title = %self.window_title, "mirror tool launched");
                Ok(pid)
            }
            Err(source) => {
                state.phase = MirrorPhase::Closed(CloseReason::LaunchFailed);
                error!(serial = %self.serial, error = %source, "mirror tool launch failed");
                Err(MirrorError::Launch {
                    serial: self.serial.clone(),
                    source,
                })
            }
        }
    }

    /// Looks for the mirror window once and adopts it into `container` when found.
    ///
    /// A lookup error from the window system counts as a miss.  When the
    /// retry ceiling is reached the session closes with `AdoptionTimeout` and
    /// the mirror tool is left running.
    ///
    /// The session lock is not held while the window host runs, so a host
    /// that raises a resize event during reparenting may call back into
    /// [`MirrorSession::handle_resize`] (which returns `Ignored` until the
    /// session is adopted).
    pub fn probe(
        &self,
        host: &dyn WindowHost,
        container: &dyn ContainerSurface,
    ) -> Result<ProbeOutcome, MirrorError> {
        match self.phase() {
            MirrorPhase::WaitingForWindow => {}
            MirrorPhase::Adopted => {
                return self
                    .native_window()
                    .map(ProbeOutcome::Adopted)
                    .ok_or_else(|| self.invalid_phase(MirrorPhase::Adopted, "probe"));
            }
            phase => return Err(self.invalid_phase(phase, "probe")),
        }

        // Failures only count toward the timeout, which logs once.
        let found = host
            .find_window_by_title(&self.window_title)
            .unwrap_or_else(|e| {
                debug!(serial = %self.serial, error = %e, "window lookup failed");
                None
            });

        let Some(window) = found else {
            return self.record_miss();
        };

        let adopted = host.reparent_window(window, container.native_handle());

        let mut state = self.state.lock().expect("lock poisoned");
        if state.phase != MirrorPhase::WaitingForWindow {
            return Err(self.invalid_phase(state.phase, "probe"));
        }
        if let Err(source) = adopted {
            state.phase = MirrorPhase::Closed(CloseReason::AdoptionFailed);
            error!(serial = %self.serial, %window, error = %source, "failed to adopt mirror window");
            return Err(MirrorError::Adoption { window, source });
        }

        let _ = self.native_window.set(window);
        state.phase = MirrorPhase::Adopted;
        info!(
            serial = %self.serial,
            %window,
            container = %container.native_handle(),
            probes = state.retry_count + 1,
            "mirror window adopted"
        );
        Ok(ProbeOutcome::Adopted(window))
    }

    fn record_miss(&self) -> Result<ProbeOutcome, MirrorError> {
        let mut state = self.state.lock().expect("lock poisoned");
        if state.phase != MirrorPhase::WaitingForWindow {
            return Err(self.invalid_phase(state.phase, "probe"));
        }

        state.retry_count += 1;
        debug!(serial = %self.serial, attempt = state.retry_count, "mirror window not found yet");
        if state.retry_count < self.policy.max_attempts {
            return Ok(ProbeOutcome::Pending {
                attempt: state.retry_count,
            });
        }

        state.phase = MirrorPhase::Closed(CloseReason::AdoptionTimeout);
        error!(
            serial = %self.serial,
            title = %self.window_title,
            attempts = state.retry_count,
            pid = state.process.as_ref().map(MirrorProcess::pid),
            "mirror window never appeared; giving up"
        );
        Err(MirrorError::AdoptionTimeout {
            title: self.window_title.clone(),
            attempts: state.retry_count,
        })
    }

    /// Probes on a timer until the window is adopted or adoption fails.
    ///
    /// The first probe runs one interval after the call, so with the default
    /// policy the session gives up after about ten seconds.
    pub async fn await_window(
        &self,
        host: &dyn WindowHost,
        container: &dyn ContainerSurface,
    ) -> Result<WindowHandle, MirrorError> {
        let period = self.policy.probe_interval.max(Duration::from_millis(1));
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let ProbeOutcome::Adopted(window) = self.probe(host, container)? {
                return Ok(window);
            }
        }
    }

    /// Reacts to the container being resized to `width` x `height`.
    ///
    /// Once adopted, the mirror window is refitted to the container's content
    /// area at its final size, whether or not the height was corrected.
    pub fn handle_resize(
        &self,
        container: &dyn ContainerSurface,
        width: u32,
        height: u32,
    ) -> ResizeOutcome {
        if self.phase() != MirrorPhase::Adopted {
            return ResizeOutcome::Ignored;
        }
        if self.correcting.load(Ordering::SeqCst) {
            return ResizeOutcome::Suppressed;
        }
        if !self.is_aspect_locked() || !self.aspect.is_known() {
            self.refit(container, width, height);
            return ResizeOutcome::Ignored;
        }
        let Some(expected) = self.aspect.correction(width, height) else {
            self.refit(container, width, height);
            return ResizeOutcome::WithinTolerance;
        };
        let Some(_guard) = CorrectionGuard::acquire(&self.correcting) else {
            return ResizeOutcome::Suppressed;
        };

        debug!(serial = %self.serial, width, height, expected, "correcting container height");
        match container.resize(width, expected) {
            Ok(()) => {
                self.refit(container, width, expected);
                ResizeOutcome::Corrected { height: expected }
            }
            Err(e) => {
                warn!(serial = %self.serial, error = %e, "aspect correction failed");
                ResizeOutcome::CorrectionFailed(e)
            }
        }
    }

    /// Sizes the adopted mirror window to the content area of a container
    /// that is `width` x `height`: everything left of the sidebar.
    ///
    /// Does nothing before adoption.
    pub fn fit_mirror(
        &self,
        container: &dyn ContainerSurface,
        width: u32,
        height: u32,
    ) -> Result<(), WindowHostError> {
        let Some(window) = self.native_window() else {
            return Ok(());
        };
        let content = WindowRect::new(0, 0, self.aspect.content_width(width), height);
        container.place_child(window, content)
    }

    fn refit(&self, container: &dyn ContainerSurface, width: u32, height: u32) {
        if let Err(e) = self.fit_mirror(container, width, height) {
            warn!(serial = %self.serial, error = %e, "failed to fit mirror window");
        }
    }

    /// Closes the session.  Returns the pid of the mirror tool, which keeps
    /// running.  A session that is already closed keeps its close reason.
    pub fn close(&self) -> Option<u32> {
        let mut state = self.state.lock().expect("lock poisoned");
        if !state.phase.is_closed() {
            state.phase = MirrorPhase::Closed(CloseReason::ClosedByUser);
        }
        let pid = state.process.take().map(MirrorProcess::release);
        info!(serial = %self.serial, ?pid, phase = ?state.phase, "mirror session closed; tool left running");
        pid
    }

    fn invalid_phase(&self, phase: MirrorPhase, operation: &'static str) -> MirrorError {
        MirrorError::InvalidPhase {
            serial: self.serial.clone(),
            phase,
            operation,
        }
    }
}

/// Restores the previous aspect-lock state on drop.
#[must_use = "the aspect lock is restored as soon as the guard is dropped"]
pub struct AspectUnlockGuard<'a> {
    flag: &'a AtomicBool,
    previous: bool,
}

impl Drop for AspectUnlockGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(self.previous, Ordering::SeqCst);
    }
}

struct CorrectionGuard<'a>(&'a AtomicBool);

impl<'a> CorrectionGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for CorrectionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
