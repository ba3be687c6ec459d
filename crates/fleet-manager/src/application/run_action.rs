//! ActionExecutor: fire-and-forget device commands with one result each.
//!
//! Operator commands (reboot, install, push, ...) block on the bridge for an
//! unpredictable time.  Each one therefore runs on its own short-lived OS
//! thread and reports back through an unbounded channel:
//!
//! ```text
//!   submit(request) ──► thread "fleet-action-<name>" ──► ActionResult ──► results rx
//! ```
//!
//! Every submitted request produces **exactly one** [`ActionResult`], whether
//! the closure returns `Ok`, returns `Err`, or panics.  Requests are
//! independent: there is no deduplication, throttling or cancellation, and two
//! reboots of the same device may well run concurrently.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::panic_message;

/// Message reported when an action succeeds without output of its own.
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Command completed.";

/// Identifier assigned to each submitted action.
pub type ActionId = Uuid;

type ActionFn = Box<dyn FnOnce() -> anyhow::Result<Option<String>> + Send + 'static>;

/// A unit of work to run against one device.
pub struct ActionRequest {
    pub name: String,
    pub serial: String,
    action: ActionFn,
}

impl ActionRequest {
    /// `action` returns `Ok(Some(text))` to report its own output, `Ok(None)`
    /// for the generic acknowledgement, or an error.
    pub fn new<F>(name: impl Into<String>, serial: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<Option<String>> + Send + 'static,
    {
        Self {
            name: name.into(),
            serial: serial.into(),
            action: Box::new(action),
        }
    }
}

impl fmt::Debug for ActionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRequest")
            .field("name", &self.name)
            .field("serial", &self.serial)
            .finish_non_exhaustive()
    }
}

/// Outcome of one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    pub id: ActionId,
    pub action_name: String,
    pub serial: String,
    pub success: bool,
    /// Action output on success, error description on failure.
    pub message: String,
}

impl fmt::Display for ActionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "ok" } else { "FAILED" };
        write!(f, "[{}] {} {}: {}", self.serial, self.action_name, status, self.message)
    }
}

/// Bookkeeping entry for a submitted action.
#[derive(Debug)]
pub struct ActionWorker {
    pub id: ActionId,
    pub name: String,
    pub serial: String,
    handle: JoinHandle<()>,
}

impl ActionWorker {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Runs [`ActionRequest`]s on worker threads.
pub struct ActionExecutor {
    results: mpsc::UnboundedSender<ActionResult>,
    workers: Mutex<Vec<ActionWorker>>,
}

impl ActionExecutor {
    /// Creates an executor and the receiver on which results arrive.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ActionResult>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                results: tx,
                workers: Mutex::new(Vec::new()),
            },
            rx,
        )
    }

    /// Starts `request` on a new worker thread.
    ///
    /// If the OS refuses to create the thread, the failure is reported as the
    /// request's [`ActionResult`] instead.
    pub fn submit(&self, request: ActionRequest) -> ActionId {
        let id = Uuid::new_v4();
        let ActionRequest {
            name,
            serial,
            action,
        } = request;

        info!(action = %name, %serial, %id, "starting action");

        let results = self.results.clone();
        let worker_name = name.clone();
        let worker_serial = serial.clone();
        let spawned = thread::Builder::new()
            .name(worker_thread_name(&name))
            .spawn(move || {
                let result = execute(id, worker_name, worker_serial, action);
                if results.send(result).is_err() {
                    warn!(%id, "action result dropped: receiver closed");
                }
            });

        match spawned {
            Ok(handle) => {
                self.workers
                    .lock()
                    .expect("lock poisoned")
                    .push(ActionWorker {
                        id,
                        name,
                        serial,
                        handle,
                    });
            }
            Err(e) => {
                error!(action = %name, %serial, error = %e, "failed to spawn action thread");
                let _ = self.results.send(ActionResult {
                    id,
                    action_name: name,
                    serial,
                    success: false,
                    message: format!("failed to start worker thread: {e}"),
                });
            }
        }
        id
    }

    /// Number of workers that have not finished yet.
    pub fn active_count(&self) -> usize {
        self.workers
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter(|w| !w.is_finished())
            .count()
    }

    /// Drops the bookkeeping for finished workers and returns how many were removed.
    pub fn reap_finished(&self) -> usize {
        let finished: Vec<ActionWorker> = {
            let mut workers = self.workers.lock().expect("lock poisoned");
            let (done, running): (Vec<_>, Vec<_>) =
                workers.drain(..).partition(ActionWorker::is_finished);
            *workers = running;
            done
        };
        let count = finished.len();
        for worker in finished {
            let _ = worker.handle.join();
        }
        count
    }

    /// Blocks until every submitted worker has finished.
    pub fn join_all(&self) {
        let workers = std::mem::take(&mut *self.workers.lock().expect("lock poisoned"));
        for worker in workers {
            if worker.handle.join().is_err() {
                warn!(id = %worker.id, "action worker terminated abnormally");
            }
        }
    }
}

fn execute(id: ActionId, name: String, serial: String, action: ActionFn) -> ActionResult {
    let outcome = panic::catch_unwind(AssertUnwindSafe(action));

    let (success, message) = match outcome {
        Ok(Ok(output)) => (
            true,
            output.unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string()),
        ),
        Ok(Err(e)) => (false, format!("{e:#}")),
        Err(payload) => (false, format!("action panicked: {}", panic_message(payload.as_ref()))),
    };

    if success {
        info!(action = %name, %serial, %id, "action completed");
    } else {
        error!(action = %name, %serial, %id, error = %message, "action failed");
    }

    ActionResult {
        id,
        action_name: name,
        serial,
        success,
        message,
    }
}

/// Thread names may not contain NUL, so those characters are dropped.
fn worker_thread_name(action_name: &str) -> String {
    let clean: String = action_name.chars().filter(|&c| c != '\0').collect();
    format!("fleet-action-{clean}")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};
    use std::time::Duration;

    #[tokio::test]
    async fn test_success_with_output_reports_output() {
        // Arrange
        let (executor, mut rx) = ActionExecutor::new();

        // Act
        let id = executor.submit(ActionRequest::new("Shell", "ABC", || {
            Ok(Some("hello".to_string()))
        }));
        let result = rx.recv().await.unwrap();

        // Assert
        assert_eq!(result.id, id);
        assert!(result.success);
        assert_eq!(result.message, "hello");
        assert_eq!(result.action_name, "Shell");
        assert_eq!(result.serial, "ABC");
    }

    #[tokio::test]
    async fn test_success_without_output_reports_generic_message() {
        let (executor, mut rx) = ActionExecutor::new();

        executor.submit(ActionRequest::new("Reboot", "ABC", || Ok(None)));
        let result = rx.recv().await.unwrap();

        assert!(result.success);
        assert_eq!(result.message, DEFAULT_SUCCESS_MESSAGE);
    }

    #[tokio::test]
    async fn test_error_reports_full_context_chain() {
        let (executor, mut rx) = ActionExecutor::new();

        executor.submit(ActionRequest::new("Install", "ABC", || {
            Err(anyhow!("INSTALL_FAILED_VERSION_DOWNGRADE")).context("installing app.apk")
        }));
        let result = rx.recv().await.unwrap();

        assert!(!result.success);
        assert!(result.message.contains("installing app.apk"));
        assert!(result.message.contains("INSTALL_FAILED_VERSION_DOWNGRADE"));
    }

    #[tokio::test]
    async fn test_panic_is_reported_as_failure() {
        let (executor, mut rx) = ActionExecutor::new();

        executor.submit(ActionRequest::new("Push", "ABC", || panic!("disk vanished")));
        let result = rx.recv().await.unwrap();

        assert!(!result.success);
        assert!(result.message.contains("disk vanished"));
    }

    #[tokio::test]
    async fn test_action_name_with_nul_still_runs() {
        // Arrange
        let (executor, mut rx) = ActionExecutor::new();

        // Act
        executor.submit(ActionRequest::new("Key\0Event", "ABC", || Ok(None)));
        let result = rx.recv().await.unwrap();

        // Assert
        assert!(result.success);
        assert_eq!(result.action_name, "Key\0Event");
    }

    #[test]
    fn test_worker_thread_name_drops_nul() {
        assert_eq!(worker_thread_name("Reboot"), "fleet-action-Reboot");
        assert_eq!(worker_thread_name("a\0b"), "fleet-action-ab");
    }

    #[tokio::test]
    async fn test_each_request_yields_exactly_one_result() {
        // Arrange
        let (executor, mut rx) = ActionExecutor::new();

        // Act: overlapping actions against the same device are all accepted
        for i in 0..8 {
            executor.submit(ActionRequest::new("Reboot", "ABC", move || {
                std::thread::sleep(Duration::from_millis(5));
                if i % 2 == 0 {
                    Ok(None)
                } else {
                    Err(anyhow!("device offline"))
                }
            }));
        }
        executor.join_all();
        drop(executor);

        // Assert
        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        assert_eq!(results.len(), 8);
        assert_eq!(results.iter().filter(|r| r.success).count(), 4);
    }

    #[test]
    fn test_reap_finished_clears_bookkeeping() {
        let (executor, _rx) = ActionExecutor::new();
        executor.submit(ActionRequest::new("Key", "ABC", || Ok(None)));
        executor.submit(ActionRequest::new("Key", "DEF", || Ok(None)));

        // Wait until both workers are done
        while executor.active_count() > 0 {
            std::thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(executor.reap_finished(), 2);
        assert_eq!(executor.reap_finished(), 0);
    }

    #[test]
    fn test_dropped_receiver_does_not_break_workers() {
        let (executor, rx) = ActionExecutor::new();
        drop(rx);

        executor.submit(ActionRequest::new("Reboot", "ABC", || Ok(None)));
        executor.join_all();

        assert_eq!(executor.active_count(), 0);
    }

    #[test]
    fn test_result_display_includes_serial_and_status() {
        let result = ActionResult {
            id: Uuid::nil(),
            action_name: "Reboot".into(),
            serial: "ABC".into(),
            success: false,
            message: "offline".into(),
        };
        assert_eq!(result.to_string(), "[ABC] Reboot FAILED: offline");
    }
}
