//! Mock mirror launcher for unit and integration testing.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use super::{MirrorLauncher, MirrorProcess, MirrorToolError};

/// A launch recorded by [`MockMirrorLauncher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedLaunch {
    pub serial: String,
    pub window_title: String,
    pub pid: u32,
}

/// A mock implementation of [`MirrorLauncher`] that hands out fake pids.
#[derive(Debug)]
pub struct MockMirrorLauncher {
    launches: Mutex<Vec<RecordedLaunch>>,
    next_pid: AtomicU32,
    should_fail: AtomicBool,
}

impl MockMirrorLauncher {
    pub fn new() -> Self {
        Self {
            launches: Mutex::new(Vec::new()),
            next_pid: AtomicU32::new(1000),
            should_fail: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent launch fail as if the binary were missing.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    pub fn launches(&self) -> Vec<RecordedLaunch> {
        self.launches.lock().expect("lock poisoned").clone()
    }
}

impl Default for MockMirrorLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl MirrorLauncher for MockMirrorLauncher {
    fn launch(&self, serial: &str, window_title: &str) -> Result<MirrorProcess, MirrorToolError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(MirrorToolError::NotFound("scrcpy".into()));
        }
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        self.launches
            .lock()
            .expect("lock poisoned")
            .push(RecordedLaunch {
                serial: serial.to_string(),
                window_title: window_title.to_string(),
                pid,
            });
        Ok(MirrorProcess::detached(pid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_launcher_records_and_assigns_distinct_pids() {
        let launcher = MockMirrorLauncher::new();

        let a = launcher.launch("A", "title-a").unwrap();
        let b = launcher.launch("B", "title-b").unwrap();

        assert_ne!(a.pid(), b.pid());
        assert_eq!(launcher.launches().len(), 2);
        assert_eq!(launcher.launches()[1].window_title, "title-b");
    }

    #[test]
    fn test_mock_launcher_failure_records_nothing() {
        let launcher = MockMirrorLauncher::new();
        launcher.set_should_fail(true);

        assert!(launcher.launch("A", "t").is_err());
        assert!(launcher.launches().is_empty());
    }
}
