//! Device-bridge (`adb`) process adapter.
//!
//! Every call spawns a short-lived `adb` process and blocks the calling thread
//! until it exits.  Callers therefore run bridge commands only on the poller
//! thread or on action worker threads, never on the interactive task.
//!
//! # Two flavours of every call (for beginners)
//!
//! [`BridgeRunner::try_run`] returns a `Result` and is what device *actions*
//! use: a failed reboot must reach the operator as a failure.  The provided
//! [`BridgeRunner::run`] wraps it and downgrades any failure to an empty string
//! plus a `warn!` log.  The poller uses that flavour, because a property that
//! cannot be read is simply "unknown" and must not abort the cycle.
//!
//! # Testability
//!
//! [`mock::MockBridgeRunner`] answers scripted output per argument list and
//! records every call, so tests can verify that offline devices are never
//! queried.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use fleet_core::domain::device::parse_physical_size;
use thiserror::Error;
use tracing::{debug, warn};

pub mod mock;

/// Errors produced by the bridge process adapter.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The bridge executable does not exist.
    #[error("bridge binary not found at {}", .0.display())]
    NotFound(PathBuf),

    /// The process could not be started for another reason.
    #[error("failed to start bridge binary {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The process ran but reported failure.
    #[error("`{args}` exited with status {code:?}: {stderr}")]
    NonZeroExit {
        args: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The output file for a binary capture could not be created.
    #[error("cannot write {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Runs the device-bridge executable.
///
/// Implementations must be shareable between the poller thread and action
/// worker threads.
pub trait BridgeRunner: Send + Sync {
    /// Runs the bridge with `args` and returns its trimmed standard output.
    fn try_run(&self, args: &[&str]) -> Result<String, BridgeError>;

    /// Runs the bridge with `args`, streaming raw standard output into
    /// `destination`.
    fn try_run_to_file(&self, args: &[&str], destination: &Path) -> Result<(), BridgeError>;

    /// Failure-tolerant [`try_run`](Self::try_run): any error becomes an empty
    /// string and a warning.
    fn run(&self, args: &[&str]) -> String {
        match self.try_run(args) {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "bridge command failed");
                String::new()
            }
        }
    }

    /// Failure-tolerant [`try_run_to_file`](Self::try_run_to_file).
    ///
    /// Returns `false` on a non-zero exit or any I/O error.
    fn run_binary(&self, args: &[&str], destination: &Path) -> bool {
        match self.try_run_to_file(args, destination) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, destination = %destination.display(), "binary capture failed");
                false
            }
        }
    }
}

/// [`BridgeRunner`] backed by a real `adb` executable.
#[derive(Debug, Clone)]
pub struct AdbRunner {
    program: PathBuf,
}

impl AdbRunner {
    /// Creates a runner for `program`.
    ///
    /// A bare name such as `adb` is resolved through `PATH` at spawn time.  An
    /// explicit path that does not exist is accepted with a warning so the
    /// manager still starts; every call will then fail with
    /// [`BridgeError::NotFound`].
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        if program.components().count() > 1 && !program.exists() {
            warn!(path = %program.display(), "bridge executable not found; device features will be limited");
        }
        Self { program }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).stdin(Stdio::null());
        cmd
    }

    fn spawn_error(&self, source: io::Error) -> BridgeError {
        if source.kind() == io::ErrorKind::NotFound {
            BridgeError::NotFound(self.program.clone())
        } else {
            BridgeError::Spawn {
                path: self.program.clone(),
                source,
            }
        }
    }
}

impl Default for AdbRunner {
    fn default() -> Self {
        Self::new("adb")
    }
}

impl BridgeRunner for AdbRunner {
    fn try_run(&self, args: &[&str]) -> Result<String, BridgeError> {
        debug!(args = ?args, "running bridge command");
        let output = self
            .command(args)
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(BridgeError::NonZeroExit {
                args: args.join(" "),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn try_run_to_file(&self, args: &[&str], destination: &Path) -> Result<(), BridgeError> {
        debug!(args = ?args, destination = %destination.display(), "running binary bridge command");
        let file = File::create(destination).map_err(|source| BridgeError::Output {
            path: destination.to_path_buf(),
            source,
        })?;

        let output = self
            .command(args)
            .stdout(Stdio::from(file))
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(BridgeError::NonZeroExit {
                args: args.join(" "),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Per-device commands built on a [`BridgeRunner`].
///
/// Cheap to clone; action closures each take their own copy onto their
/// worker thread.
#[derive(Clone)]
pub struct DeviceCommands {
    runner: Arc<dyn BridgeRunner>,
}

impl DeviceCommands {
    pub fn new(runner: Arc<dyn BridgeRunner>) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &Arc<dyn BridgeRunner> {
        &self.runner
    }

    pub fn reboot(&self, serial: &str) -> Result<String, BridgeError> {
        self.runner.try_run(&["-s", serial, "reboot"])
    }

    /// Sends an Android key event (`3` / `KEYCODE_HOME`, `26` / `KEYCODE_POWER`, ...).
    pub fn input_keyevent(&self, serial: &str, keycode: &str) -> Result<String, BridgeError> {
        self.runner
            .try_run(&["-s", serial, "shell", "input", "keyevent", keycode])
    }

    pub fn install_apk(&self, serial: &str, apk: &Path) -> Result<String, BridgeError> {
        let apk = apk.to_string_lossy();
        self.runner.try_run(&["-s", serial, "install", &*apk])
    }

    pub fn push_file(
        &self,
        serial: &str,
        local: &Path,
        remote: &str,
    ) -> Result<String, BridgeError> {
        let local = local.to_string_lossy();
        self.runner.try_run(&["-s", serial, "push", &*local, remote])
    }

    /// Runs `command` in the device shell.  The command is split on whitespace;
    /// no shell quoting is interpreted on the host side.
    pub fn shell_command(&self, serial: &str, command: &str) -> Result<String, BridgeError> {
        let mut args = vec!["-s", serial, "shell"];
        args.extend(command.split_whitespace());
        self.runner.try_run(&args)
    }

    /// Captures the screen as PNG straight into `destination`.
    pub fn take_screenshot(&self, serial: &str, destination: &Path) -> Result<(), BridgeError> {
        self.runner
            .try_run_to_file(&["-s", serial, "exec-out", "screencap", "-p"], destination)
    }

    /// Reads one system property; empty when unavailable.
    pub fn get_prop(&self, serial: &str, key: &str) -> String {
        self.runner.run(&["-s", serial, "shell", "getprop", key])
    }

    /// Physical panel size as `"WxH"`; empty when unavailable.
    pub fn screen_resolution(&self, serial: &str) -> String {
        parse_physical_size(&self.runner.run(&["-s", serial, "shell", "wm", "size"]))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::mock::MockBridgeRunner;
    use super::*;

    fn commands() -> (Arc<MockBridgeRunner>, DeviceCommands) {
        let mock = Arc::new(MockBridgeRunner::new());
        let commands = DeviceCommands::new(mock.clone());
        (mock, commands)
    }

    #[test]
    fn test_run_downgrades_failure_to_empty_string() {
        // Arrange
        let mock = MockBridgeRunner::new();
        mock.fail(&["devices", "-l"], "daemon not running");

        // Act
        let output = mock.run(&["devices", "-l"]);

        // Assert
        assert_eq!(output, "");
    }

    #[test]
    fn test_run_binary_reports_failure_as_false() {
        let mock = MockBridgeRunner::new();
        mock.fail(&["-s", "X", "exec-out", "screencap", "-p"], "device offline");
        assert!(!mock.run_binary(
            &["-s", "X", "exec-out", "screencap", "-p"],
            Path::new("unused.png")
        ));
    }

    #[test]
    fn test_shell_command_splits_on_whitespace() {
        let (mock, commands) = commands();
        mock.respond(&["-s", "ABC", "shell", "echo", "hi", "there"], "hi there");

        let output = commands.shell_command("ABC", "  echo hi   there ").unwrap();

        assert_eq!(output, "hi there");
        assert_eq!(
            mock.calls(),
            vec![vec!["-s", "ABC", "shell", "echo", "hi", "there"]]
        );
    }

    #[test]
    fn test_reboot_propagates_bridge_failure() {
        let (mock, commands) = commands();
        mock.fail(&["-s", "ABC", "reboot"], "device 'ABC' not found");

        let err = commands.reboot("ABC").unwrap_err();

        assert!(matches!(err, BridgeError::NonZeroExit { .. }));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_input_keyevent_and_push_build_expected_arguments() {
        let (mock, commands) = commands();

        commands.input_keyevent("ABC", "26").unwrap();
        commands
            .push_file("ABC", Path::new("notes.txt"), "/sdcard/notes.txt")
            .unwrap();
        commands.install_apk("ABC", Path::new("app.apk")).unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                vec!["-s", "ABC", "shell", "input", "keyevent", "26"],
                vec!["-s", "ABC", "push", "notes.txt", "/sdcard/notes.txt"],
                vec!["-s", "ABC", "install", "app.apk"],
            ]
        );
    }

    #[test]
    fn test_screen_resolution_parses_physical_size() {
        let (mock, commands) = commands();
        mock.respond(
            &["-s", "ABC", "shell", "wm", "size"],
            "Physical size: 1080x2400\nOverride size: 720x1600",
        );

        assert_eq!(commands.screen_resolution("ABC"), "1080x2400");
    }

    #[test]
    fn test_get_prop_is_empty_when_unscripted() {
        let (_mock, commands) = commands();
        assert_eq!(commands.get_prop("ABC", "ro.product.model"), "");
    }

    #[test]
    fn test_adb_runner_missing_binary_is_not_found() {
        // Arrange
        let runner = AdbRunner::new("/definitely/not/here/adb");

        // Act
        let err = runner.try_run(&["devices"]).unwrap_err();

        // Assert
        assert!(matches!(err, BridgeError::NotFound(_)));
        assert_eq!(runner.run(&["devices"]), "");
    }

    #[test]
    fn test_adb_runner_missing_binary_capture_fails() {
        let dir = std::env::temp_dir().join(format!("droidfleet-bridge-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let runner = AdbRunner::new("/definitely/not/here/adb");

        assert!(!runner.run_binary(&["exec-out", "screencap", "-p"], &dir.join("shot.png")));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
