//! Screen-mirroring tool (`scrcpy`) launcher.
//!
//! The mirror tool renders a device screen into its own top-level native
//! window.  The only handshake between DroidFleet and that window is the
//! `--window-title` argument: the tool copies it verbatim into the window
//! title, and the mirror session later searches the OS window list for it.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub mod mock;

/// Errors produced when launching the mirror tool.
#[derive(Debug, Error)]
pub enum MirrorToolError {
    #[error("mirror tool not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to start mirror tool {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Stream quality options passed to the mirror tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorOptions {
    /// Longest side of the mirrored video, in pixels.
    pub max_size: u32,
    /// Video bit rate in bits per second.
    pub bit_rate: u32,
    pub video_codec: String,
    pub max_fps: u32,
    /// Forward device audio to the host.
    pub audio: bool,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            max_size: 800,
            bit_rate: 4_000_000,
            video_codec: "h264".to_string(),
            max_fps: 90,
            audio: false,
        }
    }
}

/// Builds the mirror tool command line for one session.
pub fn mirror_args(serial: &str, window_title: &str, options: &MirrorOptions) -> Vec<String> {
    let mut args = vec![
        "-s".to_string(),
        serial.to_string(),
        "--max-size".to_string(),
        options.max_size.to_string(),
        "--video-bit-rate".to_string(),
        options.bit_rate.to_string(),
        format!("--video-codec={}", options.video_codec),
        format!("--max-fps={}", options.max_fps),
    ];
    if !options.audio {
        args.push("--no-audio".to_string());
    }
    args.push("--window-title".to_string());
    args.push(window_title.to_string());
    args
}

/// A running mirror tool process.
///
/// Dropping this value does **not** terminate the process: mirror processes
/// outlive their session (see [`MirrorProcess::release`]).
#[derive(Debug)]
pub struct MirrorProcess {
    pid: u32,
    child: Option<Child>,
}

impl MirrorProcess {
    pub fn from_child(child: Child) -> Self {
        Self {
            pid: child.id(),
            child: Some(child),
        }
    }

    /// A process known only by its id (used by test launchers).
    pub fn detached(pid: u32) -> Self {
        Self { pid, child: None }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Gives up ownership of the process without killing it and returns its id.
    ///
    /// The mirror tool keeps running until the operator closes it or the
    /// device disconnects.
    pub fn release(mut self) -> u32 {
        drop(self.child.take());
        self.pid
    }
}

/// Starts the mirror tool for a device.
pub trait MirrorLauncher: Send + Sync {
    /// Spawns the tool for `serial`, titling its window `window_title`.
    fn launch(&self, serial: &str, window_title: &str) -> Result<MirrorProcess, MirrorToolError>;
}

/// [`MirrorLauncher`] that spawns a real `scrcpy` executable.
#[derive(Debug, Clone)]
pub struct ScrcpyLauncher {
    program: PathBuf,
    options: MirrorOptions,
}

impl ScrcpyLauncher {
    pub fn new(program: impl Into<PathBuf>, options: MirrorOptions) -> Self {
        let program = program.into();
        if program.components().count() > 1 && !program.exists() {
            warn!(path = %program.display(), "mirror tool executable not found");
        }
        Self { program, options }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn options(&self) -> &MirrorOptions {
        &self.options
    }
}

impl MirrorLauncher for ScrcpyLauncher {
    fn launch(&self, serial: &str, window_title: &str) -> Result<MirrorProcess, MirrorToolError> {
        let child = Command::new(&self.program)
            .args(mirror_args(serial, window_title, &self.options))
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| {
                if source.kind() == io::ErrorKind::NotFound {
                    MirrorToolError::NotFound(self.program.clone())
                } else {
                    MirrorToolError::Spawn {
                        path: self.program.clone(),
                        source,
                    }
                }
            })?;

        info!(
            serial,
            pid = child.id(),
            max_size = self.options.max_size,
            bit_rate = self.options.bit_rate,
            codec = %self.options.video_codec,
            "mirror tool started"
        );
        Ok(MirrorProcess::from_child(child))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
