//! Scripted bridge runner for unit and integration testing.
//!
//! Responses are keyed by the exact argument list.  Unscripted calls succeed
//! with empty output, which is what a real `getprop` returns for an unset
//! property.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use super::{BridgeError, BridgeRunner};

#[derive(Debug, Clone)]
enum Scripted {
    Output(String),
    Failure(String),
    Panic,
}

/// A mock implementation of [`BridgeRunner`] that records every call.
#[derive(Debug, Default)]
pub struct MockBridgeRunner {
    script: Mutex<HashMap<Vec<String>, Scripted>>,
    calls: Mutex<Vec<Vec<String>>>,
}

fn key(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| (*a).to_string()).collect()
}

impl MockBridgeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `args` with `stdout` (trimmed, as the real runner does).
    pub fn respond(&self, args: &[&str], stdout: &str) {
        self.script
            .lock()
            .expect("lock poisoned")
            .insert(key(args), Scripted::Output(stdout.trim().to_string()));
    }

    /// Makes `args` fail with a non-zero exit carrying `stderr`.
    pub fn fail(&self, args: &[&str], stderr: &str) {
        self.script
            .lock()
            .expect("lock poisoned")
            .insert(key(args), Scripted::Failure(stderr.to_string()));
    }

    /// Makes `args` panic, simulating a bug deep inside a poll cycle.
    pub fn panic_on(&self, args: &[&str]) {
        self.script
            .lock()
            .expect("lock poisoned")
            .insert(key(args), Scripted::Panic);
    }

    /// Removes any scripted answer for `args`.
    pub fn clear(&self, args: &[&str]) {
        self.script.lock().expect("lock poisoned").remove(&key(args));
    }

    /// Every argument list received so far, in call order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    /// Number of calls addressed to `serial` through `-s <serial>`.
    pub fn calls_for_serial(&self, serial: &str) -> usize {
        self.calls
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter(|call| call.windows(2).any(|w| w[0] == "-s" && w[1] == serial))
            .count()
    }

    /// Number of calls whose arguments equal `args`.
    pub fn count_of(&self, args: &[&str]) -> usize {
        let wanted = key(args);
        self.calls
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter(|call| **call == wanted)
            .count()
    }

    fn answer(&self, args: &[&str]) -> Result<String, BridgeError> {
        let args = key(args);
        self.calls.lock().expect("lock poisoned").push(args.clone());

        let scripted = self.script.lock().expect("lock poisoned").get(&args).cloned();
        match scripted {
            None => Ok(String::new()),
            Some(Scripted::Output(out)) => Ok(out),
            Some(Scripted::Failure(stderr)) => Err(BridgeError::NonZeroExit {
                args: args.join(" "),
                code: Some(1),
                stderr,
            }),
            Some(Scripted::Panic) => panic!("scripted panic for `{}`", args.join(" ")),
        }
    }
}

impl BridgeRunner for MockBridgeRunner {
    fn try_run(&self, args: &[&str]) -> Result<String, BridgeError> {
        self.answer(args)
    }

    fn try_run_to_file(&self, args: &[&str], destination: &Path) -> Result<(), BridgeError> {
        let output = self.answer(args)?;
        std::fs::write(destination, output.as_bytes()).map_err(|source| BridgeError::Output {
            path: destination.to_path_buf(),
            source,
        })
    }
}
