//! DevicePoller: continuous device discovery on a dedicated thread.
//!
//! Every cycle enumerates the attached devices through the bridge, queries a
//! handful of properties for each *online* device, and publishes the complete
//! result as one immutable [`DeviceSnapshot`].
//!
//! # Threading model (for beginners)
//!
//! Bridge calls block for as long as `adb` takes, which can be seconds for a
//! device that is rebooting.  Running them on the Tokio runtime would stall
//! every other task, so the poller owns one plain OS thread
//! (`fleet-device-poller`).  The interactive side talks to it through two
//! atomics and one channel:
//!
//! ```text
//!   interactive task                      fleet-device-poller thread
//!   ────────────────                      ──────────────────────────
//!   set_interval() ──► AtomicU64 ───────► read at the top of each cycle
//!   stop()         ──► AtomicBool ──────► checked between cycles and sleep slices
//!   subscribe()    ◄── watch::Receiver ◄─ send_replace(snapshot)
//! ```
//!
//! The `watch` channel keeps only the newest snapshot: a slow consumer skips
//! intermediate cycles instead of building a queue.
//!
//! # Failure semantics
//!
//! Bridge failures are already downgraded to empty strings by
//! [`BridgeRunner::run`](crate::infrastructure::bridge::BridgeRunner::run).
//! Anything worse (a panic inside the cycle) is caught, logged, and the
//! next cycle runs after the normal interval.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use fleet_core::domain::device::{
    EnumerationEntry, PROP_ANDROID_VERSION, PROP_MANUFACTURER, PROP_MODEL, PROP_PRODUCT_DEVICE,
    PROP_PRODUCT_NAME,
};
use fleet_core::{
    marketing_name_properties, parse_enumeration, resolve_product_name, Device, DeviceSnapshot,
};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::application::panic_message;
use crate::application::settings::Settings;
use crate::infrastructure::bridge::DeviceCommands;

/// Longest uninterrupted sleep; bounds how long [`DevicePoller::stop`] waits.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Error type for poller lifecycle operations.
#[derive(Debug, Error)]
pub enum PollerError {
    #[error("device poller is already running")]
    AlreadyRunning,

    #[error("failed to spawn device poller thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Shared, runtime-adjustable poll interval.
///
/// Cloning yields another handle to the same value.
#[derive(Debug, Clone)]
pub struct PollInterval(Arc<AtomicU64>);

impl PollInterval {
    pub fn new(interval: Duration) -> Self {
        Self(Arc::new(AtomicU64::new(duration_to_millis(interval))))
    }

    /// Takes effect at the start of the next cycle.
    pub fn set(&self, interval: Duration) {
        self.0.store(duration_to_millis(interval), Ordering::Relaxed);
    }

    pub fn get(&self) -> Duration {
        Duration::from_millis(self.0.load(Ordering::Relaxed))
    }
}

fn duration_to_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Keeps `interval` in sync with the refresh interval in `settings`.
///
/// Runs until the settings hub is dropped.
pub async fn follow_settings(interval: PollInterval, mut settings: watch::Receiver<Settings>) {
    interval.set(settings.borrow_and_update().refresh_interval);
    while settings.changed().await.is_ok() {
        let next = settings.borrow_and_update().refresh_interval;
        debug!(interval_ms = next.as_millis() as u64, "poll interval changed");
        interval.set(next);
    }
}

/// Background device discovery loop.
pub struct DevicePoller {
    commands: DeviceCommands,
    interval: PollInterval,
    running: Arc<AtomicBool>,
    snapshots: Arc<watch::Sender<DeviceSnapshot>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DevicePoller {
    /// Creates a stopped poller.  The first published snapshot is the empty
    /// cycle-0 snapshot.
    pub fn new(commands: DeviceCommands, interval: Duration) -> Self {
        let (tx, _rx) = watch::channel(DeviceSnapshot::default());
        Self {
            commands,
            interval: PollInterval::new(interval),
            running: Arc::new(AtomicBool::new(false)),
            snapshots: Arc::new(tx),
            worker: Mutex::new(None),
        }
    }

    /// A receiver that always holds the newest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<DeviceSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn latest(&self) -> DeviceSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval.get()
    }

    pub fn set_interval(&self, interval: Duration) {
        self.interval.set(interval);
    }

    /// A handle to the interval, e.g. for [`follow_settings`].
    pub fn interval_handle(&self) -> PollInterval {
        self.interval.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawns the poller thread.  The first cycle starts immediately.
    ///
    /// # Errors
    ///
    /// [`PollerError::AlreadyRunning`] if the poller was already started, or
    /// [`PollerError::Spawn`] if the OS refused to create the thread.
    pub fn start(&self) -> Result<(), PollerError> {
        let mut worker = self.worker.lock().expect("lock poisoned");
        if worker.is_some() || self.running.swap(true, Ordering::SeqCst) {
            return Err(PollerError::AlreadyRunning);
        }

        let commands = self.commands.clone();
        let interval = self.interval.clone();
        let running = Arc::clone(&self.running);
        let tx = Arc::clone(&self.snapshots);

        let spawned = thread::Builder::new()
            .name("fleet-device-poller".to_string())
            .spawn(move || poll_loop(commands, interval, running, tx));

        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                info!(interval_ms = self.interval.get().as_millis() as u64, "device poller started");
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(PollerError::Spawn(e))
            }
        }
    }

    /// Requests a stop and joins the thread.
    ///
    /// An in-flight cycle always completes (bridge calls are not interrupted),
    /// so this returns after at most one cycle plus one sleep slice.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let handle = self.worker.lock().expect("lock poisoned").take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("device poller thread terminated abnormally");
            }
            info!("device poller stopped");
        }
    }

    /// Runs a single enumeration on the calling thread without publishing it.
    pub fn poll_once(commands: &DeviceCommands) -> Vec<Device> {
        inspect_devices(commands)
    }
}

impl Drop for DevicePoller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn poll_loop(
    commands: DeviceCommands,
    interval: PollInterval,
    running: Arc<AtomicBool>,
    tx: Arc<watch::Sender<DeviceSnapshot>>,
) {
    let mut cycle: u64 = 0;

    while running.load(Ordering::SeqCst) {
        let sleep_for = interval.get();
        cycle += 1;

        match panic::catch_unwind(AssertUnwindSafe(|| inspect_devices(&commands))) {
            Ok(devices) => {
                let snapshot = DeviceSnapshot::new(cycle, devices);
                debug!(
                    cycle,
                    devices = snapshot.devices.len(),
                    online = snapshot.online_count(),
                    "poll cycle complete"
                );
                tx.send_replace(snapshot);
            }
            Err(payload) => {
                error!(cycle, panic = %panic_message(payload.as_ref()), "poll cycle failed; continuing");
            }
        }

        sleep_while_running(sleep_for, &running);
    }
}

fn sleep_while_running(total: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + total;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}

/// Enumerates devices and builds one [`Device`] per enumeration line.
///
/// Only online devices receive property queries.
pub fn inspect_devices(commands: &DeviceCommands) -> Vec<Device> {
    let output = commands.runner().run(&["devices", "-l"]);
    parse_enumeration(&output)
        .into_iter()
        .map(|entry| describe_device(commands, entry))
        .collect()
}

fn describe_device(commands: &DeviceCommands, entry: EnumerationEntry) -> Device {
    let hinted_model = first_non_empty([&entry.product_hint, &entry.device_hint]);

    if !entry.status.is_online() {
        return Device {
            product: resolve_product_name("", &entry.model_hint),
            serial: entry.serial,
            status: entry.status,
            model: hinted_model,
            model_number: entry.model_hint,
            android_version: String::new(),
            resolution: String::new(),
        };
    }

    let serial = entry.serial.as_str();
    let manufacturer = commands.get_prop(serial, PROP_MANUFACTURER);

    let mut model_number = commands.get_prop(serial, PROP_MODEL);
    if model_number.is_empty() {
        model_number = entry.model_hint.clone();
    }

    // A candidate that only repeats the model number is not a marketing name.
    let reported = marketing_name_properties(&manufacturer)
        .iter()
        .map(|key| commands.get_prop(serial, key))
        .find(|value| !value.is_empty() && value.trim() != model_number.trim())
        .unwrap_or_default();
    let product = resolve_product_name(&reported, &model_number);

    let mut model = commands.get_prop(serial, PROP_PRODUCT_NAME);
    if model.is_empty() {
        model = commands.get_prop(serial, PROP_PRODUCT_DEVICE);
    }
    if model.is_empty() {
        model = hinted_model;
    }

    let android_version = commands.get_prop(serial, PROP_ANDROID_VERSION);
    let resolution = commands.screen_resolution(serial);

    Device {
        serial: entry.serial,
        status: entry.status,
        model,
        model_number,
        product,
        android_version,
        resolution,
    }
}

fn first_non_empty<const N: usize>(candidates: [&String; N]) -> String {
    candidates
        .into_iter()
        .find(|c| !c.is_empty())
        .cloned()
        .unwrap_or_default()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
