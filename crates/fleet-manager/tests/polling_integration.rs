//! Integration tests for device discovery and device actions.
//!
//! These tests exercise the application layer of fleet-manager end-to-end:
//! `DevicePoller` / `ActionExecutor` + `DeviceCommands` + the scripted bridge
//! runner.  No real `adb` is needed.

use std::sync::Arc;
use std::time::Duration;

use fleet_core::domain::device::{PROP_ANDROID_VERSION, PROP_MANUFACTURER, PROP_MODEL};
use fleet_core::{DeviceSnapshot, DeviceStatus};
use fleet_manager::application::poll_devices::{follow_settings, DevicePoller};
use fleet_manager::application::run_action::{ActionExecutor, ActionRequest, DEFAULT_SUCCESS_MESSAGE};
use fleet_manager::application::settings::SettingsHub;
use fleet_manager::infrastructure::bridge::mock::MockBridgeRunner;
use fleet_manager::infrastructure::bridge::DeviceCommands;
use tokio::sync::watch;

const ENUMERATE: [&str; 2] = ["devices", "-l"];

fn setup() -> (Arc<MockBridgeRunner>, DeviceCommands) {
    let mock = Arc::new(MockBridgeRunner::new());
    let commands = DeviceCommands::new(mock.clone());
    (mock, commands)
}

fn script_samsung(mock: &MockBridgeRunner, serial: &str) {
    let getprop = |key: &str, value: &str| {
        mock.respond(&["-s", serial, "shell", "getprop", key], value);
    };
    getprop(PROP_MANUFACTURER, "samsung");
    getprop(PROP_MODEL, "SM-A725F");
    getprop(PROP_ANDROID_VERSION, "13");
    mock.respond(&["-s", serial, "shell", "wm", "size"], "Physical size: 1080x2400");
}

async fn wait_for_cycle(
    rx: &mut watch::Receiver<DeviceSnapshot>,
    pred: impl FnMut(&DeviceSnapshot) -> bool,
) -> DeviceSnapshot {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("poller must publish within 5 s")
        .expect("poller must still be alive")
        .clone()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_poller_publishes_mixed_fleet_snapshot() {
    // Arrange
    let (mock, commands) = setup();
    mock.respond(
        &ENUMERATE,
        "List of devices attached\n\
         R58N123 device usb:1-1 product:a72qnsxx model:SM_A725F device:a72q transport_id:3\n\
         EMU5554 offline\n",
    );
    script_samsung(&mock, "R58N123");
    let poller = DevicePoller::new(commands, Duration::from_millis(20));
    let mut rx = poller.subscribe();

    // Act
    poller.start().unwrap();
    let snapshot = wait_for_cycle(&mut rx, |s| s.cycle >= 1).await;
    poller.stop();

    // Assert
    assert_eq!(snapshot.devices.len(), 2);
    let samsung = snapshot.get("R58N123").unwrap();
    assert_eq!(samsung.status, DeviceStatus::Online);
    assert_eq!(samsung.product, "Galaxy A72");
    assert_eq!(samsung.resolution, "1080x2400");
    let emulator = snapshot.get("EMU5554").unwrap();
    assert_eq!(emulator.status, DeviceStatus::Offline);
    assert_eq!(mock.calls_for_serial("EMU5554"), 0);
}

#[tokio::test]
async fn test_poller_sees_device_arrive_and_leave() {
    let (mock, commands) = setup();
    mock.respond(&ENUMERATE, "List of devices attached\n");
    let poller = DevicePoller::new(commands, Duration::from_millis(10));
    let mut rx = poller.subscribe();
    poller.start().unwrap();

    let empty = wait_for_cycle(&mut rx, |s| s.cycle >= 1).await;
    assert!(empty.devices.is_empty());

    mock.respond(&ENUMERATE, "List of devices attached\nR58N123 device\n");
    script_samsung(&mock, "R58N123");
    let arrived = wait_for_cycle(&mut rx, |s| s.get("R58N123").is_some()).await;
    assert!(arrived.cycle > empty.cycle);

    mock.respond(&ENUMERATE, "List of devices attached\n");
    let left = wait_for_cycle(&mut rx, |s| s.cycle > arrived.cycle && s.devices.is_empty()).await;
    assert!(left.get("R58N123").is_none());

    poller.stop();
}

#[tokio::test]
async fn test_panicking_cycle_does_not_stop_the_poller() {
    // Arrange: the first cycles blow up inside the bridge call
    let (mock, commands) = setup();
    mock.panic_on(&ENUMERATE);
    let poller = DevicePoller::new(commands, Duration::from_millis(10));
    let mut rx = poller.subscribe();
    poller.start().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Act: the fault clears
    mock.respond(&ENUMERATE, "List of devices attached\nEMU5554 offline\n");
    let snapshot = wait_for_cycle(&mut rx, |s| !s.devices.is_empty()).await;

    // Assert
    assert!(poller.is_running());
    assert_eq!(snapshot.devices[0].serial, "EMU5554");
    poller.stop();
}

#[tokio::test]
async fn test_settings_change_reaches_running_poller() {
    let (mock, commands) = setup();
    mock.respond(&ENUMERATE, "List of devices attached\n");
    let hub = SettingsHub::default();
    let poller = DevicePoller::new(commands, hub.current().refresh_interval);
    tokio::spawn(follow_settings(poller.interval_handle(), hub.subscribe()));

    hub.update(|s| s.refresh_interval = Duration::from_secs(7));
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert_eq!(poller.interval(), Duration::from_secs(7));
}

#[tokio::test]
async fn test_actions_report_per_device_outcome() {
    // Arrange: one device reboots, the other has gone away
    let (mock, commands) = setup();
    mock.fail(&["-s", "GONE", "reboot"], "error: device 'GONE' not found");
    let (executor, mut results) = ActionExecutor::new();

    // Act
    for serial in ["R58N123", "GONE"] {
        let commands = commands.clone();
        let target = serial.to_string();
        executor.submit(ActionRequest::new("Reboot", serial, move || {
            commands.reboot(&target)?;
            Ok(None)
        }));
    }
    let mut outcomes = Vec::new();
    for _ in 0..2 {
        outcomes.push(results.recv().await.unwrap());
    }
    outcomes.sort_by(|a, b| a.serial.cmp(&b.serial));

    // Assert
    assert_eq!(outcomes[0].serial, "GONE");
    assert!(!outcomes[0].success);
    assert!(outcomes[0].message.contains("not found"));
    assert_eq!(outcomes[1].serial, "R58N123");
    assert!(outcomes[1].success);
    assert_eq!(outcomes[1].message, DEFAULT_SUCCESS_MESSAGE);
    assert_eq!(mock.count_of(&["-s", "R58N123", "reboot"]), 1);
}

#[tokio::test]
async fn test_shell_action_returns_command_output() {
    let (mock, commands) = setup();
    mock.respond(&["-s", "R58N123", "shell", "echo", "hi"], "hi\n");
    let (executor, mut results) = ActionExecutor::new();

    executor.submit(ActionRequest::new("Shell", "R58N123", move || {
        Ok(Some(commands.shell_command("R58N123", "echo hi")?))
    }));
    let result = results.recv().await.unwrap();

    assert!(result.success);
    assert_eq!(result.message, "hi");
}
