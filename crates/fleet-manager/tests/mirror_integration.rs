//! Integration tests for mirror window adoption and grid arrangement.
//!
//! `MirrorSession` + `MirrorRegistry` + `arrange_mirrors` are driven against
//! the in-memory window system, mirror launcher and bridge runner, so the
//! whole "discover → mirror → tile" path runs without a display.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use fleet_core::{AdoptionPolicy, CloseReason, MirrorPhase, ScreenRect, WindowHandle};
use fleet_manager::application::arrange_mirrors::arrange_mirrors;
use fleet_manager::application::manage_mirrors::{MirrorEntry, MirrorRegistry};
use fleet_manager::application::mirror_session::{MirrorError, MirrorSession, ResizeOutcome};
use fleet_manager::application::poll_devices::inspect_devices;
use fleet_manager::infrastructure::bridge::mock::MockBridgeRunner;
use fleet_manager::infrastructure::bridge::DeviceCommands;
use fleet_manager::infrastructure::mirror_tool::mock::MockMirrorLauncher;
use fleet_manager::infrastructure::window_host::mock::{MockContainer, MockWindowHost};
use fleet_manager::infrastructure::window_host::WindowRect;

fn fleet_with_resolutions(resolutions: &[(&str, &str)]) -> DeviceCommands {
    let mock = Arc::new(MockBridgeRunner::new());
    let mut listing = String::from("List of devices attached\n");
    for &(serial, size) in resolutions {
        listing.push_str(&format!("{serial} device\n"));
        mock.respond(
            &["-s", serial, "shell", "wm", "size"],
            &format!("Physical size: {size}"),
        );
    }
    mock.respond(&["devices", "-l"], &listing);
    DeviceCommands::new(mock)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_discovered_devices_are_mirrored_and_tiled() {
    // Arrange: two phones, windows appear after a few probes
    let commands = fleet_with_resolutions(&[("PHONE1", "1080x2160"), ("PHONE2", "720x1440")]);
    let devices = inspect_devices(&commands);
    let launcher = MockMirrorLauncher::new();
    let host = MockWindowHost::new();
    let mut registry = MirrorRegistry::new();
    let mut containers = Vec::new();

    // Act
    for (i, device) in devices.iter().enumerate() {
        let session = Arc::new(MirrorSession::for_device(device, AdoptionPolicy::default(), 27));
        let container = Arc::new(MockContainer::new(WindowHandle(0x100 + i as u64)));
        session.launch(&launcher).unwrap();
        host.add_window_after(session.window_title(), WindowHandle(0x900 + i as u64), 3);
        session.await_window(&host, container.as_ref()).await.unwrap();
        registry.insert(MirrorEntry::new(session, container.clone()));
        containers.push(container);
    }
    let report = arrange_mirrors(&registry, 2, ScreenRect::new(0, 0, 1054, 1200)).unwrap();

    // Assert
    assert_eq!(launcher.launches().len(), 2);
    assert_eq!(registry.adopted().count(), 2);
    assert_eq!(
        host.reparent_calls(),
        vec![
            (WindowHandle(0x900), WindowHandle(0x100)),
            (WindowHandle(0x901), WindowHandle(0x101)),
        ]
    );
    // Both are 1:2 panels: 527 wide, 500 px content, 1000 tall
    assert_eq!(report.applied(), 2);
    assert_eq!(containers[0].geometries(), vec![WindowRect::new(0, 0, 527, 1000)]);
    assert_eq!(containers[1].geometries(), vec![WindowRect::new(527, 0, 527, 1000)]);
}

#[tokio::test(start_paused = true)]
async fn test_missing_window_times_out_and_session_is_pruned() {
    let commands = fleet_with_resolutions(&[("PHONE1", "1080x2160")]);
    let device = inspect_devices(&commands).remove(0);
    let launcher = MockMirrorLauncher::new();
    let host = MockWindowHost::new();
    let session = Arc::new(MirrorSession::for_device(&device, AdoptionPolicy::default(), 27));
    let container = Arc::new(MockContainer::new(WindowHandle(1)));
    let mut registry = MirrorRegistry::new();
    registry.insert(MirrorEntry::new(session.clone(), container.clone()));

    session.launch(&launcher).unwrap();
    let err = session.await_window(&host, container.as_ref()).await.unwrap_err();

    assert!(matches!(err, MirrorError::AdoptionTimeout { attempts: 20, .. }));
    assert_eq!(host.find_calls(), 20);
    assert_eq!(session.phase(), MirrorPhase::Closed(CloseReason::AdoptionTimeout));
    assert_eq!(registry.prune_closed(), 1);
    assert!(registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_user_resize_is_corrected_once_per_event() {
    // Arrange: the container reports every resize back to the session
    let commands = fleet_with_resolutions(&[("PHONE1", "1080x2160")]);
    let device = inspect_devices(&commands).remove(0);
    let host = MockWindowHost::new();
    let session = Arc::new(MirrorSession::for_device(
        &device,
        AdoptionPolicy::new(Duration::from_millis(100), 5),
        27,
    ));
    let container = Arc::new(MockContainer::new(WindowHandle(7)));
    session.launch(&MockMirrorLauncher::new()).unwrap();
    host.add_window(session.window_title(), WindowHandle(0x77));
    session.await_window(&host, container.as_ref()).await.unwrap();

    let nested = Arc::new(Mutex::new(Vec::new()));
    let hook_session = session.clone();
    let hook_log = nested.clone();
    container.set_on_resize(move |c, w, h| {
        hook_log.lock().unwrap().push(hook_session.handle_resize(c, w, h));
    });

    // Act: the operator drags the container to 427 x 300
    let outcome = session.handle_resize(container.as_ref(), 427, 300);

    // Assert: 400 px of content on a 1:2 panel needs 800 px
    assert_eq!(outcome, ResizeOutcome::Corrected { height: 800 });
    assert_eq!(container.resizes(), vec![(427, 800)]);
    assert_eq!(*nested.lock().unwrap(), vec![ResizeOutcome::Suppressed]);
}

#[tokio::test(start_paused = true)]
async fn test_remirroring_a_device_replaces_its_session() {
    let launcher = MockMirrorLauncher::new();
    let host = MockWindowHost::new();
    let mut registry = MirrorRegistry::new();
    let mut sessions = Vec::new();

    for _ in 0..2 {
        let session = Arc::new(MirrorSession::new(
            "PHONE1",
            fleet_core::AspectLock::new(0.5, 27),
            AdoptionPolicy::new(Duration::from_millis(100), 3),
        ));
        let container = Arc::new(MockContainer::new(WindowHandle(1)));
        session.launch(&launcher).unwrap();
        host.add_window(session.window_title(), WindowHandle(0x50));
        session.await_window(&host, container.as_ref()).await.unwrap();
        registry.insert(MirrorEntry::new(session.clone(), container));
        sessions.push(session);
    }

    assert_eq!(registry.len(), 1);
    assert_eq!(sessions[0].phase(), MirrorPhase::Closed(CloseReason::ClosedByUser));
    assert_eq!(sessions[1].phase(), MirrorPhase::Adopted);
    assert_ne!(launcher.launches()[0].window_title, launcher.launches()[1].window_title);
}
