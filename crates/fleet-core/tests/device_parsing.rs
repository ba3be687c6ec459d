//! Integration tests for turning raw device-bridge output into device records
//! and mirror geometry, through the public `fleet_core` API only.

use fleet_core::{
    arrange, marketing_name_properties, parse_enumeration, parse_physical_size,
    resolve_product_name, AspectLock, Device, DeviceSnapshot, DeviceStatus, LayoutInput, Resolution,
    ScreenRect,
    DEFAULT_SIDEBAR_WIDTH,
};

const MIXED_FLEET: &str = "\
List of devices attached
* daemon not running; starting now at tcp:5037
* daemon started successfully
ABC123                 device usb:1-1 product:panther model:Pixel_7 device:panther transport_id:1
R58N12345XY            unauthorized usb:1-2 transport_id:2

emulator-5554          offline transport_id:3
ZY22FLDJ8S             device product:lisa_eea model:2109119DG device:lisa transport_id:4
";

#[test]
fn test_mixed_fleet_enumeration_keeps_every_device_line() {
    // Act
    let entries = parse_enumeration(MIXED_FLEET);

    // Assert
    let serials: Vec<&str> = entries.iter().map(|e| e.serial.as_str()).collect();
    assert_eq!(
        serials,
        vec!["ABC123", "R58N12345XY", "emulator-5554", "ZY22FLDJ8S"]
    );
    let online: Vec<bool> = entries.iter().map(|e| e.status.is_online()).collect();
    assert_eq!(online, vec![true, false, false, true]);
}

#[test]
fn test_enumeration_hints_feed_pixel_display_name() {
    // Arrange
    let entries = parse_enumeration(MIXED_FLEET);
    let pixel = &entries[0];

    // Act: Google devices query no marketing properties, so nothing is reported
    let candidates = marketing_name_properties("Google");
    let product = resolve_product_name("", &pixel.model_hint);

    // Assert
    assert!(candidates.is_empty());
    assert_eq!(pixel.status, DeviceStatus::Online);
    assert_eq!(pixel.product_hint, "panther");
    assert_eq!(product, "Pixel 7");
}

#[test]
fn test_header_only_output_yields_no_devices() {
    assert!(parse_enumeration("List of devices attached\n").is_empty());
    assert!(parse_enumeration("").is_empty());
}

#[test]
fn test_physical_size_drives_aspect_lock_and_layout_height() {
    // Arrange
    let size = parse_physical_size("Physical size: 1080x2400\nOverride size: 720x1600\n");
    let lock = AspectLock::from_resolution(&size, DEFAULT_SIDEBAR_WIDTH);
    let ratio = Resolution::parse(&size).unwrap().aspect_ratio();

    // Act
    let layout = arrange(
        &[LayoutInput::new("ABC123", ratio)],
        1,
        ScreenRect::new(0, 0, 527, 1440),
    )
    .unwrap();

    // Assert: layout and resize enforcement agree on the container height
    assert_eq!(size, "1080x2400");
    assert_eq!(
        lock.expected_height(layout.windows[0].width),
        Some(layout.windows[0].height)
    );
    assert_eq!(lock.correction(527, layout.windows[0].height), None);
}

#[test]
fn test_snapshot_json_shape_is_stable() {
    // Arrange
    let snapshot = DeviceSnapshot::new(
        3,
        vec![Device {
            serial: "ABC123".into(),
            status: DeviceStatus::Online,
            model: "panther".into(),
            model_number: "Pixel 7".into(),
            product: "Pixel 7".into(),
            android_version: "14".into(),
            resolution: "1080x2400".into(),
        }],
    );

    // Act
    let json = serde_json::to_value(&snapshot).unwrap();
    let back: DeviceSnapshot = serde_json::from_value(json.clone()).unwrap();

    // Assert
    assert_eq!(json["cycle"], 3);
    assert_eq!(json["devices"][0]["status"], "Online");
    assert_eq!(json["devices"][0]["model"], "panther");
    assert_eq!(back, snapshot);
}
