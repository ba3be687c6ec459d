//! # fleet-core
//!
//! Shared library for DroidFleet containing the device model, the parsers for
//! device-bridge (`adb`) output, the marketing-name catalog, the aspect-ratio
//! math used by mirror windows, and the grid layout engine.
//!
//! This crate has zero dependencies on OS APIs, child processes, or UI
//! frameworks.  Everything here is a pure function or a plain value type, so it
//! can be tested on any machine without a device attached.
//!
//! # Architecture overview (for beginners)
//!
//! DroidFleet watches the Android devices plugged into the local machine.  A
//! background poller asks `adb` which devices exist, queries a few properties
//! of every online device, and publishes the result as an immutable
//! [`DeviceSnapshot`].  An operator can mirror a device screen with `scrcpy`;
//! the manager adopts the scrcpy window into its own container and can tile
//! many mirrors across the screen.
//!
//! This crate (`fleet-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – Pure business logic: the [`Device`] record and the parsers
//!   that build it, the mirror window vocabulary (phases, adoption policy,
//!   aspect lock), and the grid [`arrange`] algorithm.
//!
//! - **`catalog`** – The static model-number → marketing-name tables and the
//!   precedence rule that picks the name shown to the operator.

pub mod catalog;
pub mod domain;

// Re-export the most-used types at the crate root so callers can write
// `fleet_core::Device` instead of `fleet_core::domain::device::Device`.
pub use catalog::{marketing_name, resolve_product_name};
pub use domain::device::{
    marketing_name_properties, parse_enumeration, parse_physical_size, Device, DeviceSnapshot, DeviceStatus,
    EnumerationEntry, Resolution,
};
pub use domain::layout::{
    arrange, LayoutError, LayoutInput, LayoutResult, ScreenRect, WindowGeometry,
};
pub use domain::mirror::{
    mirror_window_title, AdoptionPolicy, AspectLock, CloseReason, MirrorPhase, WindowHandle,
    ASPECT_TOLERANCE_PX, DEFAULT_SIDEBAR_WIDTH,
};
