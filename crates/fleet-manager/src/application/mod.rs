//! Application layer use cases for the fleet manager.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure rules such as output parsing and grid arithmetic) and the
//! infrastructure (child processes, window systems, files).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil an operator goal (e.g., "embed
//!   the mirror window of this phone into that container").
//! - **Depend on abstractions** (traits such as `BridgeRunner` and
//!   `WindowHost`) rather than concrete implementations, so tests can script
//!   the outside world.
//! - **Own the threading model**: the poller runs on a dedicated thread,
//!   actions run one thread each, adoption probing runs on a Tokio timer.
//!
//! # Sub-modules
//!
//! - **`poll_devices`**    – Background enumeration of attached devices and
//!   publication of immutable snapshots.
//! - **`run_action`**      – Fire-and-forget device commands, each reporting
//!   exactly one result.
//! - **`mirror_session`**  – Lifecycle of one mirror window: launch, adoption,
//!   aspect-ratio enforcement, close.
//! - **`manage_mirrors`**  – Registry of live mirror sessions keyed by serial.
//! - **`arrange_mirrors`** – Applies a grid layout to every adopted session.
//! - **`settings`**        – Runtime settings with change notification.

pub mod arrange_mirrors;
pub mod manage_mirrors;
pub mod mirror_session;
pub mod poll_devices;
pub mod run_action;
pub mod settings;

use std::any::Any;

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
