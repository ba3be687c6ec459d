//! Domain entities for DroidFleet.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is called the **domain** (or "entities" layer).  Domain code:
//!
//! - Contains the core business rules of the application.
//! - Has **no** imports from OS APIs, process spawning, or UI frameworks.
//! - Can be compiled and tested on any platform without a device attached.
//!
//! Here that means: turning raw `adb` text into [`device::Device`] records,
//! describing the lifecycle of an adopted mirror window, and computing where
//! each mirror window goes on screen.

/// Device records and bridge-output parsers.
pub mod device;

/// Grid layout for mirror windows.
///
/// See [`layout::arrange`] for the main entry point.
pub mod layout;

/// Mirror window vocabulary: handles, phases, adoption policy, aspect lock.
pub mod mirror;
