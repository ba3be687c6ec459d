//! Infrastructure layer for DroidFleet.
//!
//! Contains the OS-facing adapters: the `adb` process runner, the `scrcpy`
//! launcher, the native window host used for mirror adoption, and file-system
//! storage for the configuration.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `fleet_core`.  The application layer only uses the traits defined here
//! (`BridgeRunner`, `MirrorLauncher`, `WindowHost`, `ContainerSurface`), never
//! a concrete adapter, so every use case runs against the mocks in tests.

pub mod bridge;
pub mod mirror_tool;
pub mod storage;
pub mod window_host;
