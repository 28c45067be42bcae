//! Hardware Abstraction Layer
//!
//! Thin wrappers over the `embedded-hal` traits. This module isolates
//! bus and pin access so the drivers above it stay hardware-agnostic.

pub mod gpio;
pub mod i2c;
