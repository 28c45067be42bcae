//! FM Tuner Firmware Library
//!
//! This library provides the driver and control core for an RDA5807-family
//! FM broadcast receiver attached over I2C. It turns raw register state into
//! user actions: convergent frequency tuning, station seek, volume/mono/bass
//! control, signal-strength sampling and a line-based remote-control protocol.
//!
//! # Architecture
//!
//! The firmware is organized in layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    APPLICATION LAYER                         │
//! │  Radio Session  │  Station Table  │  Command Protocol        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      DRIVER LAYER                            │
//! │  RDA5807 Tuner Driver  │  Debounced Buttons                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                        HAL LAYER                             │
//! │  16-bit Register Bus (I2C)  │  GPIO  │  USB CDC framing      │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    RTOS / SCHEDULER                          │
//! │           embassy-rs (async/await executor)                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Hardware is the source of truth**: every queryable fact is re-read
//!   from the chip rather than assumed from a cache
//! - **Bounded waits**: every hardware-completion poll carries a timeout
//! - **Generic over embedded-hal**: drivers run unchanged on target and
//!   against a simulated chip on the host
//! - **Explicit error handling**: All fallible operations return `Result`

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Logging macros must be declared before the modules that use them
#[macro_use]
mod fmt;

// Re-export dependencies needed by applications (only in embedded mode)
#[cfg(feature = "embedded")]
pub use embassy_executor;
#[cfg(feature = "embedded")]
pub use embassy_stm32;
#[cfg(feature = "embedded")]
pub use embassy_time;
#[cfg(feature = "embedded")]
pub use embassy_usb;

/// Hardware Abstraction Layer
///
/// 16-bit register bus over I2C and GPIO helpers.
pub mod hal;

/// Peripheral Drivers
///
/// RDA5807 tuner driver and debounced button inputs.
pub mod drivers;

/// Radio Control Logic
///
/// Session state shared by the button loop and the remote command path.
pub mod radio;

/// USB Subsystem
///
/// Line framing for the CDC ACM remote-control port.
pub mod usb;

/// Communication Protocols
///
/// Remote-control command parser and dispatcher.
pub mod protocol;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;

/// Prelude module for common imports
#[cfg(feature = "embedded")]
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::config::*;
    pub use crate::types::*;

    // Common traits
    pub use embedded_hal::delay::DelayNs;
    pub use embedded_hal::digital::{InputPin, OutputPin};
    pub use embedded_hal::i2c::I2c;

    // Embassy
    pub use embassy_time::{Duration, Instant, Timer};

    // Error handling
    pub use core::result::Result;

    // Logging
    pub use defmt::{debug, error, info, trace, warn};
}
