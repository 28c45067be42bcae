//! System configuration and hardware constants
//!
//! This module defines compile-time constants for the FM receiver hardware.
//! All pin mappings, bus parameters, timeouts and startup settings are
//! centralized here.

use crate::types::{Frequency, PollTimeout, TunerConfig, Volume};

/// I2C bus frequency for the tuner (the RDA5807 supports up to 400 kHz)
pub const I2C_FREQUENCY_HZ: u32 = 400_000;

/// RDA5807 random-access (register-indexed) I2C address
pub const RDA5807_I2C_ADDR: u8 = 0x11;

/// RDA5807 sequential-access I2C address (not used by this driver)
pub const RDA5807_SEQUENTIAL_I2C_ADDR: u8 = 0x10;

/// Expected value of the chip-id register's top byte
pub const RDA5807_CHIP_ID: u16 = 0x5800;

/// Lowest receivable frequency (worldwide band) in kHz
pub const BAND_START_KHZ: u32 = 76_000;

/// Highest receivable frequency (worldwide band) in kHz
pub const BAND_END_KHZ: u32 = 108_000;

/// Channel spacing in kHz
pub const CHANNEL_SPACING_KHZ: u32 = 100;

/// Control loop tick in milliseconds
pub const CONTROL_TICK_MS: u64 = 100;

/// Upper bound on a single tune operation
pub const TUNE_TIMEOUT_MS: u32 = 500;

/// Upper bound on a full-band seek
pub const SEEK_TIMEOUT_MS: u32 = 5_000;

/// Delay between completion polls
pub const POLL_INTERVAL_MS: u32 = 5;

/// Maximum correction rounds in the frequency convergence loop
pub const MAX_TUNE_ATTEMPTS: u8 = 8;

/// Consecutive agreeing samples needed to accept a button level change
pub const BUTTON_DEBOUNCE_SAMPLES: u8 = 3;

/// Startup volume (0-15)
pub const STARTUP_VOLUME: u8 = 3;

/// Force mono at startup
pub const STARTUP_FORCED_MONO: bool = true;

/// Enable bass boost at startup
pub const STARTUP_BASS_BOOST: bool = true;

/// Maximum accepted remote command line length
pub const COMMAND_LINE_LEN: usize = 64;

/// Maximum response line length
pub const RESPONSE_LINE_LEN: usize = 64;

/// Maximum number of preset stations
pub const MAX_STATIONS: usize = 32;

/// Maximum station name length in bytes
pub const STATION_NAME_LEN: usize = 24;

/// Station name shown when the tuned frequency matches no preset
pub const UNKNOWN_STATION_NAME: &str = "------";

/// USB VID (use test VID for development)
pub const USB_VID: u16 = 0x1209;

/// USB PID (get from pid.codes for production)
pub const USB_PID: u16 = 0x0001;

/// USB CDC ACM packet size
pub const USB_CDC_PACKET_SIZE: u16 = 64;

/// Pin assignments for GPIO
pub mod pins {
    //! GPIO pin assignments matching the schematic

    /// Status LED, lit while a remote host is connected
    pub const LED_STATUS: &str = "PA5";

    /// I2C1 SCL (RDA5807)
    pub const I2C1_SCL: &str = "PB8";

    /// I2C1 SDA (RDA5807)
    pub const I2C1_SDA: &str = "PB9";

    /// Volume up button (active low)
    pub const BTN_VOLUME_UP: &str = "PC0";

    /// Volume down button (active low)
    pub const BTN_VOLUME_DOWN: &str = "PC1";

    /// Seek button (active low)
    pub const BTN_SEEK: &str = "PC2";

    /// Preset select button (active low)
    pub const BTN_SELECT: &str = "PC3";

    /// USB D+ (handled by USB peripheral)
    pub const USB_DP: &str = "PA12";

    /// USB D- (handled by USB peripheral)
    pub const USB_DM: &str = "PA11";
}

/// Tuner band and grid used by the firmware
#[must_use]
pub const fn tuner_config() -> TunerConfig {
    TUNER_CONFIG
}

/// Band and grid checked at compile time
const TUNER_CONFIG: TunerConfig = match TunerConfig::new(
    Frequency::from_khz(BAND_START_KHZ),
    Frequency::from_khz(BAND_END_KHZ),
    CHANNEL_SPACING_KHZ,
) {
    Some(config) => config,
    None => panic!("band limits or channel spacing invalid"),
};

/// Bounded wait used for tune completion
#[must_use]
pub const fn tune_timeout() -> PollTimeout {
    PollTimeout::new(TUNE_TIMEOUT_MS, POLL_INTERVAL_MS)
}

/// Bounded wait used for seek completion
#[must_use]
pub const fn seek_timeout() -> PollTimeout {
    PollTimeout::new(SEEK_TIMEOUT_MS, POLL_INTERVAL_MS)
}

/// Startup volume as a validated value
#[must_use]
pub const fn startup_volume() -> Volume {
    Volume::new(STARTUP_VOLUME)
}
