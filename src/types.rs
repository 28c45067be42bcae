//! Shared types used across the FM tuner firmware
//!
//! This module defines domain-specific types that enforce invariants
//! at compile time and provide type safety throughout the codebase.

use core::fmt;
#[cfg(not(feature = "std"))]
use micromath::F32Ext;

/// Broadcast frequency
///
/// Stored in kHz so the channel grid maps exactly; MHz floats only appear
/// at the protocol and API edges.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frequency(u32);

impl Frequency {
    /// Create a frequency from kHz
    #[must_use]
    pub const fn from_khz(khz: u32) -> Self {
        Self(khz)
    }

    /// Create a frequency from MHz, rounded to the nearest kHz
    ///
    /// Returns `None` for negative, non-finite or absurdly large values.
    #[must_use]
    pub fn from_mhz(mhz: f32) -> Option<Self> {
        if !mhz.is_finite() || mhz < 0.0 || mhz > 4_000_000.0 {
            return None;
        }
        let khz = (mhz * 1000.0).round();
        Some(Self(khz as u32))
    }

    /// Get the frequency in kHz
    #[must_use]
    pub const fn as_khz(self) -> u32 {
        self.0
    }

    /// Get the frequency in MHz as floating point
    #[must_use]
    pub fn as_mhz_f32(self) -> f32 {
        self.0 as f32 / 1000.0
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({} kHz)", self.0)
    }
}

/// Formats as MHz with one decimal place, e.g. `82.5`
impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tenths = (self.0 + 50) / 100;
        write!(f, "{}.{}", tenths / 10, tenths % 10)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Frequency {
    fn format(&self, f: defmt::Formatter) {
        let tenths = (self.0 + 50) / 100;
        defmt::write!(f, "{}.{} MHz", tenths / 10, tenths % 10);
    }
}

/// Band limits and channel grid of a tuner instance
///
/// Fixed at construction: `frequency = base + channel * spacing`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TunerConfig {
    base: Frequency,
    top: Frequency,
    spacing_khz: u32,
}

impl TunerConfig {
    /// Create a tuner configuration
    ///
    /// Returns `None` for a zero spacing or a band whose top lies below its
    /// base; channel arithmetic relies on neither happening.
    #[must_use]
    pub const fn new(base: Frequency, top: Frequency, spacing_khz: u32) -> Option<Self> {
        if spacing_khz == 0 || top.as_khz() < base.as_khz() {
            return None;
        }
        Some(Self {
            base,
            top,
            spacing_khz,
        })
    }

    /// Lowest tunable frequency
    #[must_use]
    pub const fn base(&self) -> Frequency {
        self.base
    }

    /// Highest tunable frequency
    #[must_use]
    pub const fn top(&self) -> Frequency {
        self.top
    }

    /// Channel spacing in kHz
    #[must_use]
    pub const fn spacing_khz(&self) -> u32 {
        self.spacing_khz
    }

    /// Index of the highest channel in the band
    #[must_use]
    pub const fn max_channel(&self) -> u16 {
        ((self.top.as_khz() - self.base.as_khz()) / self.spacing_khz) as u16
    }

    /// Check whether a frequency lies inside the band
    #[must_use]
    pub const fn contains(&self, freq: Frequency) -> bool {
        freq.as_khz() >= self.base.as_khz() && freq.as_khz() <= self.top.as_khz()
    }

    /// Nearest channel index for an in-band frequency
    #[must_use]
    pub const fn channel_of(&self, freq: Frequency) -> Option<u16> {
        if self.contains(freq) {
            Some(self.channel_near(freq.as_khz() as i64))
        } else {
            None
        }
    }

    /// Nearest channel for an arbitrary kHz value, clamped to the band
    #[must_use]
    pub const fn channel_near(&self, khz: i64) -> u16 {
        let offset = khz - self.base.as_khz() as i64;
        let spacing = self.spacing_khz as i64;
        let channel = if offset <= 0 {
            0
        } else {
            (offset + spacing / 2) / spacing
        };
        let max = self.max_channel() as i64;
        if channel > max {
            max as u16
        } else {
            channel as u16
        }
    }

    /// Frequency of a channel index
    #[must_use]
    pub const fn frequency_of(&self, channel: u16) -> Frequency {
        Frequency::from_khz(self.base.as_khz() + channel as u32 * self.spacing_khz)
    }

    /// Snap an in-band frequency onto the channel grid
    #[must_use]
    pub const fn snap(&self, freq: Frequency) -> Option<Frequency> {
        match self.channel_of(freq) {
            Some(channel) => Some(self.frequency_of(channel)),
            None => None,
        }
    }
}

/// Audio volume (0-15, the width of the chip's DAC gain field)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Volume(u8);

impl Volume {
    /// Loudest setting
    pub const MAX: Self = Self(15);

    /// Silent setting
    pub const MIN: Self = Self(0);

    /// Create a volume, masking to the low 4 bits
    #[must_use]
    pub const fn new(level: u8) -> Self {
        Self(level & 0x0F)
    }

    /// Get the level
    #[must_use]
    pub const fn level(self) -> u8 {
        self.0
    }

    /// One step louder, saturating at 15
    #[must_use]
    pub const fn step_up(self) -> Self {
        if self.0 < Self::MAX.0 {
            Self(self.0 + 1)
        } else {
            self
        }
    }

    /// One step quieter, saturating at 0
    #[must_use]
    pub const fn step_down(self) -> Self {
        if self.0 > 0 {
            Self(self.0 - 1)
        } else {
            self
        }
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Volume {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "vol {}", self.0);
    }
}

/// Received signal strength, logarithmic 0-127
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct SignalStrength(u8);

impl SignalStrength {
    /// Decode from the raw RSSI register (value lives in bits 15:9)
    #[must_use]
    pub const fn from_register(raw: u16) -> Self {
        Self((raw >> 9) as u8)
    }

    /// Get the 0-127 value
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for SignalStrength {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "rssi {}", self.0);
    }
}

/// Seek direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekDirection {
    /// Towards higher frequencies
    Up,
    /// Towards lower frequencies
    Down,
}

#[cfg(feature = "embedded")]
impl defmt::Format for SeekDirection {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Up => defmt::write!(f, "up"),
            Self::Down => defmt::write!(f, "down"),
        }
    }
}

/// Bounded wait for a hardware operation to finish
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollTimeout {
    max_wait_ms: u32,
    interval_ms: u32,
}

impl PollTimeout {
    /// Create a timeout from a maximum wait and a poll interval
    #[must_use]
    pub const fn new(max_wait_ms: u32, interval_ms: u32) -> Self {
        Self {
            max_wait_ms,
            interval_ms,
        }
    }

    /// Maximum total wait
    #[must_use]
    pub const fn max_wait_ms(&self) -> u32 {
        self.max_wait_ms
    }

    /// Delay between polls
    #[must_use]
    pub const fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Number of polls that fit in the maximum wait (at least one)
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        let n = if self.interval_ms == 0 {
            self.max_wait_ms
        } else {
            self.max_wait_ms / self.interval_ms
        };
        if n == 0 {
            1
        } else {
            n
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn display_rounds_to_tenths() {
        assert_eq!(format!("{}", Frequency::from_khz(82_500)), "82.5");
        assert_eq!(format!("{}", Frequency::from_khz(76_000)), "76.0");
        assert_eq!(format!("{}", Frequency::from_khz(99_950)), "100.0");
    }

    #[test]
    fn channel_near_clamps() {
        let cfg = TunerConfig::new(Frequency::from_khz(76_000), Frequency::from_khz(108_000), 100)
            .unwrap();
        assert_eq!(cfg.channel_near(70_000), 0);
        assert_eq!(cfg.channel_near(200_000), 320);
        assert_eq!(cfg.channel_near(76_049), 0);
        assert_eq!(cfg.channel_near(76_050), 1);
    }
}
