//! GPIO Abstractions
//!
//! Type-safe GPIO wrappers for the FM receiver front panel.
//! Generic over the `embedded-hal` digital traits.

use embedded_hal::digital::{InputPin, OutputPin, PinState};

/// Status LED state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LedState {
    /// LED is off
    #[default]
    Off,
    /// LED is on
    On,
}

impl LedState {
    /// Toggle the LED state
    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Off => Self::On,
            Self::On => Self::Off,
        }
    }
}

impl From<bool> for LedState {
    fn from(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for LedState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Off => defmt::write!(f, "OFF"),
            Self::On => defmt::write!(f, "ON"),
        }
    }
}

/// Status LED driver
///
/// Shows whether a remote-control host is connected.
pub struct StatusLed<P> {
    pin: P,
    state: LedState,
}

impl<P: OutputPin> StatusLed<P> {
    /// Create a new status LED (initially off)
    pub fn new(mut pin: P) -> Self {
        let _ = pin.set_low();
        Self {
            pin,
            state: LedState::Off,
        }
    }

    /// Drive the LED to a state; pin errors are ignored
    pub fn set(&mut self, state: LedState) {
        let level = match state {
            LedState::On => PinState::High,
            LedState::Off => PinState::Low,
        };
        let _ = self.pin.set_state(level);
        self.state = state;
    }

    /// Turn LED on
    pub fn on(&mut self) {
        self.set(LedState::On);
    }

    /// Turn LED off
    pub fn off(&mut self) {
        self.set(LedState::Off);
    }

    /// Toggle LED state
    pub fn toggle(&mut self) {
        self.set(self.state.toggle());
    }

    /// Get current state
    #[must_use]
    pub const fn state(&self) -> LedState {
        self.state
    }
}

/// Logic level of a digital input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// Pin reads low
    Low,
    /// Pin reads high
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Self::High
        } else {
            Self::Low
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Level {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Low => defmt::write!(f, "L"),
            Self::High => defmt::write!(f, "H"),
        }
    }
}

/// Sample a digital input, mapping a read error to `fallback`
pub fn sample<P: InputPin>(pin: &mut P, fallback: Level) -> Level {
    pin.is_high().map_or(fallback, Level::from)
}
