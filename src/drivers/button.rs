//! Debounced Push Buttons
//!
//! Turns a mechanically noisy input into one "activated" event per press.
//! A level change is accepted only after it has been seen on
//! `threshold` consecutive polls; any poll agreeing with the accepted level
//! resets the count.

use embedded_hal::digital::InputPin;

use crate::config::BUTTON_DEBOUNCE_SAMPLES;
use crate::hal::gpio::{self, Level};

/// Front panel controls
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    /// Raise volume one step
    VolumeUp,
    /// Lower volume one step
    VolumeDown,
    /// Seek to the next station upwards
    Seek,
    /// Tune the next preset station
    Select,
}

#[cfg(feature = "embedded")]
impl defmt::Format for Button {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::VolumeUp => defmt::write!(f, "VolumeUp"),
            Self::VolumeDown => defmt::write!(f, "VolumeDown"),
            Self::Seek => defmt::write!(f, "Seek"),
            Self::Select => defmt::write!(f, "Select"),
        }
    }
}

/// Debounce state machine, independent of any pin
#[derive(Clone, Copy, Debug)]
pub struct Debouncer {
    /// Last accepted level
    confirmed: Level,
    /// Consecutive polls disagreeing with `confirmed`
    count: u8,
    /// Polls required to accept a change
    threshold: u8,
    /// Level that counts as "pressed"
    active: Level,
}

impl Debouncer {
    /// Create a debouncer starting from the currently observed level
    ///
    /// A threshold of zero is treated as one.
    #[must_use]
    pub const fn new(initial: Level, active: Level, threshold: u8) -> Self {
        Self {
            confirmed: initial,
            count: 0,
            threshold: if threshold == 0 { 1 } else { threshold },
            active,
        }
    }

    /// Debouncer for an active-low button with a pull-up, idle high
    #[must_use]
    pub const fn active_low() -> Self {
        Self::new(Level::High, Level::Low, BUTTON_DEBOUNCE_SAMPLES)
    }

    /// Feed one sample; returns true exactly once per accepted press
    pub fn update(&mut self, level: Level) -> bool {
        if level == self.confirmed {
            self.count = 0;
            return false;
        }

        self.count = self.count.saturating_add(1);
        if self.count < self.threshold {
            return false;
        }

        self.confirmed = level;
        self.count = 0;
        level == self.active
    }

    /// Last accepted level
    #[must_use]
    pub const fn level(&self) -> Level {
        self.confirmed
    }

    /// Whether the accepted level is the active one
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.confirmed == self.active
    }

    /// Configured threshold
    #[must_use]
    pub const fn threshold(&self) -> u8 {
        self.threshold
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::active_low()
    }
}

/// A hardware input pin with debouncing
pub struct DebouncedInput<P> {
    pin: P,
    debouncer: Debouncer,
}

impl<P: InputPin> DebouncedInput<P> {
    /// Wrap a pin, sampling it once for the starting level
    pub fn new(mut pin: P, active: Level, threshold: u8) -> Self {
        let idle = match active {
            Level::Low => Level::High,
            Level::High => Level::Low,
        };
        let initial = gpio::sample(&mut pin, idle);
        Self {
            pin,
            debouncer: Debouncer::new(initial, active, threshold),
        }
    }

    /// Wrap an active-low button with the default threshold
    pub fn active_low(pin: P) -> Self {
        Self::new(pin, Level::Low, BUTTON_DEBOUNCE_SAMPLES)
    }

    /// Poll the pin (call once per tick); true on a new press
    pub fn poll(&mut self) -> bool {
        let idle = self.debouncer.level();
        let level = gpio::sample(&mut self.pin, idle);
        self.debouncer.update(level)
    }

    /// Check if the button is currently held
    #[must_use]
    pub fn is_pressed(&self) -> bool {
        self.debouncer.is_active()
    }
}

/// The four front panel buttons
pub struct ButtonPanel<P> {
    volume_up: DebouncedInput<P>,
    volume_down: DebouncedInput<P>,
    seek: DebouncedInput<P>,
    select: DebouncedInput<P>,
}

impl<P: InputPin> ButtonPanel<P> {
    /// Create the panel from four active-low inputs
    pub fn new(volume_up: P, volume_down: P, seek: P, select: P) -> Self {
        Self {
            volume_up: DebouncedInput::active_low(volume_up),
            volume_down: DebouncedInput::active_low(volume_down),
            seek: DebouncedInput::active_low(seek),
            select: DebouncedInput::active_low(select),
        }
    }

    /// Poll every button once, returning the presses seen this tick
    pub fn poll(&mut self) -> heapless::Vec<Button, 4> {
        let mut pressed = heapless::Vec::new();
        if self.volume_up.poll() {
            let _ = pressed.push(Button::VolumeUp);
        }
        if self.volume_down.poll() {
            let _ = pressed.push(Button::VolumeDown);
        }
        if self.seek.poll() {
            let _ = pressed.push(Button::Seek);
        }
        if self.select.poll() {
            let _ = pressed.push(Button::Select);
        }
        pressed
    }
}
