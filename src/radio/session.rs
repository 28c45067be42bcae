//! Radio Session
//!
//! The single owned piece of mutable application state: the tuner, the
//! preset table and what the front panel shows (frequency, station name,
//! volume, signal strength, remote connection). The button loop and the
//! remote command path both go through a `RadioSession`, so the tuner's
//! register sequences are never interleaved.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::config::{
    startup_volume, STARTUP_BASS_BOOST, STARTUP_FORCED_MONO, UNKNOWN_STATION_NAME,
};
use crate::drivers::button::Button;
use crate::drivers::rda5807::{Rda5807, TunerResult};
use crate::radio::stations::StationTable;
use crate::types::{Frequency, SeekDirection, SignalStrength, Volume};

/// Settings applied once after the tuner is initialized
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Startup {
    /// Initial volume
    pub volume: Volume,
    /// Force mono output
    pub forced_mono: bool,
    /// Enable bass boost
    pub bass_boost: bool,
    /// Preset to tune first; `None` keeps the chip's current channel
    pub preset: Option<usize>,
}

impl Default for Startup {
    fn default() -> Self {
        Self {
            volume: startup_volume(),
            forced_mono: STARTUP_FORCED_MONO,
            bass_boost: STARTUP_BASS_BOOST,
            preset: Some(0),
        }
    }
}

/// Application state shared by the local controls and remote commands
pub struct RadioSession<I2C, D> {
    tuner: Rda5807<I2C, D>,
    stations: StationTable,
    frequency: Frequency,
    station: Option<usize>,
    volume: Volume,
    rssi: SignalStrength,
    /// Something the display shows has changed
    dirty: bool,
    /// A remote-control host is attached
    connected: bool,
}

impl<I2C, D, E> RadioSession<I2C, D>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
{
    /// Wrap an initialized tuner
    pub fn new(tuner: Rda5807<I2C, D>, stations: StationTable) -> Self {
        let frequency = tuner.config().base();
        Self {
            tuner,
            stations,
            frequency,
            station: None,
            volume: Volume::default(),
            rssi: SignalStrength::default(),
            dirty: true,
            connected: false,
        }
    }

    /// Apply startup settings and tune the first preset
    pub fn start(&mut self, startup: &Startup) -> TunerResult<(), E> {
        self.tuner.set_volume(startup.volume.level())?;
        self.tuner.set_forced_mono(startup.forced_mono)?;
        self.tuner.set_bass_boost(startup.bass_boost)?;

        match startup.preset.and_then(|i| self.stations.get(i).map(|e| (i, e.frequency))) {
            Some((index, frequency)) => {
                self.tune(frequency)?;
                self.station = Some(index);
            }
            None => self.refresh_frequency()?,
        }

        self.volume = self.tuner.volume()?;
        info!("session started at {} kHz, volume {}", self.frequency.as_khz(), self.volume.level());
        self.dirty = true;
        Ok(())
    }

    /// Direct access to the tuner
    pub fn tuner_mut(&mut self) -> &mut Rda5807<I2C, D> {
        &mut self.tuner
    }

    /// Preset table
    pub const fn stations(&self) -> &StationTable {
        &self.stations
    }

    /// Last known tuned frequency
    pub const fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Last known volume
    pub const fn volume(&self) -> Volume {
        self.volume
    }

    /// Last sampled signal strength
    pub const fn rssi(&self) -> SignalStrength {
        self.rssi
    }

    /// Preset matching the tuned frequency, if any
    pub const fn station_index(&self) -> Option<usize> {
        self.station
    }

    /// Name of the tuned preset, or a placeholder
    pub fn station_name(&self) -> &str {
        self.station
            .and_then(|i| self.stations.get(i))
            .map_or(UNKNOWN_STATION_NAME, |e| e.name.as_str())
    }

    /// Whether a remote-control host is attached
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    /// Record remote connection activity
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Flag the display state as changed
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Return and clear the changed flag
    pub fn take_dirty(&mut self) -> bool {
        core::mem::take(&mut self.dirty)
    }

    /// Handle one debounced button press
    pub fn on_button(&mut self, button: Button) -> TunerResult<(), E> {
        debug!("button {}", button_name(button));
        match button {
            Button::VolumeUp => {
                self.step_volume(true)?;
            }
            Button::VolumeDown => {
                self.step_volume(false)?;
            }
            Button::Seek => {
                self.seek(SeekDirection::Up)?;
            }
            Button::Select => {
                if let Some(index) = self.stations.next_index(self.station) {
                    self.select_preset(index)?;
                }
            }
        }
        Ok(())
    }

    /// Tune a preset by index
    pub fn select_preset(&mut self, index: usize) -> TunerResult<Frequency, E> {
        let Some(frequency) = self.stations.get(index).map(|e| e.frequency) else {
            return Ok(self.frequency);
        };
        let actual = self.tune(frequency)?;
        self.station = Some(index);
        Ok(actual)
    }

    /// Tune a frequency and update the station name
    pub fn tune(&mut self, frequency: Frequency) -> TunerResult<Frequency, E> {
        let result = self.tuner.set_frequency(frequency);
        self.settle(result)
    }

    /// Tune a frequency given in MHz
    pub fn tune_mhz(&mut self, mhz: f32) -> TunerResult<Frequency, E> {
        let result = self.tuner.set_frequency_mhz(mhz);
        self.settle(result)
    }

    /// Seek and update the station name
    pub fn seek(&mut self, direction: SeekDirection) -> TunerResult<Frequency, E> {
        let result = self.tuner.seek(direction);
        self.settle(result)
    }

    /// Step the volume one notch, clamped to 0-15
    pub fn step_volume(&mut self, up: bool) -> TunerResult<Volume, E> {
        let current = self.tuner.volume()?;
        let wanted = if up { current.step_up() } else { current.step_down() };
        if wanted != current {
            self.tuner.set_volume(wanted.level())?;
        }
        self.apply_volume_readback()
    }

    /// Set an absolute volume (masked to 4 bits by the driver)
    pub fn set_volume(&mut self, level: u8) -> TunerResult<Volume, E> {
        self.tuner.set_volume(level)?;
        self.apply_volume_readback()
    }

    /// Sample RSSI; returns true when it changed since the last sample
    pub fn refresh_signal(&mut self) -> TunerResult<bool, E> {
        let rssi = self.tuner.signal_strength()?;
        if rssi == self.rssi {
            return Ok(false);
        }
        self.rssi = rssi;
        self.dirty = true;
        Ok(true)
    }

    /// Re-read the tuned frequency and station name from the chip
    pub fn refresh_frequency(&mut self) -> TunerResult<(), E> {
        let frequency = self.tuner.frequency()?;
        self.note_frequency(frequency);
        Ok(())
    }

    /// Give back the tuner and presets
    pub fn into_parts(self) -> (Rda5807<I2C, D>, StationTable) {
        (self.tuner, self.stations)
    }

    fn apply_volume_readback(&mut self) -> TunerResult<Volume, E> {
        self.volume = self.tuner.volume()?;
        self.dirty = true;
        Ok(self.volume)
    }

    /// After a tune or seek, re-read the frequency whatever the outcome
    fn settle(&mut self, result: TunerResult<Frequency, E>) -> TunerResult<Frequency, E> {
        match result {
            Ok(frequency) => {
                self.note_frequency(frequency);
                Ok(frequency)
            }
            Err(e) => {
                // Chip state is unknown after a failure; best effort re-query
                let _ = self.refresh_frequency();
                Err(e)
            }
        }
    }

    fn note_frequency(&mut self, frequency: Frequency) {
        self.frequency = frequency;
        self.station = self.stations.lookup(frequency).map(|(i, _)| i);
        self.dirty = true;
    }
}

fn button_name(button: Button) -> &'static str {
    match button {
        Button::VolumeUp => "volume up",
        Button::VolumeDown => "volume down",
        Button::Seek => "seek",
        Button::Select => "select",
    }
}
