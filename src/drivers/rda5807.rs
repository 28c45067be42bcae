//! RDA5807 FM Tuner Driver
//!
//! High-level control of the RDA5807 single-chip broadcast FM receiver:
//! convergent tuning, hardware seek, volume and audio flags, RSSI and
//! status readback.
//!
//! Every queryable fact is re-read from the chip. The driver additionally
//! records the last requested mute/bass/mono settings for reporting.
//! Operations that wait on the chip (tune, seek) poll with a bounded
//! timeout so a stuck device cannot hang the control loop.

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::config::{self, MAX_TUNE_ATTEMPTS, RDA5807_CHIP_ID};
use crate::hal::i2c::{BusError, I2cAddress, RegisterBus};
use crate::types::{Frequency, PollTimeout, SeekDirection, SignalStrength, TunerConfig, Volume};

/// RDA5807 register addresses and field masks
pub mod reg {
    /// Chip identification
    pub const CHIPID: u8 = 0x00;
    /// Power, audio and seek control
    pub const CONFIG: u8 = 0x02;
    /// Channel, band and spacing
    pub const TUNING: u8 = 0x03;
    /// De-emphasis, soft mute, AFC
    pub const GPIO: u8 = 0x04;
    /// Seek threshold and DAC volume
    pub const VOLUME: u8 = 0x05;
    /// I2S output
    pub const I2S: u8 = 0x06;
    /// Stereo/mono soft blend
    pub const BLEND: u8 = 0x07;
    /// Seek/tune completion, stereo indicator, read channel
    pub const STATUS: u8 = 0x0A;
    /// Signal strength and station flags
    pub const RSSI: u8 = 0x0B;

    /// CHIPID fields
    pub mod chipid {
        /// Device identifier, bits 15:8
        pub const ID_MASK: u16 = 0xFF00;
    }

    /// CONFIG fields
    pub mod config {
        /// Audio output high-Z disable (1 = normal operation)
        pub const DHIZ: u16 = 0x8000;
        /// Mute disable (1 = audio on)
        pub const DMUTE: u16 = 0x4000;
        /// Force mono
        pub const MONO: u16 = 0x2000;
        /// Bass boost
        pub const BASS: u16 = 0x1000;
        /// RCLK non-calibrate mode
        pub const RCLK_NON_CAL: u16 = 0x0800;
        /// RCLK direct input
        pub const RCLK_DIRECT: u16 = 0x0400;
        /// Seek direction (1 = up)
        pub const SEEKUP: u16 = 0x0200;
        /// Start seek
        pub const SEEK: u16 = 0x0100;
        /// Stop seeking at band limit instead of wrapping
        pub const SKMODE: u16 = 0x0080;
        /// RDS/RBDS enable
        pub const RDS: u16 = 0x0008;
        /// New demodulate method
        pub const NEW_METHOD: u16 = 0x0004;
        /// Soft reset
        pub const SOFT_RESET: u16 = 0x0002;
        /// Power up
        pub const ENABLE: u16 = 0x0001;
    }

    /// TUNING fields
    pub mod tuning {
        /// Channel field position, bits 15:6
        pub const CHAN_SHIFT: u16 = 6;
        /// Channel field mask
        pub const CHAN_MASK: u16 = 0xFFC0;
        /// Direct control mode (test only)
        pub const DIRECT: u16 = 0x0020;
        /// Start tune; cleared by the chip when done
        pub const TUNE: u16 = 0x0010;
        /// Band 76-108 MHz (worldwide)
        pub const BAND_WORLD: u16 = 0x0008;
        /// 100 kHz channel spacing
        pub const SPACE_100K: u16 = 0x0000;
    }

    /// GPIO fields
    pub mod gpio {
        /// 50 us de-emphasis (Japan/Europe)
        pub const DE: u16 = 0x0800;
        /// Soft mute enable
        pub const SOFTMUTE_EN: u16 = 0x0200;
        /// AFC disable
        pub const AFCD: u16 = 0x0100;
    }

    /// VOLUME fields
    pub mod volume {
        /// Interrupt mode
        pub const INT_MODE: u16 = 0x8000;
        /// Seek SNR threshold, bits 11:8
        pub const SEEKTH_MASK: u16 = 0x0F00;
        /// Default seek threshold
        pub const SEEKTH_DEFAULT: u16 = 0x0800;
        /// DAC gain, bits 3:0
        pub const VOLUME_MASK: u16 = 0x000F;
        /// Full-scale volume
        pub const VOLUME_DEFAULT: u16 = 0x000F;
    }

    /// I2S fields
    pub mod i2s {
        /// I2S disabled
        pub const DEFAULT: u16 = 0x0000;
    }

    /// BLEND fields
    pub mod blend {
        /// Noise soft blend threshold, bits 14:10, 2 dB units
        pub const TH_SOFTBLEND_MASK: u16 = 0x7C00;
        /// Default soft blend threshold
        pub const TH_SOFTBLEND_DEFAULT: u16 = 0x4000;
        /// Soft blend enable
        pub const SOFTBLEND_EN: u16 = 0x0002;
    }

    /// STATUS fields
    pub mod status {
        /// Seek/tune complete
        pub const STC: u16 = 0x4000;
        /// Seek failed
        pub const SF: u16 = 0x2000;
        /// Stereo indicator
        pub const ST: u16 = 0x0400;
        /// Tuned channel, bits 9:0
        pub const READCHAN_MASK: u16 = 0x03FF;
    }

    /// RSSI fields
    pub mod rssi {
        /// Signal strength, bits 15:9
        pub const RSSI_MASK: u16 = 0xFE00;
        /// Current channel is a station
        pub const FM_TRUE: u16 = 0x0100;
        /// Receiver ready
        pub const FM_READY: u16 = 0x0080;
    }
}

/// Tuner driver error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TunerError<E> {
    /// Register transfer failed
    Bus(BusError<E>),
    /// No device answered at the tuner address
    DeviceNotFound,
    /// Tune did not complete within its timeout
    TuneTimeout,
    /// Seek did not complete within its timeout
    SeekTimeout,
    /// Seek completed without finding a station
    SeekFailed,
    /// Requested frequency is outside the band
    FrequencyOutOfRange,
    /// Correction loop gave up before landing on the target
    TuneNotConverged,
}

impl<E> From<BusError<E>> for TunerError<E> {
    fn from(e: BusError<E>) -> Self {
        Self::Bus(e)
    }
}

impl<E: fmt::Debug> fmt::Display for TunerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "{e}"),
            Self::DeviceNotFound => write!(f, "tuner not found on the bus"),
            Self::TuneTimeout => write!(f, "tune timed out"),
            Self::SeekTimeout => write!(f, "seek timed out"),
            Self::SeekFailed => write!(f, "seek found no station"),
            Self::FrequencyOutOfRange => write!(f, "frequency out of band"),
            Self::TuneNotConverged => write!(f, "tuning did not converge"),
        }
    }
}

#[cfg(feature = "embedded")]
impl<E: embedded_hal::i2c::Error> defmt::Format for TunerError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Bus(e) => defmt::write!(f, "{}", e),
            Self::DeviceNotFound => defmt::write!(f, "DeviceNotFound"),
            Self::TuneTimeout => defmt::write!(f, "TuneTimeout"),
            Self::SeekTimeout => defmt::write!(f, "SeekTimeout"),
            Self::SeekFailed => defmt::write!(f, "SeekFailed"),
            Self::FrequencyOutOfRange => defmt::write!(f, "FrequencyOutOfRange"),
            Self::TuneNotConverged => defmt::write!(f, "TuneNotConverged"),
        }
    }
}

/// Tuner operation result
pub type TunerResult<T, E> = Result<T, TunerError<E>>;

/// Snapshot of the receiver state, read back from the chip
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TunerStatus {
    /// Tuned frequency
    pub frequency: Frequency,
    /// Stereo pilot detected
    pub stereo: bool,
    /// Signal strength
    pub rssi: SignalStrength,
    /// DAC volume
    pub volume: Volume,
    /// Audio muted
    pub muted: bool,
    /// Bass boost on
    pub bass_boost: bool,
    /// Mono output forced
    pub forced_mono: bool,
}

/// `RDA5807` driver
pub struct Rda5807<I2C, D> {
    bus: RegisterBus<I2C>,
    delay: D,
    config: TunerConfig,
    tune_timeout: PollTimeout,
    seek_timeout: PollTimeout,
    muted: bool,
    bass_boost: bool,
    forced_mono: bool,
}

impl<I2C, D, E> Rda5807<I2C, D>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
{
    /// Create a driver with the worldwide band and default timeouts
    ///
    /// Nothing is sent to the chip until [`Self::init`].
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            bus: RegisterBus::new(i2c, I2cAddress::RDA5807),
            delay,
            config: config::tuner_config(),
            tune_timeout: config::tune_timeout(),
            seek_timeout: config::seek_timeout(),
            muted: false,
            bass_boost: false,
            forced_mono: false,
        }
    }

    /// Override the tune and seek timeouts
    #[must_use]
    pub fn with_timeouts(mut self, tune: PollTimeout, seek: PollTimeout) -> Self {
        self.tune_timeout = tune;
        self.seek_timeout = seek;
        self
    }

    /// Power up and configure the chip
    ///
    /// Fails with [`TunerError::DeviceNotFound`] when nothing answers at the
    /// tuner address; the caller must not use the driver in that case.
    pub fn init(&mut self) -> TunerResult<(), E> {
        use reg::{blend, config as cfg, gpio, i2s, tuning, volume};

        if !self.bus.probe() {
            warn!("RDA5807 not found at 0x{:02X}", self.bus.address().addr());
            return Err(TunerError::DeviceNotFound);
        }

        let id = self.bus.read(reg::CHIPID)?;
        if id & reg::chipid::ID_MASK == RDA5807_CHIP_ID {
            info!("RDA5807 found");
        } else {
            warn!("unexpected chip id 0x{:04X}", id);
        }

        let base = cfg::DHIZ | cfg::DMUTE | cfg::ENABLE;
        self.bus.write(reg::CONFIG, base | cfg::SOFT_RESET)?;
        self.bus
            .write(reg::TUNING, tuning::BAND_WORLD | tuning::SPACE_100K)?;
        self.bus.write(reg::GPIO, gpio::DE | gpio::SOFTMUTE_EN)?;
        self.bus.write(
            reg::VOLUME,
            volume::INT_MODE | volume::SEEKTH_DEFAULT | volume::VOLUME_DEFAULT,
        )?;
        self.bus.write(reg::I2S, i2s::DEFAULT)?;
        self.bus.write(
            reg::BLEND,
            blend::TH_SOFTBLEND_DEFAULT | blend::SOFTBLEND_EN,
        )?;
        self.bus.write(reg::CONFIG, base | cfg::NEW_METHOD)?;

        self.muted = false;
        self.bass_boost = false;
        self.forced_mono = false;
        Ok(())
    }

    /// Band and channel grid
    pub const fn config(&self) -> &TunerConfig {
        &self.config
    }

    /// Read the chip-id register
    pub fn chip_id(&mut self) -> TunerResult<u16, E> {
        Ok(self.bus.read(reg::CHIPID)?)
    }

    /// Tune to `target`, correcting until the chip reports it
    ///
    /// The target is snapped onto the channel grid. Each round writes the
    /// nearest channel for the current input, waits for the tune to finish
    /// and reads the channel back; on a miss the input is moved by half the
    /// error and the round repeats, up to a fixed number of rounds.
    pub fn set_frequency(&mut self, target: Frequency) -> TunerResult<Frequency, E> {
        let target = self
            .config
            .snap(target)
            .ok_or(TunerError::FrequencyOutOfRange)?;

        let mut input = i64::from(target.as_khz());
        for attempt in 0..MAX_TUNE_ATTEMPTS {
            let channel = self.config.channel_near(input);
            self.tune_channel(channel)?;

            let actual = self.frequency()?;
            if actual == target {
                return Ok(actual);
            }

            debug!(
                "tune round {}: wanted {} kHz, got {} kHz",
                attempt,
                target.as_khz(),
                actual.as_khz()
            );
            input += (input - i64::from(actual.as_khz())) / 2;
        }

        warn!("tuning to {} kHz did not converge", target.as_khz());
        Err(TunerError::TuneNotConverged)
    }

    /// Tune to a frequency given in MHz
    pub fn set_frequency_mhz(&mut self, mhz: f32) -> TunerResult<Frequency, E> {
        let target = Frequency::from_mhz(mhz).ok_or(TunerError::FrequencyOutOfRange)?;
        self.set_frequency(target)
    }

    /// Frequency the chip is tuned to
    pub fn frequency(&mut self) -> TunerResult<Frequency, E> {
        let status = self.bus.read(reg::STATUS)?;
        Ok(self.channel_frequency(status))
    }

    /// Frequency the chip is tuned to, in MHz
    pub fn get_frequency_mhz(&mut self) -> TunerResult<f32, E> {
        Ok(self.frequency()?.as_mhz_f32())
    }

    /// Set the DAC volume; only the low 4 bits of `level` are used
    pub fn set_volume(&mut self, level: u8) -> TunerResult<(), E> {
        let volume = Volume::new(level);
        self.bus.update(
            reg::VOLUME,
            reg::volume::VOLUME_MASK,
            u16::from(volume.level()),
        )?;
        Ok(())
    }

    /// Read the DAC volume back
    pub fn volume(&mut self) -> TunerResult<Volume, E> {
        let raw = self.bus.read(reg::VOLUME)?;
        Ok(Volume::new((raw & reg::volume::VOLUME_MASK) as u8))
    }

    /// Mute or unmute the audio output
    pub fn set_mute(&mut self, mute: bool) -> TunerResult<(), E> {
        // DMUTE set means audio enabled
        let value = if mute { 0 } else { reg::config::DMUTE };
        self.bus.update(reg::CONFIG, reg::config::DMUTE, value)?;
        self.muted = mute;
        Ok(())
    }

    /// Enable or disable bass boost
    pub fn set_bass_boost(&mut self, enable: bool) -> TunerResult<(), E> {
        let value = if enable { reg::config::BASS } else { 0 };
        self.bus.update(reg::CONFIG, reg::config::BASS, value)?;
        self.bass_boost = enable;
        Ok(())
    }

    /// Force mono output, or allow stereo
    pub fn set_forced_mono(&mut self, mono: bool) -> TunerResult<(), E> {
        let value = if mono { reg::config::MONO } else { 0 };
        self.bus.update(reg::CONFIG, reg::config::MONO, value)?;
        self.forced_mono = mono;
        Ok(())
    }

    /// Last requested mute setting
    pub const fn is_muted(&self) -> bool {
        self.muted
    }

    /// Last requested bass boost setting
    pub const fn bass_boost_enabled(&self) -> bool {
        self.bass_boost
    }

    /// Last requested forced-mono setting
    pub const fn forced_mono_enabled(&self) -> bool {
        self.forced_mono
    }

    /// Let the chip search for the next station in `direction`
    ///
    /// Blocks until the chip reports completion or the seek timeout
    /// expires. A completed seek with the fail flag set is reported as
    /// [`TunerError::SeekFailed`].
    pub fn seek(&mut self, direction: SeekDirection) -> TunerResult<Frequency, E> {
        use reg::config::{SEEK, SEEKUP};

        let bits = match direction {
            SeekDirection::Up => SEEK | SEEKUP,
            SeekDirection::Down => SEEK,
        };
        self.bus.update(reg::CONFIG, SEEK | SEEKUP, bits)?;

        let timeout = self.seek_timeout;
        let status = self
            .wait_for(reg::STATUS, timeout, |s| s & reg::status::STC != 0)?
            .ok_or(TunerError::SeekTimeout)?;

        if status & reg::status::SF != 0 {
            return Err(TunerError::SeekFailed);
        }
        Ok(self.channel_frequency(status))
    }

    /// Seek towards higher frequencies
    pub fn seek_up(&mut self) -> TunerResult<Frequency, E> {
        self.seek(SeekDirection::Up)
    }

    /// Seek towards lower frequencies
    pub fn seek_down(&mut self) -> TunerResult<Frequency, E> {
        self.seek(SeekDirection::Down)
    }

    /// Received signal strength (0-127, logarithmic)
    pub fn signal_strength(&mut self) -> TunerResult<SignalStrength, E> {
        Ok(SignalStrength::from_register(self.bus.read(reg::RSSI)?))
    }

    /// Whether the chip considers the current channel a station
    pub fn is_station(&mut self) -> TunerResult<bool, E> {
        Ok(self.bus.read(reg::RSSI)? & reg::rssi::FM_TRUE != 0)
    }

    /// Whether the receiver reports ready
    pub fn is_ready(&mut self) -> TunerResult<bool, E> {
        Ok(self.bus.read(reg::RSSI)? & reg::rssi::FM_READY != 0)
    }

    /// Aggregate receiver state
    ///
    /// Frequency, stereo, RSSI and volume are read from the chip; the
    /// audio flags are the last requested settings.
    pub fn status(&mut self) -> TunerResult<TunerStatus, E> {
        let status = self.bus.read(reg::STATUS)?;
        let rssi = self.signal_strength()?;
        let volume = self.volume()?;

        Ok(TunerStatus {
            frequency: self.channel_frequency(status),
            stereo: status & reg::status::ST != 0,
            rssi,
            volume,
            muted: self.muted,
            bass_boost: self.bass_boost,
            forced_mono: self.forced_mono,
        })
    }

    /// Raw register read
    pub fn read_register(&mut self, register: u8) -> TunerResult<u16, E> {
        Ok(self.bus.read(register)?)
    }

    /// Raw register write
    pub fn write_register(&mut self, register: u8, value: u16) -> TunerResult<(), E> {
        Ok(self.bus.write(register, value)?)
    }

    /// Raw masked read-modify-write
    pub fn update_register_bits(&mut self, register: u8, mask: u16, value: u16) -> TunerResult<(), E> {
        Ok(self.bus.update(register, mask, value)?)
    }

    /// Give back the bus and delay
    pub fn release(self) -> (I2C, D) {
        (self.bus.release(), self.delay)
    }

    fn channel_frequency(&self, status: u16) -> Frequency {
        self.config
            .frequency_of(status & reg::status::READCHAN_MASK)
    }

    fn tune_channel(&mut self, channel: u16) -> TunerResult<(), E> {
        use reg::tuning::{BAND_WORLD, CHAN_SHIFT, SPACE_100K, TUNE};

        self.bus.write(
            reg::TUNING,
            (channel << CHAN_SHIFT) | TUNE | BAND_WORLD | SPACE_100K,
        )?;

        let timeout = self.tune_timeout;
        self.wait_for(reg::TUNING, timeout, |t| t & TUNE == 0)?
            .ok_or(TunerError::TuneTimeout)?;
        Ok(())
    }

    /// Poll `register` until `done` holds or the timeout runs out
    ///
    /// Returns the satisfying register value, or `None` on timeout.
    fn wait_for(
        &mut self,
        register: u8,
        timeout: PollTimeout,
        done: impl Fn(u16) -> bool,
    ) -> Result<Option<u16>, BusError<E>> {
        for _ in 0..timeout.attempts() {
            let value = self.bus.read(register)?;
            if done(value) {
                return Ok(Some(value));
            }
            self.delay.delay_ms(timeout.interval_ms());
        }
        Ok(None)
    }
}
