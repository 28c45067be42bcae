//! Simulated hardware shared by the integration tests
//!
//! `SimChip` models the RDA5807 register file closely enough to exercise
//! the driver: tune and seek completion, read channel, RSSI and stereo
//! flags. `SimBus` is a cloneable handle so a test can inspect the chip
//! while the driver owns the bus.

#![allow(dead_code)]

use std::cell::{Cell, RefCell, RefMut};
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType as PinErrorType, InputPin, OutputPin};
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use fm_tuner_firmware::drivers::rda5807::{reg, Rda5807};
use fm_tuner_firmware::radio::session::RadioSession;
use fm_tuner_firmware::radio::stations::StationTable;
use fm_tuner_firmware::types::PollTimeout;

pub const CHIP_ADDRESS: u8 = 0x11;

/// Highest channel of the 76-108 MHz band at 100 kHz
pub const MAX_CHANNEL: u16 = 320;

/// Channel number for a frequency in kHz
pub const fn channel(khz: u32) -> u16 {
    ((khz - 76_000) / 100) as u16
}

/// Register-level model of the tuner
pub struct SimChip {
    regs: [u16; 0x10],
    pointer: u8,
    /// Answer on the bus at all
    pub present: bool,
    /// Fail every transfer after the address phase
    pub bus_fault: bool,
    /// Channels a seek can stop on
    pub stations: Vec<u16>,
    /// Seek never raises STC
    pub seek_stuck: bool,
    /// Tune never clears the TUNE bit
    pub tune_stuck: bool,
    /// TUNING reads that still show TUNE after a tune starts
    pub tune_busy_reads: u32,
    /// Channels the chip lands away from the requested one
    pub tune_offset: i32,
    /// Channel the chip always lands on, whatever is requested
    pub pinned_channel: Option<u16>,
    /// Reported signal strength (0-127)
    pub rssi: u8,
    /// Stereo pilot present
    pub stereo: bool,
    /// Every register write in order
    pub writes: Vec<(u8, u16)>,
    busy: u32,
}

impl SimChip {
    pub fn new() -> Self {
        let mut regs = [0u16; 0x10];
        regs[reg::CHIPID as usize] = 0x5804;
        regs[reg::VOLUME as usize] = 0x880F;
        Self {
            regs,
            pointer: 0,
            present: true,
            bus_fault: false,
            stations: Vec::new(),
            seek_stuck: false,
            tune_stuck: false,
            tune_busy_reads: 0,
            tune_offset: 0,
            pinned_channel: None,
            rssi: 0,
            stereo: false,
            writes: Vec::new(),
            busy: 0,
        }
    }

    /// Current register contents as the driver would read them
    pub fn reg(&self, register: u8) -> u16 {
        match register {
            reg::STATUS => {
                let mut value = self.regs[reg::STATUS as usize];
                if self.stereo {
                    value |= reg::status::ST;
                }
                value
            }
            reg::RSSI => {
                let mut value = (u16::from(self.rssi) << 9) | reg::rssi::FM_READY;
                if self.stations.contains(&self.current_channel()) {
                    value |= reg::rssi::FM_TRUE;
                }
                value
            }
            _ => self.regs[register as usize & 0x0F],
        }
    }

    /// Overwrite a register without side effects
    pub fn set_reg(&mut self, register: u8, value: u16) {
        self.regs[register as usize & 0x0F] = value;
    }

    /// Channel in the STATUS read-channel field
    pub fn current_channel(&self) -> u16 {
        self.regs[reg::STATUS as usize] & reg::status::READCHAN_MASK
    }

    /// Put the chip on a channel, as if a tune had completed
    pub fn park(&mut self, channel: u16) {
        let status = self.regs[reg::STATUS as usize] & !reg::status::READCHAN_MASK;
        self.regs[reg::STATUS as usize] = status | channel | reg::status::STC;
    }

    fn read_register(&mut self, register: u8) -> u16 {
        if register == reg::TUNING {
            if self.busy > 0 {
                self.busy -= 1;
            } else if !self.tune_stuck {
                self.regs[reg::TUNING as usize] &= !reg::tuning::TUNE;
            }
        }
        self.reg(register)
    }

    fn write_register(&mut self, register: u8, value: u16) {
        self.writes.push((register, value));
        self.set_reg(register, value);

        match register {
            reg::TUNING if value & reg::tuning::TUNE != 0 => self.start_tune(value),
            reg::CONFIG if value & reg::config::SEEK != 0 => self.start_seek(value),
            _ => {}
        }
    }

    fn start_tune(&mut self, value: u16) {
        let status = &mut self.regs[reg::STATUS as usize];
        *status &= !(reg::status::STC | reg::status::SF);
        if self.tune_stuck {
            return;
        }

        let requested = i32::from(value >> reg::tuning::CHAN_SHIFT);
        let landed = match self.pinned_channel {
            Some(ch) => ch,
            None => (requested + self.tune_offset).clamp(0, i32::from(MAX_CHANNEL)) as u16,
        };
        self.park(landed);
        self.busy = self.tune_busy_reads;
    }

    fn start_seek(&mut self, value: u16) {
        let status = &mut self.regs[reg::STATUS as usize];
        *status &= !(reg::status::STC | reg::status::SF);
        if self.seek_stuck {
            return;
        }

        let current = self.current_channel();
        let up = value & reg::config::SEEKUP != 0;
        let mut candidates: Vec<u16> = self.stations.clone();
        candidates.sort_unstable();
        let found = if up {
            candidates
                .iter()
                .copied()
                .find(|&ch| ch > current)
                .or_else(|| candidates.first().copied())
        } else {
            candidates
                .iter()
                .rev()
                .copied()
                .find(|&ch| ch < current)
                .or_else(|| candidates.last().copied())
        };

        match found {
            Some(ch) => self.park(ch),
            None => {
                self.regs[reg::STATUS as usize] |= reg::status::STC | reg::status::SF;
            }
        }
        self.regs[reg::CONFIG as usize] &= !reg::config::SEEK;
    }
}

impl Default for SimChip {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to a `SimChip`, usable as the driver's I2C bus
#[derive(Clone, Default)]
pub struct SimBus(Rc<RefCell<SimChip>>);

impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(chip: SimChip) -> Self {
        Self(Rc::new(RefCell::new(chip)))
    }

    pub fn chip(&self) -> RefMut<'_, SimChip> {
        self.0.borrow_mut()
    }
}

impl ErrorType for SimBus {
    type Error = ErrorKind;
}

impl I2c for SimBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut chip = self.0.borrow_mut();
        if !chip.present || address != CHIP_ADDRESS {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        if chip.bus_fault {
            return Err(ErrorKind::Bus);
        }

        for op in operations {
            match op {
                Operation::Write(bytes) => match **bytes {
                    [register] => chip.pointer = register,
                    [register, hi, lo] => {
                        chip.pointer = register;
                        chip.write_register(register, u16::from_be_bytes([hi, lo]));
                    }
                    _ => return Err(ErrorKind::Other),
                },
                Operation::Read(buf) => {
                    let pointer = chip.pointer;
                    let bytes = chip.read_register(pointer).to_be_bytes();
                    for (dst, src) in buf.iter_mut().zip(bytes) {
                        *dst = src;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Delay that returns immediately, counting calls
#[derive(Clone, Default)]
pub struct NoDelay(Rc<Cell<u32>>);

impl NoDelay {
    pub fn calls(&self) -> u32 {
        self.0.get()
    }
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {
        self.0.set(self.0.get() + 1);
    }

    fn delay_ms(&mut self, _ms: u32) {
        self.0.set(self.0.get() + 1);
    }
}

/// Input pin driven by the test
#[derive(Clone)]
pub struct SimPin(Rc<Cell<bool>>);

impl SimPin {
    /// Idle-high pin (pull-up, button released)
    pub fn released() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub fn press(&self) {
        self.0.set(false);
    }

    pub fn release(&self) {
        self.0.set(true);
    }

    pub fn drive(&self, high: bool) {
        self.0.set(high);
    }

    pub fn is_high_now(&self) -> bool {
        self.0.get()
    }
}

impl PinErrorType for SimPin {
    type Error = Infallible;
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.get())
    }
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set(true);
        Ok(())
    }
}

pub type SimTuner = Rda5807<SimBus, NoDelay>;
pub type SimSession = RadioSession<SimBus, NoDelay>;

/// Short timeouts so stuck-chip tests finish quickly
pub const FAST: PollTimeout = PollTimeout::new(50, 5);

/// Initialized driver on a fresh chip
pub fn tuner(bus: &SimBus) -> SimTuner {
    let mut tuner = Rda5807::new(bus.clone(), NoDelay::default()).with_timeouts(FAST, FAST);
    tuner.init().unwrap();
    tuner
}

/// Initialized session with a small preset table; nothing tuned yet
pub fn session(bus: &SimBus) -> SimSession {
    let stations = StationTable::from_khz(&[
        (80_000, "TOKYO FM"),
        (81_300, "J-WAVE"),
        (82_500, "NHK FM TOKYO"),
    ]);
    RadioSession::new(tuner(bus), stations)
}
