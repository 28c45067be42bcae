//! I2C Register Bus
//!
//! Addressed access to the 16-bit big-endian registers of the tuner.
//! Generic over the blocking `embedded-hal` 1.0 I2C trait so the same code
//! runs on the STM32 bus and against a simulated chip on the host.
//!
//! A write is one transfer of `[reg, hi, lo]`; a read selects the register
//! with a one-byte write and reads two bytes back in a combined transaction.

use core::fmt;

use embedded_hal::i2c::I2c;

use crate::config::RDA5807_I2C_ADDR;

/// Transport failure on a register access
///
/// No retry happens at this layer; the caller decides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusError<E> {
    /// Register being accessed when the transfer failed
    pub register: u8,
    /// Error reported by the I2C peripheral
    pub source: E,
}

impl<E> BusError<E> {
    /// Wrap a transport error for a register
    pub const fn new(register: u8, source: E) -> Self {
        Self { register, source }
    }
}

impl<E: fmt::Debug> fmt::Display for BusError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus error on register 0x{:02X}: {:?}", self.register, self.source)
    }
}

#[cfg(feature = "embedded")]
impl<E: embedded_hal::i2c::Error> defmt::Format for BusError<E> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "bus error on reg 0x{:02X}: {}", self.register, self.source.kind());
    }
}

/// Register access result
pub type BusResult<T, E> = Result<T, BusError<E>>;

/// I2C device address wrapper
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct I2cAddress(u8);

impl I2cAddress {
    /// RDA5807 random-access address (register indexed transfers)
    pub const RDA5807: Self = Self::new(RDA5807_I2C_ADDR);

    /// Create from 7-bit address
    #[must_use]
    pub const fn new(addr: u8) -> Self {
        Self(addr & 0x7F)
    }

    /// Get the 7-bit address
    #[must_use]
    pub const fn addr(self) -> u8 {
        self.0
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for I2cAddress {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "0x{:02X}", self.0);
    }
}

/// 16-bit register bus bound to one device address
pub struct RegisterBus<I2C> {
    i2c: I2C,
    address: I2cAddress,
}

impl<I2C: I2c> RegisterBus<I2C> {
    /// Create a register bus for the device at `address`
    pub const fn new(i2c: I2C, address: I2cAddress) -> Self {
        Self { i2c, address }
    }

    /// Device address this bus talks to
    pub const fn address(&self) -> I2cAddress {
        self.address
    }

    /// Read one register
    pub fn read(&mut self, reg: u8) -> BusResult<u16, I2C::Error> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address.addr(), &[reg], &mut buf)
            .map_err(|e| BusError::new(reg, e))?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Write one register
    pub fn write(&mut self, reg: u8, value: u16) -> BusResult<(), I2C::Error> {
        let [hi, lo] = value.to_be_bytes();
        self.i2c
            .write(self.address.addr(), &[reg, hi, lo])
            .map_err(|e| BusError::new(reg, e))
    }

    /// Read, clear the bits in `mask`, OR in `value & mask`, write back
    ///
    /// Not atomic against other bus users; the caller serializes access.
    pub fn update(&mut self, reg: u8, mask: u16, value: u16) -> BusResult<(), I2C::Error> {
        let current = self.read(reg)?;
        self.write(reg, (current & !mask) | (value & mask))
    }

    /// Check whether the device acknowledges its address
    ///
    /// Only detects the device; nothing is configured.
    pub fn probe(&mut self) -> bool {
        probe_address(&mut self.i2c, self.address)
    }

    /// Scan the whole bus for responding devices
    pub fn scan(&mut self) -> heapless::Vec<I2cAddress, 16> {
        scan(&mut self.i2c)
    }

    /// Give the underlying I2C peripheral back
    pub fn release(self) -> I2C {
        self.i2c
    }
}

/// Check whether a device acknowledges a one-byte read
pub fn probe_address<I2C: I2c>(i2c: &mut I2C, address: I2cAddress) -> bool {
    let mut buf = [0u8; 1];
    i2c.read(address.addr(), &mut buf).is_ok()
}

/// Scan the I2C bus for devices
pub fn scan<I2C: I2c>(i2c: &mut I2C) -> heapless::Vec<I2cAddress, 16> {
    let mut devices = heapless::Vec::new();

    for addr in 0x08..0x78 {
        let address = I2cAddress::new(addr);
        if probe_address(i2c, address) {
            let _ = devices.push(address);
        }
    }

    devices
}
