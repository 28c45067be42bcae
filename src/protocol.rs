//! Communication Protocols
//!
//! Line-oriented ASCII remote-control protocol. Each line is a
//! whitespace-separated command; responses are single ASCII lines.
//!
//! ```text
//! read reg <addr>                   -> read reg <addr> / reg <addr> <HHHH>
//! write reg <addr> <value>          -> write reg .. / reg <addr> <HHHH>
//! update reg <addr> <mask> <value>  -> update reg .. / reg <addr> <HHHH>
//! frequency <MHz>                   -> frequency <MHz.1>
//! seek up|down                      -> frequency <MHz.1>
//! mute|mono|bass on|off             -> (no response)
//! volume up|down|<n>                -> volume <level>
//! status                            -> status <MHz.1> <stereo|mono> <rssi> <vol>
//!                                      <mute|unmute> <bass|nobass> <out_mono|out_stereo>
//! anything else                     -> ?
//! ```

use core::fmt::{self, Write};
use core::str::FromStr;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use heapless::{String, Vec};

use crate::config::RESPONSE_LINE_LEN;
use crate::drivers::rda5807::{TunerResult, TunerStatus};
use crate::radio::session::RadioSession;
use crate::types::SeekDirection;

/// Response sent for anything that cannot be parsed or executed
pub const UNKNOWN_RESPONSE: &str = "?";

/// Most tokens any command carries
const MAX_TOKENS: usize = 5;

/// One response line
pub type ResponseLine = String<RESPONSE_LINE_LEN>;

/// Destination for response lines (the remote transport)
pub trait ResponseSink {
    /// Deliver one line, without terminator
    fn send(&mut self, line: &str);
}

impl<const N: usize, const M: usize> ResponseSink for Vec<String<N>, M> {
    fn send(&mut self, line: &str) {
        let mut owned = String::new();
        let _ = Truncating(&mut owned).write_str(line);
        let _ = self.push(owned);
    }
}

/// Volume change requested remotely
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VolumeChange {
    /// One step louder, clamped at 15
    Up,
    /// One step quieter, clamped at 0
    Down,
    /// Absolute level as requested; only the low 4 bits reach the chip
    Set(i32),
}

/// Numeric argument together with the token it was parsed from
///
/// Register commands echo their arguments exactly as received, so
/// `read reg 05` answers `reg 05 ...`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arg<'a, T> {
    /// Token as received
    pub text: &'a str,
    /// Parsed value
    pub value: T,
}

impl<'a, T: FromStr> Arg<'a, T> {
    /// Parse a token, keeping its text
    #[must_use]
    pub fn parse(text: &'a str) -> Option<Self> {
        let value = text.parse().ok()?;
        Some(Self { text, value })
    }
}

impl<T> fmt::Display for Arg<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text)
    }
}

/// Remote-control command
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command<'a> {
    /// Read a raw register
    ReadRegister {
        /// Register address
        register: Arg<'a, u8>,
    },
    /// Write a raw register
    WriteRegister {
        /// Register address
        register: Arg<'a, u8>,
        /// New value
        value: Arg<'a, u16>,
    },
    /// Masked read-modify-write of a raw register
    UpdateRegister {
        /// Register address
        register: Arg<'a, u8>,
        /// Bits to replace
        mask: Arg<'a, u16>,
        /// Replacement bits
        value: Arg<'a, u16>,
    },
    /// Tune a frequency in MHz
    SetFrequency(f32),
    /// Seek the next station
    Seek(SeekDirection),
    /// Mute on/off
    Mute(bool),
    /// Forced mono on/off
    Mono(bool),
    /// Bass boost on/off
    Bass(bool),
    /// Change the volume
    Volume(VolumeChange),
    /// Report the receiver status
    Status,
}

impl<'a> Command<'a> {
    /// Parse one line (terminator already stripped)
    ///
    /// Returns `None` for unknown commands, wrong token counts and
    /// malformed numbers.
    #[must_use]
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut tokens: Vec<&str, MAX_TOKENS> = Vec::new();
        for token in line.split_whitespace() {
            tokens.push(token).ok()?;
        }

        match tokens.as_slice() {
            ["read", "reg", addr] => Some(Self::ReadRegister {
                register: Arg::parse(addr)?,
            }),
            ["write", "reg", addr, value] => Some(Self::WriteRegister {
                register: Arg::parse(addr)?,
                value: Arg::parse(value)?,
            }),
            ["update", "reg", addr, mask, value] => Some(Self::UpdateRegister {
                register: Arg::parse(addr)?,
                mask: Arg::parse(mask)?,
                value: Arg::parse(value)?,
            }),
            ["frequency", mhz] => Some(Self::SetFrequency(mhz.parse().ok()?)),
            ["seek", "up"] => Some(Self::Seek(SeekDirection::Up)),
            ["seek", "down"] => Some(Self::Seek(SeekDirection::Down)),
            ["mute", state] => Some(Self::Mute(parse_switch(state)?)),
            ["mono", state] => Some(Self::Mono(parse_switch(state)?)),
            ["bass", state] => Some(Self::Bass(parse_switch(state)?)),
            ["volume", "up"] => Some(Self::Volume(VolumeChange::Up)),
            ["volume", "down"] => Some(Self::Volume(VolumeChange::Down)),
            ["volume", level] => Some(Self::Volume(VolumeChange::Set(level.parse().ok()?))),
            ["status"] => Some(Self::Status),
            _ => None,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Command<'_> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::ReadRegister { register } => defmt::write!(f, "ReadReg({})", register.value),
            Self::WriteRegister { register, value } => {
                defmt::write!(f, "WriteReg({}, {})", register.value, value.value);
            }
            Self::UpdateRegister { register, mask, value } => {
                defmt::write!(
                    f,
                    "UpdateReg({}, {}, {})",
                    register.value,
                    mask.value,
                    value.value
                );
            }
            Self::SetFrequency(mhz) => defmt::write!(f, "SetFreq({})", mhz),
            Self::Seek(dir) => defmt::write!(f, "Seek({})", dir),
            Self::Status => defmt::write!(f, "Status"),
            _ => defmt::write!(f, "Cmd(...)"),
        }
    }
}

fn parse_switch(token: &str) -> Option<bool> {
    match token {
        "on" => Some(true),
        "off" => Some(false),
        _ => None,
    }
}

/// Format one response line; overlong output is truncated
#[must_use]
pub fn format_line(args: fmt::Arguments<'_>) -> ResponseLine {
    let mut line = ResponseLine::new();
    let _ = Truncating(&mut line).write_fmt(args);
    line
}

/// Writer that drops whatever does not fit instead of failing
struct Truncating<'a, const N: usize>(&'a mut String<N>);

impl<const N: usize> Write for Truncating<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// `status ...` line for a receiver snapshot
#[must_use]
pub fn status_line(status: &TunerStatus) -> ResponseLine {
    format_line(format_args!(
        "status {} {} {} {} {} {} {}",
        status.frequency,
        if status.stereo { "stereo" } else { "mono" },
        status.rssi,
        status.volume,
        if status.muted { "mute" } else { "unmute" },
        if status.bass_boost { "bass" } else { "nobass" },
        if status.forced_mono { "out_mono" } else { "out_stereo" },
    ))
}

/// Parse and execute one command line, writing responses to `sink`
///
/// Never fails: unknown input and failed operations answer `?`.
pub fn dispatch<I2C, D, E, S>(session: &mut RadioSession<I2C, D>, line: &str, sink: &mut S)
where
    I2C: I2c<Error = E>,
    D: DelayNs,
    S: ResponseSink,
{
    let Some(command) = Command::parse(line) else {
        debug!("unrecognized command");
        sink.send(UNKNOWN_RESPONSE);
        return;
    };

    if execute(session, command, sink).is_err() {
        warn!("remote command failed");
        sink.send(UNKNOWN_RESPONSE);
    }
}

/// Execute a parsed command against the session
pub fn execute<I2C, D, E, S>(
    session: &mut RadioSession<I2C, D>,
    command: Command<'_>,
    sink: &mut S,
) -> TunerResult<(), E>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
    S: ResponseSink,
{
    match command {
        Command::ReadRegister { register } => {
            sink.send(&format_line(format_args!("read reg {register}")));
            let value = session.tuner_mut().read_register(register.value)?;
            sink.send(&register_line(register, value));
        }
        Command::WriteRegister { register, value } => {
            sink.send(&format_line(format_args!("write reg {register} {value}")));
            session
                .tuner_mut()
                .write_register(register.value, value.value)?;
            let value = session.tuner_mut().read_register(register.value)?;
            sink.send(&register_line(register, value));
        }
        Command::UpdateRegister {
            register,
            mask,
            value,
        } => {
            sink.send(&format_line(format_args!(
                "update reg {register} {mask} {value}"
            )));
            session
                .tuner_mut()
                .update_register_bits(register.value, mask.value, value.value)?;
            let value = session.tuner_mut().read_register(register.value)?;
            sink.send(&register_line(register, value));
        }
        Command::SetFrequency(mhz) => {
            let frequency = session.tune_mhz(mhz)?;
            sink.send(&format_line(format_args!("frequency {frequency}")));
        }
        Command::Seek(direction) => {
            let frequency = session.seek(direction)?;
            sink.send(&format_line(format_args!("frequency {frequency}")));
        }
        Command::Mute(on) => session.tuner_mut().set_mute(on)?,
        Command::Mono(on) => session.tuner_mut().set_forced_mono(on)?,
        Command::Bass(on) => session.tuner_mut().set_bass_boost(on)?,
        Command::Volume(VolumeChange::Up) => {
            let volume = session.step_volume(true)?;
            sink.send(&format_line(format_args!("volume {volume}")));
        }
        Command::Volume(VolumeChange::Down) => {
            let volume = session.step_volume(false)?;
            sink.send(&format_line(format_args!("volume {volume}")));
        }
        Command::Volume(VolumeChange::Set(level)) => {
            // Two's-complement masking: -1 selects level 15
            session.set_volume((level & 0x0F) as u8)?;
            sink.send(&format_line(format_args!("volume {level}")));
        }
        Command::Status => {
            let status = session.tuner_mut().status()?;
            sink.send(&status_line(&status));
        }
    }
    Ok(())
}

fn register_line(register: Arg<'_, u8>, value: u16) -> ResponseLine {
    format_line(format_args!("reg {register} {value:04X}"))
}
