//! Remote Protocol Tests
//!
//! Command parsing and dispatch of the line-based remote-control protocol.

mod common;

use common::{channel, session, SimBus, SimSession};
use fm_tuner_firmware::drivers::rda5807::reg;
use fm_tuner_firmware::protocol::{
    self, Arg, Command, ResponseLine, VolumeChange, UNKNOWN_RESPONSE,
};
use fm_tuner_firmware::types::SeekDirection;

fn run(session: &mut SimSession, line: &str) -> Vec<String> {
    let mut sink: heapless::Vec<ResponseLine, 8> = heapless::Vec::new();
    protocol::dispatch(session, line, &mut sink);
    sink.iter().map(|l| l.as_str().to_owned()).collect()
}

// ============================================================================
// Parser Tests
// ============================================================================

#[test]
fn test_parse_register_commands() {
    assert_eq!(
        Command::parse("read reg 5"),
        Some(Command::ReadRegister {
            register: Arg { text: "5", value: 5 }
        })
    );
    assert_eq!(
        Command::parse("write reg 2 49153"),
        Some(Command::WriteRegister {
            register: Arg { text: "2", value: 2 },
            value: Arg {
                text: "49153",
                value: 49153
            }
        })
    );
    assert_eq!(
        Command::parse("update reg 5 15 7"),
        Some(Command::UpdateRegister {
            register: Arg { text: "5", value: 5 },
            mask: Arg { text: "15", value: 15 },
            value: Arg { text: "7", value: 7 }
        })
    );
}

#[test]
fn test_parse_keeps_register_tokens() {
    let Some(Command::ReadRegister { register }) = Command::parse("read reg 05") else {
        panic!("not a register read");
    };
    assert_eq!(register.value, 5);
    assert_eq!(register.text, "05");
    assert_eq!(register.to_string(), "05");
}

#[test]
fn test_parse_tuning_commands() {
    assert_eq!(
        Command::parse("frequency 82.5"),
        Some(Command::SetFrequency(82.5))
    );
    assert_eq!(
        Command::parse("seek up"),
        Some(Command::Seek(SeekDirection::Up))
    );
    assert_eq!(
        Command::parse("seek down"),
        Some(Command::Seek(SeekDirection::Down))
    );
}

#[test]
fn test_parse_switches() {
    assert_eq!(Command::parse("mute on"), Some(Command::Mute(true)));
    assert_eq!(Command::parse("mono off"), Some(Command::Mono(false)));
    assert_eq!(Command::parse("bass on"), Some(Command::Bass(true)));
}

#[test]
fn test_parse_volume() {
    assert_eq!(
        Command::parse("volume up"),
        Some(Command::Volume(VolumeChange::Up))
    );
    assert_eq!(
        Command::parse("volume down"),
        Some(Command::Volume(VolumeChange::Down))
    );
    assert_eq!(
        Command::parse("volume 20"),
        Some(Command::Volume(VolumeChange::Set(20)))
    );
}

#[test]
fn test_parse_tolerates_extra_whitespace() {
    assert_eq!(Command::parse("  status  "), Some(Command::Status));
    assert_eq!(
        Command::parse("read  reg\t10"),
        Some(Command::ReadRegister {
            register: Arg {
                text: "10",
                value: 10
            }
        })
    );
}

#[test]
fn test_parse_rejects_malformed() {
    for line in [
        "",
        "bogus",
        "read reg",
        "read reg x",
        "read reg 300",
        "write reg 2",
        "write reg 2 70000",
        "update reg 5 15",
        "frequency",
        "frequency abc",
        "seek sideways",
        "mute maybe",
        "volume loud",
        "status now",
        "read reg 1 2 3 4 5",
    ] {
        assert_eq!(Command::parse(line), None, "{line:?}");
    }
}

// ============================================================================
// Register Command Tests
// ============================================================================

#[test]
fn test_read_register_echoes_then_reports_hex() {
    let sim = SimBus::new();
    let mut s = session(&sim);

    assert_eq!(run(&mut s, "read reg 5"), vec!["read reg 5", "reg 5 880F"]);
}

#[test]
fn test_register_commands_echo_tokens_verbatim() {
    let sim = SimBus::new();
    let mut s = session(&sim);
    sim.chip().set_reg(reg::VOLUME, 0x8804);

    assert_eq!(run(&mut s, "read reg 05"), vec!["read reg 05", "reg 05 8804"]);
    assert_eq!(
        run(&mut s, "write reg 04 02560"),
        vec!["write reg 04 02560", "reg 04 0A00"]
    );
    assert_eq!(
        run(&mut s, "update reg 005 0015 007"),
        vec!["update reg 005 0015 007", "reg 005 8807"]
    );
}

#[test]
fn test_write_register_reports_readback() {
    let sim = SimBus::new();
    let mut s = session(&sim);

    assert_eq!(
        run(&mut s, "write reg 4 2560"),
        vec!["write reg 4 2560", "reg 4 0A00"]
    );
    assert_eq!(sim.chip().reg(reg::GPIO), 0x0A00);
}

#[test]
fn test_update_register_masks() {
    let sim = SimBus::new();
    let mut s = session(&sim);
    sim.chip().set_reg(reg::VOLUME, 0x800F);

    assert_eq!(
        run(&mut s, "update reg 5 15 7"),
        vec!["update reg 5 15 7", "reg 5 8007"]
    );
}

#[test]
fn test_register_command_on_failed_bus() {
    let sim = SimBus::new();
    let mut s = session(&sim);
    sim.chip().bus_fault = true;

    assert_eq!(run(&mut s, "read reg 2"), vec!["read reg 2", "?"]);
}

// ============================================================================
// Tuning Command Tests
// ============================================================================

#[test]
fn test_frequency_command() {
    let sim = SimBus::new();
    let mut s = session(&sim);

    assert_eq!(run(&mut s, "frequency 82.5"), vec!["frequency 82.5"]);
    assert_eq!(sim.chip().current_channel(), channel(82_500));
    assert_eq!(s.station_name(), "NHK FM TOKYO");
}

#[test]
fn test_frequency_out_of_band() {
    let sim = SimBus::new();
    let mut s = session(&sim);

    assert_eq!(run(&mut s, "frequency 150"), vec![UNKNOWN_RESPONSE]);
}

#[test]
fn test_seek_command() {
    let sim = SimBus::new();
    let mut s = session(&sim);
    sim.chip().stations = vec![channel(81_300)];

    assert_eq!(run(&mut s, "seek up"), vec!["frequency 81.3"]);
    assert_eq!(s.station_name(), "J-WAVE");
}

#[test]
fn test_failed_seek_answers_unknown() {
    let sim = SimBus::new();
    let mut s = session(&sim);

    assert_eq!(run(&mut s, "seek down"), vec![UNKNOWN_RESPONSE]);
}

#[test]
fn test_seek_timeout_answers_unknown() {
    let sim = SimBus::new();
    let mut s = session(&sim);
    sim.chip().seek_stuck = true;

    assert_eq!(run(&mut s, "seek up"), vec![UNKNOWN_RESPONSE]);
}

// ============================================================================
// Audio Command Tests
// ============================================================================

#[test]
fn test_switches_are_silent() {
    let sim = SimBus::new();
    let mut s = session(&sim);

    assert!(run(&mut s, "mute on").is_empty());
    assert!(run(&mut s, "mono on").is_empty());
    assert!(run(&mut s, "bass on").is_empty());

    let config = sim.chip().reg(reg::CONFIG);
    assert_eq!(config & reg::config::DMUTE, 0);
    assert_ne!(config & reg::config::MONO, 0);
    assert_ne!(config & reg::config::BASS, 0);
}

#[test]
fn test_volume_up_clamps_at_max() {
    let sim = SimBus::new();
    let mut s = session(&sim);

    assert_eq!(run(&mut s, "volume 15"), vec!["volume 15"]);
    assert_eq!(run(&mut s, "volume up"), vec!["volume 15"]);
}

#[test]
fn test_volume_down_clamps_at_zero() {
    let sim = SimBus::new();
    let mut s = session(&sim);

    assert_eq!(run(&mut s, "volume 1"), vec!["volume 1"]);
    assert_eq!(run(&mut s, "volume down"), vec!["volume 0"]);
    assert_eq!(run(&mut s, "volume down"), vec!["volume 0"]);
}

#[test]
fn test_absolute_volume_is_masked() {
    let sim = SimBus::new();
    let mut s = session(&sim);

    assert_eq!(run(&mut s, "volume 20"), vec!["volume 20"]);
    assert_eq!(sim.chip().reg(reg::VOLUME) & 0x000F, 4);
    assert_eq!(s.volume().level(), 4);
}

#[test]
fn test_negative_volume_wraps_to_max() {
    let sim = SimBus::new();
    let mut s = session(&sim);
    s.set_volume(3).unwrap();

    assert_eq!(run(&mut s, "volume -1"), vec!["volume -1"]);
    assert_eq!(sim.chip().reg(reg::VOLUME) & 0x000F, 15);
}

// ============================================================================
// Status and Error Tests
// ============================================================================

#[test]
fn test_status_line_format() {
    let sim = SimBus::new();
    let mut s = session(&sim);
    run(&mut s, "frequency 82.5");
    run(&mut s, "volume 9");
    run(&mut s, "bass on");
    {
        let mut chip = sim.chip();
        chip.rssi = 30;
        chip.stereo = true;
    }

    assert_eq!(
        run(&mut s, "status"),
        vec!["status 82.5 stereo 30 9 unmute bass out_stereo"]
    );
}

#[test]
fn test_status_after_mute_and_mono() {
    let sim = SimBus::new();
    let mut s = session(&sim);
    run(&mut s, "frequency 76");
    run(&mut s, "volume 0");
    run(&mut s, "mute on");
    run(&mut s, "mono on");

    assert_eq!(
        run(&mut s, "status"),
        vec!["status 76.0 mono 0 0 mute nobass out_mono"]
    );
}

#[test]
fn test_unknown_command() {
    let sim = SimBus::new();
    let mut s = session(&sim);
    sim.chip().writes.clear();

    assert_eq!(run(&mut s, "bogus"), vec![UNKNOWN_RESPONSE]);
    assert!(sim.chip().writes.is_empty());
}

#[test]
fn test_format_line_truncates() {
    let long = "x".repeat(100);
    let line = protocol::format_line(format_args!("{long}"));
    assert_eq!(line.len(), fm_tuner_firmware::config::RESPONSE_LINE_LEN);
}
