//! Preset Station Table
//!
//! Ordered (frequency, name) presets supplied by the application. Used to
//! name the tuned station by exact frequency match and to step through
//! presets with the select button.

use heapless::{String, Vec};

use crate::config::{MAX_STATIONS, STATION_NAME_LEN};
use crate::types::Frequency;

/// A preset station
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StationEntry {
    /// Broadcast frequency
    pub frequency: Frequency,
    /// Display name
    pub name: String<STATION_NAME_LEN>,
}

impl StationEntry {
    /// Create an entry; names longer than the limit are truncated
    #[must_use]
    pub fn new(frequency: Frequency, name: &str) -> Self {
        let mut stored = String::new();
        for c in name.chars() {
            if stored.push(c).is_err() {
                break;
            }
        }
        Self {
            frequency,
            name: stored,
        }
    }
}

/// Station table is full
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableFull;

/// Ordered preset list, read-only after loading
#[derive(Clone, Debug, Default)]
pub struct StationTable {
    entries: Vec<StationEntry, MAX_STATIONS>,
}

impl StationTable {
    /// Create an empty table
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build a table from `(kHz, name)` pairs, ignoring overflow
    #[must_use]
    pub fn from_khz(presets: &[(u32, &str)]) -> Self {
        let mut table = Self::new();
        for &(khz, name) in presets {
            if table.push(StationEntry::new(Frequency::from_khz(khz), name)).is_err() {
                break;
            }
        }
        table
    }

    /// Append a preset
    pub fn push(&mut self, entry: StationEntry) -> Result<(), TableFull> {
        self.entries.push(entry).map_err(|_| TableFull)
    }

    /// Number of presets
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table has no presets
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Preset at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&StationEntry> {
        self.entries.get(index)
    }

    /// First preset whose frequency equals `frequency`
    #[must_use]
    pub fn lookup(&self, frequency: Frequency) -> Option<(usize, &StationEntry)> {
        self.entries
            .iter()
            .enumerate()
            .find(|(_, e)| e.frequency == frequency)
    }

    /// Index after `current`, wrapping to the first preset
    #[must_use]
    pub fn next_index(&self, current: Option<usize>) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        match current {
            Some(i) if i + 1 < self.entries.len() => Some(i + 1),
            _ => Some(0),
        }
    }

    /// Iterate over presets in order
    pub fn iter(&self) -> impl Iterator<Item = &StationEntry> {
        self.entries.iter()
    }

    /// Kanto-region (Japan) broadcast presets
    #[must_use]
    pub fn japan_kanto() -> Self {
        Self::from_khz(&[
            (76_400, "RADIO BERRY"),
            (77_100, "HOUSOU DAIGAKU"),
            (79_500, "NACK5"),
            (78_000, "bayfm"),
            (80_000, "TOKYO FM"),
            (80_300, "NHK FM UTUNOMIYA"),
            (80_700, "NHK FM CHIBA"),
            (81_300, "J-WAVE"),
            (81_600, "NHK FM GUNMA"),
            (81_900, "NHK FM KANAGAWA"),
            (82_500, "NHK FM TOKYO"),
            (83_000, "FM-Fuji"),
            (83_200, "NHK FM IBARAKI"),
            (84_700, "Fm yokohama"),
            (85_100, "NHK FM SAITAMA"),
            (85_600, "NHK FM YAMANASHI"),
            (86_300, "FM GUNMA"),
            (89_700, "Inter FM"),
            (90_500, "TBS RADIO"),
            (90_900, "YAMANASHI HOUSOU"),
            (91_600, "BUNKA HOUSOU"),
            (92_400, "R-F-RADIO NIPPON"),
            (93_000, "NIPPON HOUSOU"),
            (94_100, "TOCHIGI HOUSOU"),
            (94_600, "LuckyFM IBARAKI"),
        ])
    }
}
