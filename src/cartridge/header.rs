//! iNES header parsing.
//!
//! Layout ([iNES](https://www.nesdev.org/wiki/INES)): bytes 0–3 = "NES\x1A"; byte 4 = PRG ROM size
//! in 16 KiB units; byte 5 = CHR ROM size in 8 KiB units (0 → 8 KiB CHR RAM); byte 6 = flags
//! (mirroring, battery, trainer, four-screen, mapper low nibble); byte 7 = mapper high nibble.

use crate::error::RomError;

pub const HEADER_LEN: usize = 16;
pub const TRAINER_LEN: usize = 512;
pub const PRG_UNIT: usize = 16 * 1024;
pub const CHR_UNIT: usize = 8 * 1024;

const MAGIC: [u8; 4] = *b"NES\x1A";

/// Decoded iNES header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RomHeader {
    /// PRG ROM size in 16 KiB units.
    pub prg_units: u8,
    /// CHR ROM size in 8 KiB units; 0 means the board carries CHR RAM.
    pub chr_units: u8,
    pub mapper: u8,
    pub vertical_mirroring: bool,
    pub battery: bool,
    pub trainer: bool,
    pub four_screen: bool,
}

impl RomHeader {
    pub fn parse(data: &[u8]) -> Result<Self, RomError> {
        if data.len() < HEADER_LEN {
            return Err(RomError::TooShort(data.len()));
        }
        if data[0..4] != MAGIC {
            return Err(RomError::BadMagic);
        }

        let flags6 = data[6];
        let flags7 = data[7];

        Ok(Self {
            prg_units: data[4],
            chr_units: data[5],
            mapper: (flags6 >> 4) | (flags7 & 0xF0),
            vertical_mirroring: flags6 & 0x01 != 0,
            battery: flags6 & 0x02 != 0,
            trainer: flags6 & 0x04 != 0,
            four_screen: flags6 & 0x08 != 0,
        })
    }

    pub fn prg_len(&self) -> usize {
        self.prg_units as usize * PRG_UNIT
    }

    pub fn chr_len(&self) -> usize {
        self.chr_units as usize * CHR_UNIT
    }

    /// Offset of the first PRG byte (after the header and optional trainer).
    pub fn prg_offset(&self) -> usize {
        if self.trainer {
            HEADER_LEN + TRAINER_LEN
        } else {
            HEADER_LEN
        }
    }

    /// Total image length the header promises.
    pub fn expected_len(&self) -> usize {
        self.prg_offset() + self.prg_len() + self.chr_len()
    }
}
