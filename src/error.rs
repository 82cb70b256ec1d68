//! Errors raised while loading a cartridge image.
//!
//! Stepping the machine never fails: unmapped reads return open bus and unmapped writes are
//! dropped, as on the real console. Only [iNES](https://www.nesdev.org/wiki/INES) parsing and
//! mapper selection can reject input.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RomError {
    #[error("failed to read ROM file: {0}")]
    Io(#[from] io::Error),

    #[error("ROM image is {0} bytes, shorter than the 16-byte iNES header")]
    TooShort(usize),

    #[error("missing \"NES\\x1A\" magic in header")]
    BadMagic,

    #[error("header declares no PRG ROM")]
    NoPrgRom,

    /// Header declares more PRG/CHR/trainer data than the image carries.
    #[error("ROM image truncated: header declares {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u8),
}
