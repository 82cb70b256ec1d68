//! NES cartridge loading and mapper support.
//!
//! - **cartridge**: Loads iNES (.nes) images, holds the header and the mapper.
//! - **header**: iNES header validation.
//! - **mapper**: NROM (0), MMC1 (1), UxROM (2), CNROM (3), MMC3 (4); PRG/CHR bank switching,
//!   nametable mirroring, and the MMC3 scanline IRQ.

pub mod cartridge;
pub mod header;
pub mod mapper;

#[cfg(test)]
mod tests;
