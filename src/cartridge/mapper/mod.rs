//! NES mappers for PRG/CHR memory mapping.
//!
//! Mapper0 (NROM), Mapper1 (MMC1), Mapper2 (UxROM), Mapper3 (CNROM), Mapper4 (MMC3), and the
//! [`MapperVariant`] enum that the cartridge holds. The variant is chosen once at load time; every
//! access goes through a `match`, so no trait objects sit on the CPU/PPU read path.

pub mod mapper;

pub mod mapper0;
pub mod mapper1;
pub mod mapper2;
pub mod mapper3;
pub mod mapper4;

use crate::cartridge::header::RomHeader;
use crate::error::RomError;

use mapper::Mapper;
use mapper0::Mapper0;
use mapper1::Mapper1;
use mapper2::Mapper2;
use mapper3::Mapper3;
use mapper4::Mapper4;

/// Nametable mirroring mode for PPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    OneScreenLower,
    OneScreenUpper,
    FourScreen,
}

/// Physical offset of `bank` within a region of `len` bytes split into `bank_size` banks.
///
/// Register values are only wrapped here, never at write time: power-of-two bank counts wrap
/// by masking, anything else by modulo.
pub(crate) fn bank_offset(bank: usize, bank_size: usize, len: usize) -> usize {
    let count = (len / bank_size).max(1);
    let bank = if count.is_power_of_two() {
        bank & (count - 1)
    } else {
        bank % count
    };
    bank * bank_size
}

/// Index into a banked region; always in `[0, data.len())`.
pub(crate) fn banked_index(bank: usize, bank_size: usize, offset: usize, len: usize) -> usize {
    (bank_offset(bank, bank_size, len) + (offset & (bank_size - 1))) % len
}

/// One variant per supported iNES mapper number.
pub enum MapperVariant {
    Nrom(Mapper0),
    Mmc1(Mapper1),
    Uxrom(Mapper2),
    Cnrom(Mapper3),
    Mmc3(Mapper4),
}

macro_rules! dispatch {
    ($self:expr, $m:ident => $body:expr) => {
        match $self {
            MapperVariant::Nrom($m) => $body,
            MapperVariant::Mmc1($m) => $body,
            MapperVariant::Uxrom($m) => $body,
            MapperVariant::Cnrom($m) => $body,
            MapperVariant::Mmc3($m) => $body,
        }
    };
}

impl MapperVariant {
    /// Build the board for `header.mapper`. `chr` is CHR ROM, or zeroed CHR RAM when
    /// `chr_ram` is set.
    pub fn new(
        header: &RomHeader,
        prg_rom: Vec<u8>,
        chr: Vec<u8>,
        chr_ram: bool,
    ) -> Result<Self, RomError> {
        let mirroring = if header.vertical_mirroring {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        let mapper = match header.mapper {
            0 => Self::Nrom(Mapper0::new(prg_rom, chr, chr_ram, mirroring)),
            1 => Self::Mmc1(Mapper1::new(prg_rom, chr, chr_ram, mirroring)),
            2 => Self::Uxrom(Mapper2::new(prg_rom, chr, mirroring)),
            3 => Self::Cnrom(Mapper3::new(prg_rom, chr, mirroring)),
            4 => Self::Mmc3(Mapper4::new(prg_rom, chr, chr_ram, mirroring)),
            id => return Err(RomError::UnsupportedMapper(id)),
        };
        Ok(mapper)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Nrom(_) => "NROM",
            Self::Mmc1(_) => "MMC1",
            Self::Uxrom(_) => "UxROM",
            Self::Cnrom(_) => "CNROM",
            Self::Mmc3(_) => "MMC3",
        }
    }

    pub fn cpu_read(&self, addr: u16) -> u8 {
        dispatch!(self, m => m.cpu_read(addr))
    }

    pub fn cpu_write(&mut self, addr: u16, data: u8) {
        dispatch!(self, m => m.cpu_write(addr, data))
    }

    pub fn ppu_read(&self, addr: u16) -> u8 {
        dispatch!(self, m => m.ppu_read(addr))
    }

    pub fn ppu_write(&mut self, addr: u16, data: u8) {
        dispatch!(self, m => m.ppu_write(addr, data))
    }

    pub fn mirroring(&self) -> Mirroring {
        dispatch!(self, m => m.mirroring())
    }

    pub fn scanline_counter(&mut self) {
        dispatch!(self, m => m.scanline_counter())
    }

    pub fn irq_pending(&self) -> bool {
        dispatch!(self, m => m.irq_pending())
    }

    pub fn acknowledge_irq(&mut self) {
        dispatch!(self, m => m.acknowledge_irq())
    }
}
