//! NES cartridge loading from iNES format (.nes files).
//!
//! Implements the [iNES](https://www.nesdev.org/wiki/INES) format: 16-byte header, optional 512-byte
//! trainer, then PRG ROM, then CHR ROM. CHR may be ROM or RAM depending on the header.
//! [Mapper](https://www.nesdev.org/wiki/Mapper) implements CPU PRG ($4020–$FFFF) and PPU CHR
//! ($0000–$1FFF) address decoding and bank switching.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::cartridge::header::{CHR_UNIT, RomHeader};
use crate::cartridge::mapper::{MapperVariant, Mirroring};
use crate::error::RomError;

/// Cartridge: header metadata plus the mapper that owns PRG/CHR storage.
/// CPU reads PRG via bus at $4020–$FFFF; PPU reads CHR at $0000–$1FFF (pattern tables).
pub struct Cartridge {
    header: RomHeader,
    mapper: MapperVariant,
}

impl Cartridge {
    /// Load cartridge from an iNES file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RomError> {
        let data = fs::read(path.as_ref())?;
        Self::from_bytes(&data)
    }

    /// Validate the header, slice PRG/CHR, and build the mapper. Nothing is kept on failure.
    pub fn from_bytes(data: &[u8]) -> Result<Self, RomError> {
        let header = RomHeader::parse(data).inspect_err(|e| warn!("rejected ROM: {e}"))?;
        debug!(?header, "parsed iNES header");

        if header.prg_units == 0 {
            return Err(RomError::NoPrgRom);
        }
        let expected = header.expected_len();
        if data.len() < expected {
            warn!(expected, actual = data.len(), "ROM image truncated");
            return Err(RomError::Truncated {
                expected,
                actual: data.len(),
            });
        }

        let prg_start = header.prg_offset();
        let prg_end = prg_start + header.prg_len();
        let chr_end = prg_end + header.chr_len();

        let prg_rom = data[prg_start..prg_end].to_vec();
        let chr_ram = header.chr_units == 0;
        let chr = if chr_ram {
            vec![0; CHR_UNIT]
        } else {
            data[prg_end..chr_end].to_vec()
        };

        let mapper = MapperVariant::new(&header, prg_rom, chr, chr_ram)
            .inspect_err(|e| warn!("rejected ROM: {e}"))?;

        info!(
            mapper = header.mapper,
            board = mapper.name(),
            prg_kib = header.prg_len() / 1024,
            chr_kib = header.chr_len() / 1024,
            "cartridge loaded"
        );

        Ok(Self { header, mapper })
    }

    pub fn header(&self) -> &RomHeader {
        &self.header
    }

    pub fn mapper_number(&self) -> u8 {
        self.header.mapper
    }

    pub fn mapper(&self) -> &MapperVariant {
        &self.mapper
    }

    /// CPU read, $4020–$FFFF.
    pub fn cpu_read(&self, addr: u16) -> u8 {
        self.mapper.cpu_read(addr)
    }

    /// CPU write: PRG RAM or mapper registers. PRG ROM is R/O.
    pub fn cpu_write(&mut self, addr: u16, data: u8) {
        self.mapper.cpu_write(addr, data);
    }

    /// PPU pattern-table read, $0000–$1FFF.
    pub fn ppu_read(&self, addr: u16) -> u8 {
        self.mapper.ppu_read(addr)
    }

    pub fn ppu_write(&mut self, addr: u16, data: u8) {
        self.mapper.ppu_write(addr, data);
    }

    /// Four-screen boards supply their own nametable wiring and ignore the mapper's setting.
    pub fn mirroring(&self) -> Mirroring {
        if self.header.four_screen {
            Mirroring::FourScreen
        } else {
            self.mapper.mirroring()
        }
    }

    /// Clock the mapper's scanline counter (MMC3); no-op for other boards.
    pub fn scanline_counter(&mut self) {
        self.mapper.scanline_counter();
    }

    pub fn irq_pending(&self) -> bool {
        self.mapper.irq_pending()
    }

    pub fn acknowledge_irq(&mut self) {
        self.mapper.acknowledge_irq();
    }
}
