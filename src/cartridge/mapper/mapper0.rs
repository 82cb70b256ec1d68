//! Mapper 0 (NROM): no bank switching, 16/32KB PRG, 8KB CHR.

use crate::cartridge::mapper::{Mirroring, mapper::Mapper};

/// NROM mapper: fixed PRG and CHR, 16KB PRG mirrored into $C000–$FFFF.
pub struct Mapper0 {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_ram: bool,
    mirroring: Mirroring,
}

impl Mapper0 {
    pub fn new(prg_rom: Vec<u8>, chr: Vec<u8>, chr_ram: bool, mirroring: Mirroring) -> Self {
        Self {
            prg_rom,
            chr,
            chr_ram,
            mirroring,
        }
    }
}

impl Mapper for Mapper0 {
    fn cpu_read(&self, addr: u16) -> u8 {
        match addr {
            // Modulo covers both the 16KB mirror and the full 32KB layout.
            0x8000..=0xFFFF => self.prg_rom[(addr as usize - 0x8000) % self.prg_rom.len()],
            _ => 0,
        }
    }

    fn cpu_write(&mut self, _addr: u16, _data: u8) {}

    fn ppu_read(&self, addr: u16) -> u8 {
        self.chr[(addr as usize & 0x1FFF) % self.chr.len()]
    }

    fn ppu_write(&mut self, addr: u16, data: u8) {
        if self.chr_ram {
            let len = self.chr.len();
            self.chr[(addr as usize & 0x1FFF) % len] = data;
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}
