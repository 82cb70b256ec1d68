//! Mapper 3 (CNROM): fixed PRG (16KB mirrored), switchable 8KB CHR bank.

use crate::cartridge::mapper::{Mirroring, banked_index, mapper::Mapper};

pub struct Mapper3 {
    prg_rom: Vec<u8>,
    chr_rom: Vec<u8>,
    mirroring: Mirroring,
    chr_bank: u8,
}

impl Mapper3 {
    pub fn new(prg_rom: Vec<u8>, chr_rom: Vec<u8>, mirroring: Mirroring) -> Self {
        Self {
            prg_rom,
            chr_rom,
            mirroring,
            chr_bank: 0,
        }
    }
}

impl Mapper for Mapper3 {
    fn cpu_read(&self, addr: u16) -> u8 {
        match addr {
            0x8000..=0xFFFF => self.prg_rom[(addr as usize - 0x8000) % self.prg_rom.len()],
            _ => 0,
        }
    }

    fn cpu_write(&mut self, addr: u16, data: u8) {
        if addr >= 0x8000 {
            self.chr_bank = data;
        }
    }

    fn ppu_read(&self, addr: u16) -> u8 {
        let len = self.chr_rom.len();
        self.chr_rom[banked_index(self.chr_bank as usize, 0x2000, addr as usize, len)]
    }

    // CHR is ROM on CNROM boards.
    fn ppu_write(&mut self, _addr: u16, _data: u8) {}

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}
