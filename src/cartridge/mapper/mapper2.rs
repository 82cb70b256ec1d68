//! Mapper 2 (UxROM): switchable 16KB at $8000, last 16KB fixed at $C000, 8KB CHR RAM.

use crate::cartridge::mapper::{Mirroring, banked_index, mapper::Mapper};

const CHR_RAM_LEN: usize = 8 * 1024;

pub struct Mapper2 {
    prg_rom: Vec<u8>,
    chr_ram: Vec<u8>,
    mirroring: Mirroring,
    /// Raw value of the last write to $8000–$FFFF.
    prg_bank: u8,
}

impl Mapper2 {
    /// UxROM boards carry CHR RAM; any CHR ROM in the image only seeds it.
    pub fn new(prg_rom: Vec<u8>, chr: Vec<u8>, mirroring: Mirroring) -> Self {
        let mut chr_ram = vec![0; CHR_RAM_LEN];
        let n = chr.len().min(CHR_RAM_LEN);
        chr_ram[..n].copy_from_slice(&chr[..n]);

        Self {
            prg_rom,
            chr_ram,
            mirroring,
            prg_bank: 0,
        }
    }
}

impl Mapper for Mapper2 {
    fn cpu_read(&self, addr: u16) -> u8 {
        let len = self.prg_rom.len();
        match addr {
            0x8000..=0xBFFF => {
                self.prg_rom[banked_index(self.prg_bank as usize, 0x4000, addr as usize, len)]
            }
            0xC000..=0xFFFF => {
                let last = (len / 0x4000).saturating_sub(1);
                self.prg_rom[banked_index(last, 0x4000, addr as usize, len)]
            }
            _ => 0,
        }
    }

    fn cpu_write(&mut self, addr: u16, data: u8) {
        if addr >= 0x8000 {
            self.prg_bank = data;
        }
    }

    fn ppu_read(&self, addr: u16) -> u8 {
        self.chr_ram[(addr & 0x1FFF) as usize]
    }

    fn ppu_write(&mut self, addr: u16, data: u8) {
        self.chr_ram[(addr & 0x1FFF) as usize] = data;
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}
