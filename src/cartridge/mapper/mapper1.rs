//! Mapper 1 (MMC1): bank switching via 5-bit shift register.
//!
//! [MMC1](https://www.nesdev.org/wiki/MMC1): writes to $8000–$9FFF (control), $A000–$BFFF (CHR0),
//! $C000–$DFFF (CHR1), $E000–$FFFF (PRG bank). Any write with bit 7 set resets the shift register.
//! Otherwise, bit 0 is shifted in (LSB first); after 5 writes, the value is latched to the register
//! selected by address bits 13–14. Control bits 0–1 = mirroring; bits 2–3 = PRG mode; bit 4 = CHR
//! mode. 8 KiB PRG RAM at $6000–$7FFF.

use crate::cartridge::mapper::{Mirroring, banked_index, mapper::Mapper};

const PRG_RAM_LEN: usize = 8 * 1024;

/// MMC1 state: 5-bit shift register, control byte, CHR and PRG bank selects.
pub struct Mapper1 {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_ram: bool,
    prg_ram: Vec<u8>,
    shift_reg: u8,
    shift_count: u8,
    control: u8,
    chr_bank0: u8,
    chr_bank1: u8,
    prg_bank: u8,
    mirroring: Mirroring,
}

impl Mapper1 {
    /// Control powers up in PRG mode 3 ($8000 switchable, $C000 fixed to the last bank); the
    /// header's mirroring holds until the game first writes the control register.
    pub fn new(prg_rom: Vec<u8>, chr: Vec<u8>, chr_ram: bool, mirroring: Mirroring) -> Self {
        Self {
            prg_rom,
            chr,
            chr_ram,
            prg_ram: vec![0; PRG_RAM_LEN],
            shift_reg: 0,
            shift_count: 0,
            control: 0x0C,
            chr_bank0: 0,
            chr_bank1: 0,
            prg_bank: 0,
            mirroring,
        }
    }

    /// Internal registers in address order: control, CHR bank 0, CHR bank 1, PRG bank.
    pub fn registers(&self) -> [u8; 4] {
        [self.control, self.chr_bank0, self.chr_bank1, self.prg_bank]
    }

    /// Bits shifted in so far (0–4).
    pub fn pending_writes(&self) -> u8 {
        self.shift_count
    }

    /// PRG bank mode from control bits 2–3: 0/1 = 32 KiB; 2 = $8000 fixed first, $C000
    /// switchable; 3 = $8000 switchable, $C000 fixed last.
    fn prg_bank_mode(&self) -> u8 {
        (self.control >> 2) & 0b11
    }

    fn chr_4k_mode(&self) -> bool {
        self.control & 0x10 != 0
    }

    fn prg_index(&self, addr: u16) -> usize {
        let len = self.prg_rom.len();
        let bank = (self.prg_bank & 0x0F) as usize;
        let offset = (addr - 0x8000) as usize;

        match self.prg_bank_mode() {
            0 | 1 => banked_index(bank >> 1, 0x8000, offset, len),
            2 => {
                if addr < 0xC000 {
                    banked_index(0, 0x4000, offset, len)
                } else {
                    banked_index(bank, 0x4000, offset, len)
                }
            }
            _ => {
                if addr < 0xC000 {
                    banked_index(bank, 0x4000, offset, len)
                } else {
                    let last = (len / 0x4000).saturating_sub(1);
                    banked_index(last, 0x4000, offset, len)
                }
            }
        }
    }

    fn chr_index(&self, addr: u16) -> usize {
        let len = self.chr.len();
        let offset = (addr & 0x1FFF) as usize;

        if self.chr_4k_mode() {
            let bank = if offset < 0x1000 {
                self.chr_bank0
            } else {
                self.chr_bank1
            };
            banked_index(bank as usize, 0x1000, offset, len)
        } else {
            // 8 KiB mode ignores the low bit of CHR bank 0.
            banked_index((self.chr_bank0 >> 1) as usize, 0x2000, offset, len)
        }
    }

    fn latch(&mut self, addr: u16, value: u8) {
        match (addr >> 13) & 0b11 {
            0 => {
                self.control = value;
                self.mirroring = match value & 0b11 {
                    0 => Mirroring::OneScreenLower,
                    1 => Mirroring::OneScreenUpper,
                    2 => Mirroring::Vertical,
                    _ => Mirroring::Horizontal,
                };
            }
            1 => self.chr_bank0 = value,
            2 => self.chr_bank1 = value,
            _ => self.prg_bank = value,
        }
    }
}

impl Mapper for Mapper1 {
    fn cpu_read(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr - 0x6000) as usize],
            0x8000..=0xFFFF => self.prg_rom[self.prg_index(addr)],
            _ => 0,
        }
    }

    fn cpu_write(&mut self, addr: u16, data: u8) {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr - 0x6000) as usize] = data,
            0x8000..=0xFFFF => {
                if data & 0x80 != 0 {
                    self.shift_reg = 0;
                    self.shift_count = 0;
                    self.control |= 0x0C;
                    return;
                }

                self.shift_reg >>= 1;
                self.shift_reg |= (data & 1) << 4;
                self.shift_count += 1;

                if self.shift_count == 5 {
                    let value = self.shift_reg & 0x1F;
                    self.latch(addr, value);
                    self.shift_reg = 0;
                    self.shift_count = 0;
                }
            }
            _ => {}
        }
    }

    fn ppu_read(&self, addr: u16) -> u8 {
        self.chr[self.chr_index(addr)]
    }

    fn ppu_write(&mut self, addr: u16, data: u8) {
        if self.chr_ram {
            let i = self.chr_index(addr);
            self.chr[i] = data;
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}
