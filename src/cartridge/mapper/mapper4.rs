//! Mapper 4 (MMC3): bank switching, switchable mirroring, PRG RAM, scanline IRQ.
//!
//! [MMC3](https://www.nesdev.org/wiki/MMC3): Bank select at $8000–$9FFE (even), bank data at
//! $8001–$9FFF (odd). R0/R1 = 2 KiB CHR, R2–R5 = 1 KiB CHR, R6/R7 = 8 KiB PRG. Mirroring at
//! $A000–$BFFE (even). IRQ latch $C000, reload $C001, disable $E000, enable $E001. The IRQ counter
//! is clocked once per rendered scanline by the system clock.

use crate::cartridge::mapper::{Mirroring, banked_index, mapper::Mapper};

const PRG_RAM_LEN: usize = 8 * 1024;

/// MMC3 state: bank registers, mirroring, PRG RAM, IRQ counter/latch/enable.
pub struct Mapper4 {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_ram: bool,
    prg_ram: Vec<u8>,
    /// Bank select ($8000): bits 0–2 = register index, bit 6 = PRG mode, bit 7 = CHR A12 invert.
    bank_select: u8,
    /// R0–R5 CHR, R6–R7 PRG.
    regs: [u8; 8],
    mirroring: Mirroring,
    irq_latch: u8,
    irq_counter: u8,
    irq_reload: bool,
    irq_enabled: bool,
    irq_pending: bool,
}

impl Mapper4 {
    pub fn new(prg_rom: Vec<u8>, chr: Vec<u8>, chr_ram: bool, mirroring: Mirroring) -> Self {
        Self {
            prg_rom,
            chr,
            chr_ram,
            prg_ram: vec![0; PRG_RAM_LEN],
            bank_select: 0,
            regs: [0; 8],
            mirroring,
            irq_latch: 0,
            irq_counter: 0,
            irq_reload: false,
            irq_enabled: false,
            irq_pending: false,
        }
    }

    pub fn irq_counter(&self) -> u8 {
        self.irq_counter
    }

    fn prg_mode(&self) -> bool {
        self.bank_select & 0x40 != 0
    }

    fn chr_inverted(&self) -> bool {
        self.bank_select & 0x80 != 0
    }

    fn prg_index(&self, addr: u16) -> usize {
        let len = self.prg_rom.len();
        let banks = (len / 0x2000).max(1);
        let last = banks - 1;
        let second_last = banks.saturating_sub(2);
        let r6 = self.regs[6] as usize;
        let r7 = self.regs[7] as usize;

        // PRG mode swaps which of $8000/$C000 holds R6 and which holds the second-last bank.
        let bank = match ((addr - 0x8000) >> 13, self.prg_mode()) {
            (0, false) => r6,
            (0, true) => second_last,
            (1, _) => r7,
            (2, false) => second_last,
            (2, true) => r6,
            _ => last,
        };
        banked_index(bank, 0x2000, addr as usize, len)
    }

    fn chr_index(&self, addr: u16) -> usize {
        let mut slot = (addr >> 10) & 0x07;
        if self.chr_inverted() {
            slot ^= 0x04;
        }

        // 1 KiB slot → bank register; R0/R1 cover two slots each as a 2 KiB pair.
        let bank = match slot {
            0 => self.regs[0] & 0xFE,
            1 => self.regs[0] | 0x01,
            2 => self.regs[1] & 0xFE,
            3 => self.regs[1] | 0x01,
            n => self.regs[n as usize - 2],
        };
        banked_index(bank as usize, 0x400, addr as usize, self.chr.len())
    }
}

impl Mapper for Mapper4 {
    fn cpu_read(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr - 0x6000) as usize],
            0x8000..=0xFFFF => self.prg_rom[self.prg_index(addr)],
            _ => 0,
        }
    }

    fn cpu_write(&mut self, addr: u16, data: u8) {
        let even = addr & 1 == 0;
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr - 0x6000) as usize] = data,
            0x8000..=0x9FFF => {
                if even {
                    self.bank_select = data;
                } else {
                    self.regs[(self.bank_select & 0x07) as usize] = data;
                }
            }
            0xA000..=0xBFFF => {
                // Odd: PRG RAM protect, left unenforced.
                if even {
                    self.mirroring = if data & 1 == 0 {
                        Mirroring::Vertical
                    } else {
                        Mirroring::Horizontal
                    };
                }
            }
            0xC000..=0xDFFF => {
                if even {
                    self.irq_latch = data;
                } else {
                    self.irq_reload = true;
                }
            }
            0xE000..=0xFFFF => {
                if even {
                    self.irq_enabled = false;
                    self.irq_pending = false;
                } else {
                    self.irq_enabled = true;
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

    fn scanline_counter(&mut self) {
        if self.irq_counter == 0 || self.irq_reload {
            self.irq_counter = self.irq_latch;
            self.irq_reload = false;
        } else {
            self.irq_counter -= 1;
        }
        if self.irq_counter == 0 && self.irq_enabled {
            self.irq_pending = true;
        }
    }

    fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    fn acknowledge_irq(&mut self) {
        self.irq_pending = false;
    }
}
