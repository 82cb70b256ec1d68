//! 6502 register file.

use crate::cpu::flags::{FLAG_BREAK, FLAG_INTERRUPT_DISABLE, FLAG_NEGATIVE, FLAG_UNUSED, FLAG_ZERO};

/// A, X, Y, PC, SP and the packed status byte (P).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CpuRegisters {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub pc: u16,
    /// Offset into the stack page $0100–$01FF.
    pub sp: u8,
    pub status: u8,
}

impl Default for CpuRegisters {
    /// Register state right after RESET, before PC is loaded from the vector.
    fn default() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            pc: 0,
            sp: 0xFD,
            status: FLAG_INTERRUPT_DISABLE | FLAG_UNUSED,
        }
    }
}

impl CpuRegisters {
    pub fn flag(&self, flag: u8) -> bool {
        self.status & flag != 0
    }

    pub fn set_flag(&mut self, flag: u8, on: bool) {
        if on {
            self.status |= flag;
        } else {
            self.status &= !flag;
        }
    }

    /// Z and N from a result byte.
    pub fn set_zn(&mut self, value: u8) {
        self.set_flag(FLAG_ZERO, value == 0);
        self.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
    }

    /// Load P from a pulled byte. B does not exist as a latch; bit 5 always reads 1.
    pub fn set_status(&mut self, value: u8) {
        self.status = (value & !FLAG_BREAK) | FLAG_UNUSED;
    }
}
