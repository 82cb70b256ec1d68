//! 6502 CPU emulation for the NES.
//!
//! All 151 documented opcodes, table-decoded; undocumented opcodes run as 2-cycle NOPs.
//! Bus trait used for memory and I/O (PPU, APU, cartridge, controllers).

pub mod cpu;
pub mod flags;
pub mod opcodes;
pub mod registers;
