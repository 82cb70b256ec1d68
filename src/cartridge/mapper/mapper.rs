//! Mapper trait: PRG/CHR memory access, mirroring, and scanline IRQ.

use crate::cartridge::mapper::Mirroring;

/// Contract every board implements. The CPU sees $4020–$FFFF through `cpu_read`/`cpu_write`;
/// the PPU sees pattern tables $0000–$1FFF through `ppu_read`/`ppu_write`.
pub trait Mapper {
    /// Read PRG ROM/RAM. Unmapped addresses return 0 (open bus).
    fn cpu_read(&self, addr: u16) -> u8;
    /// Write PRG RAM or bank registers. PRG ROM itself is read-only.
    fn cpu_write(&mut self, addr: u16, data: u8);
    /// Read CHR ROM/RAM ($0000–$1FFF).
    fn ppu_read(&self, addr: u16) -> u8;
    /// Write CHR RAM; ignored when the board carries CHR ROM.
    fn ppu_write(&mut self, addr: u16, data: u8);
    /// Current nametable mirroring for the PPU.
    fn mirroring(&self) -> Mirroring;

    /// Clocked once per rendered scanline. Only MMC3 counts scanlines.
    fn scanline_counter(&mut self) {}

    fn irq_pending(&self) -> bool {
        false
    }

    fn acknowledge_irq(&mut self) {}
}
