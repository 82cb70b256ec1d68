//! Memory bus and address decoding for the NES.
//!
//! Maps CPU addresses to RAM, PPU registers, APU registers, controllers, and the cartridge, and
//! advances the PPU and APU alongside the CPU. See [CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map).

use crate::{
    apu::apu::Apu,
    cartridge::cartridge::Cartridge,
    controller::Controller,
    ppu::ppu::{OAM_LEN, Ppu},
};

/// Trait for memory-mapped I/O and bus access used by the CPU.
pub trait Bus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);
}

pub const RAM_SIZE: usize = 0x800;

/// CPU cycles taken by an OAM DMA transfer.
pub const OAM_DMA_CYCLES: u32 = 513;

/// What the PPU/APU/mapper raised while the bus advanced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickEvents {
    pub nmi: bool,
    pub irq: bool,
    pub frame_complete: bool,
}

/// Main NES bus: RAM, PPU, APU, cartridge, and both controller ports.
pub struct NesBus {
    ram: [u8; RAM_SIZE],
    pub(crate) ppu: Ppu,
    pub(crate) apu: Apu,
    pub(crate) cart: Cartridge,
    pub(crate) controllers: [Controller; 2],
    /// Cycles owed to an OAM DMA, collected by the system clock after each instruction.
    dma_stall: u32,
}

impl NesBus {
    /// Create a new bus with the given cartridge.
    pub fn new(cart: Cartridge) -> Self {
        Self {
            ram: [0; RAM_SIZE],
            ppu: Ppu::new(),
            apu: Apu::new(),
            cart,
            controllers: [Controller::new(); 2],
            dma_stall: 0,
        }
    }

    /// Reset PPU and APU timing; RAM and cartridge contents are kept.
    pub fn reset(&mut self) {
        self.ppu.reset();
        self.apu.reset();
        self.dma_stall = 0;
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn apu(&self) -> &Apu {
        &self.apu
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.cart
    }

    pub fn controller_mut(&mut self, port: usize) -> &mut Controller {
        &mut self.controllers[port & 1]
    }

    pub fn take_dma_stall(&mut self) -> u32 {
        std::mem::take(&mut self.dma_stall)
    }

    /// Side-effect-free read for tracing: RAM and cartridge only, 0 elsewhere.
    pub fn peek(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],
            0x4020..=0xFFFF => self.cart.cpu_read(addr),
            _ => 0,
        }
    }

    /// Advance `cycles` CPU cycles: three PPU dots and one APU cycle each.
    pub fn tick(&mut self, cycles: u32) -> TickEvents {
        let mut events = TickEvents::default();
        for _ in 0..cycles {
            for _ in 0..3 {
                let signals = self.ppu.clock(&mut self.cart);
                events.nmi |= signals.nmi;
                events.frame_complete |= signals.frame_complete;
                if signals.scanline {
                    self.cart.scanline_counter();
                }
            }

            let Self { apu, cart, .. } = self;
            apu.clock(|addr| cart.cpu_read(addr));
        }

        events.irq = self.apu.take_irq();
        if self.cart.irq_pending() {
            self.cart.acknowledge_irq();
            events.irq = true;
        }
        events
    }

    fn oam_dma(&mut self, page: u8) {
        let base = (page as u16) << 8;
        let mut data = [0u8; OAM_LEN];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = self.read(base | i as u16);
        }
        self.ppu.write_oam_dma(&data);
        self.dma_stall += OAM_DMA_CYCLES;
    }
}

impl Bus for NesBus {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            // Internal RAM (mirrored 4x in 0x0000-0x1FFF)
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],
            // PPU registers $2000-$3FFF (mirrored every 8 bytes)
            0x2000..=0x3FFF => self.ppu.read_register(addr, &self.cart),
            0x4015 => self.apu.read_status(),
            0x4016 => self.controllers[0].read(),
            0x4017 => self.controllers[1].read(),
            // Write-only APU registers and test mode: open bus
            0x4000..=0x401F => 0,
            0x4020..=0xFFFF => self.cart.cpu_read(addr),
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize] = data,
            0x2000..=0x3FFF => self.ppu.write_register(addr, data, &mut self.cart),
            0x4014 => self.oam_dma(data),
            0x4016 => {
                for pad in &mut self.controllers {
                    pad.write(data);
                }
            }
            // $4017 writes go to the APU frame counter.
            0x4000..=0x4013 | 0x4015 | 0x4017 => self.apu.write_register(addr, data),
            0x4018..=0x401F => {}
            0x4020..=0xFFFF => self.cart.cpu_write(addr, data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{apu::apu::SequencerMode, controller::Buttons};

    /// NROM-128 image with CHR RAM; PRG filled with 0xEA.
    fn bus() -> NesBus {
        let mut rom = vec![b'N', b'E', b'S', 0x1A, 1, 0, 0, 0];
        rom.resize(16, 0);
        rom.extend(std::iter::repeat_n(0xEA, 0x4000));
        let cart = Cartridge::from_bytes(&rom).expect("valid image");
        NesBus::new(cart)
    }

    #[test]
    fn ram_mirrors_every_2k() {
        let mut bus = bus();
        bus.write(0x0012, 0x34);
        assert_eq!(bus.read(0x0812), 0x34);
        assert_eq!(bus.read(0x1012), 0x34);
        assert_eq!(bus.read(0x1812), 0x34);
        bus.write(0x1FFF, 0x56);
        assert_eq!(bus.read(0x07FF), 0x56);
    }

    #[test]
    fn ppu_registers_mirror_every_8() {
        let mut bus = bus();
        // $3FFE mirrors PPUMASK.
        bus.write(0x3FFE, 0x1E);
        assert_eq!(bus.ppu().mask(), 0x1E);
        bus.write(0x2008, 0x80);
        assert_eq!(bus.ppu().ctrl(), 0x80);
    }

    #[test]
    fn cartridge_space_and_open_bus() {
        let mut bus = bus();
        assert_eq!(bus.read(0x8000), 0xEA);
        assert_eq!(bus.read(0xFFFF), 0xEA);
        assert_eq!(bus.read(0x4000), 0);
        assert_eq!(bus.read(0x4018), 0);
        assert_eq!(bus.peek(0xC000), 0xEA);
        assert_eq!(bus.peek(0x2002), 0);
    }

    #[test]
    fn oam_dma_copies_page_and_stalls() {
        let mut bus = bus();
        for i in 0..256u16 {
            bus.write(0x0200 + i, i as u8);
        }
        bus.write(0x2003, 0x10);
        bus.write(0x4014, 0x02);

        let oam = bus.ppu().oam();
        assert_eq!(oam[0x10], 0x00);
        assert_eq!(oam[0xFF], 0xEF);
        assert_eq!(oam[0x00], 0xF0);
        assert_eq!(bus.take_dma_stall(), OAM_DMA_CYCLES);
        assert_eq!(bus.take_dma_stall(), 0);
    }

    #[test]
    fn controller_ports() {
        let mut bus = bus();
        bus.controller_mut(0).buttons = Buttons::A;
        bus.controller_mut(1).buttons = Buttons::B;
        bus.write(0x4016, 1);
        bus.write(0x4016, 0);

        assert_eq!(bus.read(0x4016), 1);
        assert_eq!(bus.read(0x4016), 0);
        assert_eq!(bus.read(0x4017), 0);
        assert_eq!(bus.read(0x4017), 1);
    }

    #[test]
    fn frame_counter_write_reaches_apu() {
        let mut bus = bus();
        bus.write(0x4017, 0x80);
        assert_eq!(bus.apu().mode(), SequencerMode::FiveStep);
    }

    #[test]
    fn apu_status_read() {
        let mut bus = bus();
        bus.write(0x4015, 0x01);
        bus.write(0x4003, 0x08);
        assert_eq!(bus.read(0x4015) & 0x01, 0x01);
    }

    #[test]
    fn tick_runs_three_dots_per_cycle() {
        let mut bus = bus();
        let before = bus.ppu().cycle();
        bus.tick(5);
        assert_eq!(bus.ppu().cycle(), before + 15);
    }

    #[test]
    fn tick_reports_frame_irq() {
        let mut bus = bus();
        let events = bus.tick(14915);
        assert!(events.irq);
        assert!(!bus.tick(1).irq);
    }
}
