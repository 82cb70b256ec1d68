//! System clock: runs the CPU one instruction at a time and keeps the PPU and APU in lockstep.
//!
//! Each [`Nes::step`] executes one instruction (or interrupt entry), adds any OAM DMA stall, then
//! advances the PPU three dots and the APU one cycle per CPU cycle. Interrupts raised while doing so
//! are latched into the CPU and serviced before the next instruction.

use std::path::Path;

use tracing::info;

use crate::{
    bus::NesBus,
    cartridge::{cartridge::Cartridge, header::RomHeader},
    controller::Buttons,
    cpu::{cpu::Cpu, registers::CpuRegisters},
    error::RomError,
};

/// NTSC CPU cycles per video frame (rounded).
pub const CYCLES_PER_FRAME: u64 = 29_780;

type FrameCallback = Box<dyn FnMut(&[u32])>;
type AudioCallback = Box<dyn FnMut(&[f32])>;

/// A loaded console: CPU with its bus (RAM, PPU, APU, cartridge, pads) plus delivery callbacks.
pub struct Nes {
    cpu: Cpu<NesBus>,
    total_cycles: u64,
    running: bool,
    on_frame: Option<FrameCallback>,
    on_audio: Option<AudioCallback>,
}

impl Nes {
    /// Wire up a console around an already validated cartridge and reset it.
    pub fn new(cart: Cartridge) -> Self {
        let mut nes = Self {
            cpu: Cpu::new(NesBus::new(cart)),
            total_cycles: 0,
            running: true,
            on_frame: None,
            on_audio: None,
        };
        nes.reset();
        nes
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, RomError> {
        Cartridge::from_bytes(data).map(Self::new)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RomError> {
        Cartridge::load(path).map(Self::new)
    }

    /// Reset CPU, PPU and APU registers and timing. RAM, VRAM and cartridge state are kept.
    pub fn reset(&mut self) {
        self.cpu.bus_mut().reset();
        self.cpu.reset();
        self.total_cycles = 0;
        self.running = true;
        info!(
            pc = format_args!("${:04X}", self.cpu.registers().pc),
            mapper = self.mapper_number(),
            "reset"
        );
    }

    /// Run one instruction and the PPU/APU cycles it took. Returns the CPU cycles consumed,
    /// including any OAM DMA stall; 0 once stopped.
    pub fn step(&mut self) -> u32 {
        if !self.running {
            return 0;
        }

        let mut cycles = self.cpu.step();
        cycles += self.cpu.bus_mut().take_dma_stall();

        let events = self.cpu.bus_mut().tick(cycles);
        if events.nmi {
            self.cpu.trigger_nmi();
        }
        if events.irq {
            self.cpu.trigger_irq();
        }

        if events.frame_complete {
            if let Some(on_frame) = self.on_frame.as_mut() {
                on_frame(self.cpu.bus().ppu().framebuffer());
            }
        }
        if let Some(batch) = self.cpu.bus_mut().apu.take_samples() {
            if let Some(on_audio) = self.on_audio.as_mut() {
                on_audio(batch);
            }
        }

        self.total_cycles += cycles as u64;
        cycles
    }

    /// Run at least [`CYCLES_PER_FRAME`] CPU cycles.
    pub fn run_frame(&mut self) {
        let target = self.total_cycles + CYCLES_PER_FRAME;
        while self.running && self.total_cycles < target {
            self.step();
        }
    }

    /// Run until the PPU finishes the current frame.
    pub fn run_until_frame(&mut self) {
        let start = self.frame_count();
        while self.running && self.frame_count() == start {
            self.step();
        }
    }

    /// Stop stepping; `step` becomes a no-op until the next reset.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Called with the finished 256×240 framebuffer (0xRRGGBB) once per frame.
    pub fn on_frame<F: FnMut(&[u32]) + 'static>(&mut self, callback: F) {
        self.on_frame = Some(Box::new(callback));
    }

    /// Called with each full batch of mixed mono samples.
    pub fn on_audio<F: FnMut(&[f32]) + 'static>(&mut self, callback: F) {
        self.on_audio = Some(Box::new(callback));
    }

    /// Replace the full button state of pad 0 or 1.
    pub fn set_buttons(&mut self, pad: usize, buttons: Buttons) {
        self.cpu.bus_mut().controller_mut(pad).buttons = buttons;
    }

    pub fn set_button(&mut self, pad: usize, button: Buttons, pressed: bool) {
        self.cpu.bus_mut().controller_mut(pad).set(button, pressed);
    }

    pub fn framebuffer(&self) -> &[u32] {
        self.cpu.bus().ppu().framebuffer()
    }

    pub fn bus(&self) -> &NesBus {
        self.cpu.bus()
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    pub fn cpu_registers(&self) -> CpuRegisters {
        self.cpu.registers()
    }

    pub fn ppu_ctrl(&self) -> u8 {
        self.bus().ppu().ctrl()
    }

    pub fn ppu_mask(&self) -> u8 {
        self.bus().ppu().mask()
    }

    pub fn ppu_scanline(&self) -> u16 {
        self.bus().ppu().scanline()
    }

    pub fn ppu_cycle(&self) -> u16 {
        self.bus().ppu().cycle()
    }

    pub fn frame_count(&self) -> u64 {
        self.bus().ppu().frame_count()
    }

    pub fn mapper_number(&self) -> u8 {
        self.bus().cartridge().mapper_number()
    }

    pub fn header(&self) -> &RomHeader {
        self.bus().cartridge().header()
    }
}
