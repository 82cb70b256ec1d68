//! NES PPU (Picture Processing Unit) implementation.
//!
//! Cycle-stepped: each [`Ppu::clock`] advances one dot of the 341×262 frame. Background pixels
//! come from 16-bit pattern/attribute shift registers fed by the 8-dot fetch pipeline; sprites are
//! evaluated at dot 257 for the next scanline. Registers: $2000–$2007 (mirrored).

use crate::{
    cartridge::{cartridge::Cartridge, mapper::Mirroring},
    ppu::{
        palette::{palette_index, resolve},
        registers::{
            CTRL_NAMETABLE, PpuRegisters, STATUS_OVERFLOW, STATUS_SPRITE0_HIT, STATUS_VBLANK,
            VRAM_ADDR_MASK,
        },
    },
};

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 240;
pub const DOTS_PER_SCANLINE: u16 = 341;
pub const SCANLINES_PER_FRAME: u16 = 262;

/// OAM (Object Attribute Memory): 64 sprites × 4 bytes. Each entry: Y, tile, attr, X.
pub const OAM_LEN: usize = 256;

const PRE_RENDER: u16 = 261;
const VBLANK_LINE: u16 = 241;
/// Dot at which the mapper sees the A12 rise of the sprite fetches.
const SCANLINE_IRQ_DOT: u16 = 260;

/// What happened during one dot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PpuSignals {
    /// VBlank began with NMI enabled.
    pub nmi: bool,
    /// The frame counter advanced; the framebuffer holds a complete picture.
    pub frame_complete: bool,
    /// A rendered scanline reached the point where MMC3 clocks its IRQ counter.
    pub scanline: bool,
}

/// One of the eight sprites fetched for the current scanline.
#[derive(Clone, Copy, Debug, Default)]
struct SpriteUnit {
    lo: u8,
    hi: u8,
    attr: u8,
    x: u8,
}

/// PPU state: timing, VRAM, palettes, OAM, shifters, and framebuffer.
pub struct Ppu {
    pub(crate) regs: PpuRegisters,
    pub(crate) scanline: u16,
    pub(crate) cycle: u16,
    frame_count: u64,
    odd_frame: bool,

    vram: [u8; 0x800],
    /// Palette RAM $3F00-$3F1F (32 bytes, with NES mirroring).
    palette: [u8; 32],
    pub(crate) oam: [u8; OAM_LEN],

    nt_byte: u8,
    at_bits: u8,
    bg_lo: u8,
    bg_hi: u8,
    bg_shift_lo: u16,
    bg_shift_hi: u16,
    at_shift_lo: u16,
    at_shift_hi: u16,

    sprites: [SpriteUnit; 8],
    pub(crate) sprite_count: usize,
    sprite0_on_line: bool,

    /// 256×240 framebuffer (0xRRGGBB per pixel). Row-major, left-to-right, top-to-bottom.
    framebuffer: Vec<u32>,
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

impl Ppu {
    pub fn new() -> Self {
        let mut ppu = Self {
            regs: PpuRegisters::default(),
            scanline: PRE_RENDER,
            cycle: 0,
            frame_count: 0,
            odd_frame: false,
            vram: [0; 0x800],
            palette: [0; 32],
            oam: [0; OAM_LEN],
            nt_byte: 0,
            at_bits: 0,
            bg_lo: 0,
            bg_hi: 0,
            bg_shift_lo: 0,
            bg_shift_hi: 0,
            at_shift_lo: 0,
            at_shift_hi: 0,
            sprites: [SpriteUnit::default(); 8],
            sprite_count: 0,
            sprite0_on_line: false,
            framebuffer: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT],
        };
        ppu.reset();
        ppu
    }

    /// Registers and timing back to power-on; starts on the pre-render scanline.
    /// VRAM, palette RAM, OAM and the framebuffer are kept.
    pub fn reset(&mut self) {
        self.regs = PpuRegisters::default();
        self.scanline = PRE_RENDER;
        self.cycle = 0;
        self.frame_count = 0;
        self.odd_frame = false;
        self.sprites = [SpriteUnit::default(); 8];
        self.sprite_count = 0;
        self.sprite0_on_line = false;
    }

    pub fn framebuffer(&self) -> &[u32] {
        &self.framebuffer
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    pub fn cycle(&self) -> u16 {
        self.cycle
    }

    pub fn ctrl(&self) -> u8 {
        self.regs.ctrl
    }

    pub fn mask(&self) -> u8 {
        self.regs.mask
    }

    pub fn status(&self) -> u8 {
        self.regs.status
    }

    pub fn oam(&self) -> &[u8; OAM_LEN] {
        &self.oam
    }

    /// Advance one dot.
    pub fn clock(&mut self, cart: &mut Cartridge) -> PpuSignals {
        let mut signals = PpuSignals::default();
        let rendering = self.regs.rendering_enabled();
        let render_line = self.scanline < 240 || self.scanline == PRE_RENDER;

        if self.scanline == PRE_RENDER {
            if self.cycle == 1 {
                self.regs.set_status(STATUS_VBLANK, false);
                self.regs.set_status(STATUS_SPRITE0_HIT, false);
                self.regs.set_status(STATUS_OVERFLOW, false);
            }
            if (280..=304).contains(&self.cycle) && rendering {
                self.regs.copy_vertical();
            }
        }

        if render_line {
            if (1..=256).contains(&self.cycle) || (321..=336).contains(&self.cycle) {
                self.shift_background();

                match self.cycle % 8 {
                    1 => {
                        self.load_background();
                        self.fetch_nametable(cart);
                    }
                    3 => self.fetch_attribute(cart),
                    5 => self.bg_lo = self.read(cart, self.pattern_row_addr()),
                    7 => self.bg_hi = self.read(cart, self.pattern_row_addr() + 8),
                    0 => {
                        if rendering {
                            self.regs.increment_x();
                        }
                    }
                    _ => {}
                }
            }

            if self.cycle == 256 && rendering {
                self.regs.increment_y();
            }

            if self.cycle == 257 {
                if rendering {
                    self.regs.copy_horizontal();
                    self.evaluate_sprites(cart);
                } else {
                    self.sprite_count = 0;
                    self.sprite0_on_line = false;
                }
            }

            if self.cycle == SCANLINE_IRQ_DOT && rendering {
                signals.scanline = true;
            }
        }

        if self.scanline < 240 && (1..=256).contains(&self.cycle) {
            self.render_pixel();
        }

        if self.scanline == VBLANK_LINE && self.cycle == 1 {
            self.regs.set_status(STATUS_VBLANK, true);
            if self.regs.nmi_enabled() {
                signals.nmi = true;
            }
        }

        self.cycle += 1;
        if self.cycle >= DOTS_PER_SCANLINE {
            self.cycle = 0;
            self.scanline += 1;
            if self.scanline >= SCANLINES_PER_FRAME {
                self.scanline = 0;
                self.frame_count += 1;
                self.odd_frame = !self.odd_frame;
                signals.frame_complete = true;
            }
        }

        // Odd frames are one dot shorter while rendering.
        if self.scanline == 0 && self.cycle == 0 && self.odd_frame && self.regs.rendering_enabled()
        {
            self.cycle = 1;
        }

        signals
    }

    fn shift_background(&mut self) {
        if self.regs.show_bg() {
            self.bg_shift_lo <<= 1;
            self.bg_shift_hi <<= 1;
            self.at_shift_lo <<= 1;
            self.at_shift_hi <<= 1;
        }
    }

    fn load_background(&mut self) {
        self.bg_shift_lo = (self.bg_shift_lo & 0xFF00) | self.bg_lo as u16;
        self.bg_shift_hi = (self.bg_shift_hi & 0xFF00) | self.bg_hi as u16;
        // Attribute bits fill a whole byte so they stay aligned with the pattern bits.
        self.at_shift_lo = (self.at_shift_lo & 0xFF00) | spread(self.at_bits & 0x01);
        self.at_shift_hi = (self.at_shift_hi & 0xFF00) | spread(self.at_bits & 0x02);
    }

    fn fetch_nametable(&mut self, cart: &Cartridge) {
        let addr = 0x2000 | (self.regs.v & 0x0FFF);
        self.nt_byte = self.read(cart, addr);
    }

    fn fetch_attribute(&mut self, cart: &Cartridge) {
        let v = self.regs.v;
        let addr = 0x23C0 | (v & 0x0C00) | ((v >> 4) & 0x38) | ((v >> 2) & 0x07);
        let shift = ((v >> 4) & 0x04) | (v & 0x02);
        self.at_bits = (self.read(cart, addr) >> shift) & 0x03;
    }

    /// Low-plane address of the current tile row; the high plane is 8 bytes later.
    fn pattern_row_addr(&self) -> u16 {
        self.regs.bg_pattern_addr() + self.nt_byte as u16 * 16 + ((self.regs.v >> 12) & 0x07)
    }

    /// Select up to eight sprites covering the next scanline and fetch their pattern rows.
    /// A ninth match sets the overflow flag.
    fn evaluate_sprites(&mut self, cart: &Cartridge) {
        self.sprite_count = 0;
        self.sprite0_on_line = false;

        let height: i32 = if self.regs.tall_sprites() { 16 } else { 8 };
        let next = (self.scanline as i32 + 1) % SCANLINES_PER_FRAME as i32;

        for i in 0..64 {
            let entry = &self.oam[i * 4..i * 4 + 4];
            let (y, tile, attr, x) = (entry[0], entry[1], entry[2], entry[3]);

            let mut row = next - y as i32;
            if !(0..height).contains(&row) {
                continue;
            }
            if self.sprite_count == 8 {
                self.regs.set_status(STATUS_OVERFLOW, true);
                break;
            }
            if i == 0 {
                self.sprite0_on_line = true;
            }

            if attr & 0x80 != 0 {
                row = height - 1 - row;
            }

            let addr = if self.regs.tall_sprites() {
                let table = (tile as u16 & 0x01) * 0x1000;
                let mut index = tile as u16 & 0xFE;
                if row >= 8 {
                    index += 1;
                    row -= 8;
                }
                table + index * 16 + row as u16
            } else {
                self.regs.sprite_pattern_addr() + tile as u16 * 16 + row as u16
            };

            let mut lo = self.read(cart, addr);
            let mut hi = self.read(cart, addr + 8);
            if attr & 0x40 != 0 {
                lo = lo.reverse_bits();
                hi = hi.reverse_bits();
            }

            self.sprites[self.sprite_count] = SpriteUnit { lo, hi, attr, x };
            self.sprite_count += 1;
        }
    }

    fn render_pixel(&mut self) {
        let x = (self.cycle - 1) as usize;
        let y = self.scanline as usize;

        let mut bg_pixel = 0u8;
        let mut bg_palette = 0u8;
        if self.regs.show_bg() && (self.regs.show_left_bg() || x >= 8) {
            let mask = 0x8000u16 >> self.regs.fine_x;
            bg_pixel = plane_bits(self.bg_shift_lo, self.bg_shift_hi, mask);
            if bg_pixel != 0 {
                bg_palette = plane_bits(self.at_shift_lo, self.at_shift_hi, mask);
            }
        }

        let mut sprite_pixel = 0u8;
        let mut sprite_palette = 0u8;
        let mut behind_bg = false;
        let mut sprite_zero = false;
        // Counters and shifters run on every visible dot; masking only hides the output.
        let show_sprites = self.regs.show_sprites() && (self.regs.show_left_sprites() || x >= 8);
        for (i, sprite) in self.sprites[..self.sprite_count].iter_mut().enumerate() {
            if sprite.x != 0 {
                sprite.x -= 1;
                continue;
            }

            let pixel = (sprite.lo >> 7) | ((sprite.hi >> 7) << 1);
            sprite.lo <<= 1;
            sprite.hi <<= 1;

            // Lowest OAM index wins among opaque sprites.
            if show_sprites && pixel != 0 && sprite_pixel == 0 {
                sprite_pixel = pixel;
                sprite_palette = (sprite.attr & 0x03) + 4;
                behind_bg = sprite.attr & 0x20 != 0;
                sprite_zero = i == 0 && self.sprite0_on_line;
            }
        }

        if sprite_zero && bg_pixel != 0 && sprite_pixel != 0 && x != 255 {
            self.regs.set_status(STATUS_SPRITE0_HIT, true);
        }

        let (pixel, palette) = match (bg_pixel, sprite_pixel) {
            (0, 0) => (0, 0),
            (0, s) => (s, sprite_palette),
            (b, 0) => (b, bg_palette),
            (b, s) => {
                if behind_bg {
                    (b, bg_palette)
                } else {
                    (s, sprite_palette)
                }
            }
        };

        let entry = self.palette[palette_index(((palette << 2) | pixel) as u16)];
        self.framebuffer[y * SCREEN_WIDTH + x] = resolve(entry, self.regs.grayscale());
    }

    /// CPU read of $2000–$2007 (`addr` is taken modulo 8).
    pub fn read_register(&mut self, addr: u16, cart: &Cartridge) -> u8 {
        match addr & 0x07 {
            // PPUSTATUS: low bits are stale bus contents.
            2 => {
                let result = (self.regs.status & 0xE0) | (self.regs.data_buffer & 0x1F);
                self.regs.set_status(STATUS_VBLANK, false);
                self.regs.w = false;
                result
            }
            4 => self.oam[self.regs.oam_addr as usize],
            7 => {
                let v = self.regs.v & 0x3FFF;
                let result = if v >= 0x3F00 {
                    // Palette reads bypass the buffer, which takes the nametable byte underneath.
                    self.regs.data_buffer = self.read(cart, v - 0x1000);
                    self.palette[palette_index(v)]
                } else {
                    let buffered = self.regs.data_buffer;
                    self.regs.data_buffer = self.read(cart, v);
                    buffered
                };
                self.advance_vram_addr();
                result
            }
            _ => 0,
        }
    }

    /// CPU write of $2000–$2007 (`addr` is taken modulo 8).
    pub fn write_register(&mut self, addr: u16, data: u8, cart: &mut Cartridge) {
        match addr & 0x07 {
            0 => {
                self.regs.ctrl = data;
                self.regs.t = (self.regs.t & 0xF3FF) | (((data & CTRL_NAMETABLE) as u16) << 10);
            }
            1 => self.regs.mask = data,
            3 => self.regs.oam_addr = data,
            4 => {
                self.oam[self.regs.oam_addr as usize] = data;
                self.regs.oam_addr = self.regs.oam_addr.wrapping_add(1);
            }
            5 => {
                if !self.regs.w {
                    self.regs.t = (self.regs.t & 0xFFE0) | (data as u16 >> 3);
                    self.regs.fine_x = data & 0x07;
                } else {
                    self.regs.t = (self.regs.t & 0x8C1F)
                        | ((data as u16 & 0x07) << 12)
                        | ((data as u16 & 0xF8) << 2);
                }
                self.regs.w = !self.regs.w;
            }
            6 => {
                if !self.regs.w {
                    self.regs.t = (self.regs.t & 0x00FF) | ((data as u16 & 0x3F) << 8);
                } else {
                    self.regs.t = (self.regs.t & 0xFF00) | data as u16;
                    self.regs.v = self.regs.t;
                }
                self.regs.w = !self.regs.w;
            }
            7 => {
                self.write(cart, self.regs.v, data);
                self.advance_vram_addr();
            }
            _ => {}
        }
    }

    /// OAM DMA ($4014): 256 bytes land at OAMADDR onward, wrapping within OAM.
    pub fn write_oam_dma(&mut self, page: &[u8; 256]) {
        let start = self.regs.oam_addr as usize;
        for (i, &byte) in page.iter().enumerate() {
            self.oam[(start + i) % OAM_LEN] = byte;
        }
    }

    fn advance_vram_addr(&mut self) {
        self.regs.v = self.regs.v.wrapping_add(self.regs.vram_increment()) & VRAM_ADDR_MASK;
    }

    /// PPU bus read: pattern tables via the mapper, nametables, palette.
    fn read(&self, cart: &Cartridge, addr: u16) -> u8 {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => cart.ppu_read(addr),
            0x2000..=0x3EFF => self.vram[mirror_nametable(addr, cart.mirroring())],
            _ => self.palette[palette_index(addr)],
        }
    }

    fn write(&mut self, cart: &mut Cartridge, addr: u16, data: u8) {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => cart.ppu_write(addr, data),
            0x2000..=0x3EFF => self.vram[mirror_nametable(addr, cart.mirroring())] = data,
            _ => self.palette[palette_index(addr)] = data,
        }
    }
}

/// Two-bit value from the bit selected by `mask` in a low and a high plane.
fn plane_bits(lo: u16, hi: u16, mask: u16) -> u8 {
    ((lo & mask != 0) as u8) | (((hi & mask != 0) as u8) << 1)
}

/// A full low byte when `bit` is set.
fn spread(bit: u8) -> u16 {
    if bit != 0 { 0x00FF } else { 0x0000 }
}

/// Map a nametable address ($2000–$3EFF) to an index into the 2 KiB VRAM.
///
/// Four-screen boards would need 4 KiB; without cartridge VRAM the upper two tables fold onto
/// the lower two.
pub fn mirror_nametable(addr: u16, mirroring: Mirroring) -> usize {
    let addr = addr & 0x0FFF;
    let index = match mirroring {
        Mirroring::Horizontal => (addr & 0x03FF) | ((addr & 0x0800) >> 1),
        Mirroring::Vertical => addr & 0x07FF,
        Mirroring::OneScreenLower => addr & 0x03FF,
        Mirroring::OneScreenUpper => (addr & 0x03FF) | 0x0400,
        Mirroring::FourScreen => addr,
    };
    (index & 0x07FF) as usize
}
