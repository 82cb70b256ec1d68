//! PPU register file: PPUCTRL/PPUMASK/PPUSTATUS plus the internal "loopy" scroll registers.
//!
//! See [PPU scrolling](https://www.nesdev.org/wiki/PPU_scrolling). V and T are 15-bit:
//! `yyy NN YYYYY XXXXX` (fine Y, nametable select, coarse Y, coarse X).

pub const CTRL_NAMETABLE: u8 = 0x03;
pub const CTRL_INCREMENT_32: u8 = 0x04;
pub const CTRL_SPRITE_TABLE: u8 = 0x08;
pub const CTRL_BG_TABLE: u8 = 0x10;
pub const CTRL_TALL_SPRITES: u8 = 0x20;
pub const CTRL_NMI: u8 = 0x80;

pub const MASK_GRAYSCALE: u8 = 0x01;
pub const MASK_LEFT_BG: u8 = 0x02;
pub const MASK_LEFT_SPRITES: u8 = 0x04;
pub const MASK_SHOW_BG: u8 = 0x08;
pub const MASK_SHOW_SPRITES: u8 = 0x10;

pub const STATUS_OVERFLOW: u8 = 0x20;
pub const STATUS_SPRITE0_HIT: u8 = 0x40;
pub const STATUS_VBLANK: u8 = 0x80;

/// Mask keeping V/T inside 15 bits.
pub const VRAM_ADDR_MASK: u16 = 0x7FFF;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PpuRegisters {
    pub ctrl: u8,
    pub mask: u8,
    pub status: u8,
    /// Current VRAM address.
    pub v: u16,
    /// Temporary VRAM address (top-left of the screen).
    pub t: u16,
    pub fine_x: u8,
    /// First/second write toggle shared by $2005 and $2006.
    pub w: bool,
    /// $2007 read buffer.
    pub data_buffer: u8,
    pub oam_addr: u8,
}

impl PpuRegisters {
    pub fn vram_increment(&self) -> u16 {
        if self.ctrl & CTRL_INCREMENT_32 != 0 { 32 } else { 1 }
    }

    pub fn sprite_pattern_addr(&self) -> u16 {
        if self.ctrl & CTRL_SPRITE_TABLE != 0 { 0x1000 } else { 0x0000 }
    }

    pub fn bg_pattern_addr(&self) -> u16 {
        if self.ctrl & CTRL_BG_TABLE != 0 { 0x1000 } else { 0x0000 }
    }

    pub fn tall_sprites(&self) -> bool {
        self.ctrl & CTRL_TALL_SPRITES != 0
    }

    pub fn nmi_enabled(&self) -> bool {
        self.ctrl & CTRL_NMI != 0
    }

    pub fn grayscale(&self) -> bool {
        self.mask & MASK_GRAYSCALE != 0
    }

    pub fn show_left_bg(&self) -> bool {
        self.mask & MASK_LEFT_BG != 0
    }

    pub fn show_left_sprites(&self) -> bool {
        self.mask & MASK_LEFT_SPRITES != 0
    }

    pub fn show_bg(&self) -> bool {
        self.mask & MASK_SHOW_BG != 0
    }

    pub fn show_sprites(&self) -> bool {
        self.mask & MASK_SHOW_SPRITES != 0
    }

    pub fn rendering_enabled(&self) -> bool {
        self.mask & (MASK_SHOW_BG | MASK_SHOW_SPRITES) != 0
    }

    pub fn set_status(&mut self, flag: u8, on: bool) {
        if on {
            self.status |= flag;
        } else {
            self.status &= !flag;
        }
    }

    /// Coarse X increment with horizontal nametable wrap.
    pub fn increment_x(&mut self) {
        if self.v & 0x001F == 31 {
            self.v &= !0x001F;
            self.v ^= 0x0400;
        } else {
            self.v += 1;
        }
    }

    /// Fine Y increment; coarse Y wraps at row 29 (toggling the vertical nametable) and at 31
    /// (attribute rows, no toggle).
    pub fn increment_y(&mut self) {
        if self.v & 0x7000 != 0x7000 {
            self.v += 0x1000;
            return;
        }

        self.v &= !0x7000;
        let mut y = (self.v & 0x03E0) >> 5;
        if y == 29 {
            y = 0;
            self.v ^= 0x0800;
        } else if y == 31 {
            y = 0;
        } else {
            y += 1;
        }
        self.v = (self.v & !0x03E0) | (y << 5);
    }

    /// Cycle 257: coarse X and horizontal nametable bit from T.
    pub fn copy_horizontal(&mut self) {
        self.v = (self.v & !0x041F) | (self.t & 0x041F);
    }

    /// Pre-render 280–304: fine Y, coarse Y and vertical nametable bit from T.
    pub fn copy_vertical(&mut self) {
        self.v = (self.v & !0x7BE0) | (self.t & 0x7BE0);
    }
}
