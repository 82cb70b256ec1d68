//! NES controller input handling.
//!
//! Implements the standard NES controller shift register protocol:
//! write $01 to $4016 to latch current state; then read $4016/$4017 repeatedly
//! to get one bit per read (A, B, Select, Start, Up, Down, Left, Right).

use bitflags::bitflags;

bitflags! {
    /// Standard pad buttons in shift-out order.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Buttons: u8 {
        const A = 1 << 0;
        const B = 1 << 1;
        const SELECT = 1 << 2;
        const START = 1 << 3;
        const UP = 1 << 4;
        const DOWN = 1 << 5;
        const LEFT = 1 << 6;
        const RIGHT = 1 << 7;
    }
}

/// One controller port.
#[derive(Clone, Copy, Debug, Default)]
pub struct Controller {
    /// Live button state, set by the frontend.
    pub buttons: Buttons,
    /// Shift register: latched from `buttons` on strobe; shifted out LSB-first on read.
    shift: u8,
    strobe: bool,
}

impl Controller {
    /// Create a new controller with no buttons pressed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one button bit. While strobed, always returns A. After all eight buttons the
    /// register has filled with 1s.
    pub fn read(&mut self) -> u8 {
        if self.strobe {
            return self.buttons.contains(Buttons::A) as u8;
        }
        let bit = self.shift & 1;
        self.shift = (self.shift >> 1) | 0x80;
        bit
    }

    /// $4016 write. Bit 0 high keeps reloading the shift register from the live state.
    pub fn write(&mut self, data: u8) {
        self.strobe = data & 1 != 0;
        if self.strobe {
            self.shift = self.buttons.bits();
        }
    }

    pub fn set(&mut self, button: Buttons, pressed: bool) {
        self.buttons.set(button, pressed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latch(pad: &mut Controller) {
        pad.write(1);
        pad.write(0);
    }

    #[test]
    fn reads_buttons_lsb_first() {
        let mut pad = Controller::new();
        pad.buttons = Buttons::A | Buttons::START | Buttons::RIGHT;
        latch(&mut pad);
        let bits: Vec<u8> = (0..8).map(|_| pad.read()).collect();
        assert_eq!(bits, vec![1, 0, 0, 1, 0, 0, 0, 1]);
    }

    #[test]
    fn ninth_read_returns_one() {
        let mut pad = Controller::new();
        latch(&mut pad);
        for _ in 0..8 {
            assert_eq!(pad.read(), 0);
        }
        assert_eq!(pad.read(), 1);
        assert_eq!(pad.read(), 1);
    }

    #[test]
    fn strobe_high_repeats_a() {
        let mut pad = Controller::new();
        pad.set(Buttons::A, true);
        pad.write(1);
        assert_eq!(pad.read(), 1);
        assert_eq!(pad.read(), 1);
        pad.set(Buttons::A, false);
        assert_eq!(pad.read(), 0);
    }

    #[test]
    fn state_changes_after_latch_are_not_seen() {
        let mut pad = Controller::new();
        pad.set(Buttons::B, true);
        latch(&mut pad);
        pad.set(Buttons::B, false);
        assert_eq!(pad.read(), 0);
        assert_eq!(pad.read(), 1);
    }
}
