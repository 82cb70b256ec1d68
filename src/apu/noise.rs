//! Noise channel ($400C, $400E, $400F). See [APU Noise](https://www.nesdev.org/wiki/APU_Noise).

use super::envelope::{Envelope, LengthCounter};

/// NTSC timer periods indexed by the low nibble of $400E.
const NOISE_PERIOD_TABLE: [u16; 16] = [
    4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
];

/// 15-bit LFSR noise with the same envelope unit as the pulses.
#[derive(Clone, Copy, Debug)]
pub struct Noise {
    /// Short mode: feedback from bit 6 instead of bit 1.
    mode: bool,
    timer_period: u16,
    timer: u16,
    shift: u16,
    pub(crate) envelope: Envelope,
    pub(crate) length: LengthCounter,
}

impl Default for Noise {
    fn default() -> Self {
        Self {
            mode: false,
            timer_period: NOISE_PERIOD_TABLE[0],
            timer: 0,
            shift: 1,
            envelope: Envelope::default(),
            length: LengthCounter::default(),
        }
    }
}

impl Noise {
    /// $400C: length halt / envelope loop, constant volume, volume.
    pub fn write_control(&mut self, data: u8) {
        self.length.halt = data & 0x20 != 0;
        self.envelope.write(data);
    }

    /// $400E: mode (bit 7), period index (bits 0–3).
    pub fn write_period(&mut self, data: u8) {
        self.mode = data & 0x80 != 0;
        self.timer_period = NOISE_PERIOD_TABLE[(data & 0x0F) as usize];
    }

    /// $400F: length load; restarts the envelope.
    pub fn write_length(&mut self, data: u8) {
        self.length.load(data);
        self.envelope.restart();
    }

    pub fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.timer_period;
            let tap = if self.mode { 6 } else { 1 };
            let feedback = (self.shift & 1) ^ ((self.shift >> tap) & 1);
            self.shift = (self.shift >> 1) | (feedback << 14);
        } else {
            self.timer -= 1;
        }
    }

    pub fn shift_register(&self) -> u16 {
        self.shift
    }

    pub fn output(&self) -> u8 {
        if !self.length.active() || self.shift & 1 != 0 {
            return 0;
        }
        self.envelope.output()
    }
}
