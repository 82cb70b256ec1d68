//! Triangle channel ($4008, $400A, $400B). See [APU Triangle](https://www.nesdev.org/wiki/APU_Triangle).

use super::envelope::LengthCounter;

/// 32-step waveform: 15 down to 0, then 0 up to 15.
const TRIANGLE_SEQUENCE: [u8; 32] = [
    15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12,
    13, 14, 15,
];

/// Linear counter + length counter gate a 32-step sequencer clocked at the CPU rate.
#[derive(Clone, Copy, Debug, Default)]
pub struct Triangle {
    /// Control flag: halts the length counter and keeps the linear reload latched.
    control: bool,
    linear_load: u8,
    linear_counter: u8,
    linear_reload: bool,
    timer_period: u16,
    timer: u16,
    sequence_pos: u8,
    pub(crate) length: LengthCounter,
}

impl Triangle {
    /// $4008: control flag, linear counter reload value.
    pub fn write_linear(&mut self, data: u8) {
        self.control = data & 0x80 != 0;
        self.length.halt = self.control;
        self.linear_load = data & 0x7F;
    }

    /// $400A: timer low 8 bits.
    pub fn write_timer_lo(&mut self, data: u8) {
        self.timer_period = (self.timer_period & 0x0700) | data as u16;
    }

    /// $400B: length load, timer high 3 bits; sets the linear reload flag.
    pub fn write_timer_hi(&mut self, data: u8) {
        self.timer_period = (self.timer_period & 0x00FF) | ((data & 7) as u16) << 8;
        self.length.load(data);
        self.linear_reload = true;
    }

    pub fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.timer_period;
            if self.length.count() > 0 && self.linear_counter > 0 {
                self.sequence_pos = (self.sequence_pos + 1) & 31;
            }
        } else {
            self.timer -= 1;
        }
    }

    pub fn clock_linear(&mut self) {
        if self.linear_reload {
            self.linear_counter = self.linear_load;
        } else if self.linear_counter > 0 {
            self.linear_counter -= 1;
        }
        if !self.control {
            self.linear_reload = false;
        }
    }

    pub fn linear_counter(&self) -> u8 {
        self.linear_counter
    }

    pub fn output(&self) -> u8 {
        // Periods below 2 are ultrasonic.
        if !self.length.active() || self.linear_counter == 0 || self.timer_period < 2 {
            return 0;
        }
        TRIANGLE_SEQUENCE[self.sequence_pos as usize]
    }
}
