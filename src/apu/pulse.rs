//! Pulse channels ($4000–$4003 = pulse 1, $4004–$4007 = pulse 2). See
//! [APU Pulse](https://www.nesdev.org/wiki/APU_Pulse) and [APU Sweep](https://www.nesdev.org/wiki/APU_Sweep).

use super::envelope::{Envelope, LengthCounter};

/// Duty waveforms, 8 steps each: 12.5%, 25%, 50%, 25% negated.
const DUTY_TABLE: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 0, 0, 0, 0, 0],
    [0, 1, 1, 1, 1, 0, 0, 0],
    [1, 0, 0, 1, 1, 1, 1, 1],
];

/// Square wave with duty, envelope, sweep and length counter. Timer clocked every other CPU cycle.
#[derive(Clone, Copy, Debug)]
pub struct Pulse {
    /// Pulse 1 negates with one's complement, pulse 2 with two's complement.
    ones_complement: bool,
    duty: u8,
    sequence_pos: u8,
    timer_period: u16,
    timer: u16,
    sweep_enabled: bool,
    sweep_period: u8,
    sweep_negate: bool,
    sweep_shift: u8,
    sweep_reload: bool,
    sweep_counter: u8,
    pub(crate) envelope: Envelope,
    pub(crate) length: LengthCounter,
}

impl Pulse {
    pub fn new(channel_one: bool) -> Self {
        Self {
            ones_complement: channel_one,
            duty: 0,
            sequence_pos: 0,
            timer_period: 0,
            timer: 0,
            sweep_enabled: false,
            sweep_period: 0,
            sweep_negate: false,
            sweep_shift: 0,
            sweep_reload: false,
            sweep_counter: 0,
            envelope: Envelope::default(),
            length: LengthCounter::default(),
        }
    }

    /// $4000/$4004: duty, length halt / envelope loop, constant volume, volume.
    pub fn write_control(&mut self, data: u8) {
        self.duty = (data >> 6) & 3;
        self.length.halt = data & 0x20 != 0;
        self.envelope.write(data);
    }

    /// $4001/$4005: sweep enable, period, negate, shift.
    pub fn write_sweep(&mut self, data: u8) {
        self.sweep_enabled = data & 0x80 != 0;
        self.sweep_period = (data >> 4) & 7;
        self.sweep_negate = data & 0x08 != 0;
        self.sweep_shift = data & 7;
        self.sweep_reload = true;
    }

    /// $4002/$4006: timer low 8 bits.
    pub fn write_timer_lo(&mut self, data: u8) {
        self.timer_period = (self.timer_period & 0x0700) | data as u16;
    }

    /// $4003/$4007: length load, timer high 3 bits; restarts sequencer and envelope.
    pub fn write_timer_hi(&mut self, data: u8) {
        self.timer_period = (self.timer_period & 0x00FF) | ((data & 7) as u16) << 8;
        self.length.load(data);
        self.sequence_pos = 0;
        self.envelope.restart();
    }

    pub fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.timer_period;
            self.sequence_pos = (self.sequence_pos + 1) & 7;
        } else {
            self.timer -= 1;
        }
    }

    pub fn clock_sweep(&mut self) {
        let target = self.sweep_target();
        if self.sweep_counter == 0 && self.sweep_enabled && !self.muted() && self.sweep_shift > 0 {
            self.timer_period = target as u16;
        }
        if self.sweep_counter == 0 || self.sweep_reload {
            self.sweep_counter = self.sweep_period;
            self.sweep_reload = false;
        } else {
            self.sweep_counter -= 1;
        }
    }

    /// Period the sweep unit would move to; can exceed 11 bits.
    fn sweep_target(&self) -> i32 {
        let period = self.timer_period as i32;
        let mut delta = period >> self.sweep_shift;
        if self.sweep_negate {
            delta = -delta;
            if self.ones_complement {
                delta -= 1;
            }
        }
        period + delta
    }

    /// Muted while the period is too low or the sweep target overflows 11 bits,
    /// regardless of whether the sweep is enabled.
    pub fn muted(&self) -> bool {
        self.timer_period < 8 || self.sweep_target() > 0x7FF
    }

    pub fn timer_period(&self) -> u16 {
        self.timer_period
    }

    pub fn output(&self) -> u8 {
        if !self.length.active()
            || self.muted()
            || DUTY_TABLE[self.duty as usize][self.sequence_pos as usize] == 0
        {
            return 0;
        }
        self.envelope.output()
    }
}
