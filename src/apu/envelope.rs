//! Units shared by several channels: the [envelope](https://www.nesdev.org/wiki/APU_Envelope)
//! generator and the [length counter](https://www.nesdev.org/wiki/APU_Length_Counter).

/// Length counter lookup table: 5-bit index from register → count.
pub const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, 12, 16, 24, 18, 48, 20, 96, 22,
    192, 24, 72, 26, 16, 28, 32, 30,
];

/// Volume envelope used by the pulse and noise channels.
///
/// Either a constant volume, or a decay level falling 15→0 once per `volume + 1` quarter frames,
/// optionally looping back to 15 when the length-counter halt bit is set.
#[derive(Clone, Copy, Debug, Default)]
pub struct Envelope {
    start: bool,
    divider: u8,
    decay: u8,
    /// Constant volume or divider period (4 bits).
    volume: u8,
    constant: bool,
    looping: bool,
}

impl Envelope {
    /// Control byte layout shared by $4000/$4004/$400C: `--LC VVVV`.
    pub fn write(&mut self, data: u8) {
        self.looping = data & 0x20 != 0;
        self.constant = data & 0x10 != 0;
        self.volume = data & 0x0F;
    }

    /// Flag a restart; takes effect on the next quarter frame.
    pub fn restart(&mut self) {
        self.start = true;
    }

    pub fn clock(&mut self) {
        if self.start {
            self.start = false;
            self.decay = 15;
            self.divider = self.volume;
        } else if self.divider > 0 {
            self.divider -= 1;
        } else {
            self.divider = self.volume;
            if self.decay > 0 {
                self.decay -= 1;
            } else if self.looping {
                self.decay = 15;
            }
        }
    }

    pub fn output(&self) -> u8 {
        if self.constant { self.volume } else { self.decay }
    }
}

/// Per-channel length counter. Loading only happens while the channel is enabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct LengthCounter {
    pub enabled: bool,
    pub halt: bool,
    count: u8,
}

impl LengthCounter {
    /// Load from the top five bits of a $4003-style write.
    pub fn load(&mut self, data: u8) {
        if self.enabled {
            self.count = LENGTH_TABLE[(data >> 3) as usize];
        }
    }

    /// $4015 enable bit; disabling clears the count immediately.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.count = 0;
        }
    }

    pub fn clock(&mut self) {
        if !self.halt && self.count > 0 {
            self.count -= 1;
        }
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    /// True when the channel is enabled and still counting.
    pub fn active(&self) -> bool {
        self.enabled && self.count > 0
    }
}
