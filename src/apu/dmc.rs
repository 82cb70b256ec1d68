//! Delta modulation channel ($4010–$4013). See [APU DMC](https://www.nesdev.org/wiki/APU_DMC).
//!
//! Sample bytes are pulled from CPU address space through a read callback supplied by the caller on
//! every clock; the channel never holds a reference to the cartridge.

/// NTSC rate table: 4-bit index from $4010 → timer period.
const DMC_RATE_TABLE: [u16; 16] = [
    428, 380, 340, 320, 286, 254, 226, 214, 190, 160, 142, 128, 106, 84, 72, 54,
];

#[derive(Clone, Copy, Debug)]
pub struct Dmc {
    irq_enabled: bool,
    loop_flag: bool,
    timer_period: u16,
    timer: u16,
    output_level: u8,
    /// Start address from $4012: $C000 + 64·A.
    sample_address: u16,
    /// Length from $4013: 16·L + 1.
    sample_length: u16,
    current_address: u16,
    bytes_remaining: u16,
    buffer_empty: bool,
    shift_register: u8,
    bits_remaining: u8,
    irq_pending: bool,
    enabled: bool,
}

impl Default for Dmc {
    fn default() -> Self {
        Self {
            irq_enabled: false,
            loop_flag: false,
            timer_period: DMC_RATE_TABLE[0],
            timer: 0,
            output_level: 0,
            sample_address: 0xC000,
            sample_length: 1,
            current_address: 0xC000,
            bytes_remaining: 0,
            buffer_empty: true,
            shift_register: 0,
            bits_remaining: 8,
            irq_pending: false,
            enabled: false,
        }
    }
}

impl Dmc {
    /// $4010: IRQ enable (bit 7), loop (bit 6), rate index (bits 0–3). Clearing IRQ enable
    /// acknowledges a pending DMC IRQ.
    pub fn write_control(&mut self, data: u8) {
        self.irq_enabled = data & 0x80 != 0;
        self.loop_flag = data & 0x40 != 0;
        self.timer_period = DMC_RATE_TABLE[(data & 0x0F) as usize];
        if !self.irq_enabled {
            self.irq_pending = false;
        }
    }

    /// $4011: direct load of the 7-bit output level.
    pub fn write_direct_load(&mut self, data: u8) {
        self.output_level = data & 0x7F;
    }

    /// $4012
    pub fn write_address(&mut self, data: u8) {
        self.sample_address = 0xC000 | ((data as u16) << 6);
    }

    /// $4013
    pub fn write_length(&mut self, data: u8) {
        self.sample_length = ((data as u16) << 4) | 1;
    }

    /// $4015 bit 4. Enabling with nothing left restarts the sample; disabling drops the rest.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.bytes_remaining = 0;
        } else if self.bytes_remaining == 0 {
            self.restart();
        }
    }

    fn restart(&mut self) {
        self.current_address = self.sample_address;
        self.bytes_remaining = self.sample_length;
    }

    /// One APU cycle. `read` fetches a sample byte from CPU address space.
    pub fn clock_timer<F: FnMut(u16) -> u8>(&mut self, read: &mut F) {
        if self.timer > 0 {
            self.timer -= 1;
            return;
        }
        self.timer = self.timer_period;

        if !self.buffer_empty {
            if self.shift_register & 1 != 0 {
                if self.output_level <= 125 {
                    self.output_level += 2;
                }
            } else if self.output_level >= 2 {
                self.output_level -= 2;
            }
            self.shift_register >>= 1;
            self.bits_remaining -= 1;
            if self.bits_remaining == 0 {
                self.bits_remaining = 8;
                self.buffer_empty = true;
            }
        }

        if self.buffer_empty && self.bytes_remaining > 0 {
            self.fetch(read);
        }
    }

    fn fetch<F: FnMut(u16) -> u8>(&mut self, read: &mut F) {
        debug_assert!(self.bytes_remaining > 0);
        self.shift_register = read(self.current_address);
        self.buffer_empty = false;
        self.current_address = match self.current_address.wrapping_add(1) {
            0 => 0x8000,
            next => next,
        };
        self.bytes_remaining -= 1;
        if self.bytes_remaining == 0 {
            if self.loop_flag {
                self.restart();
            } else if self.irq_enabled {
                self.irq_pending = true;
            }
        }
    }

    pub fn clear_irq(&mut self) {
        self.irq_pending = false;
    }

    pub fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    pub fn bytes_remaining(&self) -> u16 {
        self.bytes_remaining
    }

    pub fn current_address(&self) -> u16 {
        self.current_address
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn output(&self) -> u8 {
        self.output_level
    }
}
