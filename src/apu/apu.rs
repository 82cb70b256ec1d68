//! NES APU (Audio Processing Unit) implementation.
//!
//! Implements the [APU](https://www.nesdev.org/wiki/APU) as in the Ricoh 2A03: five channels (pulse×2,
//! triangle, noise, DMC), [frame counter](https://www.nesdev.org/wiki/APU_Frame_Counter) (4-step or
//! 5-step), and [APU Mixer](https://www.nesdev.org/wiki/APU_Mixer) (non-linear). Registers $4000–$4013,
//! $4015, $4017. See [APU registers](https://www.nesdev.org/wiki/APU_registers).
//!
//! ## Timing
//!
//! - Triangle: timer clocked every CPU cycle.
//! - Pulse, noise, DMC: timers clocked on even CPU cycles.
//! - Envelopes/linear counter (quarter frame) and length/sweep (half frame) from the frame counter.
//!
//! Mixed samples are produced every `CPU_CLOCK_HZ / SAMPLE_RATE` cycles and collected into fixed
//! batches of [`SAMPLES_PER_BATCH`]; a finished batch is picked up with [`Apu::take_samples`].

use super::{dmc::Dmc, noise::Noise, pulse::Pulse, triangle::Triangle};

/// NTSC CPU clock.
pub const CPU_CLOCK_HZ: u32 = 1_789_773;

pub const SAMPLE_RATE: u32 = 44_100;

/// One video frame worth of audio at 44.1 kHz.
pub const SAMPLES_PER_BATCH: usize = 735;

const CYCLES_PER_SAMPLE: f64 = CPU_CLOCK_HZ as f64 / SAMPLE_RATE as f64;

/// Frame counter step positions in CPU cycles.
const STEP_1: u32 = 3729;
const STEP_2: u32 = 7457;
const STEP_3: u32 = 11186;
const STEP_4_FOUR: u32 = 14915;
const STEP_4_FIVE: u32 = 18641;

const STATUS_FRAME_IRQ: u8 = 0x40;
const STATUS_DMC_IRQ: u8 = 0x80;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SequencerMode {
    #[default]
    FourStep,
    FiveStep,
}

/// Non-linear mixer. Inputs are raw channel levels: pulses and noise 0–15, triangle 0–15, DMC 0–127.
pub fn mix(pulse1: u8, pulse2: u8, triangle: u8, noise: u8, dmc: u8) -> f32 {
    let pulse_sum = pulse1 as f32 + pulse2 as f32;
    let pulse_out = if pulse_sum > 0.0 {
        95.88 / (8128.0 / pulse_sum + 100.0)
    } else {
        0.0
    };

    let tnd = triangle as f32 / 8227.0 + noise as f32 / 12241.0 + dmc as f32 / 22638.0;
    let tnd_out = if tnd > 0.0 {
        159.79 / (1.0 / tnd + 100.0)
    } else {
        0.0
    };

    pulse_out + tnd_out
}

/// APU state: channels, frame counter, IRQ flags and the double-buffered sample batch.
pub struct Apu {
    pub(crate) pulse1: Pulse,
    pub(crate) pulse2: Pulse,
    pub(crate) triangle: Triangle,
    pub(crate) noise: Noise,
    pub(crate) dmc: Dmc,
    mode: SequencerMode,
    frame_counter: u32,
    irq_inhibit: bool,
    frame_irq: bool,
    /// Set on each new frame/DMC IRQ; consumed by `take_irq`.
    irq_raised: bool,
    sample_phase: f64,
    batches: [[f32; SAMPLES_PER_BATCH]; 2],
    /// Batch currently being filled.
    front: usize,
    filled: usize,
    batch_ready: bool,
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

impl Apu {
    pub fn new() -> Self {
        Self {
            pulse1: Pulse::new(true),
            pulse2: Pulse::new(false),
            triangle: Triangle::default(),
            noise: Noise::default(),
            dmc: Dmc::default(),
            mode: SequencerMode::FourStep,
            frame_counter: 0,
            irq_inhibit: false,
            frame_irq: false,
            irq_raised: false,
            sample_phase: 0.0,
            batches: [[0.0; SAMPLES_PER_BATCH]; 2],
            front: 0,
            filled: 0,
            batch_ready: false,
        }
    }

    /// Silence all channels and restart the frame counter. Sample buffers are reused.
    pub fn reset(&mut self) {
        self.pulse1 = Pulse::new(true);
        self.pulse2 = Pulse::new(false);
        self.triangle = Triangle::default();
        self.noise = Noise::default();
        self.dmc = Dmc::default();
        self.mode = SequencerMode::FourStep;
        self.frame_counter = 0;
        self.irq_inhibit = false;
        self.frame_irq = false;
        self.irq_raised = false;
        self.sample_phase = 0.0;
        self.filled = 0;
        self.batch_ready = false;
    }

    /// Write to APU registers. $4000–$4013 = channel regs; $4015 = channel enables;
    /// $4017 = frame counter mode and IRQ inhibit. Other addresses are ignored.
    pub fn write_register(&mut self, addr: u16, data: u8) {
        match addr {
            0x4000 => self.pulse1.write_control(data),
            0x4001 => self.pulse1.write_sweep(data),
            0x4002 => self.pulse1.write_timer_lo(data),
            0x4003 => self.pulse1.write_timer_hi(data),
            0x4004 => self.pulse2.write_control(data),
            0x4005 => self.pulse2.write_sweep(data),
            0x4006 => self.pulse2.write_timer_lo(data),
            0x4007 => self.pulse2.write_timer_hi(data),
            0x4008 => self.triangle.write_linear(data),
            0x400A => self.triangle.write_timer_lo(data),
            0x400B => self.triangle.write_timer_hi(data),
            0x400C => self.noise.write_control(data),
            0x400E => self.noise.write_period(data),
            0x400F => self.noise.write_length(data),
            0x4010 => self.dmc.write_control(data),
            0x4011 => self.dmc.write_direct_load(data),
            0x4012 => self.dmc.write_address(data),
            0x4013 => self.dmc.write_length(data),
            0x4015 => {
                self.pulse1.length.set_enabled(data & 0x01 != 0);
                self.pulse2.length.set_enabled(data & 0x02 != 0);
                self.triangle.length.set_enabled(data & 0x04 != 0);
                self.noise.length.set_enabled(data & 0x08 != 0);
                self.dmc.set_enabled(data & 0x10 != 0);
                self.dmc.clear_irq();
            }
            0x4017 => {
                self.mode = if data & 0x80 != 0 {
                    SequencerMode::FiveStep
                } else {
                    SequencerMode::FourStep
                };
                self.irq_inhibit = data & 0x40 != 0;
                if self.irq_inhibit {
                    self.frame_irq = false;
                }
                if self.mode == SequencerMode::FiveStep {
                    self.quarter_frame();
                    self.half_frame();
                }
                self.frame_counter = 0;
            }
            _ => {}
        }
    }

    /// Read $4015: bits 0–3 = length counter > 0 for pulse1, pulse2, triangle, noise; bit 4 = DMC
    /// has bytes remaining; bit 6 = frame IRQ; bit 7 = DMC IRQ. Clears the frame IRQ.
    pub fn read_status(&mut self) -> u8 {
        let status = self.peek_status();
        self.frame_irq = false;
        status
    }

    /// $4015 without the read side effect.
    pub fn peek_status(&self) -> u8 {
        let mut status = 0;
        if self.pulse1.length.count() > 0 {
            status |= 0x01;
        }
        if self.pulse2.length.count() > 0 {
            status |= 0x02;
        }
        if self.triangle.length.count() > 0 {
            status |= 0x04;
        }
        if self.noise.length.count() > 0 {
            status |= 0x08;
        }
        if self.dmc.bytes_remaining() > 0 {
            status |= 0x10;
        }
        if self.frame_irq {
            status |= STATUS_FRAME_IRQ;
        }
        if self.dmc.irq_pending() {
            status |= STATUS_DMC_IRQ;
        }
        status
    }

    /// Advance one CPU cycle. `read` serves DMC sample fetches from CPU address space.
    pub fn clock<F: FnMut(u16) -> u8>(&mut self, mut read: F) {
        self.triangle.clock_timer();

        self.frame_counter += 1;
        if self.frame_counter % 2 == 0 {
            self.pulse1.clock_timer();
            self.pulse2.clock_timer();
            self.noise.clock_timer();
            let dmc_irq = self.dmc.irq_pending();
            self.dmc.clock_timer(&mut read);
            if !dmc_irq && self.dmc.irq_pending() {
                self.irq_raised = true;
            }
        }

        self.clock_frame_counter();

        self.sample_phase += 1.0;
        if self.sample_phase >= CYCLES_PER_SAMPLE {
            self.sample_phase -= CYCLES_PER_SAMPLE;
            let sample = self.sample();
            self.push_sample(sample);
        }
    }

    fn clock_frame_counter(&mut self) {
        match (self.mode, self.frame_counter) {
            (_, STEP_1) | (_, STEP_3) => self.quarter_frame(),
            (_, STEP_2) => {
                self.quarter_frame();
                self.half_frame();
            }
            (SequencerMode::FourStep, STEP_4_FOUR) => {
                self.quarter_frame();
                self.half_frame();
                if !self.irq_inhibit {
                    self.frame_irq = true;
                    self.irq_raised = true;
                }
                self.frame_counter = 0;
            }
            (SequencerMode::FiveStep, STEP_4_FIVE) => {
                self.quarter_frame();
                self.half_frame();
                self.frame_counter = 0;
            }
            _ => {}
        }
    }

    /// Quarter frame: envelopes and the triangle linear counter.
    fn quarter_frame(&mut self) {
        self.pulse1.envelope.clock();
        self.pulse2.envelope.clock();
        self.triangle.clock_linear();
        self.noise.envelope.clock();
    }

    /// Half frame: length counters and sweep units.
    fn half_frame(&mut self) {
        self.pulse1.length.clock();
        self.pulse1.clock_sweep();
        self.pulse2.length.clock();
        self.pulse2.clock_sweep();
        self.triangle.length.clock();
        self.noise.length.clock();
    }

    /// Current mixed output level.
    pub fn sample(&self) -> f32 {
        mix(
            self.pulse1.output(),
            self.pulse2.output(),
            self.triangle.output(),
            self.noise.output(),
            self.dmc.output(),
        )
    }

    fn push_sample(&mut self, sample: f32) {
        debug_assert!(self.filled < SAMPLES_PER_BATCH);
        self.batches[self.front][self.filled] = sample;
        self.filled += 1;
        if self.filled == SAMPLES_PER_BATCH {
            self.front ^= 1;
            self.filled = 0;
            self.batch_ready = true;
        }
    }

    /// The most recently completed batch, once. An untaken batch is overwritten two batches later.
    pub fn take_samples(&mut self) -> Option<&[f32; SAMPLES_PER_BATCH]> {
        if !self.batch_ready {
            return None;
        }
        self.batch_ready = false;
        Some(&self.batches[self.front ^ 1])
    }

    /// True once per newly raised frame or DMC interrupt.
    pub fn take_irq(&mut self) -> bool {
        std::mem::take(&mut self.irq_raised)
    }

    /// Level of the APU interrupt line: frame IRQ or DMC IRQ flag set.
    pub fn irq_pending(&self) -> bool {
        self.frame_irq || self.dmc.irq_pending()
    }

    pub fn mode(&self) -> SequencerMode {
        self.mode
    }

    pub fn frame_counter(&self) -> u32 {
        self.frame_counter
    }
}
