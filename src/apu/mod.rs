//! NES APU (Audio Processing Unit) emulation.
//!
//! - **Pulse** (×2): square waves with duty, envelope, sweep, length counter.
//! - **Triangle**: 32-step wave, linear counter, length counter.
//! - **Noise**: LFSR-based, envelope, length counter.
//! - **DMC**: delta-modulated samples fetched from cartridge space.
//! - **Frame counter**: 4-step or 5-step mode; clocks envelope/linear/length/sweep.
//! - **Mixer**: NES-style non-linear mix; output sampled at 44.1 kHz.

pub mod apu;
pub mod dmc;
pub mod envelope;
pub mod noise;
pub mod pulse;
pub mod triangle;

#[cfg(test)]
mod tests;
