use super::apu::{Apu, SAMPLES_PER_BATCH, SequencerMode, mix};
use super::envelope::Envelope;
use super::noise::Noise;

fn run(apu: &mut Apu, cycles: u32) {
    for _ in 0..cycles {
        apu.clock(|_| 0);
    }
}

#[test]
fn frame_irq_fires_at_end_of_four_step_sequence() {
    let mut apu = Apu::new();
    run(&mut apu, 14914);
    assert_eq!(apu.peek_status() & 0x40, 0);
    assert!(!apu.take_irq());

    run(&mut apu, 1);
    assert_eq!(apu.peek_status() & 0x40, 0x40);
    assert!(apu.take_irq());
    assert!(!apu.take_irq());
    assert_eq!(apu.frame_counter(), 0);

    // Reading $4015 acknowledges it.
    assert_eq!(apu.read_status() & 0x40, 0x40);
    assert_eq!(apu.read_status() & 0x40, 0);
}

#[test]
fn frame_irq_inhibited() {
    let mut apu = Apu::new();
    apu.write_register(0x4017, 0x40);
    run(&mut apu, 14915 * 3);
    assert_eq!(apu.peek_status() & 0x40, 0);
    assert!(!apu.take_irq());
}

#[test]
fn inhibit_write_clears_pending_frame_irq() {
    let mut apu = Apu::new();
    run(&mut apu, 14915);
    assert!(apu.irq_pending());
    apu.write_register(0x4017, 0x40);
    assert!(!apu.irq_pending());
}

#[test]
fn five_step_mode_never_raises_frame_irq() {
    let mut apu = Apu::new();
    apu.write_register(0x4017, 0x80);
    assert_eq!(apu.mode(), SequencerMode::FiveStep);
    run(&mut apu, 18641 * 3);
    assert_eq!(apu.peek_status() & 0x40, 0);
    assert!(!apu.take_irq());
}

#[test]
fn five_step_sequence_wraps_at_18641() {
    let mut apu = Apu::new();
    apu.write_register(0x4017, 0x80);
    run(&mut apu, 18640);
    assert_eq!(apu.frame_counter(), 18640);
    run(&mut apu, 1);
    assert_eq!(apu.frame_counter(), 0);
}

#[test]
fn mix_silence_is_zero() {
    assert_eq!(mix(0, 0, 0, 0, 0), 0.0);
}

#[test]
fn mix_uses_nonlinear_formulas() {
    let pulses = mix(15, 15, 0, 0, 0);
    assert!((pulses - 95.88 / (8128.0 / 30.0 + 100.0)).abs() < 1e-6);

    let tnd = mix(0, 0, 15, 15, 127);
    assert!((tnd - 0.7415).abs() < 0.001, "tnd = {tnd}");

    let full = mix(15, 15, 15, 15, 127);
    assert!((full - (pulses + tnd)).abs() < 1e-6);
}

#[test]
fn length_loads_only_while_enabled() {
    let mut apu = Apu::new();
    apu.write_register(0x4003, 0x08);
    assert_eq!(apu.peek_status() & 0x01, 0);

    apu.write_register(0x4015, 0x01);
    apu.write_register(0x4003, 0x08);
    assert_eq!(apu.peek_status() & 0x01, 0x01);
    assert_eq!(apu.pulse1.length.count(), 254);

    // Disabling clears the counter.
    apu.write_register(0x4015, 0x00);
    assert_eq!(apu.peek_status() & 0x01, 0);
}

#[test]
fn status_reports_each_channel() {
    let mut apu = Apu::new();
    apu.write_register(0x4015, 0x0F);
    apu.write_register(0x4007, 0x08);
    apu.write_register(0x400B, 0x08);
    apu.write_register(0x400F, 0x08);
    assert_eq!(apu.peek_status(), 0x0E);
    apu.write_register(0x4003, 0x08);
    assert_eq!(apu.peek_status(), 0x0F);
}

#[test]
fn length_counter_decrements_on_half_frames() {
    let mut apu = Apu::new();
    apu.write_register(0x4015, 0x01);
    // Index 3 → 2.
    apu.write_register(0x4003, 0x18);
    assert_eq!(apu.pulse1.length.count(), 2);
    run(&mut apu, 7457);
    assert_eq!(apu.pulse1.length.count(), 1);
    run(&mut apu, 14915 - 7457);
    assert_eq!(apu.pulse1.length.count(), 0);
    assert_eq!(apu.peek_status() & 0x01, 0);
}

#[test]
fn length_halt_holds_counter() {
    let mut apu = Apu::new();
    apu.write_register(0x4015, 0x01);
    apu.write_register(0x4000, 0x20);
    apu.write_register(0x4003, 0x18);
    run(&mut apu, 14915 * 2);
    assert_eq!(apu.pulse1.length.count(), 2);
}

#[test]
fn pulse_muted_by_low_period_or_sweep_overflow() {
    let mut apu = Apu::new();
    apu.write_register(0x4002, 0x05);
    apu.write_register(0x4003, 0x00);
    assert!(apu.pulse1.muted());

    // 0x7FF + (0x7FF >> 1) overflows 11 bits even with the sweep disabled.
    apu.write_register(0x4001, 0x01);
    apu.write_register(0x4002, 0xFF);
    apu.write_register(0x4003, 0x07);
    assert!(apu.pulse1.muted());

    apu.write_register(0x4002, 0x00);
    apu.write_register(0x4003, 0x04);
    assert!(!apu.pulse1.muted());
}

#[test]
fn sweep_negate_differs_between_channels() {
    let mut apu = Apu::new();
    // Enabled, period 0, negate, shift 1.
    apu.write_register(0x4001, 0x89);
    apu.write_register(0x4002, 0x00);
    apu.write_register(0x4003, 0x01);
    apu.write_register(0x4005, 0x89);
    apu.write_register(0x4006, 0x00);
    apu.write_register(0x4007, 0x01);

    // Five-step select clocks a half frame immediately.
    apu.write_register(0x4017, 0x80);
    assert_eq!(apu.pulse1.timer_period(), 0x100 - 0x80 - 1);
    assert_eq!(apu.pulse2.timer_period(), 0x100 - 0x80);
}

#[test]
fn sweep_raises_period_without_negate() {
    let mut apu = Apu::new();
    apu.write_register(0x4001, 0x82);
    apu.write_register(0x4002, 0x00);
    apu.write_register(0x4003, 0x02);
    apu.write_register(0x4017, 0x80);
    assert_eq!(apu.pulse1.timer_period(), 0x200 + 0x80);
}

#[test]
fn pulse_output_follows_constant_volume() {
    let mut apu = Apu::new();
    apu.write_register(0x4015, 0x01);
    // 50% duty, constant volume 9.
    apu.write_register(0x4000, 0xB9);
    apu.write_register(0x4002, 0x40);
    apu.write_register(0x4003, 0x08);

    let mut seen = [false; 16];
    for _ in 0..4000 {
        apu.clock(|_| 0);
        seen[apu.pulse1.output() as usize] = true;
    }
    assert!(seen[0]);
    assert!(seen[9]);
    assert_eq!(seen.iter().filter(|&&s| s).count(), 2);
}

#[test]
fn triangle_linear_counter_reload() {
    let mut apu = Apu::new();
    apu.write_register(0x4015, 0x04);
    apu.write_register(0x4008, 0x05);
    apu.write_register(0x400B, 0x08);
    apu.write_register(0x4017, 0x80);
    assert_eq!(apu.triangle.linear_counter(), 5);
    apu.write_register(0x4017, 0x80);
    assert_eq!(apu.triangle.linear_counter(), 4);
}

#[test]
fn triangle_ultrasonic_period_is_silent() {
    let mut apu = Apu::new();
    apu.write_register(0x4015, 0x04);
    apu.write_register(0x4008, 0x7F);
    apu.write_register(0x400A, 0x01);
    apu.write_register(0x400B, 0x08);
    apu.write_register(0x4017, 0x80);
    for _ in 0..100 {
        apu.clock(|_| 0);
        assert_eq!(apu.triangle.output(), 0);
    }
}

#[test]
fn envelope_decays_and_loops() {
    let mut env = Envelope::default();
    env.write(0x02);
    env.restart();
    env.clock();
    assert_eq!(env.output(), 15);
    for _ in 0..3 {
        env.clock();
    }
    assert_eq!(env.output(), 14);

    let mut looping = Envelope::default();
    looping.write(0x20);
    looping.restart();
    looping.clock();
    for _ in 0..15 {
        looping.clock();
    }
    assert_eq!(looping.output(), 0);
    looping.clock();
    assert_eq!(looping.output(), 15);

    let mut constant = Envelope::default();
    constant.write(0x1A);
    assert_eq!(constant.output(), 10);
}

#[test]
fn noise_long_mode_is_maximal_length() {
    let mut noise = Noise::default();
    noise.clock_timer();
    assert_eq!(noise.shift_register(), 0x4000);

    let mut shifts = 1;
    while noise.shift_register() != 1 {
        // Period index 0 reloads the timer with 4: one shift per five clocks.
        for _ in 0..5 {
            noise.clock_timer();
        }
        shifts += 1;
        assert!(shifts <= 32767);
    }
    assert_eq!(shifts, 32767);
}

#[test]
fn dmc_sample_address_and_length() {
    let mut apu = Apu::new();
    apu.write_register(0x4012, 0x10);
    apu.write_register(0x4013, 0x02);
    apu.write_register(0x4015, 0x10);
    assert_eq!(apu.dmc.current_address(), 0xC400);
    assert_eq!(apu.dmc.bytes_remaining(), 33);
    assert_eq!(apu.peek_status() & 0x10, 0x10);

    let mut reads = Vec::new();
    for _ in 0..2 {
        apu.clock(|addr| {
            reads.push(addr);
            0
        });
    }
    assert_eq!(reads, vec![0xC400]);
    assert_eq!(apu.dmc.bytes_remaining(), 32);
}

#[test]
fn dmc_disable_drops_remaining_bytes() {
    let mut apu = Apu::new();
    apu.write_register(0x4013, 0x02);
    apu.write_register(0x4015, 0x10);
    assert!(apu.dmc.enabled());
    apu.write_register(0x4015, 0x00);
    assert_eq!(apu.dmc.bytes_remaining(), 0);
    assert_eq!(apu.peek_status() & 0x10, 0);
}

#[test]
fn dmc_address_wraps_to_8000() {
    let mut apu = Apu::new();
    apu.write_register(0x4010, 0x0F);
    apu.write_register(0x4012, 0xFF);
    apu.write_register(0x4013, 0x04);
    apu.write_register(0x4015, 0x10);

    let mut reads = Vec::new();
    for _ in 0..100_000 {
        apu.clock(|addr| {
            reads.push(addr);
            0
        });
    }
    assert_eq!(reads.len(), 65);
    assert_eq!(reads[0], 0xFFC0);
    assert_eq!(reads[63], 0xFFFF);
    assert_eq!(reads[64], 0x8000);
}

#[test]
fn dmc_irq_on_sample_end() {
    let mut apu = Apu::new();
    apu.write_register(0x4010, 0x80);
    apu.write_register(0x4013, 0x00);
    apu.write_register(0x4015, 0x10);
    run(&mut apu, 2);
    assert_eq!(apu.peek_status() & 0x90, 0x80);
    assert!(apu.take_irq());

    // Reading status leaves the DMC IRQ; a $4015 write clears it.
    apu.read_status();
    assert_eq!(apu.peek_status() & 0x80, 0x80);
    apu.write_register(0x4015, 0x00);
    assert_eq!(apu.peek_status() & 0x80, 0);
}

#[test]
fn dmc_loop_restarts_sample() {
    let mut apu = Apu::new();
    apu.write_register(0x4010, 0xC0);
    apu.write_register(0x4013, 0x00);
    apu.write_register(0x4015, 0x10);
    run(&mut apu, 2);
    assert_eq!(apu.dmc.bytes_remaining(), 1);
    assert!(!apu.dmc.irq_pending());
}

#[test]
fn dmc_output_steps_by_two_and_clamps() {
    let mut apu = Apu::new();
    apu.write_register(0x4010, 0x0F);
    apu.write_register(0x4011, 0x40);
    apu.write_register(0x4015, 0x10);
    for _ in 0..10_000 {
        apu.clock(|_| 0xFF);
    }
    assert_eq!(apu.dmc.output(), 0x40 + 16);

    let mut high = Apu::new();
    high.write_register(0x4010, 0x0F);
    high.write_register(0x4011, 0x7F);
    high.write_register(0x4015, 0x10);
    for _ in 0..10_000 {
        high.clock(|_| 0xFF);
    }
    assert_eq!(high.dmc.output(), 0x7F);
}

#[test]
fn samples_delivered_in_batches() {
    let mut apu = Apu::new();
    run(&mut apu, 29_000);
    assert!(apu.take_samples().is_none());
    run(&mut apu, 900);
    let batch = apu.take_samples().map(|b| b.len());
    assert_eq!(batch, Some(SAMPLES_PER_BATCH));
    assert!(apu.take_samples().is_none());
}

#[test]
fn reset_silences_everything() {
    let mut apu = Apu::new();
    apu.write_register(0x4015, 0x1F);
    apu.write_register(0x4003, 0x08);
    apu.write_register(0x4017, 0x80);
    apu.reset();
    assert_eq!(apu.peek_status(), 0);
    assert_eq!(apu.mode(), SequencerMode::FourStep);
    assert_eq!(apu.frame_counter(), 0);
}
