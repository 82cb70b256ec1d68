//! NES emulator entry point.
//!
//! Loads a cartridge and runs it in a window with audio, or headless for a fixed number of frames.
//! Usage: famulator [OPTIONS] <ROM>

use std::path::PathBuf;
use std::time::{Duration, Instant};

use ansi_term::Colour::{Cyan, Green, Red};
use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use famulator::{
    Buttons, Nes,
    apu::apu::SAMPLE_RATE,
    cpu::opcodes::decode,
    ppu::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH},
};
use minifb::{Key, KeyRepeat, Scale, Window, WindowOptions};
use rodio::{OutputStream, Sink, buffer::SamplesBuffer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// NES runs at ~60.0988 Hz (NTSC). Target one frame per 16.67 ms for ~60 fps.
const FRAME_DURATION: Duration = Duration::from_nanos(16_666_667);

/// Queued audio batches beyond which new ones are dropped to bound latency.
const MAX_QUEUED_BATCHES: usize = 4;

const KEYMAP: [(Key, Buttons); 8] = [
    (Key::Z, Buttons::A),
    (Key::X, Buttons::B),
    (Key::RightShift, Buttons::SELECT),
    (Key::Enter, Buttons::START),
    (Key::Up, Buttons::UP),
    (Key::Down, Buttons::DOWN),
    (Key::Left, Buttons::LEFT),
    (Key::Right, Buttons::RIGHT),
];

#[derive(Parser, Debug)]
#[command(name = "famulator", version, about = "NES emulator", long_about = None)]
struct Config {
    /// Path to an iNES (.nes) ROM
    rom: PathBuf,

    /// Window scale: 1, 2, 4 or 8
    #[arg(short, long, default_value_t = 2)]
    scale: u8,

    /// Run without an audio device
    #[arg(long)]
    mute: bool,

    /// Run this many frames without a window, then print a summary
    #[arg(long)]
    frames: Option<u64>,

    /// Print every executed instruction
    #[arg(long)]
    trace: bool,

    /// Log filter (overrides RUST_LOG), e.g. "debug" or "famulator=trace"
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let config = Config::parse();
    init_logging(config.log_level.as_deref());

    let mut nes = Nes::load(&config.rom)
        .with_context(|| format!("failed to load {}", config.rom.display()))?;
    let header = nes.header();
    info!(
        mapper = header.mapper,
        prg_units = header.prg_units,
        chr_units = header.chr_units,
        battery = header.battery,
        "ready"
    );

    match config.frames {
        Some(frames) => run_headless(&mut nes, frames, config.trace),
        None => run_windowed(&mut nes, &config),
    }
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_headless(nes: &mut Nes, frames: u64, trace: bool) -> Result<()> {
    let start = Instant::now();
    for _ in 0..frames {
        run_one_frame(nes, trace);
    }

    let regs = nes.cpu_registers();
    let checksum = nes
        .framebuffer()
        .iter()
        .fold(0u32, |acc, &px| acc.rotate_left(5) ^ px);
    println!("Ran {} frames in {:.2?}", nes.frame_count(), start.elapsed());
    println!("  CPU cycles: {}", nes.total_cycles());
    println!(
        "  PC:${:04X} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X}",
        regs.pc, regs.a, regs.x, regs.y, regs.status, regs.sp
    );
    println!(
        "  PPU: scanline {} dot {} ctrl ${:02X} mask ${:02X}",
        nes.ppu_scanline(),
        nes.ppu_cycle(),
        nes.ppu_ctrl(),
        nes.ppu_mask()
    );
    println!("  Framebuffer checksum: {checksum:08X}");
    Ok(())
}

fn run_windowed(nes: &mut Nes, config: &Config) -> Result<()> {
    let scale = match config.scale {
        1 => Scale::X1,
        2 => Scale::X2,
        4 => Scale::X4,
        8 => Scale::X8,
        other => bail!("unsupported scale {other}; use 1, 2, 4 or 8"),
    };

    // The stream must outlive the sink.
    let _stream = if config.mute {
        None
    } else {
        match open_audio(nes) {
            Ok(stream) => Some(stream),
            Err(e) => {
                warn!("audio disabled: {e:#}");
                None
            }
        }
    };

    let mut window = Window::new(
        "Famulator",
        SCREEN_WIDTH,
        SCREEN_HEIGHT,
        WindowOptions {
            scale,
            ..WindowOptions::default()
        },
    )
    .map_err(|e| anyhow!("failed to create window: {e}"))?;
    window.set_target_fps(60);

    while window.is_open() && !window.is_key_down(Key::Escape) {
        let frame_start = Instant::now();

        if window.is_key_pressed(Key::F5, KeyRepeat::No) {
            nes.reset();
        }
        let mut buttons = Buttons::empty();
        for (key, button) in KEYMAP {
            buttons.set(button, window.is_key_down(key));
        }
        nes.set_buttons(0, buttons);

        run_one_frame(nes, config.trace);

        window
            .update_with_buffer(nes.framebuffer(), SCREEN_WIDTH, SCREEN_HEIGHT)
            .map_err(|e| anyhow!("failed to present frame: {e}"))?;

        // Pace to ~60 fps so we don't burn CPU (emulation is far faster than real NES)
        let elapsed = frame_start.elapsed();
        if elapsed < FRAME_DURATION {
            std::thread::sleep(FRAME_DURATION - elapsed);
        }
    }
    Ok(())
}

/// Route APU batches into a rodio sink. Returns the stream, which must be kept alive.
fn open_audio(nes: &mut Nes) -> Result<OutputStream> {
    let (stream, handle) = OutputStream::try_default().context("no audio output device")?;
    let sink = Sink::try_new(&handle).context("failed to create audio sink")?;
    nes.on_audio(move |samples| {
        if sink.len() < MAX_QUEUED_BATCHES {
            sink.append(SamplesBuffer::new(1, SAMPLE_RATE, samples.to_vec()));
        }
    });
    Ok(stream)
}

fn run_one_frame(nes: &mut Nes, trace: bool) {
    if !trace {
        nes.run_until_frame();
        return;
    }
    let start = nes.frame_count();
    while nes.is_running() && nes.frame_count() == start {
        println!("{}", trace_line(nes));
        nes.step();
    }
}

/// nestest-style line for the instruction about to execute.
fn trace_line(nes: &Nes) -> String {
    let regs = nes.cpu_registers();
    let bus = nes.bus();
    let opcode = decode(bus.peek(regs.pc));
    let bytes: Vec<String> = (0..opcode.mode.bytes())
        .map(|i| format!("{:02X}", bus.peek(regs.pc.wrapping_add(i))))
        .collect();
    let mnemonic = if opcode.official {
        Green.paint(opcode.operation.mnemonic())
    } else {
        Red.bold().paint("*NOP")
    };
    format!(
        "{:04X}  {:<9} {:<4} {:?}  A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} {}",
        regs.pc,
        bytes.join(" "),
        mnemonic,
        opcode.mode,
        regs.a,
        regs.x,
        regs.y,
        regs.status,
        regs.sp,
        Cyan.paint(format!("CYC:{}", nes.total_cycles())),
    )
}
