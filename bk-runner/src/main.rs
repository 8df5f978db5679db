//! BK-0010 emulator runner.
//!
//! Loads a ROM image at the standard start address, builds the machine with
//! its devices, and runs in real time with one-bit PCM audio. No display:
//! this runner exists to exercise the core and listen to it.

mod audio;

use machine_bk::{
    AudioOutput, Computer, Keyboard, MemoryRegion, Sel1Register, Synth, Timer, VideoController,
    START_ADDRESS,
};
use std::time::{Duration, Instant};

/// User plus video RAM: the low 32K of the address space.
const RAM_SIZE: usize = 0o100000;

/// Wall-clock slice per scheduling round (one video frame).
const FRAME: Duration = Duration::from_millis(20);

fn main() {
    env_logger::init();

    let Some(rom_path) = std::env::args().nth(1) else {
        eprintln!("usage: bk-runner <rom-image>");
        std::process::exit(2);
    };
    let rom = match std::fs::read(&rom_path) {
        Ok(rom) => rom,
        Err(err) => {
            eprintln!("failed to load {rom_path}: {err}");
            std::process::exit(1);
        }
    };

    let mut computer = Computer::new();
    computer.add_memory(MemoryRegion::ram(0, RAM_SIZE));
    computer.add_memory(MemoryRegion::rom_from_bytes(START_ADDRESS, &rom));
    computer.add_device(Box::new(Sel1Register::new(START_ADDRESS)));
    computer.add_device(Box::new(Keyboard::new()));
    computer.add_device(Box::new(Timer::new()));
    computer.add_device(Box::new(VideoController::new()));

    let audio_device = AudioOutput::new(&computer.clock());
    let synth = Synth::new(audio_device.queue(), computer.clock());
    computer.add_device(Box::new(audio_device));

    computer.reset();
    log::info!(
        "machine reset, PC {:#08o}, {} byte ROM",
        computer.cpu().read_register(7),
        rom.len()
    );

    let audio_thread = audio::AudioThread::start(synth);

    // Pace simulated time against the wall clock, one frame per round.
    // The sleep sits between instructions, never inside one.
    let mut deadline = Instant::now() + FRAME;
    loop {
        computer.execute_for(FRAME.as_nanos() as u64);
        if computer.cpu().is_halted() {
            log::info!("CPU halted at {:#08o}", computer.cpu().read_register(7));
            break;
        }
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        deadline += FRAME;
    }

    audio_thread.stop();
}
