//! BK-0010 machine emulation.
//!
//! Composes the K1801VM1 CPU with the machine's memory map and
//! memory-mapped devices: the system configuration register, keyboard
//! controller, programmable timer, video controller, and the one-bit PCM
//! audio output. The [`Computer`] facade owns the whole machine state; no
//! globals, so tests can hold several instances.

pub mod audio;
pub mod computer;
pub mod device;
pub mod keyboard;
pub mod memory;
pub mod sel1;
pub mod timer;
pub mod video;

pub use audio::{AudioOutput, PcmTimestampQueue, Synth, OUTPUT_BIT, OUTPUT_SAMPLE_RATE};
pub use computer::{Computer, CLOCK_FREQUENCY_HZ, INITIAL_STACK, START_ADDRESS};
pub use device::{Device, StateBag};
pub use keyboard::{Keyboard, KeyboardHandle};
pub use memory::{MemoryMap, MemoryRegion};
pub use sel1::Sel1Register;
pub use timer::Timer;
pub use video::VideoController;
