//! Video controller: scroll register and frame timing.
//!
//! The scroll register at 0o177664 holds the display scroll offset in the
//! low byte and the extended-memory bit. The controller also derives the
//! 50 Hz frame interrupt (vector 0o100) from CPU time, so hosts that never
//! render still get frame pacing for programs that count on it.

use bk_core::Cycles;
use cpu_k1801::InterruptRequest;

use crate::computer::CLOCK_FREQUENCY_HZ;
use crate::device::{Device, StateBag};

/// Scroll register address.
pub const SCROLL_ADDRESS: u16 = 0o177664;

/// Frame interrupt vector.
pub const FRAME_VECTOR: u16 = 0o100;

/// Frames per second.
pub const FRAME_RATE: u64 = 50;

/// CPU cycles per video frame.
pub const CYCLES_PER_FRAME: u64 = CLOCK_FREQUENCY_HZ / FRAME_RATE;

/// Power-up scroll register value: base offset with the full-screen bit.
pub const SCROLL_DEFAULT: u16 = 0o1330;

const SCROLL_WRITABLE: u16 = 0o1377;

/// Video controller device.
pub struct VideoController {
    scroll: u16,
    frame_interrupt_enabled: bool,
    last_frame: u64,
}

impl VideoController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scroll: SCROLL_DEFAULT,
            frame_interrupt_enabled: true,
            last_frame: 0,
        }
    }

    /// Current scroll offset for the host renderer.
    #[must_use]
    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    /// Turn the 50 Hz frame interrupt on or off.
    pub fn set_frame_interrupt(&mut self, enabled: bool) {
        self.frame_interrupt_enabled = enabled;
    }
}

impl Default for VideoController {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for VideoController {
    fn addresses(&self) -> &[u16] {
        &[SCROLL_ADDRESS]
    }

    fn init(&mut self, cpu_time: Cycles) {
        self.scroll = SCROLL_DEFAULT;
        self.last_frame = cpu_time.get() / CYCLES_PER_FRAME;
    }

    fn read(&mut self, _cpu_time: Cycles, _address: u16) -> u16 {
        self.scroll
    }

    fn write(&mut self, _cpu_time: Cycles, _byte_mode: bool, _address: u16, value: u16) {
        self.scroll = value & SCROLL_WRITABLE;
    }

    fn interrupt(&mut self, cpu_time: Cycles) -> Option<InterruptRequest> {
        if !self.frame_interrupt_enabled {
            return None;
        }
        let frame = cpu_time.get() / CYCLES_PER_FRAME;
        if frame > self.last_frame {
            self.last_frame = frame;
            return Some(InterruptRequest {
                vector: FRAME_VECTOR,
                priority: 6,
            });
        }
        None
    }

    fn save_state(&self, bag: &mut StateBag) {
        bag.insert("video/scroll".into(), self.scroll.to_le_bytes().to_vec());
    }

    fn restore_state(&mut self, bag: &StateBag) {
        if let Some(bytes) = bag.get("video/scroll") {
            if bytes.len() == 2 {
                self.scroll = u16::from_le_bytes([bytes[0], bytes[1]]);
            }
        }
    }
}
