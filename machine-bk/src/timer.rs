//! Programmable countdown timer.
//!
//! Three registers: preset at 0o177706, counter at 0o177710, control at
//! 0o177712. The counter derives from CPU time: it ticks down once every
//! [`TIMER_DIVIDER`] cycles while running, so reads compute the current
//! value from the elapsed time instead of stepping state. The BK timer
//! raises no CPU interrupt; expiry is a sticky control bit.

use bk_core::Cycles;

use crate::device::{Device, StateBag};

/// Preset (reload value) register.
pub const TIMER_PRESET_ADDRESS: u16 = 0o177706;
/// Counter register.
pub const TIMER_COUNTER_ADDRESS: u16 = 0o177710;
/// Control register.
pub const TIMER_CONTROL_ADDRESS: u16 = 0o177712;

/// CPU cycles per counter tick.
pub const TIMER_DIVIDER: u64 = 128;

/// Control: counting stopped.
pub const CONTROL_STOP: u16 = 1 << 0;
/// Control: reload the preset on expiry and keep counting.
pub const CONTROL_WRAP: u16 = 1 << 1;
/// Control: sticky expiry flag, cleared by writing it back as zero.
pub const CONTROL_EXPIRY: u16 = 1 << 2;
/// Control: counting enabled.
pub const CONTROL_RUN: u16 = 1 << 4;

const CONTROL_WRITABLE: u16 = CONTROL_STOP | CONTROL_WRAP | CONTROL_EXPIRY | CONTROL_RUN;

const ADDRESSES: [u16; 3] = [
    TIMER_PRESET_ADDRESS,
    TIMER_COUNTER_ADDRESS,
    TIMER_CONTROL_ADDRESS,
];

/// The timer device.
pub struct Timer {
    preset: u16,
    control: u16,
    /// CPU time when counting (re)started.
    started_at: u64,
    /// Counter value at `started_at`.
    start_count: u16,
    expired: bool,
}

impl Timer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            preset: 0,
            control: CONTROL_STOP,
            started_at: 0,
            start_count: 0,
            expired: false,
        }
    }

    fn running(&self) -> bool {
        self.control & CONTROL_RUN != 0 && self.control & CONTROL_STOP == 0
    }

    /// Counter value at the given CPU time.
    fn counter_at(&mut self, cpu_time: Cycles) -> u16 {
        if !self.running() {
            return self.start_count;
        }
        let elapsed = (cpu_time.get().saturating_sub(self.started_at)) / TIMER_DIVIDER;
        let start = u64::from(self.start_count);
        if elapsed < start {
            return (start - elapsed) as u16;
        }
        // Reached zero at least once.
        self.expired = true;
        if self.control & CONTROL_WRAP != 0 && self.preset != 0 {
            let period = u64::from(self.preset);
            let into_cycle = (elapsed - start) % period;
            ((period - into_cycle) % period) as u16
        } else {
            0
        }
    }

    fn restart(&mut self, cpu_time: Cycles, count: u16) {
        self.started_at = cpu_time.get();
        self.start_count = count;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for Timer {
    fn addresses(&self) -> &[u16] {
        &ADDRESSES
    }

    fn init(&mut self, cpu_time: Cycles) {
        self.preset = 0;
        self.control = CONTROL_STOP;
        self.expired = false;
        self.restart(cpu_time, 0);
    }

    fn read(&mut self, cpu_time: Cycles, address: u16) -> u16 {
        match address {
            TIMER_PRESET_ADDRESS => self.preset,
            TIMER_COUNTER_ADDRESS => self.counter_at(cpu_time),
            TIMER_CONTROL_ADDRESS => {
                let expired = self.counter_at(cpu_time) == 0 && self.running();
                let mut control = self.control;
                if self.expired || expired {
                    control |= CONTROL_EXPIRY;
                }
                control
            }
            _ => 0,
        }
    }

    fn write(&mut self, cpu_time: Cycles, _byte_mode: bool, address: u16, value: u16) {
        match address {
            TIMER_PRESET_ADDRESS => {
                // Loading the preset rearms the counter.
                self.preset = value;
                self.restart(cpu_time, value);
                self.expired = false;
            }
            TIMER_COUNTER_ADDRESS => {
                // Counter is read-only; hardware ignores stores.
            }
            TIMER_CONTROL_ADDRESS => {
                // Latch the current count before the mode changes.
                let current = self.counter_at(cpu_time);
                self.restart(cpu_time, current);
                self.control = value & CONTROL_WRITABLE & !CONTROL_EXPIRY;
                if value & CONTROL_EXPIRY == 0 {
                    self.expired = false;
                }
            }
            _ => {}
        }
    }

    fn save_state(&self, bag: &mut StateBag) {
        bag.insert("timer/preset".into(), self.preset.to_le_bytes().to_vec());
        bag.insert("timer/control".into(), self.control.to_le_bytes().to_vec());
    }

    fn restore_state(&mut self, bag: &StateBag) {
        if let Some(bytes) = bag.get("timer/preset") {
            if bytes.len() == 2 {
                self.preset = u16::from_le_bytes([bytes[0], bytes[1]]);
            }
        }
        if let Some(bytes) = bag.get("timer/control") {
            if bytes.len() == 2 {
                self.control = u16::from_le_bytes([bytes[0], bytes[1]]);
            }
        }
    }
}
