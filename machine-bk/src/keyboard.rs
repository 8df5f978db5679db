//! Keyboard controller.
//!
//! Two registers: status at 0o177660 (bit 7 = data ready, bit 6 = interrupt
//! disable, the BK's inverted sense) and data at 0o177662 (reading clears
//! the ready bit). A ready key with interrupts enabled raises vector 0o60,
//! or 0o274 for AR2-prefixed keys.
//!
//! The host presses keys through a [`KeyboardHandle`], which stays valid
//! after the device is boxed onto the bus.

use bk_core::Cycles;
use cpu_k1801::InterruptRequest;
use std::sync::{Arc, Mutex};

use crate::device::{Device, StateBag};

/// Status register address.
pub const KBD_STATUS_ADDRESS: u16 = 0o177660;
/// Data register address.
pub const KBD_DATA_ADDRESS: u16 = 0o177662;

/// Plain key interrupt vector.
pub const KBD_VECTOR: u16 = 0o60;
/// AR2-prefixed key interrupt vector.
pub const KBD_VECTOR_AR2: u16 = 0o274;

const STATUS_READY: u16 = 1 << 7;
const STATUS_IRQ_DISABLE: u16 = 1 << 6;

const ADDRESSES: [u16; 2] = [KBD_STATUS_ADDRESS, KBD_DATA_ADDRESS];

#[derive(Default)]
struct KeyboardState {
    code: u16,
    ready: bool,
    ar2: bool,
    irq_disable: bool,
    irq_pending: bool,
}

/// Host-side handle for delivering key presses.
#[derive(Clone)]
pub struct KeyboardHandle {
    state: Arc<Mutex<KeyboardState>>,
}

impl KeyboardHandle {
    /// Latch a key press. Codes are 7-bit; `ar2` marks the AR2 prefix,
    /// which selects the alternate vector.
    pub fn press_key(&self, code: u8, ar2: bool) {
        let mut state = self.state.lock().expect("keyboard state poisoned");
        state.code = u16::from(code & 0o177);
        state.ar2 = ar2;
        state.ready = true;
        if !state.irq_disable {
            state.irq_pending = true;
        }
    }
}

/// Keyboard controller device.
pub struct Keyboard {
    state: Arc<Mutex<KeyboardState>>,
}

impl Keyboard {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(KeyboardState::default())),
        }
    }

    /// Handle for the host input path.
    #[must_use]
    pub fn handle(&self) -> KeyboardHandle {
        KeyboardHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for Keyboard {
    fn addresses(&self) -> &[u16] {
        &ADDRESSES
    }

    fn init(&mut self, _cpu_time: Cycles) {
        let mut state = self.state.lock().expect("keyboard state poisoned");
        state.ready = false;
        state.irq_pending = false;
        state.code = 0;
    }

    fn read(&mut self, _cpu_time: Cycles, address: u16) -> u16 {
        let mut state = self.state.lock().expect("keyboard state poisoned");
        match address {
            KBD_STATUS_ADDRESS => {
                let mut status = 0;
                if state.ready {
                    status |= STATUS_READY;
                }
                if state.irq_disable {
                    status |= STATUS_IRQ_DISABLE;
                }
                status
            }
            KBD_DATA_ADDRESS => {
                state.ready = false;
                state.code
            }
            _ => 0,
        }
    }

    fn write(&mut self, _cpu_time: Cycles, _byte_mode: bool, address: u16, value: u16) {
        // Only the interrupt-disable bit of the status register is writable.
        if address == KBD_STATUS_ADDRESS {
            let mut state = self.state.lock().expect("keyboard state poisoned");
            state.irq_disable = value & STATUS_IRQ_DISABLE != 0;
        }
    }

    fn interrupt(&mut self, _cpu_time: Cycles) -> Option<InterruptRequest> {
        let mut state = self.state.lock().expect("keyboard state poisoned");
        if !state.irq_pending {
            return None;
        }
        state.irq_pending = false;
        Some(InterruptRequest {
            vector: if state.ar2 {
                KBD_VECTOR_AR2
            } else {
                KBD_VECTOR
            },
            priority: 4,
        })
    }

    fn save_state(&self, bag: &mut StateBag) {
        let state = self.state.lock().expect("keyboard state poisoned");
        bag.insert(
            "keyboard/irq_disable".into(),
            vec![u8::from(state.irq_disable)],
        );
    }

    fn restore_state(&mut self, bag: &StateBag) {
        if let Some(bytes) = bag.get("keyboard/irq_disable") {
            let mut state = self.state.lock().expect("keyboard state poisoned");
            state.irq_disable = bytes.first().copied().unwrap_or(0) != 0;
        }
    }
}
