//! The system configuration register (SEL1).
//!
//! Reading it supplies the CPU start address in the high byte, which the
//! power-up sequence loads into PC, plus latched system bits. The audio
//! output claims the same address for the write side; reads from both
//! claimants OR together on the bus.

use bk_core::Cycles;

use crate::device::{Device, StateBag};

/// Address of the system register.
pub const SEL1_ADDRESS: u16 = 0o177716;

const WRITABLE_BITS: u16 = 0o377;

/// System register device: start-address source plus latched low byte.
pub struct Sel1Register {
    start_address: u16,
    latched: u16,
}

impl Sel1Register {
    /// `start_address` is what reset finds in the high byte (0o100000 for
    /// the standard BK-0010 ROM layout).
    #[must_use]
    pub fn new(start_address: u16) -> Self {
        Self {
            start_address: start_address & 0o177400,
            latched: 0,
        }
    }
}

impl Device for Sel1Register {
    fn addresses(&self) -> &[u16] {
        &[SEL1_ADDRESS]
    }

    fn init(&mut self, _cpu_time: Cycles) {
        self.latched = 0;
    }

    fn read(&mut self, _cpu_time: Cycles, _address: u16) -> u16 {
        self.start_address | self.latched
    }

    fn write(&mut self, _cpu_time: Cycles, _byte_mode: bool, _address: u16, value: u16) {
        self.latched = value & WRITABLE_BITS;
    }

    fn save_state(&self, bag: &mut StateBag) {
        bag.insert("sel1/latched".into(), self.latched.to_le_bytes().to_vec());
    }

    fn restore_state(&mut self, bag: &StateBag) {
        if let Some(bytes) = bag.get("sel1/latched") {
            if bytes.len() == 2 {
                self.latched = u16::from_le_bytes([bytes[0], bytes[1]]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_returns_start_address_with_latched_bits() {
        let mut sel1 = Sel1Register::new(0o100000);
        assert_eq!(sel1.read(Cycles::ZERO, SEL1_ADDRESS), 0o100000);

        sel1.write(Cycles::ZERO, false, SEL1_ADDRESS, 0o100);
        assert_eq!(sel1.read(Cycles::ZERO, SEL1_ADDRESS), 0o100100);
    }

    #[test]
    fn state_round_trips() {
        let mut sel1 = Sel1Register::new(0o100000);
        sel1.write(Cycles::ZERO, false, SEL1_ADDRESS, 0o252);

        let mut bag = StateBag::new();
        sel1.save_state(&mut bag);

        let mut restored = Sel1Register::new(0o100000);
        restored.restore_state(&bag);
        assert_eq!(restored.read(Cycles::ZERO, SEL1_ADDRESS), 0o100252);
    }
}
