//! Memory-mapped device contract.

use bk_core::Cycles;
use cpu_k1801::InterruptRequest;
use std::collections::HashMap;

/// Opaque save-state container: device-chosen keys to raw bytes.
pub type StateBag = HashMap<String, Vec<u8>>;

/// A memory-mapped device.
///
/// Devices claim individual word addresses on the bus. Callbacks receive
/// the current CPU time in cycles and run synchronously on the CPU thread;
/// they must not block. Devices hold no reference back to the machine.
pub trait Device: Send {
    /// Word addresses claimed by this device. Several devices may claim
    /// the same address; reads OR together, writes go to every claimant.
    fn addresses(&self) -> &[u16];

    /// Called on machine reset with the (restarted) CPU time.
    fn init(&mut self, cpu_time: Cycles);

    /// Read the register at `address`. Write-only devices return 0.
    fn read(&mut self, cpu_time: Cycles, address: u16) -> u16;

    /// Write the register at `address`. For byte accesses the bus merges
    /// the byte into the current word and passes `byte_mode = true`.
    fn write(&mut self, cpu_time: Cycles, byte_mode: bool, address: u16, value: u16);

    /// Polled between instructions; return a pending interrupt, if any.
    fn interrupt(&mut self, _cpu_time: Cycles) -> Option<InterruptRequest> {
        None
    }

    /// Persist device state. Devices without durable state keep the no-op.
    fn save_state(&self, _bag: &mut StateBag) {}

    /// Restore device state saved by `save_state`.
    fn restore_state(&mut self, _bag: &StateBag) {}
}
