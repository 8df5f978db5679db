//! Memory bus interface seen by the CPU.

use bk_core::Cycles;

/// A failed bus access.
///
/// Faults carry the offending address for diagnostics; the CPU converts any
/// of them into a trap through vector 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// No region or device claims the address.
    Unmapped(u16),
    /// Write to a read-only region.
    ReadOnly(u16),
    /// Word access at an odd address.
    OddAddress(u16),
}

/// Memory and I/O bus interface.
///
/// The machine routes each access to RAM, ROM, or a memory-mapped device.
/// The current CPU time is threaded through so devices can timestamp
/// accesses (the audio output records edge times in CPU cycles).
pub trait Bus {
    /// Read a word from an even address.
    fn read_word(&mut self, time: Cycles, addr: u16) -> Result<u16, BusError>;

    /// Read a byte from any address.
    fn read_byte(&mut self, time: Cycles, addr: u16) -> Result<u8, BusError>;

    /// Write a word to an even address.
    fn write_word(&mut self, time: Cycles, addr: u16, value: u16) -> Result<(), BusError>;

    /// Write a byte to any address.
    fn write_byte(&mut self, time: Cycles, addr: u16, value: u8) -> Result<(), BusError>;

    /// Reset all devices (the RESET instruction).
    fn reset_devices(&mut self, _time: Cycles) {}
}
