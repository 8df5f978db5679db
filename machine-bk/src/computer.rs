//! The computer facade: CPU + bus + clock, with the host construction API.

use bk_core::{Cycles, MasterClock};
use cpu_k1801::Cpu;

use crate::device::{Device, StateBag};
use crate::memory::{MemoryMap, MemoryRegion};
use crate::sel1::SEL1_ADDRESS;

/// K1801VM1 clock frequency of the BK-0010.
pub const CLOCK_FREQUENCY_HZ: u64 = 3_000_000;

/// Where the standard ROM layout places the start vector.
pub const START_ADDRESS: u16 = 0o100000;

/// Initial stack pointer after reset.
pub const INITIAL_STACK: u16 = 0o177600;

/// A complete BK-0010 machine.
///
/// The computer is a value carrying its whole state; tests can hold as
/// many instances as they like.
pub struct Computer {
    cpu: Cpu,
    bus: MemoryMap,
    clock: MasterClock,
}

impl Computer {
    /// A computer with an empty memory map. Populate it with
    /// [`add_memory`](Self::add_memory) and [`add_device`](Self::add_device),
    /// then call [`reset`](Self::reset).
    #[must_use]
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            bus: MemoryMap::new(),
            clock: MasterClock::new(CLOCK_FREQUENCY_HZ),
        }
    }

    /// Insert a RAM or ROM region.
    pub fn add_memory(&mut self, region: MemoryRegion) {
        self.bus.add_region(region);
    }

    /// Register a device under the addresses it claims.
    pub fn add_device(&mut self, device: Box<dyn Device>) {
        self.bus.add_device(device);
    }

    /// Reset the machine: devices are re-initialized at CPU time zero, PSW
    /// gets 0o340, SP the initial stack, and PC the start vector read from
    /// the system register (zero if nothing claims it).
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.bus.reset_devices(Cycles::ZERO);

        use cpu_k1801::bus::Bus;
        let start = self
            .bus
            .read_word(Cycles::ZERO, SEL1_ADDRESS)
            .map(|vector| vector & 0o177400)
            .unwrap_or(0);
        self.cpu.regs.set_pc(start);
        self.cpu.regs.set_sp(INITIAL_STACK);
    }

    /// Execute one instruction; returns its cycle cost (zero once halted).
    pub fn execute_single_instruction(&mut self) -> Cycles {
        let cycles = self.cpu.step(&mut self.bus);
        let now = self.cpu.time();
        for device in self.bus.devices_mut() {
            if let Some(request) = device.interrupt(now) {
                self.cpu.request_interrupt(request);
            }
        }
        cycles
    }

    /// Run whole instructions until at least `nanos` of simulated time have
    /// elapsed (or the CPU halts). Returns the cycles actually consumed.
    pub fn execute_for(&mut self, nanos: u64) -> Cycles {
        let start = self.cpu.time();
        let target = start + self.clock.nanos_to_cycles(nanos);
        while self.cpu.time() < target {
            if self.execute_single_instruction() == Cycles::ZERO {
                break;
            }
        }
        self.cpu.time() - start
    }

    /// Read a word from the bus. `None` on a bus error.
    pub fn read_memory_word(&mut self, addr: u16) -> Option<u16> {
        use cpu_k1801::bus::Bus;
        let now = self.cpu.time();
        self.bus.read_word(now, addr).ok()
    }

    /// Write a word to the bus. `false` on a bus error (ROM, unmapped).
    pub fn write_memory_word(&mut self, addr: u16, value: u16) -> bool {
        use cpu_k1801::bus::Bus;
        let now = self.cpu.time();
        self.bus.write_word(now, addr, value).is_ok()
    }

    #[must_use]
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    #[must_use]
    pub fn clock(&self) -> MasterClock {
        self.clock
    }

    /// Cycles elapsed since reset.
    #[must_use]
    pub fn cpu_time(&self) -> Cycles {
        self.cpu.time()
    }

    /// Simulated nanoseconds for a cycle count.
    #[must_use]
    pub fn cpu_time_nanos(&self, cycles: Cycles) -> u64 {
        self.clock.cycles_to_nanos(cycles)
    }

    /// Cycle count for a span of simulated nanoseconds.
    #[must_use]
    pub fn nanos_to_cpu_time(&self, nanos: u64) -> Cycles {
        self.clock.nanos_to_cycles(nanos)
    }

    /// Collect CPU registers and every device's state into a bag.
    /// CPU time is not persisted; the cycle counter keeps running.
    #[must_use]
    pub fn save_state(&self) -> StateBag {
        let mut bag = StateBag::new();
        for (index, value) in self.cpu.regs.r.iter().enumerate() {
            bag.insert(format!("cpu/r{index}"), value.to_le_bytes().to_vec());
        }
        bag.insert("cpu/psw".into(), self.cpu.psw().to_le_bytes().to_vec());
        for device in self.bus.devices() {
            device.save_state(&mut bag);
        }
        bag
    }

    /// Restore a bag produced by [`save_state`](Self::save_state).
    pub fn restore_state(&mut self, bag: &StateBag) {
        for index in 0..8 {
            if let Some(bytes) = bag.get(&format!("cpu/r{index}")) {
                if bytes.len() == 2 {
                    self.cpu
                        .write_register(index, u16::from_le_bytes([bytes[0], bytes[1]]));
                }
            }
        }
        if let Some(bytes) = bag.get("cpu/psw") {
            if bytes.len() == 2 {
                self.cpu.set_psw(u16::from_le_bytes([bytes[0], bytes[1]]));
            }
        }
        for device in self.bus.devices_mut() {
            device.restore_state(bag);
        }
    }
}

impl Default for Computer {
    fn default() -> Self {
        Self::new()
    }
}
