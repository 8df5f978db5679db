//! The CPU state machine and instruction step loop.

use bk_core::{Cycles, Observable, Value};

use crate::bus::{Bus, BusError};
use crate::decode::{decode, Op};
use crate::flags::{C, N, V, Z};
use crate::registers::Registers;

/// Bus error / odd address trap vector.
pub(crate) const VECTOR_BUS_ERROR: u16 = 0o4;
/// Reserved opcode trap vector.
pub(crate) const VECTOR_RESERVED: u16 = 0o10;
/// BPT trap vector.
pub(crate) const VECTOR_BPT: u16 = 0o14;
/// IOT trap vector.
pub(crate) const VECTOR_IOT: u16 = 0o20;
/// EMT trap vector.
pub(crate) const VECTOR_EMT: u16 = 0o30;
/// TRAP trap vector.
pub(crate) const VECTOR_TRAP: u16 = 0o34;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Normal execution.
    Running,
    /// WAIT executed, dormant until an interrupt arrives.
    Waiting,
    /// HALT executed, or a double bus fault.
    Halted,
}

/// A pending device interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptRequest {
    /// Trap vector address (new PC at `vector`, new PSW at `vector + 2`).
    pub vector: u16,
    /// Request priority; taken when it exceeds PSW bits 5-7.
    pub priority: u8,
}

/// The K1801VM1 CPU.
#[derive(Debug)]
pub struct Cpu {
    pub regs: Registers,
    state: State,
    pending: Vec<InterruptRequest>,
    /// Cycles since reset.
    pub(crate) total_cycles: Cycles,
    /// Cycle cost accumulated for the instruction in flight.
    pub(crate) op_cycles: u32,
}

impl Cpu {
    /// Create a new CPU in reset state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            state: State::Running,
            pending: Vec::new(),
            total_cycles: Cycles::ZERO,
            op_cycles: 0,
        }
    }

    /// Reset registers and state. PSW gets priority 7 with all flags clear;
    /// PC and SP are loaded by the machine from its start vector.
    pub fn reset(&mut self) {
        self.regs = Registers::new();
        self.regs.psw = 0o340;
        self.state = State::Running;
        self.pending.clear();
        self.total_cycles = Cycles::ZERO;
        self.op_cycles = 0;
    }

    /// Cycles elapsed since reset.
    #[must_use]
    pub const fn time(&self) -> Cycles {
        self.total_cycles
    }

    /// True after HALT or a double bus fault.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.state == State::Halted
    }

    /// Queue a device interrupt. It is taken between instructions once its
    /// priority exceeds the PSW priority field. A vector already pending
    /// is not queued twice.
    pub fn request_interrupt(&mut self, request: InterruptRequest) {
        if let Some(existing) = self
            .pending
            .iter_mut()
            .find(|pending| pending.vector == request.vector)
        {
            existing.priority = request.priority;
            return;
        }
        self.pending.push(request);
    }

    /// Read a general register (word-wide).
    #[must_use]
    pub fn read_register(&self, reg: usize) -> u16 {
        self.regs.read(reg)
    }

    /// Write a general register.
    pub fn write_register(&mut self, reg: usize, value: u16) {
        self.regs.write(reg, value);
    }

    /// The processor status word.
    #[must_use]
    pub const fn psw(&self) -> u16 {
        self.regs.psw
    }

    pub fn set_psw(&mut self, value: u16) {
        self.regs.psw = value;
    }

    /// Execute one instruction and return its cycle cost.
    ///
    /// Pending interrupts are checked first; a taken interrupt costs the
    /// trap-entry time and the instruction runs on the next step. A halted
    /// CPU does nothing and costs nothing. Traps never propagate out of
    /// here; bus faults become a trap through vector 4, reserved opcodes
    /// through vector 10.
    pub fn step<B: Bus>(&mut self, bus: &mut B) -> Cycles {
        if self.state == State::Halted {
            return Cycles::ZERO;
        }

        self.op_cycles = 0;

        if let Some(request) = self.take_pending_interrupt() {
            self.state = State::Running;
            self.trap(bus, request.vector);
            return self.account();
        }

        if self.state == State::Waiting {
            // Time passes while dormant so device timestamps keep moving.
            self.op_cycles = crate::timing::BASE_EXECUTION_TIME;
            return self.account();
        }

        let word = match self.fetch(bus) {
            Ok(word) => word,
            Err(_) => {
                self.trap(bus, VECTOR_BUS_ERROR);
                return self.account();
            }
        };

        let Some(entry) = decode(word) else {
            self.op_cycles = crate::timing::BASE_EXECUTION_TIME;
            self.trap(bus, VECTOR_RESERVED);
            return self.account();
        };

        self.op_cycles = entry.cycles;
        if let Err(_fault) = self.dispatch(bus, entry.op, entry.byte_mode, word) {
            self.trap(bus, VECTOR_BUS_ERROR);
        }
        self.account()
    }

    /// Fold the instruction cost into the running total.
    fn account(&mut self) -> Cycles {
        let cycles = Cycles::from(self.op_cycles);
        self.total_cycles += cycles;
        cycles
    }

    /// Fetch the instruction word at PC and advance PC.
    fn fetch<B: Bus>(&mut self, bus: &mut B) -> Result<u16, BusError> {
        let pc = self.regs.pc();
        let word = self.read_word_at(bus, pc)?;
        self.regs.set_pc(pc.wrapping_add(2));
        Ok(word)
    }

    /// Pop the highest-priority pending interrupt that outranks the PSW
    /// priority field, if any. The same rule wakes a waiting CPU.
    fn take_pending_interrupt(&mut self) -> Option<InterruptRequest> {
        let threshold = self.regs.priority();
        let best = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, request)| request.priority > threshold)
            .max_by_key(|(_, request)| request.priority)
            .map(|(index, _)| index)?;
        Some(self.pending.swap_remove(best))
    }

    fn dispatch<B: Bus>(
        &mut self,
        bus: &mut B,
        op: Op,
        byte_mode: bool,
        word: u16,
    ) -> Result<(), BusError> {
        match op {
            Op::Mov => self.exec_mov(bus, word, byte_mode),
            Op::Cmp => self.exec_cmp(bus, word, byte_mode),
            Op::Bit => self.exec_bit(bus, word, byte_mode),
            Op::Bic => self.exec_bic(bus, word, byte_mode),
            Op::Bis => self.exec_bis(bus, word, byte_mode),
            Op::Add => self.exec_add(bus, word),
            Op::Sub => self.exec_sub(bus, word),
            Op::Clr => self.exec_clr(bus, word, byte_mode),
            Op::Com => self.exec_com(bus, word, byte_mode),
            Op::Inc => self.exec_inc(bus, word, byte_mode),
            Op::Dec => self.exec_dec(bus, word, byte_mode),
            Op::Neg => self.exec_neg(bus, word, byte_mode),
            Op::Adc => self.exec_adc(bus, word, byte_mode),
            Op::Sbc => self.exec_sbc(bus, word, byte_mode),
            Op::Tst => self.exec_tst(bus, word, byte_mode),
            Op::Ror => self.exec_ror(bus, word, byte_mode),
            Op::Rol => self.exec_rol(bus, word, byte_mode),
            Op::Asr => self.exec_asr(bus, word, byte_mode),
            Op::Asl => self.exec_asl(bus, word, byte_mode),
            Op::Swab => self.exec_swab(bus, word),
            Op::Sxt => self.exec_sxt(bus, word),
            Op::Mfps => self.exec_mfps(bus, word),
            Op::Mtps => self.exec_mtps(bus, word),
            Op::Br
            | Op::Bne
            | Op::Beq
            | Op::Bge
            | Op::Blt
            | Op::Bgt
            | Op::Ble
            | Op::Bpl
            | Op::Bmi
            | Op::Bhi
            | Op::Blos
            | Op::Bvc
            | Op::Bvs
            | Op::Bcc
            | Op::Bcs => {
                self.exec_branch(op, word);
                Ok(())
            }
            Op::Jmp => self.exec_jmp(bus, word),
            Op::Jsr => self.exec_jsr(bus, word),
            Op::Rts => self.exec_rts(bus, word),
            Op::Mark => self.exec_mark(bus, word),
            Op::Sob => {
                self.exec_sob(word);
                Ok(())
            }
            Op::Emt => {
                self.trap(bus, VECTOR_EMT);
                Ok(())
            }
            Op::Trap => {
                self.trap(bus, VECTOR_TRAP);
                Ok(())
            }
            Op::Bpt => {
                self.trap(bus, VECTOR_BPT);
                Ok(())
            }
            Op::Iot => {
                self.trap(bus, VECTOR_IOT);
                Ok(())
            }
            Op::Rti | Op::Rtt => self.exec_rti(bus),
            Op::Halt => {
                self.state = State::Halted;
                Ok(())
            }
            Op::Wait => {
                self.state = State::Waiting;
                Ok(())
            }
            Op::Reset => {
                bus.reset_devices(self.total_cycles);
                Ok(())
            }
            Op::CondCode => {
                self.exec_cond_code(word);
                Ok(())
            }
        }
    }

    /// Halt after an unrecoverable fault inside trap entry.
    pub(crate) fn halt_on_double_fault(&mut self) {
        self.state = State::Halted;
    }
}

/// Source operand field of a double-operand instruction.
pub(crate) fn src_field(word: u16) -> u16 {
    (word >> 6) & 0o77
}

/// Destination operand field.
pub(crate) fn dst_field(word: u16) -> u16 {
    word & 0o77
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

const CPU_QUERY_PATHS: &[&str] = &[
    "r0", "r1", "r2", "r3", "r4", "r5", "sp", "pc", "psw", "flags.n", "flags.z", "flags.v",
    "flags.c", "priority", "halted", "waiting", "cycles",
];

impl Observable for Cpu {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "r0" => Some(self.regs.r[0].into()),
            "r1" => Some(self.regs.r[1].into()),
            "r2" => Some(self.regs.r[2].into()),
            "r3" => Some(self.regs.r[3].into()),
            "r4" => Some(self.regs.r[4].into()),
            "r5" => Some(self.regs.r[5].into()),
            "sp" => Some(self.regs.sp().into()),
            "pc" => Some(self.regs.pc().into()),
            "psw" => Some(self.regs.psw.into()),
            "flags.n" => Some(self.regs.flag(N).into()),
            "flags.z" => Some(self.regs.flag(Z).into()),
            "flags.v" => Some(self.regs.flag(V).into()),
            "flags.c" => Some(self.regs.flag(C).into()),
            "priority" => Some(Value::U8(self.regs.priority())),
            "halted" => Some((self.state == State::Halted).into()),
            "waiting" => Some((self.state == State::Waiting).into()),
            "cycles" => Some(self.total_cycles.get().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        CPU_QUERY_PATHS
    }
}
