//! Branch instructions and SOB.
//!
//! The low byte of a branch word is a signed displacement in words from the
//! updated PC. Each opcode is a predicate over the condition flags; the
//! signed comparisons combine N and V the PDP-11 way.

use crate::cpu::Cpu;
use crate::decode::Op;
use crate::flags::{C, N, V, Z};
use crate::timing::BRANCH_TAKEN_CYCLES;

impl Cpu {
    pub(crate) fn exec_branch(&mut self, op: Op, word: u16) {
        let n = self.regs.flag(N);
        let z = self.regs.flag(Z);
        let v = self.regs.flag(V);
        let c = self.regs.flag(C);

        let taken = match op {
            Op::Br => true,
            Op::Bne => !z,
            Op::Beq => z,
            Op::Bge => n == v,
            Op::Blt => n != v,
            Op::Bgt => !z && n == v,
            Op::Ble => z || n != v,
            Op::Bpl => !n,
            Op::Bmi => n,
            Op::Bhi => !c && !z,
            Op::Blos => c || z,
            Op::Bvc => !v,
            Op::Bvs => v,
            Op::Bcc => !c,
            Op::Bcs => c,
            _ => unreachable!("non-branch op in exec_branch"),
        };

        if taken {
            let displacement = i16::from(word as u8 as i8).wrapping_mul(2) as u16;
            self.regs.set_pc(self.regs.pc().wrapping_add(displacement));
            self.op_cycles += BRANCH_TAKEN_CYCLES;
        }
    }

    /// SOB reg, offset: decrement and branch back while non-zero. The six-bit
    /// offset counts words backwards from the updated PC.
    pub(crate) fn exec_sob(&mut self, word: u16) {
        let reg = ((word >> 6) & 7) as usize;
        let offset = (word & 0o77).wrapping_mul(2);
        let value = self.regs.read(reg).wrapping_sub(1);
        self.regs.write(reg, value);
        if value != 0 {
            self.regs.set_pc(self.regs.pc().wrapping_sub(offset));
            self.op_cycles += BRANCH_TAKEN_CYCLES;
        }
    }
}
