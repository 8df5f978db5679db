//! Jump, subroutine linkage, interrupt return, and condition-code
//! operators.

use crate::addressing::Operand;
use crate::bus::{Bus, BusError};
use crate::cpu::{dst_field, Cpu, VECTOR_RESERVED};

impl Cpu {
    /// JMP dst. A register destination is a reserved encoding and traps.
    pub(crate) fn exec_jmp<B: Bus>(&mut self, bus: &mut B, word: u16) -> Result<(), BusError> {
        match self.resolve(bus, dst_field(word), false)? {
            Operand::Mem(target) => {
                self.regs.set_pc(target);
                Ok(())
            }
            Operand::Reg(_) => {
                self.trap(bus, VECTOR_RESERVED);
                Ok(())
            }
        }
    }

    /// JSR reg, dst: push the linkage register, move PC into it, jump.
    /// JSR PC, dst degenerates to an ordinary call.
    pub(crate) fn exec_jsr<B: Bus>(&mut self, bus: &mut B, word: u16) -> Result<(), BusError> {
        let linkage = ((word >> 6) & 7) as usize;
        match self.resolve(bus, dst_field(word), false)? {
            Operand::Mem(target) => {
                self.push_word(bus, self.regs.read(linkage))?;
                self.regs.write(linkage, self.regs.pc());
                self.regs.set_pc(target);
                Ok(())
            }
            Operand::Reg(_) => {
                self.trap(bus, VECTOR_RESERVED);
                Ok(())
            }
        }
    }

    /// RTS reg: return through the linkage register.
    pub(crate) fn exec_rts<B: Bus>(&mut self, bus: &mut B, word: u16) -> Result<(), BusError> {
        let linkage = (word & 7) as usize;
        self.regs.set_pc(self.regs.read(linkage));
        let value = self.pop_word(bus)?;
        self.regs.write(linkage, value);
        Ok(())
    }

    /// MARK n: stack cleanup for the standard subroutine convention.
    /// SP moves past n parameters, control returns through R5.
    pub(crate) fn exec_mark<B: Bus>(&mut self, bus: &mut B, word: u16) -> Result<(), BusError> {
        let count = word & 0o77;
        self.regs
            .set_sp(self.regs.pc().wrapping_add(count.wrapping_mul(2)));
        self.regs.set_pc(self.regs.read(5));
        let value = self.pop_word(bus)?;
        self.regs.write(5, value);
        Ok(())
    }

    /// RTI / RTT: pop PC then PSW.
    pub(crate) fn exec_rti<B: Bus>(&mut self, bus: &mut B) -> Result<(), BusError> {
        let pc = self.pop_word(bus)?;
        let psw = self.pop_word(bus)?;
        self.regs.set_pc(pc);
        self.regs.psw = psw;
        Ok(())
    }

    /// Condition-code operators 0o240-0o277: bit 4 selects set or clear,
    /// the low four bits select any combination of N, Z, V, C. NOP is the
    /// empty combination.
    pub(crate) fn exec_cond_code(&mut self, word: u16) {
        let flags = word & 0o17;
        if word & 0o20 != 0 {
            self.regs.psw |= flags;
        } else {
            self.regs.psw &= !flags;
        }
    }
}
