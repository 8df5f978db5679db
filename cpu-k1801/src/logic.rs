//! Data movement and logical instructions: MOV, BIT, BIC, BIS, CLR, COM,
//! TST, SXT, SWAB, and the PSW transfer pair MFPS/MTPS.

use crate::addressing::Operand;
use crate::arith::mask;
use crate::bus::{Bus, BusError};
use crate::cpu::{dst_field, src_field, Cpu};
use crate::flags::{C, N, T, V, Z};

impl Cpu {
    /// MOV(B) src, dst. V clears, C is preserved.
    ///
    /// MOVB into a register sign-extends, the one place byte mode writes a
    /// full word.
    pub(crate) fn exec_mov<B: Bus>(
        &mut self,
        bus: &mut B,
        word: u16,
        byte_mode: bool,
    ) -> Result<(), BusError> {
        let src_op = self.resolve(bus, src_field(word), byte_mode)?;
        let value = mask(self.read_operand(bus, src_op, byte_mode)?, byte_mode);
        let dst_op = self.resolve(bus, dst_field(word), byte_mode)?;

        self.regs.update_nz(byte_mode, value);
        self.regs.set_flag(V, false);

        if byte_mode {
            if let Operand::Reg(r) = dst_op {
                self.regs.write(r, value as u8 as i8 as i16 as u16);
                return Ok(());
            }
        }
        self.write_operand(bus, dst_op, byte_mode, value)
    }

    /// BIT(B) src, dst: flags from src & dst, no write.
    pub(crate) fn exec_bit<B: Bus>(
        &mut self,
        bus: &mut B,
        word: u16,
        byte_mode: bool,
    ) -> Result<(), BusError> {
        let src_op = self.resolve(bus, src_field(word), byte_mode)?;
        let src = mask(self.read_operand(bus, src_op, byte_mode)?, byte_mode);
        let dst_op = self.resolve(bus, dst_field(word), byte_mode)?;
        let dst = mask(self.read_operand(bus, dst_op, byte_mode)?, byte_mode);

        self.regs.update_nz(byte_mode, src & dst);
        self.regs.set_flag(V, false);
        Ok(())
    }

    /// BIC(B) src, dst: clear the src bits in dst.
    pub(crate) fn exec_bic<B: Bus>(
        &mut self,
        bus: &mut B,
        word: u16,
        byte_mode: bool,
    ) -> Result<(), BusError> {
        let src_op = self.resolve(bus, src_field(word), byte_mode)?;
        let src = mask(self.read_operand(bus, src_op, byte_mode)?, byte_mode);
        let dst_op = self.resolve(bus, dst_field(word), byte_mode)?;
        let dst = mask(self.read_operand(bus, dst_op, byte_mode)?, byte_mode);

        let result = dst & !src;
        self.regs.update_nz(byte_mode, result);
        self.regs.set_flag(V, false);
        self.write_operand(bus, dst_op, byte_mode, result)
    }

    /// BIS(B) src, dst: set the src bits in dst.
    pub(crate) fn exec_bis<B: Bus>(
        &mut self,
        bus: &mut B,
        word: u16,
        byte_mode: bool,
    ) -> Result<(), BusError> {
        let src_op = self.resolve(bus, src_field(word), byte_mode)?;
        let src = mask(self.read_operand(bus, src_op, byte_mode)?, byte_mode);
        let dst_op = self.resolve(bus, dst_field(word), byte_mode)?;
        let dst = mask(self.read_operand(bus, dst_op, byte_mode)?, byte_mode);

        let result = dst | src;
        self.regs.update_nz(byte_mode, result);
        self.regs.set_flag(V, false);
        self.write_operand(bus, dst_op, byte_mode, result)
    }

    /// CLR(B) dst: N and C clear, Z sets, V clears.
    pub(crate) fn exec_clr<B: Bus>(
        &mut self,
        bus: &mut B,
        word: u16,
        byte_mode: bool,
    ) -> Result<(), BusError> {
        let dst_op = self.resolve(bus, dst_field(word), byte_mode)?;
        self.regs.set_flag(N, false);
        self.regs.set_flag(Z, true);
        self.regs.set_flag(V, false);
        self.regs.set_flag(C, false);
        self.write_operand(bus, dst_op, byte_mode, 0)
    }

    /// COM(B) dst: ones' complement. C sets.
    pub(crate) fn exec_com<B: Bus>(
        &mut self,
        bus: &mut B,
        word: u16,
        byte_mode: bool,
    ) -> Result<(), BusError> {
        let dst_op = self.resolve(bus, dst_field(word), byte_mode)?;
        let dst = mask(self.read_operand(bus, dst_op, byte_mode)?, byte_mode);

        let result = mask(!dst, byte_mode);
        self.regs.update_nz(byte_mode, result);
        self.regs.set_flag(V, false);
        self.regs.set_flag(C, true);
        self.write_operand(bus, dst_op, byte_mode, result)
    }

    /// TST(B) dst: flags from the operand, V clears, C is preserved.
    pub(crate) fn exec_tst<B: Bus>(
        &mut self,
        bus: &mut B,
        word: u16,
        byte_mode: bool,
    ) -> Result<(), BusError> {
        let dst_op = self.resolve(bus, dst_field(word), byte_mode)?;
        let dst = mask(self.read_operand(bus, dst_op, byte_mode)?, byte_mode);

        self.regs.update_nz(byte_mode, dst);
        self.regs.set_flag(V, false);
        Ok(())
    }

    /// SXT dst: fill with the N flag. Z is the complement of N.
    pub(crate) fn exec_sxt<B: Bus>(&mut self, bus: &mut B, word: u16) -> Result<(), BusError> {
        let dst_op = self.resolve(bus, dst_field(word), false)?;
        let n = self.regs.flag(N);
        let result = if n { 0o177777 } else { 0 };
        self.regs.set_flag(Z, !n);
        self.regs.set_flag(V, false);
        self.write_operand(bus, dst_op, false, result)
    }

    /// SWAB dst: exchange the bytes. N and Z come from the new low byte;
    /// V and C clear.
    pub(crate) fn exec_swab<B: Bus>(&mut self, bus: &mut B, word: u16) -> Result<(), BusError> {
        let dst_op = self.resolve(bus, dst_field(word), false)?;
        let dst = self.read_operand(bus, dst_op, false)?;

        let result = dst.rotate_left(8);
        self.regs.update_nz_byte(result as u8);
        self.regs.set_flag(V, false);
        self.regs.set_flag(C, false);
        self.write_operand(bus, dst_op, false, result)
    }

    /// MFPS dst: move the PSW low byte. Sign-extends into a register like
    /// MOVB.
    pub(crate) fn exec_mfps<B: Bus>(&mut self, bus: &mut B, word: u16) -> Result<(), BusError> {
        let dst_op = self.resolve(bus, dst_field(word), true)?;
        let value = self.regs.psw & 0o377;

        self.regs.update_nz_byte(value as u8);
        self.regs.set_flag(V, false);

        if let Operand::Reg(r) = dst_op {
            self.regs.write(r, value as u8 as i8 as i16 as u16);
            return Ok(());
        }
        self.write_operand(bus, dst_op, true, value)
    }

    /// MTPS src: load condition codes and priority from the source byte.
    /// The trace bit and the high byte are unaffected.
    pub(crate) fn exec_mtps<B: Bus>(&mut self, bus: &mut B, word: u16) -> Result<(), BusError> {
        let src_op = self.resolve(bus, dst_field(word), true)?;
        let value = mask(self.read_operand(bus, src_op, true)?, true);

        let keep = self.regs.psw & (0o177400 | T);
        self.regs.psw = keep | (value & 0o357);
        Ok(())
    }
}
