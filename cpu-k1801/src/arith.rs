//! Arithmetic instructions: ADD, SUB, CMP and the single-operand
//! increment/decrement/negate/carry family.
//!
//! Overflow is computed from the operand signs versus the result sign;
//! carry is the unsigned carry out for ADD and the borrow for the
//! subtracting forms.

use crate::bus::{Bus, BusError};
use crate::cpu::{dst_field, src_field, Cpu};
use crate::flags::{C, V};

/// Mask a value to the operation width.
pub(crate) fn mask(value: u16, byte_mode: bool) -> u16 {
    if byte_mode {
        value & 0o377
    } else {
        value
    }
}

/// Sign bit for the operation width.
pub(crate) fn sign_bit(byte_mode: bool) -> u16 {
    if byte_mode {
        0o200
    } else {
        0o100000
    }
}

/// Largest positive value for the operation width.
fn sign_max(byte_mode: bool) -> u16 {
    sign_bit(byte_mode) - 1
}

/// All-ones for the operation width.
fn all_ones(byte_mode: bool) -> u16 {
    if byte_mode {
        0o377
    } else {
        0o177777
    }
}

impl Cpu {
    /// ADD src, dst (word only).
    pub(crate) fn exec_add<B: Bus>(&mut self, bus: &mut B, word: u16) -> Result<(), BusError> {
        let src_op = self.resolve(bus, src_field(word), false)?;
        let src = self.read_operand(bus, src_op, false)?;
        let dst_op = self.resolve(bus, dst_field(word), false)?;
        let dst = self.read_operand(bus, dst_op, false)?;

        let result = dst.wrapping_add(src);
        self.regs.update_nz_word(result);
        self.regs
            .set_flag(V, (src ^ result) & (dst ^ result) & 0o100000 != 0);
        self.regs
            .set_flag(C, u32::from(src) + u32::from(dst) > 0o177777);
        self.write_operand(bus, dst_op, false, result)
    }

    /// SUB src, dst (word only): dst - src.
    pub(crate) fn exec_sub<B: Bus>(&mut self, bus: &mut B, word: u16) -> Result<(), BusError> {
        let src_op = self.resolve(bus, src_field(word), false)?;
        let src = self.read_operand(bus, src_op, false)?;
        let dst_op = self.resolve(bus, dst_field(word), false)?;
        let dst = self.read_operand(bus, dst_op, false)?;

        let result = dst.wrapping_sub(src);
        self.regs.update_nz_word(result);
        self.regs
            .set_flag(V, (src ^ dst) & (dst ^ result) & 0o100000 != 0);
        self.regs.set_flag(C, dst < src);
        self.write_operand(bus, dst_op, false, result)
    }

    /// CMP src, dst: computes src - dst and sets flags only.
    pub(crate) fn exec_cmp<B: Bus>(
        &mut self,
        bus: &mut B,
        word: u16,
        byte_mode: bool,
    ) -> Result<(), BusError> {
        let src_op = self.resolve(bus, src_field(word), byte_mode)?;
        let src = mask(self.read_operand(bus, src_op, byte_mode)?, byte_mode);
        let dst_op = self.resolve(bus, dst_field(word), byte_mode)?;
        let dst = mask(self.read_operand(bus, dst_op, byte_mode)?, byte_mode);

        let result = mask(src.wrapping_sub(dst), byte_mode);
        self.regs.update_nz(byte_mode, result);
        self.regs
            .set_flag(V, (src ^ dst) & (src ^ result) & sign_bit(byte_mode) != 0);
        self.regs.set_flag(C, src < dst);
        Ok(())
    }

    /// INC(B) dst. C is unaffected.
    pub(crate) fn exec_inc<B: Bus>(
        &mut self,
        bus: &mut B,
        word: u16,
        byte_mode: bool,
    ) -> Result<(), BusError> {
        let dst_op = self.resolve(bus, dst_field(word), byte_mode)?;
        let dst = mask(self.read_operand(bus, dst_op, byte_mode)?, byte_mode);

        let result = mask(dst.wrapping_add(1), byte_mode);
        self.regs.update_nz(byte_mode, result);
        self.regs.set_flag(V, dst == sign_max(byte_mode));
        self.write_operand(bus, dst_op, byte_mode, result)
    }

    /// DEC(B) dst. C is unaffected.
    pub(crate) fn exec_dec<B: Bus>(
        &mut self,
        bus: &mut B,
        word: u16,
        byte_mode: bool,
    ) -> Result<(), BusError> {
        let dst_op = self.resolve(bus, dst_field(word), byte_mode)?;
        let dst = mask(self.read_operand(bus, dst_op, byte_mode)?, byte_mode);

        let result = mask(dst.wrapping_sub(1), byte_mode);
        self.regs.update_nz(byte_mode, result);
        self.regs.set_flag(V, dst == sign_bit(byte_mode));
        self.write_operand(bus, dst_op, byte_mode, result)
    }

    /// NEG(B) dst: two's complement.
    pub(crate) fn exec_neg<B: Bus>(
        &mut self,
        bus: &mut B,
        word: u16,
        byte_mode: bool,
    ) -> Result<(), BusError> {
        let dst_op = self.resolve(bus, dst_field(word), byte_mode)?;
        let dst = mask(self.read_operand(bus, dst_op, byte_mode)?, byte_mode);

        let result = mask(0u16.wrapping_sub(dst), byte_mode);
        self.regs.update_nz(byte_mode, result);
        self.regs.set_flag(V, result == sign_bit(byte_mode));
        self.regs.set_flag(C, result != 0);
        self.write_operand(bus, dst_op, byte_mode, result)
    }

    /// ADC(B) dst: add the carry bit.
    pub(crate) fn exec_adc<B: Bus>(
        &mut self,
        bus: &mut B,
        word: u16,
        byte_mode: bool,
    ) -> Result<(), BusError> {
        let dst_op = self.resolve(bus, dst_field(word), byte_mode)?;
        let dst = mask(self.read_operand(bus, dst_op, byte_mode)?, byte_mode);
        let carry = u16::from(self.regs.flag(C));

        let result = mask(dst.wrapping_add(carry), byte_mode);
        self.regs.update_nz(byte_mode, result);
        self.regs
            .set_flag(V, dst == sign_max(byte_mode) && carry != 0);
        self.regs
            .set_flag(C, dst == all_ones(byte_mode) && carry != 0);
        self.write_operand(bus, dst_op, byte_mode, result)
    }

    /// SBC(B) dst: subtract the carry bit.
    pub(crate) fn exec_sbc<B: Bus>(
        &mut self,
        bus: &mut B,
        word: u16,
        byte_mode: bool,
    ) -> Result<(), BusError> {
        let dst_op = self.resolve(bus, dst_field(word), byte_mode)?;
        let dst = mask(self.read_operand(bus, dst_op, byte_mode)?, byte_mode);
        let carry = u16::from(self.regs.flag(C));

        let result = mask(dst.wrapping_sub(carry), byte_mode);
        self.regs.update_nz(byte_mode, result);
        self.regs.set_flag(V, dst == sign_bit(byte_mode));
        self.regs.set_flag(C, dst == 0 && carry != 0);
        self.write_operand(bus, dst_op, byte_mode, result)
    }
}
