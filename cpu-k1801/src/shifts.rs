//! Shift and rotate instructions.
//!
//! All four set C from the shifted-out bit and V from N xor C computed on
//! the result; the rotates go through the carry bit.

use crate::arith::{mask, sign_bit};
use crate::bus::{Bus, BusError};
use crate::cpu::{dst_field, Cpu};
use crate::flags::{C, N, V};

impl Cpu {
    /// ASR(B) dst: arithmetic shift right, sign preserved.
    pub(crate) fn exec_asr<B: Bus>(
        &mut self,
        bus: &mut B,
        word: u16,
        byte_mode: bool,
    ) -> Result<(), BusError> {
        let dst_op = self.resolve(bus, dst_field(word), byte_mode)?;
        let dst = mask(self.read_operand(bus, dst_op, byte_mode)?, byte_mode);

        let result = (dst >> 1) | (dst & sign_bit(byte_mode));
        self.set_shift_flags(byte_mode, result, dst & 1 != 0);
        self.write_operand(bus, dst_op, byte_mode, result)
    }

    /// ASL(B) dst: shift left, zero fill.
    pub(crate) fn exec_asl<B: Bus>(
        &mut self,
        bus: &mut B,
        word: u16,
        byte_mode: bool,
    ) -> Result<(), BusError> {
        let dst_op = self.resolve(bus, dst_field(word), byte_mode)?;
        let dst = mask(self.read_operand(bus, dst_op, byte_mode)?, byte_mode);

        let result = mask(dst << 1, byte_mode);
        self.set_shift_flags(byte_mode, result, dst & sign_bit(byte_mode) != 0);
        self.write_operand(bus, dst_op, byte_mode, result)
    }

    /// ROR(B) dst: rotate right through carry.
    pub(crate) fn exec_ror<B: Bus>(
        &mut self,
        bus: &mut B,
        word: u16,
        byte_mode: bool,
    ) -> Result<(), BusError> {
        let dst_op = self.resolve(bus, dst_field(word), byte_mode)?;
        let dst = mask(self.read_operand(bus, dst_op, byte_mode)?, byte_mode);
        let carry_in = if self.regs.flag(C) {
            sign_bit(byte_mode)
        } else {
            0
        };

        let result = (dst >> 1) | carry_in;
        self.set_shift_flags(byte_mode, result, dst & 1 != 0);
        self.write_operand(bus, dst_op, byte_mode, result)
    }

    /// ROL(B) dst: rotate left through carry.
    pub(crate) fn exec_rol<B: Bus>(
        &mut self,
        bus: &mut B,
        word: u16,
        byte_mode: bool,
    ) -> Result<(), BusError> {
        let dst_op = self.resolve(bus, dst_field(word), byte_mode)?;
        let dst = mask(self.read_operand(bus, dst_op, byte_mode)?, byte_mode);
        let carry_in = u16::from(self.regs.flag(C));

        let result = mask((dst << 1) | carry_in, byte_mode);
        self.set_shift_flags(byte_mode, result, dst & sign_bit(byte_mode) != 0);
        self.write_operand(bus, dst_op, byte_mode, result)
    }

    /// Common shift flags: N and Z from the result, C from the shifted-out
    /// bit, V from N xor C afterwards.
    fn set_shift_flags(&mut self, byte_mode: bool, result: u16, carry_out: bool) {
        self.regs.update_nz(byte_mode, result);
        self.regs.set_flag(C, carry_out);
        let n = self.regs.flag(N);
        self.regs.set_flag(V, n != carry_out);
    }
}
