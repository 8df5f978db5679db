//! Instruction decode.
//!
//! Decoding is a fixed table scan: each entry carries the significant opcode
//! bits, the mask selecting them, the operation tag, the byte-mode flag, and
//! the base cycle cost. The table is ordered most-specific-mask first, so a
//! linear scan resolves overlapping encodings (HALT before the
//! condition-code group, SWAB before the branch range) correctly.

use crate::timing::BASE_EXECUTION_TIME;

/// Operation tag. The step loop matches on this to call the handler; the
/// table itself stays a static data structure with no function pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    // Double operand.
    Mov,
    Cmp,
    Bit,
    Bic,
    Bis,
    Add,
    Sub,
    // Single operand.
    Clr,
    Com,
    Inc,
    Dec,
    Neg,
    Adc,
    Sbc,
    Tst,
    Ror,
    Rol,
    Asr,
    Asl,
    Swab,
    Sxt,
    Mfps,
    Mtps,
    // Branches.
    Br,
    Bne,
    Beq,
    Bge,
    Blt,
    Bgt,
    Ble,
    Bpl,
    Bmi,
    Bhi,
    Blos,
    Bvc,
    Bvs,
    Bcc,
    Bcs,
    // Jump and subroutine.
    Jmp,
    Jsr,
    Rts,
    Mark,
    Sob,
    // Traps and system control.
    Emt,
    Trap,
    Bpt,
    Iot,
    Rti,
    Rtt,
    Halt,
    Wait,
    Reset,
    // Condition-code operators (NOP, CLx, SEx and combinations).
    CondCode,
}

/// One row of the opcode table.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeEntry {
    /// Significant opcode bits.
    pub bits: u16,
    /// Mask selecting the significant bits.
    pub mask: u16,
    /// Operation tag.
    pub op: Op,
    /// Byte variant of the operation.
    pub byte_mode: bool,
    /// Base execution time in cycles, before addressing-mode surcharges.
    pub cycles: u32,
}

const fn word(bits: u16, mask: u16, op: Op, cycles: u32) -> OpcodeEntry {
    OpcodeEntry {
        bits,
        mask,
        op,
        byte_mode: false,
        cycles,
    }
}

const fn byte(bits: u16, mask: u16, op: Op, cycles: u32) -> OpcodeEntry {
    OpcodeEntry {
        bits,
        mask,
        op,
        byte_mode: true,
        cycles,
    }
}

const BASE: u32 = BASE_EXECUTION_TIME;

/// The opcode table, ordered most-specific mask first.
pub static OPCODES: &[OpcodeEntry] = &[
    // Zero-operand system instructions, exact match.
    word(0o000000, 0o177777, Op::Halt, BASE),
    word(0o000001, 0o177777, Op::Wait, BASE),
    word(0o000002, 0o177777, Op::Rti, 24),
    word(0o000003, 0o177777, Op::Bpt, BASE),
    word(0o000004, 0o177777, Op::Iot, BASE),
    word(0o000005, 0o177777, Op::Reset, BASE),
    word(0o000006, 0o177777, Op::Rtt, 24),
    // RTS: low three bits select the linkage register.
    word(0o000200, 0o177770, Op::Rts, 20),
    // Condition-code operators: 0o240-0o277.
    word(0o000240, 0o177740, Op::CondCode, BASE),
    // Single operand, mask 0o177700.
    word(0o000100, 0o177700, Op::Jmp, BASE),
    word(0o000300, 0o177700, Op::Swab, BASE),
    word(0o005000, 0o177700, Op::Clr, BASE),
    byte(0o105000, 0o177700, Op::Clr, BASE),
    word(0o005100, 0o177700, Op::Com, BASE),
    byte(0o105100, 0o177700, Op::Com, BASE),
    word(0o005200, 0o177700, Op::Inc, BASE),
    byte(0o105200, 0o177700, Op::Inc, BASE),
    word(0o005300, 0o177700, Op::Dec, BASE),
    byte(0o105300, 0o177700, Op::Dec, BASE),
    word(0o005400, 0o177700, Op::Neg, BASE),
    byte(0o105400, 0o177700, Op::Neg, BASE),
    word(0o005500, 0o177700, Op::Adc, BASE),
    byte(0o105500, 0o177700, Op::Adc, BASE),
    word(0o005600, 0o177700, Op::Sbc, BASE),
    byte(0o105600, 0o177700, Op::Sbc, BASE),
    word(0o005700, 0o177700, Op::Tst, BASE),
    byte(0o105700, 0o177700, Op::Tst, BASE),
    word(0o006000, 0o177700, Op::Ror, BASE),
    byte(0o106000, 0o177700, Op::Ror, BASE),
    word(0o006100, 0o177700, Op::Rol, BASE),
    byte(0o106100, 0o177700, Op::Rol, BASE),
    word(0o006200, 0o177700, Op::Asr, BASE),
    byte(0o106200, 0o177700, Op::Asr, BASE),
    word(0o006300, 0o177700, Op::Asl, BASE),
    byte(0o106300, 0o177700, Op::Asl, BASE),
    word(0o006400, 0o177700, Op::Mark, 20),
    word(0o006700, 0o177700, Op::Sxt, BASE),
    byte(0o106400, 0o177700, Op::Mtps, BASE),
    byte(0o106700, 0o177700, Op::Mfps, BASE),
    // Branches: high byte is the opcode, low byte the displacement.
    word(0o000400, 0o177400, Op::Br, BASE),
    word(0o001000, 0o177400, Op::Bne, BASE),
    word(0o001400, 0o177400, Op::Beq, BASE),
    word(0o002000, 0o177400, Op::Bge, BASE),
    word(0o002400, 0o177400, Op::Blt, BASE),
    word(0o003000, 0o177400, Op::Bgt, BASE),
    word(0o003400, 0o177400, Op::Ble, BASE),
    word(0o100000, 0o177400, Op::Bpl, BASE),
    word(0o100400, 0o177400, Op::Bmi, BASE),
    word(0o101000, 0o177400, Op::Bhi, BASE),
    word(0o101400, 0o177400, Op::Blos, BASE),
    word(0o102000, 0o177400, Op::Bvc, BASE),
    word(0o102400, 0o177400, Op::Bvs, BASE),
    word(0o103000, 0o177400, Op::Bcc, BASE),
    word(0o103400, 0o177400, Op::Bcs, BASE),
    // Programmed traps: low byte is the operand.
    word(0o104000, 0o177400, Op::Emt, BASE),
    word(0o104400, 0o177400, Op::Trap, BASE),
    // JSR and SOB carry a register field in bits 6-8.
    word(0o004000, 0o177000, Op::Jsr, 20),
    word(0o077000, 0o177000, Op::Sob, BASE),
    // Double operand: bits 14-12 select the opcode, bit 15 the byte form.
    word(0o010000, 0o170000, Op::Mov, BASE),
    byte(0o110000, 0o170000, Op::Mov, BASE),
    word(0o020000, 0o170000, Op::Cmp, BASE),
    byte(0o120000, 0o170000, Op::Cmp, BASE),
    word(0o030000, 0o170000, Op::Bit, BASE),
    byte(0o130000, 0o170000, Op::Bit, BASE),
    word(0o040000, 0o170000, Op::Bic, BASE),
    byte(0o140000, 0o170000, Op::Bic, BASE),
    word(0o050000, 0o170000, Op::Bis, BASE),
    byte(0o150000, 0o170000, Op::Bis, BASE),
    word(0o060000, 0o170000, Op::Add, BASE),
    word(0o160000, 0o170000, Op::Sub, BASE),
];

/// Find the table entry for an instruction word.
///
/// Returns `None` for reserved encodings; the CPU traps those through
/// vector 10.
#[must_use]
pub fn decode(word: u16) -> Option<&'static OpcodeEntry> {
    OPCODES.iter().find(|entry| word & entry.mask == entry.bits)
}
