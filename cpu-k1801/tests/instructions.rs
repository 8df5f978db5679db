//! Instruction-level tests for the K1801VM1 core.
//!
//! Uses a flat 64K RAM bus so every address is mapped; machine-level
//! routing (ROM protection, devices) is tested in the machine crate.

use bk_core::{Cycles, Observable, Value};
use cpu_k1801::bus::{Bus, BusError};
use cpu_k1801::{Cpu, InterruptRequest, BASE_EXECUTION_TIME, C, N, V, Z};

/// Flat RAM covering the whole 16-bit space.
struct TestBus {
    data: Vec<u8>,
    resets: u32,
}

impl TestBus {
    fn new() -> Self {
        Self {
            data: vec![0; 0x1_0000],
            resets: 0,
        }
    }

    fn load_words(&mut self, addr: u16, words: &[u16]) {
        for (i, &word) in words.iter().enumerate() {
            let base = addr as usize + i * 2;
            self.data[base] = word as u8;
            self.data[base + 1] = (word >> 8) as u8;
        }
    }

    fn peek_word(&self, addr: u16) -> u16 {
        let base = addr as usize;
        u16::from(self.data[base]) | (u16::from(self.data[base + 1]) << 8)
    }
}

impl Bus for TestBus {
    fn read_word(&mut self, _time: Cycles, addr: u16) -> Result<u16, BusError> {
        Ok(self.peek_word(addr))
    }

    fn read_byte(&mut self, _time: Cycles, addr: u16) -> Result<u8, BusError> {
        Ok(self.data[addr as usize])
    }

    fn write_word(&mut self, _time: Cycles, addr: u16, value: u16) -> Result<(), BusError> {
        self.data[addr as usize] = value as u8;
        self.data[addr as usize + 1] = (value >> 8) as u8;
        Ok(())
    }

    fn write_byte(&mut self, _time: Cycles, addr: u16, value: u8) -> Result<(), BusError> {
        self.data[addr as usize] = value;
        Ok(())
    }

    fn reset_devices(&mut self, _time: Cycles) {
        self.resets += 1;
    }
}

const ORIGIN: u16 = 0o1000;

/// CPU with PSW 0o340, PC at ORIGIN, SP at 0o177600, program loaded.
fn setup(words: &[u16]) -> (Cpu, TestBus) {
    let mut bus = TestBus::new();
    bus.load_words(ORIGIN, words);
    let mut cpu = Cpu::new();
    cpu.reset();
    cpu.regs.set_pc(ORIGIN);
    cpu.regs.set_sp(0o177600);
    (cpu, bus)
}

fn flags(cpu: &Cpu) -> u16 {
    cpu.psw() & 0o17
}

// === Data movement ===

#[test]
fn mov_register_to_register() {
    // MOV R1, R0
    let (mut cpu, mut bus) = setup(&[0o010100]);
    cpu.write_register(1, 0o12345);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0o12345);
    assert_eq!(cpu.read_register(7), ORIGIN + 2);
    assert_eq!(flags(&cpu), 0);
}

#[test]
fn mov_preserves_carry_and_clears_overflow() {
    // SEC; SEV; MOV R1, R0
    let (mut cpu, mut bus) = setup(&[0o000261, 0o000262, 0o010100]);
    cpu.write_register(1, 0o100000);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(flags(&cpu), C | N);
}

#[test]
fn mov_immediate() {
    // MOV #0o12345, R0 (autoincrement on PC)
    let (mut cpu, mut bus) = setup(&[0o012700, 0o12345]);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0o12345);
    assert_eq!(cpu.read_register(7), ORIGIN + 4);
}

#[test]
fn mov_absolute() {
    // MOV @#0o2000, R0 (autoincrement deferred on PC)
    let (mut cpu, mut bus) = setup(&[0o013700, 0o2000]);
    bus.load_words(0o2000, &[0o54321]);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0o54321);
    assert_eq!(cpu.read_register(7), ORIGIN + 4);
}

#[test]
fn mov_pc_relative() {
    // MOV 0o2000, R0 assembled PC-relative: the base is the index word's
    // own address, so X = target - (ORIGIN + 2).
    let target: u16 = 0o2000;
    let x = target.wrapping_sub(ORIGIN + 2);
    let (mut cpu, mut bus) = setup(&[0o016700, x]);
    bus.load_words(target, &[0o4321]);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0o4321);
    assert_eq!(cpu.read_register(7), ORIGIN + 4);
}

#[test]
fn movb_to_register_sign_extends() {
    // MOVB R1, R0 with a negative byte
    let (mut cpu, mut bus) = setup(&[0o110100]);
    cpu.write_register(1, 0o200);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0o177600);
    assert_eq!(flags(&cpu), N);
}

#[test]
fn movb_to_memory_writes_one_byte() {
    // MOVB R1, @R0
    let (mut cpu, mut bus) = setup(&[0o110110]);
    cpu.write_register(0, 0o2001);
    cpu.write_register(1, 0o252);
    bus.load_words(0o2000, &[0o177777]);
    cpu.step(&mut bus);

    // High byte replaced, low byte untouched.
    assert_eq!(bus.peek_word(0o2000), 0o125377);
}

// === Comparison and bit tests ===

#[test]
fn cmp_sets_borrow_when_src_below_dst() {
    // CMP R0, R1: computes src - dst
    let (mut cpu, mut bus) = setup(&[0o020001]);
    cpu.write_register(0, 1);
    cpu.write_register(1, 2);
    cpu.step(&mut bus);

    assert_eq!(flags(&cpu), N | C);
    assert_eq!(cpu.read_register(0), 1);
    assert_eq!(cpu.read_register(1), 2);
}

#[test]
fn cmp_equal_sets_z_only() {
    let (mut cpu, mut bus) = setup(&[0o020001]);
    cpu.write_register(0, 0o7777);
    cpu.write_register(1, 0o7777);
    cpu.step(&mut bus);

    assert_eq!(flags(&cpu), Z);
}

#[test]
fn cmp_signed_overflow() {
    // 0o100000 (most negative) - 1 overflows
    let (mut cpu, mut bus) = setup(&[0o020001]);
    cpu.write_register(0, 0o100000);
    cpu.write_register(1, 1);
    cpu.step(&mut bus);

    assert!(cpu.psw() & V != 0);
}

#[test]
fn bit_tests_without_writing() {
    // BIT R0, R1
    let (mut cpu, mut bus) = setup(&[0o030001]);
    cpu.write_register(0, 0o170000);
    cpu.write_register(1, 0o100000);
    cpu.step(&mut bus);

    assert_eq!(flags(&cpu), N);
    assert_eq!(cpu.read_register(1), 0o100000);
}

#[test]
fn bic_clears_selected_bits() {
    // BIC R0, R1
    let (mut cpu, mut bus) = setup(&[0o040001]);
    cpu.write_register(0, 0o000377);
    cpu.write_register(1, 0o123456);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(1), 0o123400);
}

#[test]
fn bis_sets_selected_bits() {
    // BIS R0, R1
    let (mut cpu, mut bus) = setup(&[0o050001]);
    cpu.write_register(0, 0o000017);
    cpu.write_register(1, 0o123400);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(1), 0o123417);
}

// === Arithmetic ===

#[test]
fn add_with_carry_out() {
    // ADD R0, R1
    let (mut cpu, mut bus) = setup(&[0o060001]);
    cpu.write_register(0, 0o177777);
    cpu.write_register(1, 1);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(1), 0);
    assert_eq!(flags(&cpu), Z | C);
}

#[test]
fn add_signed_overflow() {
    let (mut cpu, mut bus) = setup(&[0o060001]);
    cpu.write_register(0, 0o077777);
    cpu.write_register(1, 1);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(1), 0o100000);
    assert_eq!(flags(&cpu), N | V);
}

#[test]
fn sub_borrow_and_result() {
    // SUB R0, R1: dst - src
    let (mut cpu, mut bus) = setup(&[0o160001]);
    cpu.write_register(0, 2);
    cpu.write_register(1, 1);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(1), 0o177777);
    assert_eq!(flags(&cpu), N | C);
}

#[test]
fn inc_overflow_preserves_carry() {
    // SEC; INC R0 at most positive
    let (mut cpu, mut bus) = setup(&[0o000261, 0o005200]);
    cpu.write_register(0, 0o077777);
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0o100000);
    assert_eq!(flags(&cpu), N | V | C);
}

#[test]
fn dec_overflow_at_most_negative() {
    let (mut cpu, mut bus) = setup(&[0o005300]);
    cpu.write_register(0, 0o100000);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0o077777);
    assert_eq!(flags(&cpu), V);
}

#[test]
fn neg_sets_carry_for_nonzero() {
    let (mut cpu, mut bus) = setup(&[0o005400]);
    cpu.write_register(0, 1);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0o177777);
    assert_eq!(flags(&cpu), N | C);
}

#[test]
fn neg_zero_clears_carry() {
    let (mut cpu, mut bus) = setup(&[0o005400]);
    cpu.write_register(0, 0);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0);
    assert_eq!(flags(&cpu), Z);
}

#[test]
fn adc_propagates_carry() {
    // SEC; ADC R0
    let (mut cpu, mut bus) = setup(&[0o000261, 0o005500]);
    cpu.write_register(0, 0o177777);
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0);
    assert_eq!(flags(&cpu), Z | C);
}

#[test]
fn sbc_borrows_from_zero() {
    // SEC; SBC R0
    let (mut cpu, mut bus) = setup(&[0o000261, 0o005600]);
    cpu.write_register(0, 0);
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0o177777);
    assert_eq!(flags(&cpu), N | C);
}

// === CLR / COM / TST / SXT / SWAB ===

#[test]
fn clr_clears_value_and_carry() {
    // SEC; CLR R0
    let (mut cpu, mut bus) = setup(&[0o000261, 0o005000]);
    cpu.write_register(0, 0o123456);
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0);
    assert_eq!(flags(&cpu), Z);
}

#[test]
fn com_complements_and_sets_carry() {
    let (mut cpu, mut bus) = setup(&[0o005100]);
    cpu.write_register(0, 0o170000);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0o007777);
    assert_eq!(flags(&cpu), C);
}

#[test]
fn tst_preserves_carry() {
    // SEC; TST R0 — C carries through a test instruction.
    let (mut cpu, mut bus) = setup(&[0o000261, 0o005700]);
    cpu.write_register(0, 0);
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(flags(&cpu), Z | C);
}

#[test]
fn tst_word_zero_and_negative() {
    // TST R0 twice over different values
    let (mut cpu, mut bus) = setup(&[0o005700, 0o005700]);
    cpu.write_register(0, 0);
    cpu.step(&mut bus);
    assert_eq!(cpu.psw(), 0o340 | Z);

    cpu.write_register(0, 0o100000);
    cpu.step(&mut bus);
    assert_eq!(cpu.psw(), 0o340 | N);
}

#[test]
fn tstb_checks_low_byte_sign() {
    // TSTB R0 with only bit 7 set
    let (mut cpu, mut bus) = setup(&[0o105700]);
    cpu.write_register(0, 0o200);
    cpu.step(&mut bus);

    assert_eq!(cpu.psw(), 0o340 | N);
}

#[test]
fn sxt_fills_from_n() {
    // SEN; SXT R0
    let (mut cpu, mut bus) = setup(&[0o000270, 0o006700]);
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0o177777);
    assert!(cpu.psw() & Z == 0);
}

#[test]
fn swab_exchanges_bytes() {
    let (mut cpu, mut bus) = setup(&[0o000300]);
    cpu.write_register(0, 0o377);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(7), ORIGIN + 2);
    assert_eq!(cpu.read_register(0), 0o177400);
    // Z from the new low byte, V and C cleared.
    assert_eq!(cpu.psw(), 0o340 | Z);
}

// === MFPS / MTPS ===

#[test]
fn mfps_reads_status_byte() {
    // SEC; SEV; MFPS R0
    let (mut cpu, mut bus) = setup(&[0o000261, 0o000262, 0o106700]);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    // PSW low byte is 0o343 (priority 7 + C + V); bit 7 set, so the
    // register receives the sign-extended byte.
    assert_eq!(cpu.read_register(0), 0o177743);
}

#[test]
fn mtps_loads_flags_and_priority() {
    // MTPS #0o017
    let (mut cpu, mut bus) = setup(&[0o106427, 0o017]);
    cpu.step(&mut bus);

    assert_eq!(cpu.psw() & 0o357, 0o017);
    assert_eq!(cpu.psw() & 0o340, 0);
}

// === Shifts and rotates ===

#[test]
fn asr_preserves_sign_and_sets_carry() {
    let (mut cpu, mut bus) = setup(&[0o006200]);
    cpu.write_register(0, 0o100001);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0o140000);
    // N set, C from shifted-out bit, V = N xor C = 0.
    assert_eq!(flags(&cpu), N | C);
}

#[test]
fn asl_shifts_out_the_sign() {
    let (mut cpu, mut bus) = setup(&[0o006300]);
    cpu.write_register(0, 0o100000);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0);
    // C set, N clear, so V = N xor C = 1.
    assert_eq!(flags(&cpu), Z | V | C);
}

#[test]
fn ror_rotates_through_carry() {
    // SEC; ROR R0
    let (mut cpu, mut bus) = setup(&[0o000261, 0o006000]);
    cpu.write_register(0, 0);
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0o100000);
    // Carry out is 0, N is 1, V = N xor C = 1.
    assert_eq!(flags(&cpu), N | V);
}

#[test]
fn rol_rotates_through_carry() {
    // SEC; ROL R0
    let (mut cpu, mut bus) = setup(&[0o000261, 0o006100]);
    cpu.write_register(0, 0o100000);
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 1);
    // Carry out is 1, N is 0, so V = N xor C sets alongside C.
    assert_eq!(flags(&cpu), V | C);
}

#[test]
fn rolb_operates_on_the_low_byte() {
    let (mut cpu, mut bus) = setup(&[0o106100]);
    cpu.write_register(0, 0o300);
    cpu.step(&mut bus);

    // Low byte 0o300 << 1 = 0o200 with carry out; high byte preserved.
    assert_eq!(cpu.read_register(0), 0o200);
    assert_eq!(flags(&cpu), N | C);
}

// === Branches ===

#[test]
fn bcc_taken_moves_pc_by_displacement() {
    // BCC +1 word
    let (mut cpu, mut bus) = setup(&[0o103001]);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(7), ORIGIN + 4);
}

#[test]
fn bcs_not_taken_falls_through() {
    let (mut cpu, mut bus) = setup(&[0o103401]);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(7), ORIGIN + 2);
}

#[test]
fn br_backwards() {
    // BR -2 words (displacement 0o376 = -2)
    let (mut cpu, mut bus) = setup(&[0o000776]);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(7), ORIGIN - 2);
}

#[test]
fn signed_branches_follow_n_xor_v() {
    // SEN; BLT +1
    let (mut cpu, mut bus) = setup(&[0o000270, 0o002401]);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.read_register(7), ORIGIN + 6);

    // SEN; SEV; BGE +1 (N == V means greater-or-equal)
    let (mut cpu, mut bus) = setup(&[0o000270, 0o000262, 0o002001]);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.read_register(7), ORIGIN + 8);
}

#[test]
fn bhi_requires_carry_and_zero_clear() {
    // BHI +1 with C and Z clear
    let (mut cpu, mut bus) = setup(&[0o101001]);
    cpu.step(&mut bus);
    assert_eq!(cpu.read_register(7), ORIGIN + 4);

    // SEC; BHI +1 not taken
    let (mut cpu, mut bus) = setup(&[0o000261, 0o101001]);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.read_register(7), ORIGIN + 4);
}

#[test]
fn sob_loops_until_zero() {
    // SOB R0, 1 (branch back one word to itself)
    let (mut cpu, mut bus) = setup(&[0o077001]);
    cpu.write_register(0, 3);

    cpu.step(&mut bus);
    assert_eq!(cpu.read_register(7), ORIGIN);
    cpu.step(&mut bus);
    assert_eq!(cpu.read_register(7), ORIGIN);
    cpu.step(&mut bus);
    assert_eq!(cpu.read_register(7), ORIGIN + 2);
    assert_eq!(cpu.read_register(0), 0);
}

// === Jump and subroutine linkage ===

#[test]
fn jmp_through_memory_mode() {
    // JMP @#0o2000
    let (mut cpu, mut bus) = setup(&[0o000137, 0o2000]);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(7), 0o2000);
}

#[test]
fn jmp_register_is_reserved() {
    // JMP R0 traps through vector 10
    let (mut cpu, mut bus) = setup(&[0o000100]);
    bus.load_words(0o10, &[0o4000, 0o340]);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(7), 0o4000);
}

#[test]
fn jsr_rts_round_trip() {
    // JSR R5, @#0o2000 ... at 0o2000: RTS R5
    let (mut cpu, mut bus) = setup(&[0o004537, 0o2000]);
    bus.load_words(0o2000, &[0o000205]);
    cpu.write_register(5, 0o7777);

    cpu.step(&mut bus);
    assert_eq!(cpu.read_register(7), 0o2000);
    assert_eq!(cpu.read_register(5), ORIGIN + 4);
    assert_eq!(cpu.read_register(6), 0o177576);
    assert_eq!(bus.peek_word(0o177576), 0o7777);

    cpu.step(&mut bus);
    assert_eq!(cpu.read_register(7), ORIGIN + 4);
    assert_eq!(cpu.read_register(5), 0o7777);
    assert_eq!(cpu.read_register(6), 0o177600);
}

#[test]
fn jsr_pc_is_a_plain_call() {
    // JSR PC, @#0o2000
    let (mut cpu, mut bus) = setup(&[0o004737, 0o2000]);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(7), 0o2000);
    assert_eq!(bus.peek_word(0o177576), ORIGIN + 4);
}

#[test]
fn mark_unwinds_parameters() {
    // MARK 2 at ORIGIN; saved R5 lives past two parameter words.
    let (mut cpu, mut bus) = setup(&[0o006402]);
    cpu.write_register(5, 0o2000);
    bus.load_words(ORIGIN + 2 + 4, &[0o3333]);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(7), 0o2000);
    assert_eq!(cpu.read_register(5), 0o3333);
    assert_eq!(cpu.read_register(6), ORIGIN + 2 + 4 + 2);
}

// === Stack discipline ===

#[test]
fn push_pop_round_trip_restores_sp() {
    // MOV R0, -(SP); MOV (SP)+, R1
    let (mut cpu, mut bus) = setup(&[0o010046, 0o012601]);
    cpu.write_register(0, 0o31415);

    cpu.step(&mut bus);
    assert_eq!(cpu.read_register(6), 0o177576);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(1), 0o31415);
    assert_eq!(cpu.read_register(6), 0o177600);
}

#[test]
fn byte_autoincrement_steps_sp_by_two() {
    // MOVB (SP)+, R0 — stack stays word aligned in byte mode.
    let (mut cpu, mut bus) = setup(&[0o112600]);
    bus.load_words(0o177600, &[0o000101]);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0o101);
    assert_eq!(cpu.read_register(6), 0o177602);
}

#[test]
fn byte_autoincrement_steps_general_register_by_one() {
    // MOVB (R1)+, R0
    let (mut cpu, mut bus) = setup(&[0o112100]);
    cpu.write_register(1, 0o2000);
    bus.load_words(0o2000, &[0o000101]);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0o101);
    assert_eq!(cpu.read_register(1), 0o2001);
}

#[test]
fn autodecrement_deferred_follows_pointer() {
    // MOV @-(R1), R0
    let (mut cpu, mut bus) = setup(&[0o015100]);
    cpu.write_register(1, 0o2002);
    bus.load_words(0o2000, &[0o3000]);
    bus.load_words(0o3000, &[0o55555]);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0o55555);
    assert_eq!(cpu.read_register(1), 0o2000);
}

#[test]
fn index_mode_read() {
    // MOV 0o20(R1), R0
    let (mut cpu, mut bus) = setup(&[0o016100, 0o20]);
    cpu.write_register(1, 0o1000);
    bus.load_words(0o1020, &[0o12345]);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0o12345);
    assert_eq!(cpu.read_register(7), ORIGIN + 4);
}

#[test]
fn index_deferred_mode_read() {
    // MOV @0o20(R1), R0
    let (mut cpu, mut bus) = setup(&[0o017100, 0o20]);
    cpu.write_register(1, 0o1000);
    bus.load_words(0o1020, &[0o3000]);
    bus.load_words(0o3000, &[0o42]);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(0), 0o42);
}

#[test]
fn two_index_operands_consume_in_order() {
    // MOV 0o20(R1), 0o30(R2)
    let (mut cpu, mut bus) = setup(&[0o016162, 0o20, 0o30]);
    cpu.write_register(1, 0o2000);
    cpu.write_register(2, 0o3000);
    bus.load_words(0o2020, &[0o1234]);
    cpu.step(&mut bus);

    assert_eq!(bus.peek_word(0o3030), 0o1234);
    assert_eq!(cpu.read_register(7), ORIGIN + 6);
}

// === Traps and system control ===

#[test]
fn emt_pushes_state_and_vectors() {
    let (mut cpu, mut bus) = setup(&[0o104000]);
    bus.load_words(0o30, &[0o4000, 0o140]);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(7), 0o4000);
    assert_eq!(cpu.psw(), 0o140);
    assert_eq!(cpu.read_register(6), 0o177574);
    // PSW pushed first (higher address), then return PC.
    assert_eq!(bus.peek_word(0o177576), 0o340);
    assert_eq!(bus.peek_word(0o177574), ORIGIN + 2);
}

#[test]
fn trap_instruction_uses_vector_34() {
    let (mut cpu, mut bus) = setup(&[0o104400]);
    bus.load_words(0o34, &[0o5000, 0o340]);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(7), 0o5000);
}

#[test]
fn bpt_and_iot_vectors() {
    let (mut cpu, mut bus) = setup(&[0o000003]);
    bus.load_words(0o14, &[0o4100, 0o340]);
    cpu.step(&mut bus);
    assert_eq!(cpu.read_register(7), 0o4100);

    let (mut cpu, mut bus) = setup(&[0o000004]);
    bus.load_words(0o20, &[0o4200, 0o340]);
    cpu.step(&mut bus);
    assert_eq!(cpu.read_register(7), 0o4200);
}

#[test]
fn rti_restores_pc_and_psw() {
    // EMT; handler at 0o4000 does RTI.
    let (mut cpu, mut bus) = setup(&[0o104000, 0o000240]);
    bus.load_words(0o30, &[0o4000, 0o140]);
    bus.load_words(0o4000, &[0o000002]);

    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(7), ORIGIN + 2);
    assert_eq!(cpu.psw(), 0o340);
    assert_eq!(cpu.read_register(6), 0o177600);
}

#[test]
fn reserved_opcode_traps_through_10() {
    let (mut cpu, mut bus) = setup(&[0o000007]);
    bus.load_words(0o10, &[0o4300, 0o340]);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(7), 0o4300);
}

#[test]
fn odd_pc_traps_through_4() {
    let (mut cpu, mut bus) = setup(&[]);
    bus.load_words(0o4, &[0o4400, 0o340]);
    cpu.regs.set_pc(0o1001);
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(7), 0o4400);
}

#[test]
fn double_fault_halts() {
    // Odd PC and odd SP: the trap frame push faults too.
    let (mut cpu, mut bus) = setup(&[]);
    cpu.regs.set_pc(0o1001);
    cpu.regs.set_sp(0o1001);
    cpu.step(&mut bus);

    assert!(cpu.is_halted());
    assert_eq!(cpu.step(&mut bus), Cycles::ZERO);
}

#[test]
fn halt_stops_the_machine() {
    let (mut cpu, mut bus) = setup(&[0o000000, 0o000240]);
    cpu.step(&mut bus);

    assert!(cpu.is_halted());
    assert_eq!(cpu.query("halted"), Some(Value::Bool(true)));
    // Further steps do nothing.
    cpu.step(&mut bus);
    assert_eq!(cpu.read_register(7), ORIGIN + 2);
}

#[test]
fn reset_instruction_resets_devices() {
    let (mut cpu, mut bus) = setup(&[0o000005]);
    cpu.step(&mut bus);

    assert_eq!(bus.resets, 1);
    assert!(!cpu.is_halted());
}

// === Interrupts ===

#[test]
fn interrupt_taken_when_priority_exceeds_psw() {
    let (mut cpu, mut bus) = setup(&[0o000240]);
    bus.load_words(0o100, &[0o4500, 0o340]);
    cpu.set_psw(0o200); // priority 4

    cpu.request_interrupt(InterruptRequest {
        vector: 0o100,
        priority: 5,
    });
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(7), 0o4500);
    assert_eq!(cpu.psw(), 0o340);
}

#[test]
fn interrupt_deferred_below_psw_priority() {
    let (mut cpu, mut bus) = setup(&[0o000240]);
    cpu.request_interrupt(InterruptRequest {
        vector: 0o100,
        priority: 5,
    });
    // PSW priority 7 masks it; the NOP executes instead.
    cpu.step(&mut bus);

    assert_eq!(cpu.read_register(7), ORIGIN + 2);
}

#[test]
fn wait_sleeps_until_interrupt() {
    let (mut cpu, mut bus) = setup(&[0o000001, 0o000240]);
    bus.load_words(0o100, &[0o4600, 0o340]);
    // Drop priority so the later request outranks the PSW.
    cpu.set_psw(0);

    cpu.step(&mut bus);
    // Dormant: PC does not advance, time does.
    let before = cpu.time();
    cpu.step(&mut bus);
    assert_eq!(cpu.read_register(7), ORIGIN + 2);
    assert!(cpu.time() > before);

    cpu.request_interrupt(InterruptRequest {
        vector: 0o100,
        priority: 1,
    });
    cpu.step(&mut bus);
    assert_eq!(cpu.read_register(7), 0o4600);
}

// === Cycle accounting ===

#[test]
fn cycles_are_base_plus_mode_surcharges() {
    // MOV R0, R1: both operands register mode.
    let (mut cpu, mut bus) = setup(&[0o010001]);
    let cycles = cpu.step(&mut bus);
    assert_eq!(cycles, Cycles::new(u64::from(BASE_EXECUTION_TIME)));

    // MOV (R0)+, 0o20(R1): mode 2 source (+4), mode 6 destination (+8).
    let (mut cpu, mut bus) = setup(&[0o012061, 0o20]);
    cpu.write_register(0, 0o2000);
    cpu.write_register(1, 0o3000);
    let cycles = cpu.step(&mut bus);
    assert_eq!(
        cycles,
        Cycles::new(u64::from(BASE_EXECUTION_TIME + 4 + 8))
    );
}

#[test]
fn taken_branch_costs_more() {
    let (mut cpu, mut bus) = setup(&[0o103001]); // BCC, taken
    let taken = cpu.step(&mut bus);

    let (mut cpu, mut bus) = setup(&[0o103401]); // BCS, not taken
    let skipped = cpu.step(&mut bus);

    assert!(taken > skipped);
}

#[test]
fn total_cycles_accumulate() {
    let (mut cpu, mut bus) = setup(&[0o000240, 0o000240]);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.time(), Cycles::new(u64::from(BASE_EXECUTION_TIME) * 2));
    assert_eq!(
        cpu.query("cycles"),
        Some(Value::U64(u64::from(BASE_EXECUTION_TIME) * 2))
    );
}
