//! Instructions with a 16-bit absolute operand (`!abs`).
//!
//! Cycle 1 fetches the opcode, cycles 2 and 3 receive the address low and
//! high bytes. What follows depends on the instruction.

use crate::alu::{self, AluOp, AluTrace};
use crate::cpu::Step;
use crate::instructions::{Instruction, Reg};
use crate::verify::{Evidence, Violation};

/// Cycles 1 and 2. Returns false once the caller owns the cycle.
fn fetch_address_low(step: &mut Step<'_>) -> bool {
    match step.cycle() {
        1 => step.fetch_next(),
        2 => {
            let low = step.data_in();
            step.latch(u16::from(low));
            step.fetch_next();
        }
        _ => return false,
    }
    true
}

/// The full address in the cycle that receives its high byte.
fn absolute_address(step: &Step<'_>) -> u16 {
    (u16::from(step.data_in()) << 8) | (step.operand() & 0x00FF)
}

/// Cycles 1-3 read the addressed byte; from cycle 4 on, returns it.
fn read_operand(step: &mut Step<'_>) -> Option<u8> {
    if fetch_address_low(step) {
        return None;
    }
    if step.cycle() == 3 {
        let target = absolute_address(step);
        step.read(target);
        return None;
    }
    Some(step.data_in())
}

/// `A <- A op !abs` (4 cycles).
fn accumulate(step: &mut Step<'_>, op: AluOp) {
    if let Some(value) = read_operand(step) {
        let a = step.regs().a;
        let result = step.alu(op, a, value);
        step.set_a(result);
        step.fetch_next();
        step.finish();
    }
}

/// `CMP reg, !abs` (4 cycles). Only the flags change.
fn compare(step: &mut Step<'_>, reg: Reg) {
    if let Some(value) = read_operand(step) {
        let lhs = reg.get(step.regs());
        step.alu(AluOp::Cmp, lhs, value);
        step.fetch_next();
        step.finish();
    }
}

/// `MOV reg, !abs` (4 cycles). The byte passes through `OR 0` for N and Z.
fn load(step: &mut Step<'_>, reg: Reg) {
    if let Some(value) = read_operand(step) {
        let result = step.alu(AluOp::Or, value, 0);
        step.set(reg, result);
        step.fetch_next();
        step.finish();
    }
}

/// `MOV !abs, reg` (5 cycles).
fn store(step: &mut Step<'_>, reg: Reg) {
    if fetch_address_low(step) {
        return;
    }
    match step.cycle() {
        3 => {
            let target = absolute_address(step);
            let value = reg.get(step.regs());
            step.write(target, value);
        }
        4 => {}
        _ => {
            step.fetch_next();
            step.finish();
        }
    }
}

/// Read-modify-write of `!abs` (5 cycles).
fn modify(step: &mut Step<'_>, op: AluOp) {
    if step.cycle() <= 3 {
        read_operand(step);
    } else if step.cycle() == 4 {
        let value = step.data_in();
        let target = step.address();
        let result = step.alu(op, value, 0);
        step.write(target, result);
    } else {
        step.fetch_next();
        step.finish();
    }
}

fn exec_or(step: &mut Step<'_>) {
    accumulate(step, AluOp::Or);
}

fn exec_and(step: &mut Step<'_>) {
    accumulate(step, AluOp::And);
}

fn exec_eor(step: &mut Step<'_>) {
    accumulate(step, AluOp::Eor);
}

fn exec_adc(step: &mut Step<'_>) {
    accumulate(step, AluOp::Adc);
}

fn exec_sbc(step: &mut Step<'_>) {
    accumulate(step, AluOp::Sbc);
}

fn exec_cmp_a(step: &mut Step<'_>) {
    compare(step, Reg::A);
}

fn exec_cmp_x(step: &mut Step<'_>) {
    compare(step, Reg::X);
}

fn exec_cmp_y(step: &mut Step<'_>) {
    compare(step, Reg::Y);
}

fn exec_mov_a(step: &mut Step<'_>) {
    load(step, Reg::A);
}

fn exec_mov_x(step: &mut Step<'_>) {
    load(step, Reg::X);
}

fn exec_mov_y(step: &mut Step<'_>) {
    load(step, Reg::Y);
}

fn exec_store_a(step: &mut Step<'_>) {
    store(step, Reg::A);
}

fn exec_store_x(step: &mut Step<'_>) {
    store(step, Reg::X);
}

fn exec_store_y(step: &mut Step<'_>) {
    store(step, Reg::Y);
}

fn exec_asl(step: &mut Step<'_>) {
    modify(step, AluOp::Asl);
}

fn exec_rol(step: &mut Step<'_>) {
    modify(step, AluOp::Rol);
}

fn exec_lsr(step: &mut Step<'_>) {
    modify(step, AluOp::Lsr);
}

fn exec_ror(step: &mut Step<'_>) {
    modify(step, AluOp::Ror);
}

fn exec_dec(step: &mut Step<'_>) {
    modify(step, AluOp::Dec);
}

fn exec_inc(step: &mut Step<'_>) {
    modify(step, AluOp::Inc);
}

/// JMP !abs: PC <- abs (3 cycles).
fn exec_jmp(step: &mut Step<'_>) {
    if fetch_address_low(step) {
        return;
    }
    let target = absolute_address(step);
    step.set_pc(target);
    step.read(target);
    step.finish();
}

/// CALL !abs: push the return address high byte first, then jump (8 cycles).
fn exec_call(step: &mut Step<'_>) {
    if fetch_address_low(step) {
        return;
    }
    match step.cycle() {
        3 => {
            let target = absolute_address(step);
            step.latch(target);
            step.advance_pc();
        }
        5 => {
            let [_, high] = step.regs().pc.to_le_bytes();
            push(step, high);
        }
        6 => {
            let [low, _] = step.regs().pc.to_le_bytes();
            push(step, low);
        }
        8 => {
            let target = step.operand();
            step.set_pc(target);
            step.read(target);
            step.finish();
        }
        _ => {}
    }
}

fn push(step: &mut Step<'_>, value: u8) {
    let regs = *step.regs();
    step.write(regs.stack_address(), value);
    step.set_sp(regs.sp.wrapping_sub(1));
}

// Contracts

/// Checks the two operand-byte reads and returns the address they encode.
fn check_address(ev: &Evidence<'_>) -> Result<u16, Violation> {
    let pc = ev.pre().pc;
    let low = ev.expect_read_at(1, pc.wrapping_add(1))?;
    let high = ev.expect_read_at(2, pc.wrapping_add(2))?;
    Ok(u16::from_le_bytes([low.data, high.data]))
}

/// Common shape of the 4-cycle reads: returns the operand byte.
fn check_operand_read(ev: &Evidence<'_>) -> Result<u8, Violation> {
    ev.expect_accesses(4, 0)?;
    let target = check_address(ev)?;
    let operand = ev.expect_read_at(3, target)?;
    ev.expect_idle(2..=4)?;
    Ok(operand.data)
}

/// The last cycle ran `op` on `a`/`b`; `dest`, if any, took the result.
fn check_alu_result(
    ev: &Evidence<'_>,
    op: AluOp,
    a: u8,
    b: u8,
    dest: Option<Reg>,
) -> Result<(), Violation> {
    let pre = *ev.pre();
    let out = alu::compute(op, a, b, pre.psw);
    let trace = AluTrace {
        op,
        a,
        b,
        result: out.result,
    };
    ev.expect_alu(1, trace)?;

    let mut want = pre;
    want.pc = pre.pc.wrapping_add(3);
    want.psw = out.flags;
    if let Some(reg) = dest {
        reg.set(&mut want, out.result);
    }
    ev.expect_post(&want)
}

fn check_accumulate(ev: &Evidence<'_>, op: AluOp) -> Result<(), Violation> {
    let value = check_operand_read(ev)?;
    check_alu_result(ev, op, ev.pre().a, value, Some(Reg::A))
}

fn check_compare(ev: &Evidence<'_>, reg: Reg) -> Result<(), Violation> {
    let value = check_operand_read(ev)?;
    check_alu_result(ev, AluOp::Cmp, reg.get(ev.pre()), value, None)
}

fn check_load(ev: &Evidence<'_>, reg: Reg) -> Result<(), Violation> {
    let value = check_operand_read(ev)?;
    check_alu_result(ev, AluOp::Or, value, 0, Some(reg))
}

fn check_store(ev: &Evidence<'_>, reg: Reg) -> Result<(), Violation> {
    ev.expect_accesses(3, 1)?;
    let target = check_address(ev)?;
    let pre = *ev.pre();
    ev.expect_write(0, target, reg.get(&pre))?;
    ev.expect_idle(1..=5)?;

    let mut want = pre;
    want.pc = pre.pc.wrapping_add(3);
    ev.expect_post(&want)
}

fn check_modify(ev: &Evidence<'_>, op: AluOp) -> Result<(), Violation> {
    ev.expect_accesses(4, 1)?;
    let target = check_address(ev)?;
    let value = ev.expect_read_at(3, target)?.data;

    let pre = *ev.pre();
    let out = alu::compute(op, value, 0, pre.psw);
    let trace = AluTrace {
        op,
        a: value,
        b: 0,
        result: out.result,
    };
    ev.expect_alu(2, trace)?;
    ev.expect_idle(1..=1)?;
    ev.expect_idle(3..=5)?;
    ev.expect_write(0, target, out.result)?;

    let mut want = pre;
    want.pc = pre.pc.wrapping_add(3);
    want.psw = out.flags;
    ev.expect_post(&want)
}

fn check_or(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_accumulate(ev, AluOp::Or)
}

fn check_and(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_accumulate(ev, AluOp::And)
}

fn check_eor(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_accumulate(ev, AluOp::Eor)
}

fn check_adc(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_accumulate(ev, AluOp::Adc)
}

fn check_sbc(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_accumulate(ev, AluOp::Sbc)
}

fn check_cmp_a(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_compare(ev, Reg::A)
}

fn check_cmp_x(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_compare(ev, Reg::X)
}

fn check_cmp_y(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_compare(ev, Reg::Y)
}

fn check_mov_a(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_load(ev, Reg::A)
}

fn check_mov_x(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_load(ev, Reg::X)
}

fn check_mov_y(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_load(ev, Reg::Y)
}

fn check_store_a(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_store(ev, Reg::A)
}

fn check_store_x(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_store(ev, Reg::X)
}

fn check_store_y(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_store(ev, Reg::Y)
}

fn check_asl(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_modify(ev, AluOp::Asl)
}

fn check_rol(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_modify(ev, AluOp::Rol)
}

fn check_lsr(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_modify(ev, AluOp::Lsr)
}

fn check_ror(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_modify(ev, AluOp::Ror)
}

fn check_dec(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_modify(ev, AluOp::Dec)
}

fn check_inc(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_modify(ev, AluOp::Inc)
}

fn check_jmp(ev: &Evidence<'_>) -> Result<(), Violation> {
    ev.expect_accesses(3, 0)?;
    let target = check_address(ev)?;
    ev.expect_idle(1..=3)?;

    let mut want = *ev.pre();
    want.pc = target;
    ev.expect_post(&want)
}

fn check_call(ev: &Evidence<'_>) -> Result<(), Violation> {
    ev.expect_accesses(3, 2)?;
    let target = check_address(ev)?;
    let pre = *ev.pre();
    let [ret_low, ret_high] = pre.pc.wrapping_add(3).to_le_bytes();
    ev.expect_write(0, pre.stack_address(), ret_high)?;
    ev.expect_write(1, 0x0100 | u16::from(pre.sp.wrapping_sub(1)), ret_low)?;
    ev.expect_idle(1..=8)?;

    let mut want = pre;
    want.pc = target;
    want.sp = pre.sp.wrapping_sub(2);
    ev.expect_post(&want)
}

const fn absolute(
    opcode: u8,
    mnemonic: &'static str,
    cycles: u8,
    exec: fn(&mut Step<'_>),
    check: fn(&Evidence<'_>) -> Result<(), Violation>,
) -> Instruction {
    Instruction {
        opcode,
        mnemonic,
        cycles,
        exec,
        check,
    }
}

pub(super) const INSTRUCTIONS: &[Instruction] = &[
    absolute(0x05, "OR A,!abs", 4, exec_or, check_or),
    absolute(0x25, "AND A,!abs", 4, exec_and, check_and),
    absolute(0x45, "EOR A,!abs", 4, exec_eor, check_eor),
    absolute(0x85, "ADC A,!abs", 4, exec_adc, check_adc),
    absolute(0xA5, "SBC A,!abs", 4, exec_sbc, check_sbc),
    absolute(0x65, "CMP A,!abs", 4, exec_cmp_a, check_cmp_a),
    absolute(0x1E, "CMP X,!abs", 4, exec_cmp_x, check_cmp_x),
    absolute(0x5E, "CMP Y,!abs", 4, exec_cmp_y, check_cmp_y),
    absolute(0xE5, "MOV A,!abs", 4, exec_mov_a, check_mov_a),
    absolute(0xE9, "MOV X,!abs", 4, exec_mov_x, check_mov_x),
    absolute(0xEC, "MOV Y,!abs", 4, exec_mov_y, check_mov_y),
    absolute(0xC5, "MOV !abs,A", 5, exec_store_a, check_store_a),
    absolute(0xC9, "MOV !abs,X", 5, exec_store_x, check_store_x),
    absolute(0xCC, "MOV !abs,Y", 5, exec_store_y, check_store_y),
    absolute(0x0C, "ASL !abs", 5, exec_asl, check_asl),
    absolute(0x2C, "ROL !abs", 5, exec_rol, check_rol),
    absolute(0x4C, "LSR !abs", 5, exec_lsr, check_lsr),
    absolute(0x6C, "ROR !abs", 5, exec_ror, check_ror),
    absolute(0x8C, "DEC !abs", 5, exec_dec, check_dec),
    absolute(0xAC, "INC !abs", 5, exec_inc, check_inc),
    absolute(0x5F, "JMP !abs", 3, exec_jmp, check_jmp),
    absolute(0x3F, "CALL !abs", 8, exec_call, check_call),
];
