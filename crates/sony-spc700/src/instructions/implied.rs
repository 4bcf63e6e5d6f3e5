//! Single-byte instructions.
//!
//! Cycle 1 fetches the opcode and steps PC past it with the bus idle; the
//! last cycle reads the next opcode.

use crate::alu::{self, AluOp, AluTrace, DIV_CYCLES, MUL_CYCLES};
use crate::cpu::Step;
use crate::flags::{H, V};
use crate::instructions::Instruction;
use crate::verify::{Evidence, Violation};

/// NOP (2 cycles).
fn exec_nop(step: &mut Step<'_>) {
    match step.cycle() {
        1 => step.advance_pc(),
        _ => step.fetch_opcode(),
    }
}

/// A single ALU operation on A in the last of `cycles` cycles.
fn adjust_a(step: &mut Step<'_>, op: AluOp, cycles: u8) {
    match step.cycle() {
        1 => step.advance_pc(),
        c if c == cycles => {
            let a = step.regs().a;
            let result = step.alu(op, a, 0);
            step.set_a(result);
            step.fetch_opcode();
        }
        _ => {}
    }
}

fn exec_xcn(step: &mut Step<'_>) {
    adjust_a(step, AluOp::Xcn, 5);
}

fn exec_daa(step: &mut Step<'_>) {
    adjust_a(step, AluOp::Daa, 3);
}

fn exec_das(step: &mut Step<'_>) {
    adjust_a(step, AluOp::Das, 3);
}

/// RET: pop PC low then high (5 cycles).
fn exec_ret(step: &mut Step<'_>) {
    match step.cycle() {
        1 => step.advance_pc(),
        3 => pop(step),
        4 => {
            let low = step.data_in();
            step.latch(u16::from(low));
            pop(step);
        }
        5 => {
            let target = u16::from_le_bytes([step.operand() as u8, step.data_in()]);
            step.set_pc(target);
            step.read(target);
            step.finish();
        }
        _ => {}
    }
}

fn pop(step: &mut Step<'_>) {
    let sp = step.regs().sp.wrapping_add(1);
    step.set_sp(sp);
    step.read(0x0100 | u16::from(sp));
}

/// MUL YA: the ALU runs from the fetch cycle on; the product's low byte
/// lands in A one cycle before the high byte lands in Y.
fn exec_mul(step: &mut Step<'_>) {
    let regs = *step.regs();
    let result = step.alu(AluOp::Mul, regs.y, regs.a);
    match step.cycle() {
        1 => step.advance_pc(),
        c if c == MUL_CYCLES - 1 => step.set_a(result),
        c if c == MUL_CYCLES => {
            step.set_y(result);
            step.fetch_opcode();
        }
        _ => {}
    }
}

/// DIV YA,X: the fetch cycle loads Y:A into the divider, then X is fed to
/// it once per cycle. Quotient to A, then remainder to Y.
fn exec_div(step: &mut Step<'_>) {
    let regs = *step.regs();
    let (a, b) = if step.cycle() == 1 {
        (regs.y, regs.a)
    } else {
        (regs.x, 0)
    };
    let result = step.alu(AluOp::Div, a, b);
    match step.cycle() {
        1 => step.advance_pc(),
        c if c == DIV_CYCLES - 1 => step.set_a(result),
        c if c == DIV_CYCLES => {
            step.set_y(result);
            step.fetch_opcode();
        }
        _ => {}
    }
}

// Contracts

fn check_nop(ev: &Evidence<'_>) -> Result<(), Violation> {
    ev.expect_accesses(1, 0)?;
    ev.expect_idle(1..=2)?;

    let mut want = *ev.pre();
    want.pc = want.pc.wrapping_add(1);
    ev.expect_post(&want)
}

fn check_adjust_a(ev: &Evidence<'_>, op: AluOp, cycles: usize) -> Result<(), Violation> {
    ev.expect_accesses(1, 0)?;
    let pre = *ev.pre();
    let out = alu::compute(op, pre.a, 0, pre.psw);
    let trace = AluTrace {
        op,
        a: pre.a,
        b: 0,
        result: out.result,
    };
    ev.expect_alu(1, trace)?;
    ev.expect_idle(2..=cycles)?;

    let mut want = pre;
    want.pc = pre.pc.wrapping_add(1);
    want.a = out.result;
    want.psw = out.flags;
    ev.expect_post(&want)
}

fn check_xcn(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_adjust_a(ev, AluOp::Xcn, 5)
}

fn check_daa(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_adjust_a(ev, AluOp::Daa, 3)
}

fn check_das(ev: &Evidence<'_>) -> Result<(), Violation> {
    check_adjust_a(ev, AluOp::Das, 3)
}

fn check_ret(ev: &Evidence<'_>) -> Result<(), Violation> {
    ev.expect_accesses(3, 0)?;
    let pre = *ev.pre();
    let low = ev.expect_read_at(1, 0x0100 | u16::from(pre.sp.wrapping_add(1)))?;
    let high = ev.expect_read_at(2, 0x0100 | u16::from(pre.sp.wrapping_add(2)))?;
    ev.expect_idle(1..=5)?;

    let mut want = pre;
    want.pc = u16::from_le_bytes([low.data, high.data]);
    want.sp = pre.sp.wrapping_add(2);
    ev.expect_post(&want)
}

fn check_mul(ev: &Evidence<'_>) -> Result<(), Violation> {
    ev.expect_accesses(1, 0)?;
    let pre = *ev.pre();
    let cycles = usize::from(MUL_CYCLES);
    let step = AluTrace {
        op: AluOp::Mul,
        a: pre.y,
        b: pre.a,
        result: 0,
    };
    for n in 3..=cycles {
        ev.expect_alu(n, step)?;
    }

    let [low, high] = alu::multiply(pre.y, pre.a).to_le_bytes();
    ev.expect_eq("ALU op 2 cycles ago", &ev.past(2).op, &AluOp::Mul)?;
    ev.expect_eq("product low byte", &ev.past(2).result, &low)?;
    ev.expect_eq("ALU op 1 cycle ago", &ev.past(1).op, &AluOp::Mul)?;
    ev.expect_eq("product high byte", &ev.past(1).result, &high)?;

    let mut want = pre;
    want.pc = pre.pc.wrapping_add(1);
    want.a = low;
    want.y = high;
    want.psw.update_nz(high);
    ev.expect_post(&want)
}

fn check_div(ev: &Evidence<'_>) -> Result<(), Violation> {
    ev.expect_accesses(1, 0)?;
    let pre = *ev.pre();
    let cycles = usize::from(DIV_CYCLES);
    let load = AluTrace {
        op: AluOp::Div,
        a: pre.y,
        b: pre.a,
        result: 0,
    };
    let step = AluTrace {
        a: pre.x,
        b: 0,
        ..load
    };
    ev.expect_alu(cycles, load)?;
    for n in 3..cycles {
        ev.expect_alu(n, step)?;
    }

    let div = alu::divide(pre.ya(), pre.x);
    ev.expect_eq("ALU op 2 cycles ago", &ev.past(2).op, &AluOp::Div)?;
    ev.expect_eq("quotient", &ev.past(2).result, &div.quotient)?;
    ev.expect_eq("ALU op 1 cycle ago", &ev.past(1).op, &AluOp::Div)?;
    ev.expect_eq("remainder", &ev.past(1).result, &div.remainder)?;

    let mut want = pre;
    want.pc = pre.pc.wrapping_add(1);
    want.a = div.quotient;
    want.y = div.remainder;
    want.psw.set_if(V, div.overflow);
    want.psw.set_if(H, div.half);
    want.psw.update_nz(div.quotient);
    ev.expect_post(&want)
}

const fn implied(
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
    implied(0x00, "NOP", 2, exec_nop, check_nop),
    implied(0x6F, "RET", 5, exec_ret, check_ret),
    implied(0x9F, "XCN A", 5, exec_xcn, check_xcn),
    implied(0xDF, "DAA A", 3, exec_daa, check_daa),
    implied(0xBE, "DAS A", 3, exec_das, check_das),
    implied(0xCF, "MUL YA", MUL_CYCLES, exec_mul, check_mul),
    implied(0x9E, "DIV YA,X", DIV_CYCLES, exec_div, check_div),
];
