//! ALU operations for the SPC700.
//!
//! Every operation except MUL and DIV is a pure function of two operand
//! bytes and the incoming flags. MUL and DIV are sequenced over several
//! cycles by [`Alu`], which owns the partial-result accumulator.

use crate::Status;
use crate::flags::{C, H, N, V, Z};

/// Operation selector driven by the core each cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AluOp {
    /// No operation; flags pass through unchanged.
    #[default]
    Nop,
    Adc,
    Sbc,
    Cmp,
    And,
    /// Bitwise OR. `OR a, 0` doubles as a flag-setting move.
    Or,
    Eor,
    Inc,
    Dec,
    Asl,
    Lsr,
    Rol,
    Ror,
    Xcn,
    Daa,
    Das,
    Mul,
    Div,
}

impl AluOp {
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Nop => "NOP",
            Self::Adc => "ADC",
            Self::Sbc => "SBC",
            Self::Cmp => "CMP",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Eor => "EOR",
            Self::Inc => "INC",
            Self::Dec => "DEC",
            Self::Asl => "ASL",
            Self::Lsr => "LSR",
            Self::Rol => "ROL",
            Self::Ror => "ROR",
            Self::Xcn => "XCN",
            Self::Daa => "DAA",
            Self::Das => "DAS",
            Self::Mul => "MUL",
            Self::Div => "DIV",
        }
    }
}

/// Result of an ALU operation with flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluOutput {
    pub result: u8,
    pub flags: Status,
}

/// What the ALU was driven with in one cycle, and what it produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AluTrace {
    pub op: AluOp,
    pub a: u8,
    pub b: u8,
    pub result: u8,
}

impl AluTrace {
    /// An undriven cycle: NOP with zeroed operands.
    pub const IDLE: Self = Self {
        op: AluOp::Nop,
        a: 0,
        b: 0,
        result: 0,
    };
}

/// Evaluate a single-cycle operation.
///
/// MUL and DIV have no single-cycle meaning; here they behave like NOP. Use
/// [`Alu::cycle`] to sequence them, or [`multiply`] / [`divide`] for the
/// closed-form results.
#[must_use]
pub fn compute(op: AluOp, a: u8, b: u8, psw: Status) -> AluOutput {
    match op {
        AluOp::Nop | AluOp::Mul | AluOp::Div => AluOutput {
            result: 0,
            flags: psw,
        },
        AluOp::Adc => adc(a, b, psw),
        AluOp::Sbc => sbc(a, b, psw),
        AluOp::Cmp => cmp(a, b, psw),
        AluOp::And => logical(a & b, psw),
        AluOp::Or => logical(a | b, psw),
        AluOp::Eor => logical(a ^ b, psw),
        AluOp::Inc => logical(a.wrapping_add(1), psw),
        AluOp::Dec => logical(a.wrapping_sub(1), psw),
        AluOp::Asl => shift(a << 1, a & 0x80 != 0, psw),
        AluOp::Lsr => shift(a >> 1, a & 0x01 != 0, psw),
        AluOp::Rol => shift((a << 1) | psw.carry(), a & 0x80 != 0, psw),
        AluOp::Ror => shift((a >> 1) | (psw.carry() << 7), a & 0x01 != 0, psw),
        AluOp::Xcn => xcn(a, psw),
        AluOp::Daa => daa(a, psw),
        AluOp::Das => das(a, psw),
    }
}

/// Add with carry.
fn adc(a: u8, b: u8, psw: Status) -> AluOutput {
    let c = psw.carry();
    let sum = u16::from(a) + u16::from(b) + u16::from(c);
    let result = sum as u8;
    let carry = sum > 0xFF;

    let mut flags = psw;
    flags.update_nz(result);
    flags.set_if(V, (result & 0x80 != 0) != carry);
    flags.set_if(H, (a & 0x0F) + (b & 0x0F) + c > 0x0F);
    flags.set_if(C, carry);

    AluOutput { result, flags }
}

/// 9-bit difference `a - b - borrow_in` as an adder computes it: bit 8 is
/// set when no borrow out of bit 7 occurred.
fn diff9(a: u8, b: u8, borrow_in: u8) -> u16 {
    (u16::from(a) + 0x100 - u16::from(b) - u16::from(borrow_in)) & 0x1FF
}

/// Subtract with carry (carry-in is subtracted).
fn sbc(a: u8, b: u8, psw: Status) -> AluOutput {
    let c = psw.carry();
    let diff = diff9(a, b, c);
    let result = diff as u8;
    let carry = diff & 0x100 != 0;
    let nibble = ((a & 0x0F) + 0x10 - (b & 0x0F) - c) & 0x1F;

    let mut flags = psw;
    flags.update_nz(result);
    flags.set_if(V, (result & 0x80 != 0) != carry);
    flags.set_if(H, nibble & 0x10 != 0);
    flags.set_if(C, carry);

    AluOutput { result, flags }
}

/// Compare: subtract without carry-in, H untouched.
fn cmp(a: u8, b: u8, psw: Status) -> AluOutput {
    let diff = diff9(a, b, 0);
    let result = diff as u8;
    let carry = diff & 0x100 != 0;

    let mut flags = psw;
    flags.update_nz(result);
    flags.set_if(V, (result & 0x80 != 0) != carry);
    flags.set_if(C, carry);

    AluOutput { result, flags }
}

/// Results that only update N and Z.
fn logical(result: u8, psw: Status) -> AluOutput {
    let mut flags = psw;
    flags.update_nz(result);
    AluOutput { result, flags }
}

/// Shifts and rotates: N/Z from the result, C from the bit shifted out.
fn shift(result: u8, carry_out: bool, psw: Status) -> AluOutput {
    let mut flags = psw;
    flags.update_nz(result);
    flags.set_if(C, carry_out);
    AluOutput { result, flags }
}

/// Exchange nibbles.
fn xcn(a: u8, psw: Status) -> AluOutput {
    let result = a.rotate_left(4);
    let mut flags = psw;
    flags.set_if(N, a & 0x08 != 0);
    flags.set_if(Z, a == 0);
    AluOutput { result, flags }
}

/// Decimal adjust after addition.
///
/// When neither correction applies the input passes through unchanged.
fn daa(a: u8, psw: Status) -> AluOutput {
    let mut flags = psw;
    let mut adjusted = a;
    if psw.is_set(C) || a > 0x99 {
        flags.set_if(C, true);
        adjusted = a.wrapping_add(0x60);
    }
    if psw.is_set(H) || adjusted & 0x0F > 0x09 {
        adjusted = adjusted.wrapping_add(0x06);
    }
    flags.update_nz(adjusted);
    AluOutput {
        result: adjusted,
        flags,
    }
}

/// Decimal adjust after subtraction.
///
/// When neither correction applies the input passes through unchanged.
fn das(a: u8, psw: Status) -> AluOutput {
    let mut flags = psw;
    let mut adjusted = a;
    if !psw.is_set(C) || a > 0x99 {
        flags.set_if(C, false);
        adjusted = a.wrapping_sub(0x60);
    }
    if !psw.is_set(H) || adjusted & 0x0F > 0x09 {
        adjusted = adjusted.wrapping_sub(0x06);
    }
    flags.update_nz(adjusted);
    AluOutput {
        result: adjusted,
        flags,
    }
}

/// Closed-form `Y * A`, high byte in Y.
#[must_use]
pub const fn multiply(y: u8, a: u8) -> u16 {
    y as u16 * a as u16
}

/// Closed-form result of `DIV YA, X`, including the hardware's behaviour
/// when the quotient does not fit in nine bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Division {
    pub quotient: u8,
    pub remainder: u8,
    /// V: the quotient needed a ninth bit (Y >= X).
    pub overflow: bool,
    /// H: `(Y & 15) >= (X & 15)`.
    pub half: bool,
}

#[must_use]
pub fn divide(ya: u16, x: u8) -> Division {
    let [_, y] = ya.to_le_bytes();
    let dividend = u32::from(ya);
    let divisor = u32::from(x);

    let (quotient, remainder) = if u32::from(y) < divisor * 2 {
        (dividend / divisor, dividend % divisor)
    } else {
        let excess = dividend - divisor * 0x200;
        (
            255 - excess / (256 - divisor),
            divisor + excess % (256 - divisor),
        )
    };

    Division {
        quotient: quotient as u8,
        remainder: remainder as u8,
        overflow: y >= x,
        half: (y & 0x0F) >= (x & 0x0F),
    }
}

/// Number of cycles [`Alu`] needs for a MUL, finishing cycles included.
pub const MUL_CYCLES: u8 = 10;

/// Number of cycles [`Alu`] needs for a DIV, finishing cycles included.
pub const DIV_CYCLES: u8 = 12;

/// The ALU with its multiply/divide sequencer.
///
/// MUL: steps 0-7 add `a << i` for each set bit `i` of `b`; step 8 exposes
/// the low byte; step 9 exposes the high byte, sets N/Z from it and clears
/// the accumulator. This is an unsigned shift-add in place of the
/// sign-corrected partial products of the hardware; the product is the same.
///
/// DIV: step 0 loads the dividend (`a` = Y, `b` = A); steps 1-9 each run one
/// iteration of the 9-bit divider against `a` = X; step 10 exposes the
/// quotient (N, V, Z); step 11 exposes the remainder and clears the
/// accumulator.
///
/// Sequenced steps produce a result of zero until their finishing cycles.
#[derive(Debug, Clone, Default)]
pub struct Alu {
    /// Sequenced operation in progress.
    active: Option<AluOp>,
    /// Step counter, 4 bits wide in hardware.
    step: u8,
    /// Partial product or shifting dividend (17 bits for DIV).
    acc: u32,
}

impl Alu {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate one cycle of `op`.
    pub fn cycle(&mut self, op: AluOp, a: u8, b: u8, psw: Status) -> AluOutput {
        match op {
            AluOp::Mul => self.mul_step(a, b, psw),
            AluOp::Div => self.div_step(a, b, psw),
            _ => compute(op, a, b, psw),
        }
    }

    /// Current step of the sequenced operation, 0 when idle.
    #[must_use]
    pub const fn step(&self) -> u8 {
        self.step
    }

    /// Current accumulator contents.
    #[must_use]
    pub const fn accumulator(&self) -> u32 {
        self.acc
    }

    /// Start `op` unless it is already in progress.
    fn enter(&mut self, op: AluOp) {
        if self.active != Some(op) {
            self.active = Some(op);
            self.step = 0;
            self.acc = 0;
        }
    }

    fn finish(&mut self) {
        self.active = None;
        self.step = 0;
        self.acc = 0;
    }

    fn mul_step(&mut self, a: u8, b: u8, psw: Status) -> AluOutput {
        self.enter(AluOp::Mul);
        let mut flags = psw;

        let result = match self.step {
            step @ 0..=7 => {
                if (b >> step) & 1 != 0 {
                    self.acc += u32::from(a) << step;
                }
                self.step += 1;
                0
            }
            8 => {
                self.step = 9;
                self.acc as u8
            }
            _ => {
                let high = (self.acc >> 8) as u8;
                flags.update_nz(high);
                self.finish();
                high
            }
        };

        AluOutput { result, flags }
    }

    fn div_step(&mut self, a: u8, b: u8, psw: Status) -> AluOutput {
        self.enter(AluOp::Div);
        let mut flags = psw;

        let result = match self.step {
            0 => {
                self.acc = u32::from(a) << 8 | u32::from(b);
                self.step = 1;
                0
            }
            1..=9 => {
                if self.step == 1 {
                    let y = (self.acc >> 8) as u8;
                    flags.set_if(H, (y & 0x0F) >= (a & 0x0F));
                }
                let divisor = u32::from(a) << 9;
                let mut ya = self.acc << 1;
                if ya & 0x2_0000 != 0 {
                    ya = (ya & 0x1_FFFF) | 1;
                }
                if ya >= divisor {
                    ya ^= 1;
                }
                if ya & 1 != 0 {
                    ya = ya.wrapping_sub(divisor) & 0x1_FFFF;
                }
                self.acc = ya;
                self.step += 1;
                0
            }
            10 => {
                let quotient = self.acc as u8;
                flags.set_if(V, self.acc & 0x100 != 0);
                flags.update_nz(quotient);
                self.step = 11;
                quotient
            }
            _ => {
                let remainder = (self.acc >> 9) as u8;
                self.finish();
                remainder
            }
        };

        AluOutput { result, flags }
    }
}
