//! SPC700 register file.

use crate::Status;

/// SPC700 register set.
///
/// - A: 8-bit accumulator, low half of the YA pair
/// - X, Y: 8-bit index registers (Y is the high half of YA)
/// - SP: 8-bit stack pointer, stack lives at $0100-$01FF
/// - PC: 16-bit program counter
/// - PSW: program status word
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Registers {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub psw: Status,
}

impl Registers {
    /// The 16-bit YA pair used by MUL and DIV.
    #[must_use]
    pub const fn ya(&self) -> u16 {
        (self.y as u16) << 8 | self.a as u16
    }

    /// Set Y (high) and A (low) from a 16-bit value.
    pub fn set_ya(&mut self, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.a = lo;
        self.y = hi;
    }

    /// Address SP points at.
    #[must_use]
    pub const fn stack_address(&self) -> u16 {
        0x0100 | self.sp as u16
    }
}

impl std::fmt::Display for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "A=${:02X} X=${:02X} Y=${:02X} SP=${:02X} PC=${:04X} PSW={}",
            self.a, self.x, self.y, self.sp, self.pc, self.psw
        )
    }
}
