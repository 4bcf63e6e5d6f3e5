//! SPC700 program status word (PSW).
//!
//! Bit layout matches the hardware register, so `Status` can be pushed and
//! popped as a plain byte.

/// Carry flag - carry out of bit 7, or "no borrow" after a subtraction.
pub const C: u8 = 0x01;

/// Zero flag - set if result is zero.
pub const Z: u8 = 0x02;

/// Interrupt enable. Never touched by the ALU.
pub const I: u8 = 0x04;

/// Half-carry flag - carry out of bit 3.
pub const H: u8 = 0x08;

/// Break flag. Never touched by the ALU.
pub const B: u8 = 0x10;

/// Direct page select. Never touched by the ALU.
pub const P: u8 = 0x20;

/// Overflow flag.
pub const V: u8 = 0x40;

/// Negative flag - set if result has bit 7 set.
pub const N: u8 = 0x80;

/// Processor status word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Status(pub u8);

impl Status {
    /// Check if a flag is set.
    #[must_use]
    pub const fn is_set(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    /// Return a copy with `flag` set or cleared.
    #[must_use]
    pub const fn with(self, flag: u8, condition: bool) -> Self {
        if condition {
            Self(self.0 | flag)
        } else {
            Self(self.0 & !flag)
        }
    }

    /// Set or clear a flag based on condition.
    pub fn set_if(&mut self, flag: u8, condition: bool) {
        *self = self.with(flag, condition);
    }

    /// Update N and Z from a result byte.
    pub fn update_nz(&mut self, value: u8) {
        self.set_if(N, value & 0x80 != 0);
        self.set_if(Z, value == 0);
    }

    /// Carry as 0 or 1, for arithmetic.
    #[must_use]
    pub const fn carry(self) -> u8 {
        self.0 & C
    }

    /// Flags that differ between `self` and `other`, as a mask.
    #[must_use]
    pub const fn diff(self, other: Self) -> u8 {
        self.0 ^ other.0
    }
}

impl std::fmt::Display for Status {
    /// Renders as `NVPBHIZC`, lower case for clear flags.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const NAMES: [(u8, char); 8] = [
            (N, 'N'),
            (V, 'V'),
            (P, 'P'),
            (B, 'B'),
            (H, 'H'),
            (I, 'I'),
            (Z, 'Z'),
            (C, 'C'),
        ];
        for (flag, name) in NAMES {
            let shown = if self.is_set(flag) {
                name
            } else {
                name.to_ascii_lowercase()
            };
            write!(f, "{shown}")?;
        }
        Ok(())
    }
}
