//! Elapsed clock cycles.

/// A count of CPU clock cycles since power-on or the last reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticks(pub u64);

impl Ticks {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Count one more cycle.
    pub fn advance(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

impl std::fmt::Display for Ticks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} cycles", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_counts_cycles() {
        let mut t = Ticks::ZERO;
        t.advance();
        t.advance();
        assert_eq!(t.get(), 2);
        assert_eq!(t.to_string(), "2 cycles");
    }
}
