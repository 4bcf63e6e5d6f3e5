//! CPU core trait.

use crate::Bus;

/// A cycle-stepped CPU core.
///
/// The bus is passed to `tick` rather than owned so that tests and harnesses
/// can inspect memory between cycles.
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Advance the CPU by exactly one clock cycle.
    fn tick<B: Bus>(&mut self, bus: &mut B);

    /// Returns the current program counter.
    fn pc(&self) -> u16;

    /// Returns a copy of all registers.
    fn registers(&self) -> Self::Registers;

    /// Return to the first cycle of an opcode fetch at the current PC.
    fn reset(&mut self);
}
