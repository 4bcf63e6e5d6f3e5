//! Instruction table.
//!
//! Each opcode pairs a micro-program, run by the core once per cycle, with a
//! contract the verifier checks once the instruction has retired. The table
//! is data: adding an opcode means writing those two functions and listing
//! them in one of the submodules.

mod absolute;
mod implied;

use thiserror::Error;

use crate::Registers;
use crate::cpu::Step;
use crate::verify::{Evidence, Violation};

/// Runs one cycle of an instruction.
pub type MicroProgram = fn(&mut Step<'_>);

/// Checks a retired instruction against what the hardware must have done.
pub type Contract = fn(&Evidence<'_>) -> Result<(), Violation>;

#[derive(Debug, Clone, Copy)]
pub struct Instruction {
    pub opcode: u8,
    pub mnemonic: &'static str,
    /// Total cycles, the opcode fetch included.
    pub cycles: u8,
    pub exec: MicroProgram,
    pub check: Contract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("opcode ${0:02X} is already registered")]
    DuplicateOpcode(u8),
}

/// Opcode-indexed registry of instructions.
#[derive(Clone)]
pub struct InstructionTable {
    entries: [Option<Instruction>; 256],
}

impl Default for InstructionTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl InstructionTable {
    /// A table with no instructions; every opcode resyncs in one cycle.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: [None; 256],
        }
    }

    /// The instructions this crate implements.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::DuplicateOpcode`] if two definitions claim the
    /// same opcode.
    pub fn standard() -> Result<Self, TableError> {
        let mut table = Self::empty();
        for instr in absolute::INSTRUCTIONS.iter().chain(implied::INSTRUCTIONS) {
            table.register(*instr)?;
        }
        Ok(table)
    }

    /// Add one instruction.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::DuplicateOpcode`] if the opcode is taken; the
    /// table is left unchanged.
    pub fn register(&mut self, instr: Instruction) -> Result<(), TableError> {
        let slot = &mut self.entries[usize::from(instr.opcode)];
        if slot.is_some() {
            return Err(TableError::DuplicateOpcode(instr.opcode));
        }
        log::debug!(
            "registered ${:02X} {} ({} cycles)",
            instr.opcode,
            instr.mnemonic,
            instr.cycles
        );
        *slot = Some(instr);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, opcode: u8) -> Option<&Instruction> {
        self.entries[usize::from(opcode)].as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.entries.iter().flatten()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for InstructionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|i| (i.opcode, i.mnemonic)))
            .finish()
    }
}

/// An 8-bit register an instruction can name as source or destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    A,
    X,
    Y,
}

impl Reg {
    #[must_use]
    pub const fn get(self, regs: &Registers) -> u8 {
        match self {
            Self::A => regs.a,
            Self::X => regs.x,
            Self::Y => regs.y,
        }
    }

    pub fn set(self, regs: &mut Registers, value: u8) {
        match self {
            Self::A => regs.a = value,
            Self::X => regs.x = value,
            Self::Y => regs.y = value,
        }
    }
}
