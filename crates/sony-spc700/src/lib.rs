//! Cycle-accurate Sony SPC700 CPU core.
//!
//! Each call to `tick()` advances exactly one clock cycle and performs at
//! most one bus access. A [`Verifier`] can ride along and check every
//! retired instruction against its contract.

pub mod alu;
mod cpu;
pub mod flags;
pub mod instructions;
mod pins;
mod registers;
pub mod verify;

pub use alu::{Alu, AluOp, AluTrace};
pub use cpu::{CycleRecord, Spc700, Step};
pub use flags::Status;
pub use instructions::{Instruction, InstructionTable, Reg, TableError};
pub use pins::Pins;
pub use registers::Registers;
pub use verify::{BusAccess, Evidence, Verdict, Verifier, VerifyTarget, Violation};
