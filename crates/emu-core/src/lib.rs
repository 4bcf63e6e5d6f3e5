//! Core traits and types for cycle-accurate emulation.
//!
//! A CPU advances one clock cycle per `tick()` and reaches memory through a
//! [`Bus`] that it borrows for that cycle only.

mod bus;
mod cpu;
mod observable;
mod ticks;

pub use bus::{Bus, SimpleBus};
pub use cpu::Cpu;
pub use observable::{Observable, Value};
pub use ticks::Ticks;
