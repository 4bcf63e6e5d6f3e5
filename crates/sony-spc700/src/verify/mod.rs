//! Self-checking harness.
//!
//! The [`Verifier`] watches the core cycle by cycle. When a monitored opcode
//! is fetched it snapshots the registers, records every bus access until the
//! next fetch, snapshots the registers again and hands all of it, together
//! with the recent ALU history, to the instruction's contract.

mod history;
mod snapshot;

use std::fmt::Debug;
use std::ops::RangeInclusive;

use emu_core::{Bus, Cpu};
use thiserror::Error;

use crate::Registers;
use crate::alu::{AluOp, AluTrace};
use crate::cpu::{CycleRecord, Spc700};
use crate::instructions::{Instruction, InstructionTable};

pub use history::{AluHistory, HISTORY_DEPTH};
pub use snapshot::{BusAccess, Snapshot, TRACE_CAPACITY, Trace};

/// Which instructions the verifier checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyTarget {
    Opcode(u8),
    /// Every opcode in the table.
    All,
}

/// A contract failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{mnemonic} (${opcode:02X}): {message}")]
pub struct Violation {
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub message: String,
}

/// A retired instruction that satisfied its contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub cycles: u8,
    pub pre: Registers,
    pub post: Registers,
}

/// What a contract gets to look at.
pub struct Evidence<'a> {
    instruction: &'a Instruction,
    snapshot: &'a Snapshot,
    history: &'a AluHistory,
}

impl<'a> Evidence<'a> {
    #[must_use]
    pub const fn new(
        instruction: &'a Instruction,
        snapshot: &'a Snapshot,
        history: &'a AluHistory,
    ) -> Self {
        Self {
            instruction,
            snapshot,
            history,
        }
    }

    #[must_use]
    pub const fn instruction(&self) -> &Instruction {
        self.instruction
    }

    /// Registers at the opcode fetch.
    #[must_use]
    pub const fn pre(&self) -> &Registers {
        self.snapshot.pre()
    }

    /// Registers at the following opcode fetch.
    #[must_use]
    pub const fn post(&self) -> &Registers {
        self.snapshot.post()
    }

    /// Reads in order; the first is the opcode fetch.
    #[must_use]
    pub fn reads(&self) -> &[BusAccess] {
        self.snapshot.reads().as_slice()
    }

    #[must_use]
    pub fn writes(&self) -> &[BusAccess] {
        self.snapshot.writes().as_slice()
    }

    #[must_use]
    pub const fn cycles(&self) -> u8 {
        self.snapshot.cycles()
    }

    /// ALU activity `n` cycles ago; `past(1)` is the last cycle of the
    /// instruction.
    #[must_use]
    pub fn past(&self, n: usize) -> AluTrace {
        self.history.past(n).unwrap_or(AluTrace::IDLE)
    }

    #[must_use]
    pub fn fail(&self, message: impl Into<String>) -> Violation {
        Violation {
            opcode: self.instruction.opcode,
            mnemonic: self.instruction.mnemonic,
            message: message.into(),
        }
    }

    /// # Errors
    ///
    /// A violation naming `what` if the values differ.
    pub fn expect_eq<T: PartialEq + Debug + ?Sized>(
        &self,
        what: &str,
        got: &T,
        want: &T,
    ) -> Result<(), Violation> {
        if got == want {
            Ok(())
        } else {
            Err(self.fail(format!("{what}: got {got:X?}, want {want:X?}")))
        }
    }

    /// # Errors
    ///
    /// A violation if the number of reads or writes is off.
    pub fn expect_accesses(&self, reads: usize, writes: usize) -> Result<(), Violation> {
        self.expect_eq("reads", &self.reads().len(), &reads)?;
        self.expect_eq("writes", &self.writes().len(), &writes)
    }

    /// The `index`th read.
    ///
    /// # Errors
    ///
    /// A violation if fewer reads were recorded.
    pub fn read(&self, index: usize) -> Result<BusAccess, Violation> {
        self.reads()
            .get(index)
            .copied()
            .ok_or_else(|| self.fail(format!("no read #{index}")))
    }

    /// The `index`th write.
    ///
    /// # Errors
    ///
    /// A violation if fewer writes were recorded.
    pub fn write(&self, index: usize) -> Result<BusAccess, Violation> {
        self.writes()
            .get(index)
            .copied()
            .ok_or_else(|| self.fail(format!("no write #{index}")))
    }

    /// # Errors
    ///
    /// A violation if read `index` is missing or hit another address.
    pub fn expect_read_at(&self, index: usize, address: u16) -> Result<BusAccess, Violation> {
        let access = self.read(index)?;
        let what = format!("read #{index} address");
        self.expect_eq(&what, &access.address, &address)?;
        Ok(access)
    }

    /// # Errors
    ///
    /// A violation if write `index` is missing or differs from `want`.
    pub fn expect_write(&self, index: usize, address: u16, data: u8) -> Result<(), Violation> {
        let access = self.write(index)?;
        let want = BusAccess { address, data };
        self.expect_eq(&format!("write #{index}"), &access, &want)
    }

    /// # Errors
    ///
    /// A violation if the ALU did anything in the given cycles-ago range.
    pub fn expect_idle(&self, range: RangeInclusive<usize>) -> Result<(), Violation> {
        for n in range {
            let what = format!("ALU {n} cycles ago");
            self.expect_eq(&what, &self.past(n).op, &AluOp::Nop)?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// A violation if the ALU `n` cycles ago differs from `want`.
    pub fn expect_alu(&self, n: usize, want: AluTrace) -> Result<(), Violation> {
        self.expect_eq(&format!("ALU {n} cycles ago"), &self.past(n), &want)
    }

    /// Compare the post-state with `want` one register at a time.
    ///
    /// # Errors
    ///
    /// A violation naming the first register that differs.
    pub fn expect_post(&self, want: &Registers) -> Result<(), Violation> {
        let got = self.post();
        self.expect_eq("A", &got.a, &want.a)?;
        self.expect_eq("X", &got.x, &want.x)?;
        self.expect_eq("Y", &got.y, &want.y)?;
        self.expect_eq("SP", &got.sp, &want.sp)?;
        self.expect_eq("PC", &got.pc, &want.pc)?;
        if got.psw != want.psw {
            return Err(self.fail(format!(
                "PSW: got {}, want {} (mask ${:02X})",
                got.psw,
                want.psw,
                got.psw.diff(want.psw)
            )));
        }
        Ok(())
    }
}

/// Cycle-by-cycle checker for an [`Spc700`].
#[derive(Debug, Clone)]
pub struct Verifier {
    target: VerifyTarget,
    snapshot: Snapshot,
    history: AluHistory,
    verified: u64,
}

impl Verifier {
    #[must_use]
    pub fn new(target: VerifyTarget) -> Self {
        Self {
            target,
            snapshot: Snapshot::default(),
            history: AluHistory::new(),
            verified: 0,
        }
    }

    #[must_use]
    pub const fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    #[must_use]
    pub const fn history(&self) -> &AluHistory {
        &self.history
    }

    /// Instructions that passed their contract so far.
    #[must_use]
    pub const fn verified(&self) -> u64 {
        self.verified
    }

    /// Tick the core once and observe the cycle.
    ///
    /// # Errors
    ///
    /// The contract violation of an instruction that retired this cycle.
    pub fn tick<B: Bus>(
        &mut self,
        cpu: &mut Spc700,
        bus: &mut B,
    ) -> Result<Option<Verdict>, Violation> {
        cpu.tick(bus);
        match cpu.last_cycle() {
            Some(record) => self.observe(record, cpu.table()),
            None => Ok(None),
        }
    }

    /// Tick until `instructions` monitored instructions have retired.
    ///
    /// # Errors
    ///
    /// The first violation; also if the core runs `max_cycles` without
    /// retiring enough instructions.
    pub fn run<B: Bus>(
        &mut self,
        cpu: &mut Spc700,
        bus: &mut B,
        instructions: usize,
        max_cycles: u64,
    ) -> Result<Vec<Verdict>, Violation> {
        let mut verdicts = Vec::with_capacity(instructions);
        let mut cycles = 0;
        while verdicts.len() < instructions {
            if cycles == max_cycles {
                let opcode = cpu.opcode();
                return Err(Violation {
                    opcode,
                    mnemonic: cpu.table().get(opcode).map_or("???", |i| i.mnemonic),
                    message: format!(
                        "{} of {instructions} instructions retired in {max_cycles} cycles",
                        verdicts.len()
                    ),
                });
            }
            if let Some(verdict) = self.tick(cpu, bus)? {
                verdicts.push(verdict);
            }
            cycles += 1;
        }
        Ok(verdicts)
    }

    /// Feed one executed cycle.
    ///
    /// # Errors
    ///
    /// The contract violation of an instruction that retired this cycle.
    pub fn observe(
        &mut self,
        record: &CycleRecord,
        table: &InstructionTable,
    ) -> Result<Option<Verdict>, Violation> {
        let mut outcome = Ok(None);
        if record.cycle == 1 {
            if self.snapshot.is_taken() {
                self.snapshot.take_post(record.regs);
                outcome = self.check(table);
            }
            if self.monitors(record.data_in, table) {
                let fetch = BusAccess {
                    address: record.pins.address,
                    data: record.data_in,
                };
                self.snapshot.take_pre(record.regs, fetch);
            } else {
                self.snapshot.skip();
            }
        } else if self.snapshot.is_taken() {
            self.snapshot.record(&record.pins, record.data_in);
        }
        self.history.push(record.alu);
        outcome
    }

    fn monitors(&self, opcode: u8, table: &InstructionTable) -> bool {
        match self.target {
            VerifyTarget::Opcode(target) => opcode == target,
            VerifyTarget::All => table.get(opcode).is_some(),
        }
    }

    fn check(&mut self, table: &InstructionTable) -> Result<Option<Verdict>, Violation> {
        let snap = &self.snapshot;
        let opcode = snap.opcode();
        let Some(instruction) = table.get(opcode) else {
            return Err(Violation {
                opcode,
                mnemonic: "???",
                message: "no instruction registered".into(),
            });
        };
        let evidence = Evidence::new(instruction, snap, &self.history);

        let fetch = evidence.read(0)?;
        let want = BusAccess {
            address: snap.pre().pc,
            data: instruction.opcode,
        };
        evidence.expect_eq("opcode fetch", &fetch, &want)?;
        evidence.expect_eq("cycles", &snap.cycles(), &instruction.cycles)?;
        (instruction.check)(&evidence)?;

        log::trace!(
            "{} verified in {} cycles",
            instruction.mnemonic,
            snap.cycles()
        );
        let verdict = Verdict {
            opcode,
            mnemonic: instruction.mnemonic,
            cycles: snap.cycles(),
            pre: *snap.pre(),
            post: *snap.post(),
        };
        self.verified += 1;
        Ok(Some(verdict))
    }
}
