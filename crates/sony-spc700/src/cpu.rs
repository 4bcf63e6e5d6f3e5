//! SPC700 CPU core.
//!
//! Every `tick()` is one clock cycle. The pins registered at the previous
//! edge are serviced first, then the current opcode's micro-program runs for
//! the current cycle and everything it schedules is committed together, like
//! a clock edge in hardware.

use emu_core::{Bus, Cpu, Observable, Ticks, Value};

use crate::alu::{Alu, AluOp, AluTrace};
use crate::flags::{B, C, H, I, N, P, V, Z};
use crate::instructions::{InstructionTable, Reg};
use crate::{Pins, Registers};

/// Everything observable about one executed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleRecord {
    /// Cycle index within the instruction; 1 is the opcode fetch.
    pub cycle: u8,
    /// Registers as they were during the cycle.
    pub regs: Registers,
    /// Bus signals serviced during the cycle.
    pub pins: Pins,
    /// Byte on the data lines at the end of the cycle.
    pub data_in: u8,
    pub alu: AluTrace,
}

/// State scheduled for the next clock edge.
#[derive(Debug, Clone, Copy)]
struct Next {
    regs: Registers,
    pins: Pins,
    cycle: u8,
    operand: u16,
}

/// One cycle of a micro-program.
///
/// Getters describe the cycle in progress. Everything else schedules state
/// for the next edge: unless told otherwise the bus goes idle, registers
/// keep their values and the cycle counter advances by one.
pub struct Step<'a> {
    cycle: u8,
    data_in: u8,
    pins: Pins,
    operand: u16,
    regs: Registers,
    alu: &'a mut Alu,
    trace: Option<AluTrace>,
    next: Next,
}

impl<'a> Step<'a> {
    fn new(
        cycle: u8,
        data_in: u8,
        pins: Pins,
        operand: u16,
        regs: Registers,
        alu: &'a mut Alu,
    ) -> Self {
        Self {
            cycle,
            data_in,
            pins,
            operand,
            regs,
            alu,
            trace: None,
            next: Next {
                regs,
                pins: Pins::idle(regs.pc),
                cycle: cycle.wrapping_add(1),
                operand,
            },
        }
    }

    #[must_use]
    pub const fn cycle(&self) -> u8 {
        self.cycle
    }

    /// Byte returned by the access serviced this cycle (open bus otherwise).
    #[must_use]
    pub const fn data_in(&self) -> u8 {
        self.data_in
    }

    #[must_use]
    pub const fn regs(&self) -> &Registers {
        &self.regs
    }

    /// The operand latch as committed at the previous edge.
    #[must_use]
    pub const fn operand(&self) -> u16 {
        self.operand
    }

    /// Address on the bus this cycle.
    #[must_use]
    pub const fn address(&self) -> u16 {
        self.pins.address
    }

    /// Drive the ALU for this cycle; its flags become PSW at the edge.
    pub fn alu(&mut self, op: AluOp, a: u8, b: u8) -> u8 {
        debug_assert!(self.trace.is_none(), "ALU driven twice in one cycle");
        let out = self.alu.cycle(op, a, b, self.regs.psw);
        self.next.regs.psw = out.flags;
        self.trace = Some(AluTrace {
            op,
            a,
            b,
            result: out.result,
        });
        out.result
    }

    pub fn set(&mut self, reg: Reg, value: u8) {
        reg.set(&mut self.next.regs, value);
    }

    pub fn set_a(&mut self, value: u8) {
        self.next.regs.a = value;
    }

    pub fn set_y(&mut self, value: u8) {
        self.next.regs.y = value;
    }

    pub fn set_sp(&mut self, value: u8) {
        self.next.regs.sp = value;
    }

    pub fn set_pc(&mut self, value: u16) {
        self.next.regs.pc = value;
    }

    /// Load the whole operand latch.
    pub fn latch(&mut self, value: u16) {
        self.next.operand = value;
    }

    pub fn read(&mut self, address: u16) {
        self.next.pins = Pins::read(address);
    }

    pub fn write(&mut self, address: u16, value: u8) {
        self.next.pins = Pins::write(address, value);
    }

    /// PC + 1 with the bus idle.
    pub fn advance_pc(&mut self) {
        self.next.regs.pc = self.regs.pc.wrapping_add(1);
    }

    /// PC + 1 and read the byte it now points at.
    pub fn fetch_next(&mut self) {
        let pc = self.regs.pc.wrapping_add(1);
        self.next.regs.pc = pc;
        self.read(pc);
    }

    /// Read the next opcode at the scheduled PC and end the instruction.
    pub fn fetch_opcode(&mut self) {
        self.read(self.next.regs.pc);
        self.finish();
    }

    /// The next cycle is an opcode fetch.
    pub fn finish(&mut self) {
        self.next.cycle = 1;
    }

    /// Close the cycle; an undriven ALU evaluates NOP so flags pass through.
    fn close(mut self) -> (Next, AluTrace) {
        let trace = if let Some(trace) = self.trace {
            trace
        } else {
            let out = self.alu.cycle(AluOp::Nop, 0, 0, self.regs.psw);
            self.next.regs.psw = out.flags;
            AluTrace::IDLE
        };
        (self.next, trace)
    }
}

/// SPC700 CPU.
pub struct Spc700 {
    pub regs: Registers,
    table: InstructionTable,
    alu: Alu,
    /// Bus signals registered at the last edge.
    pins: Pins,
    data_in: u8,
    opcode: u8,
    /// 1 during an opcode fetch.
    cycle: u8,
    /// Address or data assembled across cycles.
    operand: u16,
    ticks: Ticks,
    last: Option<CycleRecord>,
}

impl Spc700 {
    /// A core executing `table`, about to fetch an opcode at $0000.
    #[must_use]
    pub fn new(table: InstructionTable) -> Self {
        let regs = Registers::default();
        Self {
            regs,
            table,
            alu: Alu::new(),
            pins: Pins::read(regs.pc),
            data_in: 0,
            opcode: 0,
            cycle: 1,
            operand: 0,
            ticks: Ticks::ZERO,
            last: None,
        }
    }

    #[must_use]
    pub const fn table(&self) -> &InstructionTable {
        &self.table
    }

    /// Cycle of the current instruction that the next tick executes.
    #[must_use]
    pub const fn cycle(&self) -> u8 {
        self.cycle
    }

    #[must_use]
    pub const fn opcode(&self) -> u8 {
        self.opcode
    }

    /// Pins the next tick will service.
    #[must_use]
    pub const fn pins(&self) -> Pins {
        self.pins
    }

    #[must_use]
    pub const fn data_in(&self) -> u8 {
        self.data_in
    }

    #[must_use]
    pub const fn alu(&self) -> &Alu {
        &self.alu
    }

    #[must_use]
    pub const fn ticks(&self) -> Ticks {
        self.ticks
    }

    /// The cycle executed by the most recent tick.
    #[must_use]
    pub const fn last_cycle(&self) -> Option<&CycleRecord> {
        self.last.as_ref()
    }

    /// True when the next tick fetches an opcode.
    #[must_use]
    pub const fn is_instruction_complete(&self) -> bool {
        self.cycle == 1
    }

    /// Restart execution at `pc` with an opcode fetch.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn set_pc(&mut self, pc: u16) {
        self.regs.pc = pc;
        self.pins = Pins::read(pc);
        self.cycle = 1;
    }

    /// Run until the next opcode fetch. Returns the number of cycles taken.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn step<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let mut cycles = 0;
        loop {
            self.tick(bus);
            cycles += 1;
            if self.cycle == 1 || cycles >= 64 {
                return cycles;
            }
        }
    }
}

impl Cpu for Spc700 {
    type Registers = Registers;

    fn tick<B: Bus>(&mut self, bus: &mut B) {
        let pins = self.pins;
        if pins.is_read() {
            self.data_in = bus.read(pins.address);
        } else if pins.is_write() {
            bus.write(pins.address, pins.data_out);
        }

        if self.cycle == 1 {
            self.opcode = self.data_in;
        }

        let regs = self.regs;
        let exec = self.table.get(self.opcode).map(|instr| instr.exec);
        let mut step = Step::new(
            self.cycle,
            self.data_in,
            pins,
            self.operand,
            regs,
            &mut self.alu,
        );
        if let Some(exec) = exec {
            exec(&mut step);
        } else {
            log::debug!(
                "unregistered opcode ${:02X} at ${:04X}, skipping",
                self.opcode,
                regs.pc
            );
            step.fetch_next();
            step.finish();
        }
        let (next, alu) = step.close();

        let record = CycleRecord {
            cycle: self.cycle,
            regs,
            pins,
            data_in: self.data_in,
            alu,
        };
        log::trace!(
            "{} op=${:02X} c{} bus={:?} in=${:02X} alu={}",
            self.ticks,
            self.opcode,
            record.cycle,
            pins,
            record.data_in,
            alu.op.mnemonic()
        );
        self.last = Some(record);

        self.regs = next.regs;
        self.pins = next.pins;
        self.cycle = next.cycle;
        self.operand = next.operand;
        self.ticks.advance();
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn reset(&mut self) {
        self.alu = Alu::new();
        self.pins = Pins::read(self.regs.pc);
        self.cycle = 1;
        self.operand = 0;
        self.ticks = Ticks::ZERO;
        self.last = None;
    }
}

impl Observable for Spc700 {
    fn query(&self, path: &str) -> Option<Value> {
        let alu = self.last.map_or(AluTrace::IDLE, |record| record.alu);
        let psw = self.regs.psw;
        match path {
            "a" => Some(self.regs.a.into()),
            "x" => Some(self.regs.x.into()),
            "y" => Some(self.regs.y.into()),
            "sp" => Some(self.regs.sp.into()),
            "pc" => Some(self.regs.pc.into()),
            "ya" => Some(self.regs.ya().into()),
            "psw" => Some(psw.0.into()),
            "flags.n" => Some(psw.is_set(N).into()),
            "flags.v" => Some(psw.is_set(V).into()),
            "flags.p" => Some(psw.is_set(P).into()),
            "flags.b" => Some(psw.is_set(B).into()),
            "flags.h" => Some(psw.is_set(H).into()),
            "flags.i" => Some(psw.is_set(I).into()),
            "flags.z" => Some(psw.is_set(Z).into()),
            "flags.c" => Some(psw.is_set(C).into()),
            "cycle" => Some(self.cycle.into()),
            "opcode" => Some(self.opcode.into()),
            "ticks" => Some(self.ticks.get().into()),
            "bus.enable" => Some(self.pins.enable.into()),
            "bus.address" => Some(self.pins.address.into()),
            "bus.data_out" => Some(self.pins.data_out.into()),
            "bus.read" => Some(self.pins.read.into()),
            "bus.data_in" => Some(self.data_in.into()),
            "alu.op" => Some(alu.op.mnemonic().into()),
            "alu.a" => Some(alu.a.into()),
            "alu.b" => Some(alu.b.into()),
            "alu.result" => Some(alu.result.into()),
            "alu.step" => Some(self.alu.step().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "a",
            "x",
            "y",
            "sp",
            "pc",
            "ya",
            "psw",
            "flags.n",
            "flags.v",
            "flags.p",
            "flags.b",
            "flags.h",
            "flags.i",
            "flags.z",
            "flags.c",
            "cycle",
            "opcode",
            "ticks",
            "bus.enable",
            "bus.address",
            "bus.data_out",
            "bus.read",
            "bus.data_in",
            "alu.op",
            "alu.a",
            "alu.b",
            "alu.result",
            "alu.step",
        ]
    }
}
