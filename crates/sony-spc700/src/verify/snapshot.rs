//! Pre/post state and bus traces for one monitored instruction.

use crate::{Pins, Registers};

/// Reads (and separately writes) recorded per instruction.
pub const TRACE_CAPACITY: usize = 8;

/// One bus access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BusAccess {
    pub address: u16,
    pub data: u8,
}

/// Fixed-capacity, ordered list of bus accesses.
///
/// Accesses past [`TRACE_CAPACITY`] are dropped and counted.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    entries: [BusAccess; TRACE_CAPACITY],
    len: usize,
    dropped: u32,
}

impl Trace {
    fn clear(&mut self) {
        self.len = 0;
        self.dropped = 0;
    }

    /// Append an access. Returns false if it was dropped.
    fn push(&mut self, access: BusAccess) -> bool {
        if self.len == TRACE_CAPACITY {
            self.dropped += 1;
            return false;
        }
        self.entries[self.len] = access;
        self.len += 1;
        true
    }

    #[must_use]
    pub fn as_slice(&self) -> &[BusAccess] {
        &self.entries[..self.len]
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Accesses that did not fit.
    #[must_use]
    pub const fn dropped(&self) -> u32 {
        self.dropped
    }
}

/// Evidence gathered while one instruction executes.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    taken: bool,
    opcode: u8,
    /// Cycles seen so far, the opcode fetch included.
    cycles: u8,
    pre: Registers,
    post: Registers,
    reads: Trace,
    writes: Trace,
}

impl Snapshot {
    /// Start monitoring: `fetch` is the opcode read that began the instruction.
    pub fn take_pre(&mut self, regs: Registers, fetch: BusAccess) {
        self.taken = true;
        self.opcode = fetch.data;
        self.cycles = 1;
        self.pre = regs;
        self.reads.clear();
        self.writes.clear();
        self.reads.push(fetch);
    }

    /// The instruction just fetched is not monitored.
    pub fn skip(&mut self) {
        self.taken = false;
    }

    /// Record one execute cycle.
    pub fn record(&mut self, pins: &Pins, data_in: u8) {
        self.cycles = self.cycles.saturating_add(1);
        if !pins.enable {
            return;
        }
        let (trace, access, kind) = if pins.read {
            let access = BusAccess {
                address: pins.address,
                data: data_in,
            };
            (&mut self.reads, access, "read")
        } else {
            let access = BusAccess {
                address: pins.address,
                data: pins.data_out,
            };
            (&mut self.writes, access, "write")
        };
        if !trace.push(access) && trace.dropped() == 1 {
            log::warn!(
                "opcode ${:02X}: {kind} trace full, dropping ${:04X} and later",
                self.opcode,
                access.address
            );
        }
    }

    pub fn take_post(&mut self, regs: Registers) {
        self.post = regs;
    }

    /// True while a monitored instruction is executing.
    #[must_use]
    pub const fn is_taken(&self) -> bool {
        self.taken
    }

    #[must_use]
    pub const fn opcode(&self) -> u8 {
        self.opcode
    }

    #[must_use]
    pub const fn cycles(&self) -> u8 {
        self.cycles
    }

    #[must_use]
    pub const fn pre(&self) -> &Registers {
        &self.pre
    }

    #[must_use]
    pub const fn post(&self) -> &Registers {
        &self.post
    }

    #[must_use]
    pub const fn reads(&self) -> &Trace {
        &self.reads
    }

    #[must_use]
    pub const fn writes(&self) -> &Trace {
        &self.writes
    }
}
