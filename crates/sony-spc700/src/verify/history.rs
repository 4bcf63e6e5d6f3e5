//! Ring buffer of past ALU activity.

use crate::alu::AluTrace;

/// Number of cycles of ALU activity kept.
pub const HISTORY_DEPTH: usize = 32;

/// What the ALU did over the most recent cycles.
#[derive(Debug, Clone)]
pub struct AluHistory {
    ring: [AluTrace; HISTORY_DEPTH],
    head: usize,
    len: usize,
}

impl Default for AluHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl AluHistory {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: [AluTrace::IDLE; HISTORY_DEPTH],
            head: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, trace: AluTrace) {
        self.ring[self.head] = trace;
        self.head = (self.head + 1) % HISTORY_DEPTH;
        self.len = (self.len + 1).min(HISTORY_DEPTH);
    }

    /// The trace from `n` cycles ago; `past(1)` is the most recent push.
    #[must_use]
    pub fn past(&self, n: usize) -> Option<AluTrace> {
        if n == 0 || n > self.len {
            return None;
        }
        Some(self.ring[(self.head + HISTORY_DEPTH - n) % HISTORY_DEPTH])
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}
