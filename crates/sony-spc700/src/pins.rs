//! Bus signals driven by the core.

/// Bus signals for one cycle.
///
/// The core registers these at a clock edge; the memory sees them during the
/// following cycle and its answer is sampled at the edge after that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pins {
    /// True when this cycle performs a real access.
    pub enable: bool,
    pub address: u16,
    /// Byte driven towards memory; only meaningful for writes.
    pub data_out: u8,
    /// Read when true, write when false.
    pub read: bool,
}

impl Pins {
    /// A read of `address`.
    #[must_use]
    pub const fn read(address: u16) -> Self {
        Self {
            enable: true,
            address,
            data_out: 0,
            read: true,
        }
    }

    /// A write of `value` to `address`.
    #[must_use]
    pub const fn write(address: u16, value: u8) -> Self {
        Self {
            enable: true,
            address,
            data_out: value,
            read: false,
        }
    }

    /// No access; the address lines hold `address`.
    #[must_use]
    pub const fn idle(address: u16) -> Self {
        Self {
            enable: false,
            address,
            data_out: 0,
            read: true,
        }
    }

    #[must_use]
    pub const fn is_read(&self) -> bool {
        self.enable && self.read
    }

    #[must_use]
    pub const fn is_write(&self) -> bool {
        self.enable && !self.read
    }
}
