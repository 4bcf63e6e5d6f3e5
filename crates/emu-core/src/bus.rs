//! Memory bus interface.

/// Memory bus seen by a CPU.
///
/// Every address must answer a read. Devices that leave part of the address
/// space unmapped return a fill byte for it instead of failing.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);
}

/// Flat 64K RAM bus.
///
/// Memory that was never loaded or written reads back as the fill byte, which
/// lets tests treat it as unmapped space.
pub struct SimpleBus {
    ram: Box<[u8; 0x1_0000]>,
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleBus {
    /// Create a bus with every byte cleared to zero.
    #[must_use]
    pub fn new() -> Self {
        Self::with_fill(0x00)
    }

    /// Create a bus with every byte set to `fill`.
    #[must_use]
    pub fn with_fill(fill: u8) -> Self {
        Self {
            ram: Box::new([fill; 0x1_0000]),
        }
    }

    /// Copy `data` into memory starting at `address`, wrapping at $FFFF.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        let mut addr = address;
        for &byte in data {
            self.ram[usize::from(addr)] = byte;
            addr = addr.wrapping_add(1);
        }
    }

    /// Read a byte without going through the bus protocol.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    /// Write a byte without going through the bus protocol.
    pub fn poke(&mut self, address: u16, value: u8) {
        self.ram[usize::from(address)] = value;
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram[usize::from(address)] = value;
    }
}
