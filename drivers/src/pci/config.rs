//! PCI configuration space access through the address/data port pair.
//!
//! Registers are always read as an aligned doubleword; 8- and 16-bit fields
//! are shifted out of that read rather than issued as narrower bus cycles.

use core::fmt;

use crate::port::PortIo;

use super::{PciError, enumerate::PciScan, header::PciConfigHeader};

/// The port used to specify the configuration address.
pub const CONFIG_ADDRESS_PORT: u16 = 0x0CF8;
/// The port used to transfer configuration data.
pub const CONFIG_DATA_PORT: u16 = 0x0CFC;

/// Enable bit of the configuration address word
pub const ENABLE_BIT: u32 = 1 << 31;
/// Vendor id read back when no function responds
pub const ABSENT_VENDOR_ID: u16 = 0xFFFF;
/// Header type bit flagging a multi-function device
pub const MULTI_FUNCTION_BIT: u8 = 0x80;
/// Size of one function's configuration space
pub const CONFIG_SPACE_SIZE: usize = 256;

/// PCI configuration space offsets
pub mod offsets {
    pub const VENDOR_ID: u8 = 0x00;
    pub const DEVICE_ID: u8 = 0x02;
    pub const COMMAND: u8 = 0x04;
    pub const STATUS: u8 = 0x06;
    pub const REVISION_ID: u8 = 0x08;
    pub const PROG_IF: u8 = 0x09;
    pub const SUBCLASS: u8 = 0x0A;
    pub const CLASS_CODE: u8 = 0x0B;
    pub const CACHE_LINE_SIZE: u8 = 0x0C;
    pub const LATENCY_TIMER: u8 = 0x0D;
    pub const HEADER_TYPE: u8 = 0x0E;
    pub const BIST: u8 = 0x0F;

    /// Type 0 (general device) header
    pub mod general {
        pub const BAR0: u8 = 0x10;
        pub const CARDBUS_CIS: u8 = 0x28;
        pub const SUBSYSTEM_VENDOR_ID: u8 = 0x2C;
        pub const SUBSYSTEM_ID: u8 = 0x2E;
        pub const EXPANSION_ROM: u8 = 0x30;
        pub const CAPABILITIES_PTR: u8 = 0x34;
        pub const INTERRUPT_LINE: u8 = 0x3C;
        pub const INTERRUPT_PIN: u8 = 0x3D;
        pub const MIN_GRANT: u8 = 0x3E;
        pub const MAX_LATENCY: u8 = 0x3F;
    }

    /// Type 1 (PCI-to-PCI bridge) header
    pub mod bridge {
        pub const BAR0: u8 = 0x10;
        pub const PRIMARY_BUS: u8 = 0x18;
        pub const SECONDARY_BUS: u8 = 0x19;
        pub const SUBORDINATE_BUS: u8 = 0x1A;
        pub const SECONDARY_LATENCY_TIMER: u8 = 0x1B;
        pub const IO_BASE: u8 = 0x1C;
        pub const IO_LIMIT: u8 = 0x1D;
        pub const SECONDARY_STATUS: u8 = 0x1E;
        pub const MEMORY_BASE: u8 = 0x20;
        pub const MEMORY_LIMIT: u8 = 0x22;
        pub const PREFETCHABLE_BASE: u8 = 0x24;
        pub const PREFETCHABLE_LIMIT: u8 = 0x26;
        pub const PREFETCHABLE_BASE_UPPER: u8 = 0x28;
        pub const PREFETCHABLE_LIMIT_UPPER: u8 = 0x2C;
        pub const IO_BASE_UPPER: u8 = 0x30;
        pub const IO_LIMIT_UPPER: u8 = 0x32;
        pub const CAPABILITIES_PTR: u8 = 0x34;
        pub const EXPANSION_ROM: u8 = 0x38;
        pub const INTERRUPT_LINE: u8 = 0x3C;
        pub const INTERRUPT_PIN: u8 = 0x3D;
        pub const BRIDGE_CONTROL: u8 = 0x3E;
    }

    /// Type 2 (CardBus bridge) header
    pub mod cardbus {
        pub const SOCKET_BASE: u8 = 0x10;
        pub const CAPABILITIES_OFFSET: u8 = 0x14;
        pub const SECONDARY_STATUS: u8 = 0x16;
        pub const PCI_BUS: u8 = 0x18;
        pub const CARDBUS_BUS: u8 = 0x19;
        pub const SUBORDINATE_BUS: u8 = 0x1A;
        pub const CARDBUS_LATENCY_TIMER: u8 = 0x1B;
        pub const MEMORY_BASE_0: u8 = 0x1C;
        pub const IO_BASE_0: u8 = 0x2C;
        pub const INTERRUPT_LINE: u8 = 0x3C;
        pub const INTERRUPT_PIN: u8 = 0x3D;
        pub const BRIDGE_CONTROL: u8 = 0x3E;
        pub const SUBSYSTEM_VENDOR_ID: u8 = 0x40;
        pub const SUBSYSTEM_ID: u8 = 0x42;
        pub const LEGACY_BASE: u8 = 0x44;
    }
}

/// Location of a function in configuration space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PciAddress {
    bus: u8,
    device: u8,
    function: u8,
}

impl PciAddress {
    pub const MAX_DEVICE: u8 = 31;
    pub const MAX_FUNCTION: u8 = 7;

    pub fn new(bus: u8, device: u8, function: u8) -> Result<Self, PciError> {
        if device > Self::MAX_DEVICE {
            return Err(PciError::InvalidDevice(device));
        }
        if function > Self::MAX_FUNCTION {
            return Err(PciError::InvalidFunction(function));
        }
        Ok(Self::new_masked(bus, device, function))
    }

    /// Builds an address, truncating `device` to 5 bits and `function` to 3.
    pub const fn new_masked(bus: u8, device: u8, function: u8) -> Self {
        Self {
            bus,
            device: device & Self::MAX_DEVICE,
            function: function & Self::MAX_FUNCTION,
        }
    }

    pub const fn bus(&self) -> u8 {
        self.bus
    }

    pub const fn device(&self) -> u8 {
        self.device
    }

    pub const fn function(&self) -> u8 {
        self.function
    }

    /// The same device's function `function`.
    pub const fn with_function(&self, function: u8) -> Self {
        Self::new_masked(self.bus, self.device, function)
    }

    /// Word written to the address port to select the doubleword holding
    /// `offset`.
    pub const fn config_address(&self, offset: u8) -> u32 {
        ENABLE_BIT
            | (self.bus as u32) << 16
            | (self.device as u32) << 11
            | (self.function as u32) << 8
            | (offset & 0xFC) as u32
    }
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}:{:02x}.{}", self.bus, self.device, self.function)
    }
}

/// Width of a configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessWidth {
    Byte,
    Word,
    Dword,
}

/// Extracts a field of `width` at `offset` from the aligned doubleword
/// `dword` containing it.
pub const fn extract(dword: u32, offset: u8, width: AccessWidth) -> u32 {
    match width {
        AccessWidth::Byte => (dword >> (8 * (offset & 3))) & 0xFF,
        AccessWidth::Word => (dword >> (8 * (offset & 2))) & 0xFFFF,
        AccessWidth::Dword => dword,
    }
}

/// Configuration mechanism #1 over a pair of I/O ports.
///
/// Holding it by `&mut` is what keeps address/data round trips from
/// interleaving.
pub struct PciConfigAccess<P: PortIo> {
    ports: P,
}

impl<P: PortIo> PciConfigAccess<P> {
    pub fn new(ports: P) -> Self {
        Self { ports }
    }

    pub fn ports(&self) -> &P {
        &self.ports
    }

    pub fn into_inner(self) -> P {
        self.ports
    }

    /// Reads the doubleword containing `offset`.
    pub fn read_u32(&mut self, address: PciAddress, offset: u8) -> u32 {
        self.ports
            .write_u32(CONFIG_ADDRESS_PORT, address.config_address(offset));
        self.ports.read_u32(CONFIG_DATA_PORT)
    }

    pub fn read_u16(&mut self, address: PciAddress, offset: u8) -> u16 {
        self.read(address, offset, AccessWidth::Word) as u16
    }

    pub fn read_u8(&mut self, address: PciAddress, offset: u8) -> u8 {
        self.read(address, offset, AccessWidth::Byte) as u8
    }

    /// Reads a field of any width.
    pub fn read(&mut self, address: PciAddress, offset: u8, width: AccessWidth) -> u32 {
        let dword = self.read_u32(address, offset);
        extract(dword, offset, width)
    }

    /// Writes the doubleword containing `offset`.
    pub fn write_u32(&mut self, address: PciAddress, offset: u8, value: u32) {
        self.ports
            .write_u32(CONFIG_ADDRESS_PORT, address.config_address(offset));
        self.ports.write_u32(CONFIG_DATA_PORT, value);
    }

    pub fn vendor_id(&mut self, address: PciAddress) -> u16 {
        self.read_u16(address, offsets::VENDOR_ID)
    }

    /// Whether a function responds at `address`. An absent function reads
    /// back an all-ones vendor id.
    pub fn device_exists(&mut self, address: PciAddress) -> bool {
        self.vendor_id(address) != ABSENT_VENDOR_ID
    }

    pub fn header_type(&mut self, address: PciAddress) -> u8 {
        self.read_u8(address, offsets::HEADER_TYPE)
    }

    /// Whether the device at `address` implements functions 1-7. Only
    /// meaningful on function 0.
    pub fn is_multi_function(&mut self, address: PciAddress) -> bool {
        self.header_type(address.with_function(0)) & MULTI_FUNCTION_BIT != 0
    }

    /// Reads and decodes the full configuration header of `address`.
    ///
    /// Check [`Self::device_exists`] first: an absent function decodes as
    /// all ones.
    pub fn read_header(&mut self, address: PciAddress) -> PciConfigHeader {
        let mut raw = [0u32; CONFIG_SPACE_SIZE / 4];
        for (i, dword) in raw.iter_mut().enumerate() {
            *dword = self.read_u32(address, (i * 4) as u8);
        }
        PciConfigHeader::from_dwords(&raw)
    }

    /// Lazily walks every present function; see [`PciScan`].
    pub fn scan(&mut self) -> PciScan<'_, P> {
        PciScan::new(self)
    }

    /// Fills `out` with present functions in bus, device, function order and
    /// returns how many were written. Probing stops once `out` is full.
    pub fn enumerate(&mut self, out: &mut [super::FunctionId]) -> usize {
        let mut count = 0;
        for (slot, address) in out.iter_mut().zip(self.scan()) {
            *slot = address.into();
            count += 1;
        }
        count
    }
}
