//! PCI configuration header layouts.
//!
//! The first 16 bytes are shared by every function; bits 0-6 of the header
//! type byte select how the rest of the header is laid out.

use super::config::offsets::{self, bridge, cardbus, general};

/// Number of doublewords in one function's configuration space
pub const CONFIG_DWORDS: usize = 64;

/// Little-endian view of a raw configuration space snapshot.
struct RawConfig<'a>(&'a [u32; CONFIG_DWORDS]);

impl RawConfig<'_> {
    fn u32(&self, offset: u8) -> u32 {
        self.0[(offset >> 2) as usize]
    }

    fn u16(&self, offset: u8) -> u16 {
        (self.u32(offset) >> (8 * (offset & 2))) as u16
    }

    fn u8(&self, offset: u8) -> u8 {
        (self.u32(offset) >> (8 * (offset & 3))) as u8
    }

    fn bars<const N: usize>(&self, first: u8) -> [u32; N] {
        let mut bars = [0; N];
        for (i, bar) in bars.iter_mut().enumerate() {
            *bar = self.u32(first + 4 * i as u8);
        }
        bars
    }
}

/// Fields common to every header type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonHeader {
    pub vendor_id: u16,
    pub device_id: u16,
    pub command: u16,
    pub status: u16,
    pub revision_id: u8,
    pub prog_if: u8,
    pub subclass: u8,
    pub class_code: u8,
    pub cache_line_size: u8,
    pub latency_timer: u8,
    pub header_type: u8,
    pub bist: u8,
}

impl CommonHeader {
    /// Header layout selector with the multi-function bit stripped
    pub const fn layout(&self) -> u8 {
        self.header_type & 0x7F
    }

    pub const fn is_multi_function(&self) -> bool {
        self.header_type & 0x80 != 0
    }
}

/// Type 0 header: an ordinary device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneralHeader {
    pub bars: [u32; 6],
    pub cardbus_cis_pointer: u32,
    pub subsystem_vendor_id: u16,
    pub subsystem_id: u16,
    pub expansion_rom_base: u32,
    pub capabilities_pointer: u8,
    pub interrupt_line: u8,
    pub interrupt_pin: u8,
    pub min_grant: u8,
    pub max_latency: u8,
}

/// Type 1 header: a PCI-to-PCI bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeHeader {
    pub bars: [u32; 2],
    pub primary_bus: u8,
    pub secondary_bus: u8,
    pub subordinate_bus: u8,
    pub secondary_latency_timer: u8,
    pub io_base: u8,
    pub io_limit: u8,
    pub secondary_status: u16,
    pub memory_base: u16,
    pub memory_limit: u16,
    pub prefetchable_base: u16,
    pub prefetchable_limit: u16,
    pub prefetchable_base_upper: u32,
    pub prefetchable_limit_upper: u32,
    pub io_base_upper: u16,
    pub io_limit_upper: u16,
    pub capabilities_pointer: u8,
    pub expansion_rom_base: u32,
    pub interrupt_line: u8,
    pub interrupt_pin: u8,
    pub bridge_control: u16,
}

/// Type 2 header: a CardBus bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardBusHeader {
    pub socket_base: u32,
    pub capabilities_offset: u8,
    pub secondary_status: u16,
    pub pci_bus: u8,
    pub cardbus_bus: u8,
    pub subordinate_bus: u8,
    pub cardbus_latency_timer: u8,
    /// Base/limit pairs of the two memory windows
    pub memory_windows: [(u32, u32); 2],
    /// Base/limit pairs of the two I/O windows
    pub io_windows: [(u32, u32); 2],
    pub interrupt_line: u8,
    pub interrupt_pin: u8,
    pub bridge_control: u16,
    pub subsystem_vendor_id: u16,
    pub subsystem_id: u16,
    pub legacy_base: u32,
}

/// Layout-specific part of a header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    General(GeneralHeader),
    PciBridge(BridgeHeader),
    CardBus(CardBusHeader),
    /// Layout this driver does not know; carries the raw selector
    Unknown(u8),
}

impl HeaderKind {
    pub const fn name(&self) -> &'static str {
        match self {
            HeaderKind::General(_) => "general device",
            HeaderKind::PciBridge(_) => "PCI-to-PCI bridge",
            HeaderKind::CardBus(_) => "CardBus bridge",
            HeaderKind::Unknown(_) => "unknown layout",
        }
    }
}

/// A decoded configuration header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PciConfigHeader {
    pub common: CommonHeader,
    pub kind: HeaderKind,
}

impl PciConfigHeader {
    /// Decodes a snapshot of the 64 configuration doublewords.
    pub fn from_dwords(raw: &[u32; CONFIG_DWORDS]) -> Self {
        let raw = RawConfig(raw);

        let common = CommonHeader {
            vendor_id: raw.u16(offsets::VENDOR_ID),
            device_id: raw.u16(offsets::DEVICE_ID),
            command: raw.u16(offsets::COMMAND),
            status: raw.u16(offsets::STATUS),
            revision_id: raw.u8(offsets::REVISION_ID),
            prog_if: raw.u8(offsets::PROG_IF),
            subclass: raw.u8(offsets::SUBCLASS),
            class_code: raw.u8(offsets::CLASS_CODE),
            cache_line_size: raw.u8(offsets::CACHE_LINE_SIZE),
            latency_timer: raw.u8(offsets::LATENCY_TIMER),
            header_type: raw.u8(offsets::HEADER_TYPE),
            bist: raw.u8(offsets::BIST),
        };

        let kind = match common.layout() {
            0x00 => HeaderKind::General(GeneralHeader {
                bars: raw.bars(general::BAR0),
                cardbus_cis_pointer: raw.u32(general::CARDBUS_CIS),
                subsystem_vendor_id: raw.u16(general::SUBSYSTEM_VENDOR_ID),
                subsystem_id: raw.u16(general::SUBSYSTEM_ID),
                expansion_rom_base: raw.u32(general::EXPANSION_ROM),
                capabilities_pointer: raw.u8(general::CAPABILITIES_PTR),
                interrupt_line: raw.u8(general::INTERRUPT_LINE),
                interrupt_pin: raw.u8(general::INTERRUPT_PIN),
                min_grant: raw.u8(general::MIN_GRANT),
                max_latency: raw.u8(general::MAX_LATENCY),
            }),
            0x01 => HeaderKind::PciBridge(BridgeHeader {
                bars: raw.bars(bridge::BAR0),
                primary_bus: raw.u8(bridge::PRIMARY_BUS),
                secondary_bus: raw.u8(bridge::SECONDARY_BUS),
                subordinate_bus: raw.u8(bridge::SUBORDINATE_BUS),
                secondary_latency_timer: raw.u8(bridge::SECONDARY_LATENCY_TIMER),
                io_base: raw.u8(bridge::IO_BASE),
                io_limit: raw.u8(bridge::IO_LIMIT),
                secondary_status: raw.u16(bridge::SECONDARY_STATUS),
                memory_base: raw.u16(bridge::MEMORY_BASE),
                memory_limit: raw.u16(bridge::MEMORY_LIMIT),
                prefetchable_base: raw.u16(bridge::PREFETCHABLE_BASE),
                prefetchable_limit: raw.u16(bridge::PREFETCHABLE_LIMIT),
                prefetchable_base_upper: raw.u32(bridge::PREFETCHABLE_BASE_UPPER),
                prefetchable_limit_upper: raw.u32(bridge::PREFETCHABLE_LIMIT_UPPER),
                io_base_upper: raw.u16(bridge::IO_BASE_UPPER),
                io_limit_upper: raw.u16(bridge::IO_LIMIT_UPPER),
                capabilities_pointer: raw.u8(bridge::CAPABILITIES_PTR),
                expansion_rom_base: raw.u32(bridge::EXPANSION_ROM),
                interrupt_line: raw.u8(bridge::INTERRUPT_LINE),
                interrupt_pin: raw.u8(bridge::INTERRUPT_PIN),
                bridge_control: raw.u16(bridge::BRIDGE_CONTROL),
            }),
            0x02 => {
                let window = |base: u8| (raw.u32(base), raw.u32(base + 4));
                HeaderKind::CardBus(CardBusHeader {
                    socket_base: raw.u32(cardbus::SOCKET_BASE),
                    capabilities_offset: raw.u8(cardbus::CAPABILITIES_OFFSET),
                    secondary_status: raw.u16(cardbus::SECONDARY_STATUS),
                    pci_bus: raw.u8(cardbus::PCI_BUS),
                    cardbus_bus: raw.u8(cardbus::CARDBUS_BUS),
                    subordinate_bus: raw.u8(cardbus::SUBORDINATE_BUS),
                    cardbus_latency_timer: raw.u8(cardbus::CARDBUS_LATENCY_TIMER),
                    memory_windows: [
                        window(cardbus::MEMORY_BASE_0),
                        window(cardbus::MEMORY_BASE_0 + 8),
                    ],
                    io_windows: [window(cardbus::IO_BASE_0), window(cardbus::IO_BASE_0 + 8)],
                    interrupt_line: raw.u8(cardbus::INTERRUPT_LINE),
                    interrupt_pin: raw.u8(cardbus::INTERRUPT_PIN),
                    bridge_control: raw.u16(cardbus::BRIDGE_CONTROL),
                    subsystem_vendor_id: raw.u16(cardbus::SUBSYSTEM_VENDOR_ID),
                    subsystem_id: raw.u16(cardbus::SUBSYSTEM_ID),
                    legacy_base: raw.u32(cardbus::LEGACY_BASE),
                })
            }
            other => HeaderKind::Unknown(other),
        };

        Self { common, kind }
    }
}

/// Human-readable name of a class/subclass pair
pub fn class_name(class_code: u8, subclass: u8) -> &'static str {
    match (class_code, subclass) {
        (0x00, 0x00) => "Legacy Device",
        (0x00, 0x01) => "VGA-Compatible Legacy Device",
        (0x01, 0x00) => "SCSI Bus Controller",
        (0x01, 0x01) => "IDE Controller",
        (0x01, 0x02) => "Floppy Disk Controller",
        (0x01, 0x04) => "RAID Controller",
        (0x01, 0x05) => "ATA Controller",
        (0x01, 0x06) => "SATA Controller",
        (0x01, 0x07) => "SAS Controller",
        (0x01, 0x08) => "NVM Controller",
        (0x01, _) => "Mass Storage Controller",
        (0x02, 0x00) => "Ethernet Controller",
        (0x02, _) => "Network Controller",
        (0x03, 0x00) => "VGA Compatible Controller",
        (0x03, 0x01) => "XGA Controller",
        (0x03, 0x02) => "3D Controller",
        (0x03, _) => "Display Controller",
        (0x04, 0x01) => "Multimedia Audio Controller",
        (0x04, 0x03) => "Audio Device",
        (0x04, _) => "Multimedia Controller",
        (0x05, _) => "Memory Controller",
        (0x06, 0x00) => "Host Bridge",
        (0x06, 0x01) => "ISA Bridge",
        (0x06, 0x02) => "EISA Bridge",
        (0x06, 0x04) | (0x06, 0x09) => "PCI-to-PCI Bridge",
        (0x06, 0x05) => "PCMCIA Bridge",
        (0x06, 0x07) => "CardBus Bridge",
        (0x06, _) => "Bridge",
        (0x07, _) => "Communication Controller",
        (0x08, _) => "Base System Peripheral",
        (0x09, _) => "Input Device Controller",
        (0x0A, _) => "Docking Station",
        (0x0B, _) => "Processor",
        (0x0C, 0x00) => "FireWire Controller",
        (0x0C, 0x03) => "USB Controller",
        (0x0C, 0x05) => "SMBus Controller",
        (0x0C, _) => "Serial Bus Controller",
        (0x0D, _) => "Wireless Controller",
        (0x0E, _) => "Intelligent Controller",
        (0x0F, _) => "Satellite Communication Controller",
        (0x10, _) => "Encryption Controller",
        (0x11, _) => "Signal Processing Controller",
        (0x12, _) => "Processing Accelerator",
        (0x13, _) => "Non-Essential Instrumentation",
        (0x40, _) => "Co-Processor",
        (0xFF, _) => "Unassigned Class",
        _ => "Unknown Device",
    }
}
