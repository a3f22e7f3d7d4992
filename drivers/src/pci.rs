//! PCI support for the kernel.
//!
//! This module provides configuration space access through the legacy
//! address/data port pair (mechanism #1):
//!
//! - Address word construction and sub-word field extraction
//! - Decoding of the type 0, 1 and 2 configuration headers
//! - Bus/device/function enumeration

pub mod config;
pub mod enumerate;
pub mod header;


pub use config::{AccessWidth, PciAddress, PciConfigAccess};
pub use enumerate::{FunctionId, PciScan};
pub use header::{HeaderKind, PciConfigHeader};

use crate::{info, port::PortIo};

/// PCI-related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PciError {
    /// Device number above 31
    InvalidDevice(u8),
    /// Function number above 7
    InvalidFunction(u8),
}

/// Logs every present function with its ids and class. Returns how many
/// were found.
pub fn log_functions<P: PortIo>(access: &mut PciConfigAccess<P>) -> usize {
    info!("Scanning PCI configuration space");

    let mut found = 0;
    let mut scan = access.scan();
    while let Some(address) = scan.next() {
        let header = scan.access().read_header(address);
        let common = &header.common;
        info!(
            "{} {:04x}:{:04x} {} ({:02x}.{:02x}.{:02x}) {}",
            address,
            common.vendor_id,
            common.device_id,
            header::class_name(common.class_code, common.subclass),
            common.class_code,
            common.subclass,
            common.prog_if,
            header.kind.name(),
        );
        found += 1;
    }

    info!("Found {} PCI functions", found);
    found
}
