//! Brute-force bus/device/function enumeration.

use core::fmt;

use crate::{port::PortIo, trace};

use super::config::{PciAddress, PciConfigAccess};

const BUS_COUNT: u16 = 256;

/// Compact function handle: bus in bits 8-15, device in bits 3-7, function
/// in bits 0-2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct FunctionId(u16);

impl FunctionId {
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    pub const fn bus(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn device(self) -> u8 {
        ((self.0 >> 3) & 0x1F) as u8
    }

    pub const fn function(self) -> u8 {
        (self.0 & 0x07) as u8
    }

    pub const fn address(self) -> PciAddress {
        PciAddress::new_masked(self.bus(), self.device(), self.function())
    }
}

impl From<PciAddress> for FunctionId {
    fn from(address: PciAddress) -> Self {
        Self(
            (address.bus() as u16) << 8
                | (address.device() as u16) << 3
                | address.function() as u16,
        )
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.address(), f)
    }
}

/// Iterator over present functions in bus, device, function order.
///
/// Work is done on demand: every `next` probes only until it finds one
/// function. Whether a device found at function 0 has functions 1-7 is
/// checked on the following call, so stopping right after a hit costs no
/// extra configuration reads.
pub struct PciScan<'a, P: PortIo> {
    access: &'a mut PciConfigAccess<P>,
    bus: u16,
    device: u8,
    function: u8,
    /// Function 0 returned by the previous call, multi-function bit unread
    pending: Option<PciAddress>,
}

impl<'a, P: PortIo> PciScan<'a, P> {
    pub(super) fn new(access: &'a mut PciConfigAccess<P>) -> Self {
        Self {
            access,
            bus: 0,
            device: 0,
            function: 0,
            pending: None,
        }
    }

    /// The configuration access driving the scan, for reading more of a
    /// function that was just returned.
    pub fn access(&mut self) -> &mut PciConfigAccess<P> {
        &mut *self.access
    }

    fn next_device(&mut self) {
        self.function = 0;
        if self.device == PciAddress::MAX_DEVICE {
            self.device = 0;
            self.bus += 1;
        } else {
            self.device += 1;
        }
    }

    fn next_function(&mut self) {
        if self.function == PciAddress::MAX_FUNCTION {
            self.next_device();
        } else {
            self.function += 1;
        }
    }
}

impl<P: PortIo> Iterator for PciScan<'_, P> {
    type Item = PciAddress;

    fn next(&mut self) -> Option<PciAddress> {
        if let Some(function0) = self.pending.take() {
            if self.access.is_multi_function(function0) {
                self.next_function();
            } else {
                self.next_device();
            }
        }

        while self.bus < BUS_COUNT {
            let address = PciAddress::new_masked(self.bus as u8, self.device, self.function);

            if !self.access.device_exists(address) {
                // Without function 0 there is no device at all.
                if self.function == 0 {
                    self.next_device();
                } else {
                    self.next_function();
                }
                continue;
            }

            if self.function == 0 {
                self.pending = Some(address);
            } else {
                self.next_function();
            }
            trace!("PCI function present at {}", address);
            return Some(address);
        }

        None
    }
}
