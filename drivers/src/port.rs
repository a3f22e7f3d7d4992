//! Port-mapped register access.
//!
//! The protocol engines never touch `in`/`out` themselves; they go through
//! [`PortIo`], which [`HardwarePorts`] implements with the `x86_64` crate's
//! port types. Tests substitute register fixtures.

/// Single-cycle access to the x86 I/O address space.
pub trait PortIo {
    /// Reads a byte from `port`.
    fn read_u8(&mut self, port: u16) -> u8;
    /// Writes a byte to `port`.
    fn write_u8(&mut self, port: u16, value: u8);
    /// Reads a doubleword from `port`.
    fn read_u32(&mut self, port: u16) -> u32;
    /// Writes a doubleword to `port`.
    fn write_u32(&mut self, port: u16, value: u32);
}

impl<P: PortIo + ?Sized> PortIo for &mut P {
    fn read_u8(&mut self, port: u16) -> u8 {
        (**self).read_u8(port)
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        (**self).write_u8(port, value)
    }

    fn read_u32(&mut self, port: u16) -> u32 {
        (**self).read_u32(port)
    }

    fn write_u32(&mut self, port: u16, value: u32) {
        (**self).write_u32(port, value)
    }
}

/// The machine's real I/O ports.
#[cfg(target_arch = "x86_64")]
#[derive(Debug)]
pub struct HardwarePorts {
    _private: (),
}

#[cfg(target_arch = "x86_64")]
impl HardwarePorts {
    /// # Safety
    ///
    /// The caller must run in ring 0 and must be the only code driving the
    /// ports it hands this value to.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(target_arch = "x86_64")]
impl PortIo for HardwarePorts {
    fn read_u8(&mut self, port: u16) -> u8 {
        let mut port = x86_64::instructions::port::Port::<u8>::new(port);
        unsafe { port.read() }
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        let mut port = x86_64::instructions::port::Port::<u8>::new(port);
        unsafe { port.write(value) }
    }

    fn read_u32(&mut self, port: u16) -> u32 {
        let mut port = x86_64::instructions::port::Port::<u32>::new(port);
        unsafe { port.read() }
    }

    fn write_u32(&mut self, port: u16, value: u32) {
        let mut port = x86_64::instructions::port::Port::<u32>::new(port);
        unsafe { port.write(value) }
    }
}
