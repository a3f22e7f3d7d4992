//! Serial log sink.
//!
//! On hardware everything goes to COM1. Host test builds print to stdout
//! instead, so log lines end up in the captured test output.

use core::fmt;

#[cfg(all(target_arch = "x86_64", not(test)))]
use conquer_once::spin::Lazy;
#[cfg(all(target_arch = "x86_64", not(test)))]
use spin::Mutex;
#[cfg(all(target_arch = "x86_64", not(test)))]
use uart_16550::SerialPort;

/// I/O base of the first serial port.
pub const COM1_BASE: u16 = 0x3F8;

/// Serial port for writing to the serial interface in QEMU.
#[cfg(all(target_arch = "x86_64", not(test)))]
pub static SERIAL1: Lazy<Mutex<SerialPort>> = Lazy::new(|| {
    let mut serial_port = unsafe { SerialPort::new(COM1_BASE) };
    serial_port.init();
    Mutex::new(serial_port)
});

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    #[cfg(all(target_arch = "x86_64", not(test)))]
    {
        use core::fmt::Write;
        let _ = SERIAL1.lock().write_fmt(args);
    }

    #[cfg(test)]
    std::print!("{}", args);

    #[cfg(all(not(target_arch = "x86_64"), not(test)))]
    let _ = args;
}

/// Global print! macro that writes to the serial interface in QEMU.
#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {
        $crate::serial::_print(format_args!($($arg)*))
    };
}

/// Global println! macro that writes to the serial interface in QEMU.
#[macro_export]
macro_rules! serial_println {
    () => {
        $crate::serial_print!("\n")
    };
    ($($arg:tt)*) => {
        $crate::serial_print!("{}\n", format_args!($($arg)*))
    };
}
