//! Minimal serial monitor driven by keyboard events.
//!
//! Printable keys are echoed to the serial console. Ctrl+P asks the main
//! loop to list the PCI functions again.

use core::sync::atomic::{AtomicBool, Ordering};

use drivers::{
    ps2::{
        keyboard::KeyEvent,
        scancode::{self, keys},
    },
    serial_print, serial_println,
};

static PCI_LISTING_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Keyboard event handler.
///
/// Runs with the keyboard driver locked, so it only records requests and
/// writes to serial.
pub fn handle_key(event: KeyEvent) {
    let KeyEvent {
        character, flags, ..
    } = event;

    if flags.ctrl() {
        if character.eq_ignore_ascii_case(&b'p') {
            PCI_LISTING_REQUESTED.store(true, Ordering::Relaxed);
        }
        return;
    }

    match character {
        keys::ENTER => serial_println!(),
        keys::BACKSPACE => serial_print!("\x08 \x08"),
        keys::TAB => serial_print!("\t"),
        c if scancode::is_printable(c) => serial_print!("{}", c as char),
        _ => {}
    }
}

/// Takes a pending PCI listing request.
pub fn take_pci_request() -> bool {
    PCI_LISTING_REQUESTED.swap(false, Ordering::Relaxed)
}
