/*
Copyright © 2024–2025 Mako and JayAndJef

This file is part of flint.

flint is free software: you can redistribute it and/or modify it under the terms of the GNU General
Public License as published by the Free Software Foundation, either version 3 of the License, or (at
your option) any later version.

flint is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public
License for more details.

You should have received a copy of the GNU General Public License along with flint. If not, see
<https://www.gnu.org/licenses/>.
*/

#![no_std]
#![no_main]
pub mod meta;
pub mod monitor;

use core::panic::PanicInfo;

use drivers::{
    error, info,
    pci::{self, PciConfigAccess},
    port::HardwarePorts,
    ps2::keyboard,
    serial_println,
};
use limine::{
    BaseRevision,
    request::{RequestsEndMarker, RequestsStartMarker},
};

#[unsafe(no_mangle)]
unsafe extern "C" fn kernel_main() -> ! {
    assert!(BASE_REVISION.is_supported());
    meta::print_welcome();

    // SAFETY: nothing else in the kernel touches the PCI configuration ports.
    let mut pci = PciConfigAccess::new(unsafe { HardwarePorts::new() });
    pci::log_functions(&mut pci);

    if let Err(err) = keyboard::init(monitor::handle_key) {
        error!("PS/2 keyboard unavailable: {:?}", err);
        hcf();
    }
    info!("Type to echo, Ctrl+P to list PCI functions");

    loop {
        if monitor::take_pci_request() {
            serial_println!();
            pci::log_functions(&mut pci);
        }
        if !keyboard::poll() {
            core::hint::spin_loop();
        }
    }
}

#[used]
#[unsafe(link_section = ".requests")]
pub static BASE_REVISION: BaseRevision = BaseRevision::new();

#[used]
#[unsafe(link_section = ".requests_start_marker")]
static _START_MARKER: RequestsStartMarker = RequestsStartMarker::new();
#[used]
#[unsafe(link_section = ".requests_end_marker")]
static _END_MARKER: RequestsEndMarker = RequestsEndMarker::new();

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    serial_println!("{}", info);
    hcf();
}

fn hcf() -> ! {
    loop {
        x86_64::instructions::hlt();
    }
}
