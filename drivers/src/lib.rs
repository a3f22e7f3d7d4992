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

//! Hardware protocol drivers for flint.
//!
//! - [`ps2`]: 8042 controller access and the PS/2 keyboard protocol engine
//!   (scancode decoding, modifier tracking, outbound command queue)
//! - [`pci`]: configuration mechanism #1 access, header decoding and
//!   bus/device/function enumeration
//!
//! Every engine talks to hardware through [`port::PortIo`], so the protocol
//! logic runs unchanged against synthetic register fixtures on the host.

#![cfg_attr(not(test), no_std)]

pub mod macros;
pub mod pci;
pub mod port;
pub mod ps2;
pub mod serial;
