//! Scan code set 1 decoder.
//!
//! The keyboard sends make/break codes and multi-byte escapes with no length
//! framing, one byte per interrupt. [`ScancodeDecoder`] reconstructs logical
//! key events from that flat stream, one byte per call. Any byte that does
//! not fit the sequence in progress sends the machine to
//! [`DecoderState::Error`], which swallows exactly one more byte and starts
//! over, so bad input can never wedge it.

use crate::trace;

use super::scancode::{self, TableContext, keys};

/// Prefix of two-byte extended codes
pub const EXTENDED_PREFIX: u8 = 0xE0;
/// Prefix of the Pause sequence
pub const PAUSE_PREFIX: u8 = 0xE1;

/// Where the decoder is in the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecoderState {
    /// Between events; the only state in which a command may be dispatched
    #[default]
    Start,
    /// Saw `E0`
    ExtendedPrefix,
    /// Saw `E1`
    PauseSeq1,
    /// Saw `E1 1D`
    PausePressWait,
    /// Saw `E1 9D`
    PauseReleaseWait,
    /// Saw `E0 2A`
    PrtScPressWait1,
    /// Saw `E0 2A E0`
    PrtScPressWait2,
    /// Saw `E0 B7`
    PrtScReleaseWait1,
    /// Saw `E0 B7 E0`
    PrtScReleaseWait2,
    /// A command byte went out; the next byte is the keyboard's answer
    AwaitingControllerResponse,
    /// Desynchronized; the next byte is dropped
    Error,
}

/// Byte-at-a-time scancode state machine.
#[derive(Debug, Default)]
pub struct ScancodeDecoder {
    state: DecoderState,
}

impl ScancodeDecoder {
    pub const fn new() -> Self {
        Self {
            state: DecoderState::Start,
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Forces a state. Only the command handshake uses this, to enter and
    /// leave [`DecoderState::AwaitingControllerResponse`].
    pub(crate) fn set_state(&mut self, state: DecoderState) {
        self.state = state;
    }

    pub fn reset(&mut self) {
        self.state = DecoderState::Start;
    }

    /// Consumes one raw byte and returns the logical key it completes, if any.
    ///
    /// Release codes resolve to the same logical key as their make code; the
    /// caller tells them apart by bit 7 of `byte`. For Pause and Print Screen
    /// the final byte of the sequence carries that bit.
    pub fn feed(&mut self, byte: u8) -> Option<u8> {
        use DecoderState::*;

        let (next, key) = match self.state {
            Start => match byte {
                EXTENDED_PREFIX => (ExtendedPrefix, None),
                PAUSE_PREFIX => (PauseSeq1, None),
                _ => (Start, Some(scancode::lookup(TableContext::Base, byte))),
            },
            ExtendedPrefix => match byte {
                0x2A => (PrtScPressWait1, None),
                0xB7 => (PrtScReleaseWait1, None),
                // Fake shifts wrapped around navigation keys in num lock mode
                0xAA | 0x36 | 0xB6 => (Start, None),
                _ => match scancode::lookup(TableContext::Extended, byte) {
                    keys::UNMAPPED => (Error, None),
                    key => (Start, Some(key)),
                },
            },
            PauseSeq1 => match byte {
                0x1D => (PausePressWait, None),
                0x9D => (PauseReleaseWait, None),
                _ => (Error, None),
            },
            PausePressWait => match byte {
                0x45 => (Start, Some(keys::PAUSE)),
                _ => (Error, None),
            },
            PauseReleaseWait => match byte {
                0xC5 => (Start, Some(keys::PAUSE)),
                _ => (Error, None),
            },
            PrtScPressWait1 => match byte {
                EXTENDED_PREFIX => (PrtScPressWait2, None),
                _ => (Error, None),
            },
            PrtScPressWait2 => match byte {
                0x37 => (Start, Some(keys::PRINT_SCREEN)),
                _ => (Error, None),
            },
            PrtScReleaseWait1 => match byte {
                EXTENDED_PREFIX => (PrtScReleaseWait2, None),
                _ => (Error, None),
            },
            PrtScReleaseWait2 => match byte {
                0xAA => (Start, Some(keys::PRINT_SCREEN)),
                _ => (Error, None),
            },
            AwaitingControllerResponse => (AwaitingControllerResponse, None),
            Error => (Start, None),
        };

        if next == Error {
            trace!(
                "scancode 0x{:02X} unexpected in {:?}, dropping next byte",
                byte, self.state
            );
        }

        self.state = next;
        key.filter(|&key| key != keys::UNMAPPED)
    }
}
