//! Scan code set 1 translation tables.
//!
//! A logical key code is a byte: printable keys map to their ASCII character,
//! everything else to a sentinel from [`keys`]. Sentinels live in
//! `0x00..=0x1F`, `0x7F` and `0x80..=0x99`, so they never collide with
//! printable ASCII.

/// Logical codes for keys without a printable character.
pub mod keys {
    /// No key at this position
    pub const UNMAPPED: u8 = 0x00;
    pub const LEFT_CTRL: u8 = 0x02;
    pub const LEFT_SHIFT: u8 = 0x03;
    pub const RIGHT_SHIFT: u8 = 0x04;
    pub const LEFT_ALT: u8 = 0x05;
    pub const CAPS_LOCK: u8 = 0x06;
    pub const F1: u8 = 0x07;
    pub const BACKSPACE: u8 = 0x08;
    pub const TAB: u8 = 0x09;
    pub const ENTER: u8 = 0x0A;
    pub const F2: u8 = 0x0E;
    pub const F3: u8 = 0x0F;
    pub const F4: u8 = 0x10;
    pub const F5: u8 = 0x11;
    pub const F6: u8 = 0x12;
    pub const F7: u8 = 0x13;
    pub const F8: u8 = 0x14;
    pub const F9: u8 = 0x15;
    pub const F10: u8 = 0x16;
    pub const NUM_LOCK: u8 = 0x17;
    pub const SCROLL_LOCK: u8 = 0x18;
    pub const F11: u8 = 0x19;
    pub const F12: u8 = 0x1A;
    pub const ESCAPE: u8 = 0x1B;
    pub const RIGHT_CTRL: u8 = 0x1E;
    pub const RIGHT_ALT: u8 = 0x1F;
    pub const DELETE: u8 = 0x7F;
    pub const HOME: u8 = 0x80;
    pub const UP: u8 = 0x81;
    pub const PAGE_UP: u8 = 0x82;
    pub const LEFT: u8 = 0x83;
    pub const RIGHT: u8 = 0x84;
    pub const END: u8 = 0x85;
    pub const DOWN: u8 = 0x86;
    pub const PAGE_DOWN: u8 = 0x87;
    pub const INSERT: u8 = 0x88;
    pub const LEFT_GUI: u8 = 0x89;
    pub const RIGHT_GUI: u8 = 0x8A;
    pub const APPS: u8 = 0x8B;
    pub const POWER: u8 = 0x8C;
    pub const SLEEP: u8 = 0x8D;
    pub const WAKE: u8 = 0x8E;
    pub const WWW_SEARCH: u8 = 0x8F;
    pub const WWW_FAVORITES: u8 = 0x90;
    pub const WWW_REFRESH: u8 = 0x91;
    pub const WWW_STOP: u8 = 0x92;
    pub const WWW_FORWARD: u8 = 0x93;
    pub const WWW_BACK: u8 = 0x94;
    pub const MY_COMPUTER: u8 = 0x95;
    pub const EMAIL: u8 = 0x96;
    pub const MEDIA_SELECT: u8 = 0x97;
    /// Emitted at the end of the `E1 1D 45` / `E1 9D C5` sequences
    pub const PAUSE: u8 = 0x98;
    /// Emitted at the end of the `E0 2A E0 37` / `E0 B7 E0 AA` sequences
    pub const PRINT_SCREEN: u8 = 0x99;
    /// A real key with no logical meaning yet (media and ACPI keys)
    pub const UNIMPLEMENTED: u8 = 0xFF;
}

use keys::*;

/// Which half of the key map a code is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableContext {
    /// Single-byte codes
    Base,
    /// Codes following an `0xE0` prefix
    Extended,
}

/// Shift substitution only exists for codes below this value.
pub const SHIFT_TABLE_LEN: usize = 0x36;

#[rustfmt::skip]
static BASE: [u8; 128] = [
    // 0x00
    UNMAPPED, ESCAPE, b'1', b'2', b'3', b'4', b'5', b'6',
    b'7', b'8', b'9', b'0', b'-', b'=', BACKSPACE, TAB,
    // 0x10
    b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i',
    b'o', b'p', b'[', b']', ENTER, LEFT_CTRL, b'a', b's',
    // 0x20
    b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';',
    b'\'', b'`', LEFT_SHIFT, b'\\', b'z', b'x', b'c', b'v',
    // 0x30
    b'b', b'n', b'm', b',', b'.', b'/', RIGHT_SHIFT, b'*',
    LEFT_ALT, b' ', CAPS_LOCK, F1, F2, F3, F4, F5,
    // 0x40, keypad from 0x47
    F6, F7, F8, F9, F10, NUM_LOCK, SCROLL_LOCK, b'7',
    b'8', b'9', b'-', b'4', b'5', b'6', b'+', b'1',
    // 0x50
    b'2', b'3', b'0', b'.', UNMAPPED, UNMAPPED, UNMAPPED, F11,
    F12, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED,
    // 0x60
    UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED,
    UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED,
    // 0x70
    UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED,
    UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED,
];

static EXTENDED: [u8; 128] = {
    let mut table = [UNMAPPED; 128];

    table[0x10] = UNIMPLEMENTED; // previous track
    table[0x1C] = ENTER; // keypad
    table[0x1D] = RIGHT_CTRL;
    table[0x20] = UNIMPLEMENTED; // mute
    table[0x21] = UNIMPLEMENTED; // calculator
    table[0x22] = UNIMPLEMENTED; // play
    table[0x24] = UNIMPLEMENTED; // stop
    table[0x2E] = UNIMPLEMENTED; // volume down
    table[0x30] = UNIMPLEMENTED; // volume up
    table[0x32] = UNIMPLEMENTED; // WWW home
    table[0x35] = b'/'; // keypad
    table[0x37] = UNIMPLEMENTED; // print screen with ctrl or shift
    table[0x38] = RIGHT_ALT;
    table[0x46] = UNIMPLEMENTED; // ctrl+break

    table[0x47] = HOME;
    table[0x48] = UP;
    table[0x49] = PAGE_UP;
    table[0x4B] = LEFT;
    table[0x4D] = RIGHT;
    table[0x4F] = END;
    table[0x50] = DOWN;
    table[0x51] = PAGE_DOWN;
    table[0x52] = INSERT;
    table[0x53] = DELETE;

    table[0x5B] = LEFT_GUI;
    table[0x5C] = RIGHT_GUI;
    table[0x5D] = APPS;
    table[0x5E] = POWER;
    table[0x5F] = SLEEP;
    table[0x63] = WAKE;
    table[0x65] = WWW_SEARCH;
    table[0x66] = WWW_FAVORITES;
    table[0x67] = WWW_REFRESH;
    table[0x68] = WWW_STOP;
    table[0x69] = WWW_FORWARD;
    table[0x6A] = WWW_BACK;
    table[0x6B] = MY_COMPUTER;
    table[0x6C] = EMAIL;
    table[0x6D] = MEDIA_SELECT;

    table
};

#[rustfmt::skip]
static SHIFT: [u8; SHIFT_TABLE_LEN] = [
    // 0x00
    UNMAPPED, ESCAPE, b'!', b'@', b'#', b'$', b'%', b'^',
    b'&', b'*', b'(', b')', b'_', b'+', BACKSPACE, TAB,
    // 0x10
    b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i',
    b'o', b'p', b'{', b'}', ENTER, LEFT_CTRL, b'a', b's',
    // 0x20
    b'd', b'f', b'g', b'h', b'j', b'k', b'l', b':',
    b'"', b'~', LEFT_SHIFT, b'|', b'z', b'x', b'c', b'v',
    // 0x30
    b'b', b'n', b'm', b'<', b'>', b'?',
];

/// Looks up the logical code for `code` (make or break) in `context`.
pub fn lookup(context: TableContext, code: u8) -> u8 {
    let index = (code & 0x7F) as usize;
    match context {
        TableContext::Base => BASE[index],
        TableContext::Extended => EXTENDED[index],
    }
}

/// The shifted variant of a base code, if the shift table covers it.
pub fn shifted(code: u8) -> Option<u8> {
    SHIFT.get(code as usize).copied()
}

/// Whether `key` is a logical code for a printable ASCII character.
pub fn is_printable(key: u8) -> bool {
    key.is_ascii_graphic() || key == b' '
}
