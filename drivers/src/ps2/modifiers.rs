//! Modifier and lock-key tracking.

use super::scancode::{self, TableContext, keys};

/// Key flag register, delivered with every key event.
///
/// Bit 0 is the press bit of the latest event, bits 1-3 are lock toggles and
/// bits 4-9 mirror whether each held modifier is down. Bits 10-15 stay clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct KeyFlags(u16);

impl KeyFlags {
    pub const PRESSED: u16 = 1 << 0;
    pub const CAPS_LOCK: u16 = 1 << 1;
    pub const NUM_LOCK: u16 = 1 << 2;
    pub const SCROLL_LOCK: u16 = 1 << 3;
    pub const LEFT_SHIFT: u16 = 1 << 4;
    pub const RIGHT_SHIFT: u16 = 1 << 5;
    pub const LEFT_CTRL: u16 = 1 << 6;
    pub const RIGHT_CTRL: u16 = 1 << 7;
    pub const LEFT_ALT: u16 = 1 << 8;
    pub const RIGHT_ALT: u16 = 1 << 9;

    pub const SHIFT: u16 = Self::LEFT_SHIFT | Self::RIGHT_SHIFT;
    pub const CTRL: u16 = Self::LEFT_CTRL | Self::RIGHT_CTRL;
    pub const ALT: u16 = Self::LEFT_ALT | Self::RIGHT_ALT;
    const VALID: u16 = (1 << 10) - 1;

    pub const fn empty() -> Self {
        Self(0)
    }

    /// Builds a register from raw bits, dropping the reserved ones.
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits & Self::VALID)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Whether every bit of `mask` is set.
    pub const fn contains(self, mask: u16) -> bool {
        self.0 & mask == mask
    }

    /// Whether any bit of `mask` is set.
    pub const fn intersects(self, mask: u16) -> bool {
        self.0 & mask != 0
    }

    pub const fn is_pressed(self) -> bool {
        self.contains(Self::PRESSED)
    }

    pub const fn caps_lock(self) -> bool {
        self.contains(Self::CAPS_LOCK)
    }

    pub const fn shift(self) -> bool {
        self.intersects(Self::SHIFT)
    }

    pub const fn ctrl(self) -> bool {
        self.intersects(Self::CTRL)
    }

    pub const fn alt(self) -> bool {
        self.intersects(Self::ALT)
    }

    /// Lock state in the layout of the keyboard's Set LEDs argument
    /// (bit 0 Scroll Lock, bit 1 Num Lock, bit 2 Caps Lock).
    pub const fn led_mask(self) -> u8 {
        let mut mask = 0;
        if self.contains(Self::SCROLL_LOCK) {
            mask |= 1 << 0;
        }
        if self.contains(Self::NUM_LOCK) {
            mask |= 1 << 1;
        }
        if self.contains(Self::CAPS_LOCK) {
            mask |= 1 << 2;
        }
        mask
    }

    fn set(&mut self, mask: u16, value: bool) {
        if value {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }

    fn toggle(&mut self, mask: u16) {
        self.0 ^= mask;
    }
}

/// How a key affects the flag register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    /// Flag follows the key: set on press, cleared on release
    Held(u16),
    /// Flag flips on press, release ignored
    Lock(u16),
}

fn modifier_of(key: u8) -> Option<Modifier> {
    match key {
        keys::CAPS_LOCK => Some(Modifier::Lock(KeyFlags::CAPS_LOCK)),
        keys::NUM_LOCK => Some(Modifier::Lock(KeyFlags::NUM_LOCK)),
        keys::SCROLL_LOCK => Some(Modifier::Lock(KeyFlags::SCROLL_LOCK)),
        keys::LEFT_SHIFT => Some(Modifier::Held(KeyFlags::LEFT_SHIFT)),
        keys::RIGHT_SHIFT => Some(Modifier::Held(KeyFlags::RIGHT_SHIFT)),
        keys::LEFT_CTRL => Some(Modifier::Held(KeyFlags::LEFT_CTRL)),
        keys::RIGHT_CTRL => Some(Modifier::Held(KeyFlags::RIGHT_CTRL)),
        keys::LEFT_ALT => Some(Modifier::Held(KeyFlags::LEFT_ALT)),
        keys::RIGHT_ALT => Some(Modifier::Held(KeyFlags::RIGHT_ALT)),
        _ => None,
    }
}

/// Whether a raw scancode is a break (release) code.
pub const fn is_release(scancode: u8) -> bool {
    scancode & 0x80 != 0
}

/// Keeps [`KeyFlags`] in step with decoded key events.
#[derive(Debug, Default)]
pub struct ModifierTracker {
    flags: KeyFlags,
}

impl ModifierTracker {
    pub const fn new() -> Self {
        Self {
            flags: KeyFlags::empty(),
        }
    }

    pub fn flags(&self) -> KeyFlags {
        self.flags
    }

    pub fn reset(&mut self) {
        self.flags = KeyFlags::empty();
    }

    /// Records the event `key` (decoded from `scancode`) in the flag register.
    pub fn update(&mut self, key: u8, scancode: u8) {
        let pressed = !is_release(scancode);
        self.flags.set(KeyFlags::PRESSED, pressed);

        match modifier_of(key) {
            Some(Modifier::Held(mask)) => self.flags.set(mask, pressed),
            Some(Modifier::Lock(mask)) if pressed => self.flags.toggle(mask),
            _ => {}
        }
    }

    /// The character `key` stands for under the current modifiers.
    ///
    /// Letters follow Caps Lock XOR Shift. Other keys with a shift-table
    /// entry take it while either Shift is held; Caps Lock leaves them alone.
    pub fn adjust(&self, key: u8, scancode: u8) -> u8 {
        if key.is_ascii_lowercase() {
            if self.flags.caps_lock() ^ self.flags.shift() {
                return key.to_ascii_uppercase();
            }
            return key;
        }

        // Extended keys share raw codes with base keys; only substitute for
        // the key the shift table actually describes.
        let base_key = scancode::lookup(TableContext::Base, scancode) == key;
        if self.flags.shift() && base_key {
            if let Some(shifted) = scancode::shifted(scancode) {
                return shifted;
            }
        }
        key
    }

    /// Updates the flags with an event and returns the adjusted character
    /// along with the new flags.
    pub fn apply(&mut self, key: u8, scancode: u8) -> (u8, KeyFlags) {
        self.update(key, scancode);
        (self.adjust(key, scancode), self.flags)
    }
}
