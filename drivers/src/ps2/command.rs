//! Outbound keyboard commands.
//!
//! Commands wait in a fixed-size FIFO until the decoder is idle. The head
//! command stays queued while its bytes are in flight and is only removed
//! once the keyboard acknowledges its last byte.

use super::keyboard_commands;

/// Maximum number of queued commands
pub const QUEUE_CAPACITY: usize = 16;

/// Keyboard device commands that answer with ACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandId {
    /// Data byte is the LED mask (bit 0 Scroll, bit 1 Num, bit 2 Caps)
    SetLeds,
    /// Data byte selects the scan code set (1-3)
    ScanCodeSet,
    /// Data byte encodes repeat rate and delay
    SetTypematic,
    EnableScanning,
    DisableScanning,
    SetDefaults,
}

impl CommandId {
    /// The command byte sent to the keyboard
    pub const fn opcode(self) -> u8 {
        match self {
            CommandId::SetLeds => keyboard_commands::SET_LEDS,
            CommandId::ScanCodeSet => keyboard_commands::SCANCODE_SET,
            CommandId::SetTypematic => keyboard_commands::SET_TYPEMATIC,
            CommandId::EnableScanning => keyboard_commands::ENABLE_SCANNING,
            CommandId::DisableScanning => keyboard_commands::DISABLE_SCANNING,
            CommandId::SetDefaults => keyboard_commands::SET_DEFAULTS,
        }
    }

    /// Whether the command is followed by a data byte
    pub const fn takes_data(self) -> bool {
        matches!(
            self,
            CommandId::SetLeds | CommandId::ScanCodeSet | CommandId::SetTypematic
        )
    }
}

/// A request for the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerCommand {
    pub id: CommandId,
    /// Ignored by commands that take no data
    pub data: u8,
}

impl ControllerCommand {
    pub const fn new(id: CommandId, data: u8) -> Self {
        Self { id, data }
    }

    /// Number of bytes on the wire
    pub const fn len(&self) -> usize {
        if self.id.takes_data() { 2 } else { 1 }
    }

    /// The `index`th byte on the wire
    pub const fn byte(&self, index: usize) -> Option<u8> {
        match index {
            0 => Some(self.id.opcode()),
            1 if self.id.takes_data() => Some(self.data),
            _ => None,
        }
    }
}

/// Fixed-capacity circular FIFO of [`ControllerCommand`]s.
#[derive(Debug)]
pub struct CommandQueue {
    slots: [Option<ControllerCommand>; QUEUE_CAPACITY],
    start: usize,
    len: usize,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    pub const fn new() -> Self {
        Self {
            slots: [None; QUEUE_CAPACITY],
            start: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == QUEUE_CAPACITY
    }

    /// Appends a command. Returns `false`, leaving the queue untouched, when
    /// it is full.
    pub fn enqueue(&mut self, command: ControllerCommand) -> bool {
        if self.is_full() {
            return false;
        }
        let index = (self.start + self.len) % QUEUE_CAPACITY;
        self.slots[index] = Some(command);
        self.len += 1;
        true
    }

    /// The oldest command, which is the one dispatched next.
    pub fn head(&self) -> Option<&ControllerCommand> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.start].as_ref()
    }

    /// Removes the oldest command.
    pub fn dequeue(&mut self) -> Option<ControllerCommand> {
        if self.is_empty() {
            return None;
        }
        let command = self.slots[self.start].take();
        self.start = (self.start + 1) % QUEUE_CAPACITY;
        self.len -= 1;
        command
    }

    /// Queued commands from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &ControllerCommand> + '_ {
        (0..self.len).filter_map(move |i| self.slots[(self.start + i) % QUEUE_CAPACITY].as_ref())
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}
