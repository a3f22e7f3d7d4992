//! PS/2 keyboard driver.
//!
//! [`KeyboardDriver`] owns the whole protocol state: decoder, modifier flags
//! and command queue. Each [`KeyboardDriver::poll`] consumes at most one byte
//! from the controller and routes it either to the command handshake or
//! through decoder, tracker and event handler, then tries to dispatch the
//! next queued command.

use crate::{debug, port::PortIo, trace, warn};

use super::{
    Ps2Controller, Ps2Error,
    command::{CommandId, CommandQueue, ControllerCommand},
    decoder::{DecoderState, ScancodeDecoder},
    modifiers::{KeyFlags, ModifierTracker},
    responses,
};

/// A resolved key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Logical key code, adjusted for Shift and Caps Lock
    pub character: u8,
    /// Final raw byte of the sequence that produced the event
    pub scancode: u8,
    /// Flag register after the event
    pub flags: KeyFlags,
}

/// Callback receiving key presses.
pub type KeyEventHandler = fn(KeyEvent);

/// Runtime knobs of the keyboard driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardConfig {
    /// Queue a Set LEDs command whenever a lock key toggles
    pub sync_leds: bool,
    /// RESEND or unexpected answers tolerated per command before it is
    /// dropped
    pub max_retries: u8,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            sync_leds: true,
            max_retries: 3,
        }
    }
}

/// Progress of the head command.
///
/// `byte_index` restarts with every dispatch; `retries` only clears when the
/// head command leaves the queue.
#[derive(Debug, Default, Clone, Copy)]
struct InFlight {
    byte_index: usize,
    retries: u8,
}

/// Keyboard driver state
pub struct KeyboardDriver<P: PortIo, H: FnMut(KeyEvent) = KeyEventHandler> {
    controller: Ps2Controller<P>,
    decoder: ScancodeDecoder,
    tracker: ModifierTracker,
    queue: CommandQueue,
    in_flight: InFlight,
    config: KeyboardConfig,
    handler: H,
}

impl<P: PortIo, H: FnMut(KeyEvent)> KeyboardDriver<P, H> {
    /// Create a new keyboard driver with the default configuration
    pub fn new(ports: P, handler: H) -> Self {
        Self::with_config(ports, KeyboardConfig::default(), handler)
    }

    pub fn with_config(ports: P, config: KeyboardConfig, handler: H) -> Self {
        Self {
            controller: Ps2Controller::new(ports),
            decoder: ScancodeDecoder::new(),
            tracker: ModifierTracker::new(),
            queue: CommandQueue::new(),
            in_flight: InFlight::default(),
            config,
            handler,
        }
    }

    pub fn state(&self) -> DecoderState {
        self.decoder.state()
    }

    pub fn flags(&self) -> KeyFlags {
        self.tracker.flags()
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    pub fn controller(&self) -> &Ps2Controller<P> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut Ps2Controller<P> {
        &mut self.controller
    }

    /// Returns every piece of protocol state to its power-on value.
    pub fn reset(&mut self) {
        self.decoder.reset();
        self.tracker.reset();
        self.queue.clear();
        self.in_flight = InFlight::default();
    }

    /// Queues a command for the keyboard and dispatches it right away if the
    /// decoder is idle. Returns `false` if the queue is full.
    pub fn queue_command(&mut self, id: CommandId, data: u8) -> bool {
        if !self.queue.enqueue(ControllerCommand::new(id, data)) {
            return false;
        }
        self.try_dispatch();
        true
    }

    /// Checks the controller for a waiting byte and processes it.
    ///
    /// Returns `true` if a byte was consumed.
    pub fn poll(&mut self) -> bool {
        let has_data = self.controller.output_buffer_full();
        if has_data {
            let byte = self.controller.read_data_now();
            self.process_byte(byte);
        }
        self.try_dispatch();
        has_data
    }

    /// Routes one byte read from the controller.
    pub fn process_byte(&mut self, byte: u8) {
        if self.decoder.state() == DecoderState::AwaitingControllerResponse {
            self.handle_response(byte);
        } else {
            self.process_scancode(byte);
        }
    }

    fn process_scancode(&mut self, scancode: u8) {
        let Some(key) = self.decoder.feed(scancode) else {
            return;
        };

        let leds = self.tracker.flags().led_mask();
        let (character, flags) = self.tracker.apply(key, scancode);

        if self.config.sync_leds && flags.led_mask() != leds {
            let command = ControllerCommand::new(CommandId::SetLeds, flags.led_mask());
            if !self.queue.enqueue(command) {
                warn!("Keyboard command queue full, dropping LED update");
            }
        }

        if flags.is_pressed() {
            (self.handler)(KeyEvent {
                character,
                scancode,
                flags,
            });
        }
    }

    /// Sends the head command if the decoder sits between events.
    pub fn try_dispatch(&mut self) {
        if self.decoder.state() != DecoderState::Start {
            return;
        }
        let Some(byte) = self.queue.head().and_then(|command| command.byte(0)) else {
            return;
        };

        self.in_flight.byte_index = 0;
        self.send(byte);
    }

    /// Handles the keyboard's answer to the byte in flight.
    fn handle_response(&mut self, response: u8) {
        let Some(head) = self.queue.head().copied() else {
            self.decoder.reset();
            return;
        };

        match response {
            responses::ACK => {
                let next = self.in_flight.byte_index + 1;
                match head.byte(next) {
                    Some(byte) => {
                        self.in_flight.byte_index = next;
                        self.send(byte);
                    }
                    None => {
                        self.finish_head();
                        trace!("Keyboard acknowledged {:?}", head);
                    }
                }
            }
            _ if self.in_flight.retries >= self.config.max_retries => {
                warn!(
                    "Keyboard answered 0x{:02X} to {:?} too often, dropping it",
                    response, head
                );
                self.finish_head();
            }
            responses::RESEND => {
                self.in_flight.retries += 1;
                match head.byte(self.in_flight.byte_index) {
                    Some(byte) => self.send(byte),
                    None => self.decoder.reset(),
                }
            }
            other => {
                // Listen again; the command goes out anew on the next dispatch.
                self.in_flight.retries += 1;
                debug!(
                    "Keyboard answered 0x{:02X} to {:?}, returning to start",
                    other, head
                );
                self.decoder.reset();
            }
        }
    }

    /// Removes the head command and resumes decoding.
    fn finish_head(&mut self) {
        self.queue.dequeue();
        self.in_flight = InFlight::default();
        self.decoder.reset();
    }

    /// Writes one command byte and waits for the answer.
    fn send(&mut self, byte: u8) {
        match self.controller.write_data(byte) {
            Ok(()) => self
                .decoder
                .set_state(DecoderState::AwaitingControllerResponse),
            Err(err) => {
                warn!("Failed to send 0x{:02X} to keyboard: {:?}", byte, err);
                self.decoder.reset();
            }
        }
    }
}

#[cfg(target_arch = "x86_64")]
pub use global::*;

#[cfg(target_arch = "x86_64")]
mod global {
    use spin::Mutex;

    use crate::{info, port::HardwarePorts};

    use super::*;

    /// The machine's keyboard
    pub static KEYBOARD: Mutex<Option<KeyboardDriver<HardwarePorts>>> = Mutex::new(None);

    /// Brings up the controller and installs the keyboard driver.
    ///
    /// The controller runs without set 1 translation, so the keyboard is
    /// switched to set 1 and scanning is re-enabled through the command queue.
    ///
    /// `handler` runs with [`KEYBOARD`] locked and must not call back into
    /// this module.
    pub fn init(handler: KeyEventHandler) -> Result<(), Ps2Error> {
        info!("Initializing PS/2 keyboard");

        // SAFETY: the kernel hands the PS/2 ports to this driver alone.
        let mut driver = KeyboardDriver::new(unsafe { HardwarePorts::new() }, handler);
        driver.controller_mut().init()?;
        driver.queue_command(CommandId::ScanCodeSet, 0x01);
        driver.queue_command(CommandId::EnableScanning, 0);

        *KEYBOARD.lock() = Some(driver);

        info!("PS/2 keyboard initialized");
        Ok(())
    }

    /// Processes at most one waiting byte. Returns `true` if one was read.
    pub fn poll() -> bool {
        KEYBOARD.lock().as_mut().is_some_and(|keyboard| keyboard.poll())
    }

    /// Queues a keyboard command. Returns `false` if the queue is full or
    /// the driver is not initialized.
    pub fn queue_command(id: CommandId, data: u8) -> bool {
        KEYBOARD
            .lock()
            .as_mut()
            .is_some_and(|keyboard| keyboard.queue_command(id, data))
    }

    /// Current flag register, if the driver is initialized.
    pub fn flags() -> Option<KeyFlags> {
        KEYBOARD.lock().as_ref().map(|keyboard| keyboard.flags())
    }
}
