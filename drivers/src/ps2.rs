//! PS/2 keyboard support.
//!
//! This module provides:
//! - Low-level 8042 controller communication and bring-up
//! - Scan code set 1 decoding, including the Pause and Print Screen escapes
//! - Modifier and lock-key tracking
//! - The outbound keyboard command queue and its ACK/RESEND handshake

pub mod command;
pub mod decoder;
pub mod keyboard;
pub mod modifiers;
pub mod scancode;

#[cfg(test)]
mod tests;

use crate::{
    debug, info,
    port::PortIo,
    warn,
};

/// PS/2 controller data port (read/write)
pub const PS2_DATA_PORT: u16 = 0x60;
/// PS/2 controller command/status port
pub const PS2_COMMAND_PORT: u16 = 0x64;

/// Number of status polls before a busy-wait gives up.
pub const WAIT_LIMIT: usize = 100_000;

/// PS/2 controller status register bits
pub mod status_bits {
    /// Output buffer full (data available to read)
    pub const OUTPUT_BUFFER_FULL: u8 = 0x01;
    /// Input buffer full (controller busy)
    pub const INPUT_BUFFER_FULL: u8 = 0x02;
    /// Timeout error
    pub const TIMEOUT_ERROR: u8 = 0x40;
    /// Parity error
    pub const PARITY_ERROR: u8 = 0x80;
}

/// PS/2 controller commands
pub mod commands {
    /// Read configuration byte
    pub const READ_CONFIG: u8 = 0x20;
    /// Write configuration byte
    pub const WRITE_CONFIG: u8 = 0x60;
    /// Disable second PS/2 port
    pub const DISABLE_SECOND_PORT: u8 = 0xA7;
    /// Test PS/2 controller
    pub const TEST_CONTROLLER: u8 = 0xAA;
    /// Test first PS/2 port
    pub const TEST_FIRST_PORT: u8 = 0xAB;
    /// Disable first PS/2 port
    pub const DISABLE_FIRST_PORT: u8 = 0xAD;
    /// Enable first PS/2 port
    pub const ENABLE_FIRST_PORT: u8 = 0xAE;
}

/// PS/2 keyboard commands
pub mod keyboard_commands {
    /// Set LEDs
    pub const SET_LEDS: u8 = 0xED;
    /// Get/set scancode set
    pub const SCANCODE_SET: u8 = 0xF0;
    /// Set repeat rate and delay
    pub const SET_TYPEMATIC: u8 = 0xF3;
    /// Enable scanning
    pub const ENABLE_SCANNING: u8 = 0xF4;
    /// Disable scanning
    pub const DISABLE_SCANNING: u8 = 0xF5;
    /// Set default parameters
    pub const SET_DEFAULTS: u8 = 0xF6;
}

/// PS/2 response codes
pub mod responses {
    /// Key detection error or internal buffer overrun
    pub const ERROR_0: u8 = 0x00;
    /// Self-test passed
    pub const SELF_TEST_PASSED: u8 = 0xAA;
    /// Echo reply
    pub const ECHO: u8 = 0xEE;
    /// Acknowledge
    pub const ACK: u8 = 0xFA;
    /// Self-test failed
    pub const SELF_TEST_FAILED_0: u8 = 0xFC;
    /// Self-test failed
    pub const SELF_TEST_FAILED_1: u8 = 0xFD;
    /// Resend request
    pub const RESEND: u8 = 0xFE;
    /// Key detection error or internal buffer overrun
    pub const ERROR_1: u8 = 0xFF;
    /// Controller self-test passed
    pub const CONTROLLER_TEST_PASSED: u8 = 0x55;
    /// Port test passed
    pub const PORT_TEST_PASSED: u8 = 0x00;
}

/// PS/2 controller configuration byte bits
pub mod config_bits {
    /// First PS/2 port interrupt enabled
    pub const FIRST_PORT_INTERRUPT: u8 = 0x01;
    /// Second PS/2 port interrupt enabled
    pub const SECOND_PORT_INTERRUPT: u8 = 0x02;
    /// First PS/2 port translation enabled
    pub const FIRST_PORT_TRANSLATION: u8 = 0x40;
}

/// PS/2 bring-up and transmission failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ps2Error {
    /// The controller did not become ready within [`WAIT_LIMIT`] polls
    Timeout,
    /// The controller self-test returned something other than `0x55`
    ControllerSelfTest(u8),
    /// The first port test returned a non-zero fault code
    PortTest(u8),
}

/// Low-level PS/2 controller interface
pub struct Ps2Controller<P: PortIo> {
    ports: P,
}

impl<P: PortIo> Ps2Controller<P> {
    /// Wraps the ports the controller lives on
    pub fn new(ports: P) -> Self {
        Self { ports }
    }

    /// The underlying ports
    pub fn ports(&self) -> &P {
        &self.ports
    }

    /// The underlying ports, mutably
    pub fn ports_mut(&mut self) -> &mut P {
        &mut self.ports
    }

    /// Read the status register
    pub fn read_status(&mut self) -> u8 {
        self.ports.read_u8(PS2_COMMAND_PORT)
    }

    /// Check if output buffer is full (data available to read)
    pub fn output_buffer_full(&mut self) -> bool {
        self.read_status() & status_bits::OUTPUT_BUFFER_FULL != 0
    }

    /// Check if input buffer is full (controller busy)
    pub fn input_buffer_full(&mut self) -> bool {
        self.read_status() & status_bits::INPUT_BUFFER_FULL != 0
    }

    /// Wait for the input buffer to be empty
    pub fn wait_input_buffer_empty(&mut self) -> Result<(), Ps2Error> {
        for _ in 0..WAIT_LIMIT {
            if !self.input_buffer_full() {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        Err(Ps2Error::Timeout)
    }

    /// Wait for the output buffer to be full
    pub fn wait_output_buffer_full(&mut self) -> Result<(), Ps2Error> {
        for _ in 0..WAIT_LIMIT {
            if self.output_buffer_full() {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        Err(Ps2Error::Timeout)
    }

    /// Read the data port without checking the status register first
    pub fn read_data_now(&mut self) -> u8 {
        self.ports.read_u8(PS2_DATA_PORT)
    }

    /// Read data from the PS/2 controller
    pub fn read_data(&mut self) -> Result<u8, Ps2Error> {
        self.wait_output_buffer_full()?;
        Ok(self.read_data_now())
    }

    /// Write data to the PS/2 controller (forwarded to the keyboard)
    pub fn write_data(&mut self, data: u8) -> Result<(), Ps2Error> {
        self.wait_input_buffer_empty()?;
        self.ports.write_u8(PS2_DATA_PORT, data);
        Ok(())
    }

    /// Send a command to the PS/2 controller
    pub fn send_command(&mut self, command: u8) -> Result<(), Ps2Error> {
        self.wait_input_buffer_empty()?;
        self.ports.write_u8(PS2_COMMAND_PORT, command);
        Ok(())
    }

    /// Send a command and read the response
    pub fn send_command_with_response(&mut self, command: u8) -> Result<u8, Ps2Error> {
        self.send_command(command)?;
        self.read_data()
    }

    /// Drain anything left in the output buffer
    pub fn flush_output(&mut self) {
        let mut drained = 0;
        while self.output_buffer_full() && drained < WAIT_LIMIT {
            let _ = self.read_data_now();
            drained += 1;
        }
    }

    /// Bring the controller up with the keyboard port enabled.
    ///
    /// Both ports are disabled while testing, interrupts and set 1
    /// translation are turned off (the keyboard is switched to set 1 through
    /// the command queue instead), and the first port is re-enabled once the
    /// controller and port tests pass.
    pub fn init(&mut self) -> Result<(), Ps2Error> {
        info!("Initializing PS/2 controller");

        self.send_command(commands::DISABLE_FIRST_PORT)?;
        self.send_command(commands::DISABLE_SECOND_PORT)?;
        self.flush_output();

        let config = self.send_command_with_response(commands::READ_CONFIG)?;
        debug!("PS/2 controller config: 0x{:02X}", config);

        let new_config = config
            & !(config_bits::FIRST_PORT_INTERRUPT
                | config_bits::SECOND_PORT_INTERRUPT
                | config_bits::FIRST_PORT_TRANSLATION);
        self.send_command(commands::WRITE_CONFIG)?;
        self.write_data(new_config)?;

        let test_result = self.send_command_with_response(commands::TEST_CONTROLLER)?;
        if test_result != responses::CONTROLLER_TEST_PASSED {
            warn!("PS/2 controller self-test failed: 0x{:02X}", test_result);
            return Err(Ps2Error::ControllerSelfTest(test_result));
        }

        // The self-test may reset the configuration byte on some controllers.
        self.send_command(commands::WRITE_CONFIG)?;
        self.write_data(new_config)?;

        let port_test = self.send_command_with_response(commands::TEST_FIRST_PORT)?;
        if port_test != responses::PORT_TEST_PASSED {
            warn!("PS/2 keyboard port test failed: 0x{:02X}", port_test);
            return Err(Ps2Error::PortTest(port_test));
        }

        self.send_command(commands::ENABLE_FIRST_PORT)?;

        info!("PS/2 controller initialized");
        Ok(())
    }
}
