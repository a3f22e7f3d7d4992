//! PS/2 protocol tests against a synthetic 8042

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use super::{
    PS2_COMMAND_PORT, PS2_DATA_PORT, Ps2Controller, Ps2Error, commands,
    command::{CommandId, CommandQueue, ControllerCommand, QUEUE_CAPACITY},
    decoder::{DecoderState, ScancodeDecoder},
    keyboard::{KeyEvent, KeyboardConfig, KeyboardDriver},
    modifiers::KeyFlags,
    responses,
    scancode::{self, TableContext, keys},
    status_bits,
};
use crate::port::PortIo;

/// Register-level stand-in for the controller and an attached keyboard.
struct Fake8042 {
    /// Bytes waiting in the output buffer
    rx: VecDeque<u8>,
    /// Bytes written to the data port
    data_writes: Vec<u8>,
    /// Bytes written to the command port
    commands: Vec<u8>,
    /// Keeps the input buffer full
    busy: bool,
    config: u8,
    self_test: u8,
    port_test: u8,
}

impl Default for Fake8042 {
    fn default() -> Self {
        Self {
            rx: VecDeque::new(),
            data_writes: Vec::new(),
            commands: Vec::new(),
            busy: false,
            config: 0x47,
            self_test: responses::CONTROLLER_TEST_PASSED,
            port_test: responses::PORT_TEST_PASSED,
        }
    }
}

impl PortIo for Fake8042 {
    fn read_u8(&mut self, port: u16) -> u8 {
        match port {
            PS2_COMMAND_PORT => {
                let mut status = 0;
                if !self.rx.is_empty() {
                    status |= status_bits::OUTPUT_BUFFER_FULL;
                }
                if self.busy {
                    status |= status_bits::INPUT_BUFFER_FULL;
                }
                status
            }
            PS2_DATA_PORT => self.rx.pop_front().unwrap_or(0),
            _ => panic!("unexpected read from port 0x{port:X}"),
        }
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        match port {
            PS2_COMMAND_PORT => {
                self.commands.push(value);
                match value {
                    commands::READ_CONFIG => self.rx.push_back(self.config),
                    commands::TEST_CONTROLLER => self.rx.push_back(self.self_test),
                    commands::TEST_FIRST_PORT => self.rx.push_back(self.port_test),
                    _ => {}
                }
            }
            PS2_DATA_PORT => self.data_writes.push(value),
            _ => panic!("unexpected write to port 0x{port:X}"),
        }
    }

    fn read_u32(&mut self, port: u16) -> u32 {
        panic!("unexpected doubleword read from port 0x{port:X}")
    }

    fn write_u32(&mut self, port: u16, value: u32) {
        panic!("unexpected doubleword write 0x{value:08X} to port 0x{port:X}")
    }
}

type Events = Rc<RefCell<Vec<KeyEvent>>>;

fn keyboard() -> (KeyboardDriver<Fake8042, impl FnMut(KeyEvent)>, Events) {
    let events = Events::default();
    let sink = Rc::clone(&events);
    let driver = KeyboardDriver::new(Fake8042::default(), move |event| {
        sink.borrow_mut().push(event)
    });
    (driver, events)
}

fn feed_all(decoder: &mut ScancodeDecoder, bytes: &[u8]) -> Vec<u8> {
    bytes.iter().filter_map(|&byte| decoder.feed(byte)).collect()
}

fn characters(events: &Events) -> Vec<u8> {
    events.borrow().iter().map(|event| event.character).collect()
}

/// Delivers one byte from the keyboard and polls the driver.
fn deliver<H: FnMut(KeyEvent)>(driver: &mut KeyboardDriver<Fake8042, H>, byte: u8) {
    driver.controller_mut().ports_mut().rx.push_back(byte);
    assert!(driver.poll());
}

fn data_writes<H: FnMut(KeyEvent)>(driver: &KeyboardDriver<Fake8042, H>) -> &[u8] {
    &driver.controller().ports().data_writes
}

#[test]
fn test_base_codes_decode_from_start() {
    for code in 0x00..=0x7Fu8 {
        let mut decoder = ScancodeDecoder::new();
        let expected = scancode::lookup(TableContext::Base, code);
        let expected = (expected != keys::UNMAPPED).then_some(expected);

        assert_eq!(decoder.feed(code), expected, "make code 0x{code:02X}");
        assert_eq!(decoder.state(), DecoderState::Start);

        // Break codes of 0x60 and 0x61 collide with the prefixes.
        let release = code | 0x80;
        if matches!(release, 0xE0 | 0xE1) {
            continue;
        }
        assert_eq!(decoder.feed(release), expected, "break code 0x{release:02X}");
        assert_eq!(decoder.state(), DecoderState::Start);
    }
}

#[test]
fn test_print_screen_sequences() {
    let mut decoder = ScancodeDecoder::new();

    assert_eq!(decoder.feed(0xE0), None);
    assert_eq!(decoder.state(), DecoderState::ExtendedPrefix);
    assert_eq!(decoder.feed(0x2A), None);
    assert_eq!(decoder.state(), DecoderState::PrtScPressWait1);
    assert_eq!(decoder.feed(0xE0), None);
    assert_eq!(decoder.state(), DecoderState::PrtScPressWait2);
    assert_eq!(decoder.feed(0x37), Some(keys::PRINT_SCREEN));
    assert_eq!(decoder.state(), DecoderState::Start);

    assert_eq!(decoder.feed(0xE0), None);
    assert_eq!(decoder.feed(0xB7), None);
    assert_eq!(decoder.state(), DecoderState::PrtScReleaseWait1);
    assert_eq!(decoder.feed(0xE0), None);
    assert_eq!(decoder.state(), DecoderState::PrtScReleaseWait2);
    assert_eq!(decoder.feed(0xAA), Some(keys::PRINT_SCREEN));
    assert_eq!(decoder.state(), DecoderState::Start);
}

#[test]
fn test_broken_print_screen_recovers() {
    let mut decoder = ScancodeDecoder::new();

    assert_eq!(feed_all(&mut decoder, &[0xE0, 0x2A, 0x1E]), Vec::<u8>::new());
    assert_eq!(decoder.state(), DecoderState::Error);
    // The byte after an error is swallowed.
    assert_eq!(decoder.feed(0x1E), None);
    assert_eq!(decoder.state(), DecoderState::Start);
    assert_eq!(decoder.feed(0x1E), Some(b'a'));
}

#[test]
fn test_unmapped_extended_code_is_an_error() {
    let mut decoder = ScancodeDecoder::new();

    assert_eq!(feed_all(&mut decoder, &[0xE0, 0x99]), Vec::<u8>::new());
    assert_eq!(decoder.state(), DecoderState::Error);
    assert_eq!(feed_all(&mut decoder, &[0x02, 0x02]), vec![b'1']);
}

#[test]
fn test_extended_keys() {
    let mut decoder = ScancodeDecoder::new();

    assert_eq!(feed_all(&mut decoder, &[0xE0, 0x48]), vec![keys::UP]);
    assert_eq!(feed_all(&mut decoder, &[0xE0, 0xC8]), vec![keys::UP]);
    assert_eq!(feed_all(&mut decoder, &[0xE0, 0x1D]), vec![keys::RIGHT_CTRL]);
    assert_eq!(feed_all(&mut decoder, &[0xE0, 0x53]), vec![keys::DELETE]);
    assert_eq!(decoder.state(), DecoderState::Start);
}

#[test]
fn test_fake_shifts_are_dropped() {
    let mut decoder = ScancodeDecoder::new();

    // Num lock mode wraps arrow keys in synthetic shift codes.
    let decoded = feed_all(&mut decoder, &[0xE0, 0xAA, 0xE0, 0x48, 0xE0, 0xC8, 0xE0, 0x2A]);
    assert_eq!(decoded, vec![keys::UP, keys::UP]);
    assert_eq!(decoder.state(), DecoderState::PrtScPressWait1);
}

#[test]
fn test_unmodelled_extended_keys_keep_next_byte() {
    let mut decoder = ScancodeDecoder::new();

    for code in [0x10, 0x37, 0x46, 0xC6, 0x20] {
        assert_eq!(decoder.feed(0xE0), None);
        assert_eq!(decoder.feed(code), Some(keys::UNIMPLEMENTED), "E0 0x{code:02X}");
        assert_eq!(decoder.state(), DecoderState::Start);
        assert_eq!(decoder.feed(0x1E), Some(b'a'));
    }
}

#[test]
fn test_pause_sequences() {
    let mut decoder = ScancodeDecoder::new();

    assert_eq!(decoder.feed(0xE1), None);
    assert_eq!(decoder.state(), DecoderState::PauseSeq1);
    assert_eq!(decoder.feed(0x1D), None);
    assert_eq!(decoder.state(), DecoderState::PausePressWait);
    assert_eq!(decoder.feed(0x45), Some(keys::PAUSE));

    assert_eq!(feed_all(&mut decoder, &[0xE1, 0x9D]), Vec::<u8>::new());
    assert_eq!(decoder.state(), DecoderState::PauseReleaseWait);
    assert_eq!(decoder.feed(0xC5), Some(keys::PAUSE));
    assert_eq!(decoder.state(), DecoderState::Start);

    assert_eq!(feed_all(&mut decoder, &[0xE1, 0x00]), Vec::<u8>::new());
    assert_eq!(decoder.state(), DecoderState::Error);
}

#[test]
fn test_caps_lock_uppercases_letters() {
    let (mut driver, events) = keyboard();

    for byte in [0x3A, 0xBA, 0x1E, 0x9E, 0x02] {
        driver.process_byte(byte);
    }
    assert!(driver.flags().caps_lock());
    assert_eq!(characters(&events), vec![keys::CAPS_LOCK, b'A', b'1']);

    // Shift cancels Caps Lock for letters only.
    events.borrow_mut().clear();
    for byte in [0x2A, 0x1E, 0x02, 0xAA] {
        driver.process_byte(byte);
    }
    assert_eq!(characters(&events), vec![keys::LEFT_SHIFT, b'a', b'!']);
}

#[test]
fn test_shift_substitution() {
    let (mut driver, events) = keyboard();

    for byte in [0x36, 0x02, 0x82, 0x1A, 0x47, 0xB6, 0x02] {
        driver.process_byte(byte);
    }
    // Keypad 7 has no shifted form.
    assert_eq!(
        characters(&events),
        vec![keys::RIGHT_SHIFT, b'!', b'{', b'7', b'1']
    );
}

#[test]
fn test_releases_are_not_forwarded() {
    let (mut driver, events) = keyboard();

    driver.process_byte(0x1E);
    driver.process_byte(0x9E);

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].character, b'a');
    assert_eq!(events[0].scancode, 0x1E);
    assert!(events[0].flags.is_pressed());
    assert!(!driver.flags().is_pressed());
}

#[test]
fn test_held_modifier_flags() {
    let (mut driver, _events) = keyboard();

    driver.process_byte(0x1D);
    assert!(driver.flags().contains(KeyFlags::LEFT_CTRL));
    driver.process_byte(0xE0);
    driver.process_byte(0x38);
    assert!(driver.flags().contains(KeyFlags::RIGHT_ALT));
    assert!(driver.flags().ctrl() && driver.flags().alt());

    driver.process_byte(0x9D);
    driver.process_byte(0xE0);
    driver.process_byte(0xB8);
    assert!(!driver.flags().ctrl());
    assert!(!driver.flags().alt());
}

#[test]
fn test_key_flags_layout() {
    let flags = KeyFlags::from_bits(KeyFlags::CAPS_LOCK | KeyFlags::SCROLL_LOCK | 0xFC00);
    assert_eq!(flags.bits(), KeyFlags::CAPS_LOCK | KeyFlags::SCROLL_LOCK);
    assert_eq!(flags.led_mask(), 0b101);
    assert_eq!(KeyFlags::from_bits(KeyFlags::NUM_LOCK).led_mask(), 0b010);
}

#[test]
fn test_queue_full_rejects() {
    let mut queue = CommandQueue::new();
    for i in 0..QUEUE_CAPACITY {
        assert!(queue.enqueue(ControllerCommand::new(CommandId::SetLeds, i as u8)));
    }
    assert!(queue.is_full());

    let before: Vec<_> = queue.iter().copied().collect();
    assert!(!queue.enqueue(ControllerCommand::new(CommandId::EnableScanning, 0)));
    let after: Vec<_> = queue.iter().copied().collect();
    assert_eq!(before, after);
    assert_eq!(queue.len(), QUEUE_CAPACITY);
}

#[test]
fn test_queue_fifo_wraparound() {
    let mut queue = CommandQueue::new();
    for i in 0..QUEUE_CAPACITY {
        queue.enqueue(ControllerCommand::new(CommandId::SetLeds, i as u8));
    }
    for i in 0..3 {
        assert_eq!(queue.dequeue().map(|command| command.data), Some(i));
    }
    for i in 16..19 {
        assert!(queue.enqueue(ControllerCommand::new(CommandId::SetLeds, i)));
    }

    let order: Vec<u8> = queue.iter().map(|command| command.data).collect();
    assert_eq!(order, (3..19).collect::<Vec<u8>>());
    assert_eq!(queue.head().map(|command| command.data), Some(3));
}

#[test]
fn test_command_bytes() {
    let leds = ControllerCommand::new(CommandId::SetLeds, 0x07);
    assert_eq!(leds.len(), 2);
    assert_eq!(leds.byte(0), Some(0xED));
    assert_eq!(leds.byte(1), Some(0x07));
    assert_eq!(leds.byte(2), None);

    let enable = ControllerCommand::new(CommandId::EnableScanning, 0x55);
    assert_eq!(enable.len(), 1);
    assert_eq!(enable.byte(0), Some(0xF4));
    assert_eq!(enable.byte(1), None);
}

#[test]
fn test_dispatch_waits_for_start() {
    let (mut driver, _events) = keyboard();

    driver.process_byte(0xE0);
    assert!(driver.queue_command(CommandId::EnableScanning, 0));
    assert!(data_writes(&driver).is_empty());
    assert_eq!(driver.state(), DecoderState::ExtendedPrefix);

    deliver(&mut driver, 0x48);
    assert_eq!(data_writes(&driver), &[0xF4]);
    assert_eq!(driver.state(), DecoderState::AwaitingControllerResponse);
}

#[test]
fn test_two_byte_command_handshake() {
    let (mut driver, _events) = keyboard();

    assert!(driver.queue_command(CommandId::ScanCodeSet, 0x01));
    assert_eq!(data_writes(&driver), &[0xF0]);
    assert_eq!(driver.state(), DecoderState::AwaitingControllerResponse);

    deliver(&mut driver, responses::ACK);
    assert_eq!(data_writes(&driver), &[0xF0, 0x01]);
    assert_eq!(driver.queue().len(), 1);

    deliver(&mut driver, responses::ACK);
    assert!(driver.queue().is_empty());
    assert_eq!(driver.state(), DecoderState::Start);
}

#[test]
fn test_queued_commands_go_out_in_order() {
    let (mut driver, _events) = keyboard();

    driver.queue_command(CommandId::ScanCodeSet, 0x01);
    driver.queue_command(CommandId::EnableScanning, 0);
    assert_eq!(driver.queue().len(), 2);

    for _ in 0..3 {
        deliver(&mut driver, responses::ACK);
    }
    assert_eq!(data_writes(&driver), &[0xF0, 0x01, 0xF4]);
    assert!(driver.queue().is_empty());
    assert_eq!(driver.state(), DecoderState::Start);
}

#[test]
fn test_resend_retransmits_current_byte() {
    let (mut driver, _events) = keyboard();

    driver.queue_command(CommandId::SetLeds, 0x02);
    deliver(&mut driver, responses::ACK);
    deliver(&mut driver, responses::RESEND);
    assert_eq!(data_writes(&driver), &[0xED, 0x02, 0x02]);

    deliver(&mut driver, responses::ACK);
    assert!(driver.queue().is_empty());
}

#[test]
fn test_resend_limit_drops_command() {
    let (mut driver, _events) = keyboard();

    driver.queue_command(CommandId::EnableScanning, 0);
    for _ in 0..3 {
        deliver(&mut driver, responses::RESEND);
    }
    assert_eq!(data_writes(&driver), &[0xF4; 4]);
    assert_eq!(driver.queue().len(), 1);

    deliver(&mut driver, responses::RESEND);
    assert_eq!(data_writes(&driver).len(), 4);
    assert!(driver.queue().is_empty());
    assert_eq!(driver.state(), DecoderState::Start);
}

#[test]
fn test_unexpected_response_keeps_command() {
    let (mut driver, _events) = keyboard();

    driver.queue_command(CommandId::EnableScanning, 0);
    driver.process_byte(responses::ECHO);
    assert_eq!(driver.state(), DecoderState::Start);
    assert_eq!(driver.queue().len(), 1);

    // The next poll sends the same command again.
    assert!(!driver.poll());
    assert_eq!(data_writes(&driver), &[0xF4, 0xF4]);
}

#[test]
fn test_garbage_answers_drop_command() {
    let (mut driver, events) = keyboard();

    driver.queue_command(CommandId::EnableScanning, 0);
    for _ in 0..50 {
        deliver(&mut driver, responses::ERROR_1);
    }
    // Sent once, then re-sent for each of the three tolerated answers.
    assert_eq!(data_writes(&driver), &[0xF4; 4]);
    assert!(driver.queue().is_empty());
    assert_eq!(driver.state(), DecoderState::Start);

    deliver(&mut driver, 0x1E);
    assert_eq!(characters(&events), vec![b'a']);
}

#[test]
fn test_retry_count_survives_redispatch() {
    let (mut driver, _events) = keyboard();

    driver.queue_command(CommandId::SetLeds, 0x02);
    deliver(&mut driver, responses::RESEND);
    deliver(&mut driver, responses::ERROR_0);
    deliver(&mut driver, responses::RESEND);
    assert_eq!(data_writes(&driver), &[0xED; 4]);
    assert_eq!(driver.queue().len(), 1);

    deliver(&mut driver, responses::ERROR_0);
    assert!(driver.queue().is_empty());
    assert_eq!(data_writes(&driver).len(), 4);

    // The next command starts with a fresh count.
    driver.queue_command(CommandId::EnableScanning, 0);
    deliver(&mut driver, responses::RESEND);
    assert_eq!(&data_writes(&driver)[4..], &[0xF4, 0xF4]);
    assert_eq!(driver.queue().len(), 1);
}

#[test]
fn test_lock_keys_sync_leds() {
    let (mut driver, events) = keyboard();

    deliver(&mut driver, 0x3A);
    assert_eq!(data_writes(&driver), &[0xED]);
    deliver(&mut driver, responses::ACK);
    assert_eq!(data_writes(&driver), &[0xED, 0x04]);
    deliver(&mut driver, responses::ACK);
    assert!(driver.queue().is_empty());

    // Releasing the lock key changes nothing.
    deliver(&mut driver, 0xBA);
    assert_eq!(data_writes(&driver).len(), 2);
    assert_eq!(characters(&events), vec![keys::CAPS_LOCK]);
}

#[test]
fn test_led_sync_can_be_disabled() {
    let config = KeyboardConfig {
        sync_leds: false,
        ..KeyboardConfig::default()
    };
    let mut driver = KeyboardDriver::with_config(Fake8042::default(), config, |_| {});

    deliver(&mut driver, 0x45);
    assert!(driver.flags().contains(KeyFlags::NUM_LOCK));
    assert!(data_writes(&driver).is_empty());
}

#[test]
fn test_write_timeout_leaves_command_queued() {
    let (mut driver, _events) = keyboard();
    driver.controller_mut().ports_mut().busy = true;

    assert!(driver.queue_command(CommandId::EnableScanning, 0));
    assert!(data_writes(&driver).is_empty());
    assert_eq!(driver.state(), DecoderState::Start);
    assert_eq!(driver.queue().len(), 1);
}

#[test]
fn test_reset_clears_state() {
    let (mut driver, _events) = keyboard();

    driver.process_byte(0x3A);
    driver.queue_command(CommandId::EnableScanning, 0);
    driver.reset();

    assert_eq!(driver.state(), DecoderState::Start);
    assert_eq!(driver.flags(), KeyFlags::empty());
    assert!(driver.queue().is_empty());
}

#[test]
fn test_controller_init() {
    let mut controller = Ps2Controller::new(Fake8042::default());

    assert_eq!(controller.init(), Ok(()));
    assert_eq!(
        controller.ports().commands,
        vec![
            commands::DISABLE_FIRST_PORT,
            commands::DISABLE_SECOND_PORT,
            commands::READ_CONFIG,
            commands::WRITE_CONFIG,
            commands::TEST_CONTROLLER,
            commands::WRITE_CONFIG,
            commands::TEST_FIRST_PORT,
            commands::ENABLE_FIRST_PORT,
        ]
    );
    // Both port interrupts and translation cleared from 0x47
    assert_eq!(controller.ports().data_writes, vec![0x04, 0x04]);
}

#[test]
fn test_controller_init_failures() {
    let mut controller = Ps2Controller::new(Fake8042 {
        self_test: 0xFC,
        ..Fake8042::default()
    });
    assert_eq!(controller.init(), Err(Ps2Error::ControllerSelfTest(0xFC)));

    let mut controller = Ps2Controller::new(Fake8042 {
        port_test: 0x03,
        ..Fake8042::default()
    });
    assert_eq!(controller.init(), Err(Ps2Error::PortTest(0x03)));

    let mut controller = Ps2Controller::new(Fake8042 {
        busy: true,
        ..Fake8042::default()
    });
    assert_eq!(controller.init(), Err(Ps2Error::Timeout));
}
