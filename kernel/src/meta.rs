use drivers::serial_println;

const WELCOME: &str = r"  __ _ _       _
 / _| (_)_ __ | |_
| |_| | | '_ \| __|
|  _| | | | | | |_
|_| |_|_|_| |_|\__|
";

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prints the welcome banner to the serial console.
pub fn print_welcome() {
    serial_println!("{}v{}", WELCOME, VERSION);
}
