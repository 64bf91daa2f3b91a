//! Console log backend for the host binary.
//!
//! On target the platform logger owns the `log` facade; on the host this
//! writes one line per record to stderr, prefixed with the milliseconds
//! since the logger was installed:
//!
//! ```text
//! [    12 INFO  sdbridge::protocol::server] server: serving 8192 blocks of 512 bytes
//! ```

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;
static STARTED: OnceLock<Instant> = OnceLock::new();

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let ms = STARTED.get_or_init(Instant::now).elapsed().as_millis();
        let mut err = std::io::stderr().lock();
        // Nowhere to report a failed stderr write.
        let _ = writeln!(
            err,
            "[{:>6} {:<5} {}] {}",
            ms,
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Install the console logger and set the global level. Fails if another
/// logger is already installed.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    STARTED.get_or_init(Instant::now);
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}
