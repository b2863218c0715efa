// cardshield/src/logger.rs
//! Logging setup for the cardshield binary.
//!
//! `RUST_LOG` is honoured unless an explicit level is passed in; without either,
//! only warnings and errors are shown. Calling `init_logger` more than once is
//! harmless, which lets tests initialise it freely.

use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

pub fn init_logger(level: Option<LevelFilter>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                buf.timestamp_seconds(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr);

    // Already initialised (for example by an earlier test): keep the first logger.
    let _ = builder.try_init();
}
