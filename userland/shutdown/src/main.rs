//! Awesom-O shutdown — выключение системы / system power-off
//!
//! Запускается скриптом администратора, не является PID 1.
//! Run by an administrative script; not PID 1.

use std::io::Write;
use std::process;

use libawesomo::config::ShutdownConfig;
use libawesomo::linux::Linux;
use libawesomo::logger::{self, Sink};
use libawesomo::shutdown;
use log::LevelFilter;

fn main() {
    logger::init(Sink::Stdout, LevelFilter::Info);

    let failure = match shutdown::run(&Linux, &ShutdownConfig::DEFAULT) {
        Ok(never) => match never {},
        Err(failure) => failure,
    };
    let _ = std::io::stderr().write_all(&failure.render());
    process::exit(1);
}
